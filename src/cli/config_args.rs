// src/cli/config_args.rs
use clap::{Args, Subcommand};

/// Configuration management parameters
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Configuration action
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key, e.g. "semantic.threshold"
        key: String,

        /// New value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Show the full configuration
    List,

    /// Reset configuration to defaults
    Reset,

    /// Show the configuration file path
    Path,
}
