//! Command-line interface for the CallAudit call auditing tool.
//!
//! # Architecture
//!
//! The CLI is built using `clap` and follows a subcommand pattern:
//! - `audit` - Process a folder of call recordings
//! - `phrases` - Review and manage the learned phrase repository
//! - `config` - Configuration management and inspection
//! - `generate-completion` - Shell completion script generation
//!
//! # Examples
//!
//! ```bash
//! # Audit a folder of recordings, flagged calls only
//! callaudit audit /calls/campaign-north
//!
//! # Full results with 8 workers
//! callaudit audit /calls/campaign-north --all-results --max-workers 8
//!
//! # Review pending learned phrases
//! callaudit phrases list
//! ```

mod audit_args;
mod config_args;
mod generate_completion_args;
mod phrases_args;
pub mod table;
pub mod ui;

pub use audit_args::AuditArgs;
use clap::{Parser, Subcommand};
pub use config_args::{ConfigAction, ConfigArgs};
pub use generate_completion_args::GenerateCompletionArgs;
pub use phrases_args::{PhrasesAction, PhrasesArgs};
pub use ui::{create_progress_bar, print_error, print_success, print_warning};

/// Main CLI application structure defining the top-level interface.
#[derive(Parser, Debug)]
#[command(name = "callaudit")]
#[command(about = "Concurrent sales-call audio audit tool")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the CallAudit CLI application.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Audit a folder of call recordings
    Audit(AuditArgs),

    /// Review and manage the learned phrase repository
    Phrases(PhrasesArgs),

    /// Manage and inspect application configuration
    Config(ConfigArgs),

    /// Generate shell completion scripts
    GenerateCompletion(GenerateCompletionArgs),
}

/// Executes the CallAudit CLI application with parsed arguments.
///
/// # Errors
///
/// Returns a [`crate::Result<()>`] that wraps any errors encountered
/// during command execution. Errors are propagated up to the main
/// function for proper exit code handling.
pub async fn run() -> crate::Result<()> {
    let config_service = std::sync::Arc::new(crate::config::ProductionConfigService::new()?);
    run_with_config(config_service.as_ref()).await
}

/// Run the CLI with a provided configuration service.
///
/// This function enables dependency injection of configuration services,
/// making it easier to test and providing better control over
/// configuration management.
///
/// # Errors
///
/// Returns an error if command execution fails.
pub async fn run_with_config(
    config_service: &dyn crate::config::ConfigService,
) -> crate::Result<()> {
    let cli = Cli::parse();
    crate::commands::dispatcher::dispatch_command_with_ref(cli.command, config_service).await
}
