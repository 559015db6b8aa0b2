// src/cli/phrases_args.rs
use clap::{Args, Subcommand};

/// Learned phrase repository management parameters
#[derive(Args, Debug)]
pub struct PhrasesArgs {
    /// Phrase management action
    #[command(subcommand)]
    pub action: PhrasesAction,
}

/// Phrase management actions
#[derive(Subcommand, Debug)]
pub enum PhrasesAction {
    /// List pending learned phrases with quality tiers
    List {
        /// Status filter: pending, approved, rejected, auto_approved
        #[arg(long, default_value = "pending")]
        status: String,
    },

    /// Approve a pending phrase into the repository
    Approve {
        /// Pending phrase id
        id: i64,
    },

    /// Approve all pending phrases of a category at or above its adaptive
    /// quality threshold
    ApproveCategory {
        /// Category to approve
        category: String,
    },

    /// Reject a pending phrase and blacklist it
    Reject {
        /// Pending phrase id
        id: i64,

        /// Rejection reason for the blacklist
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Add a phrase straight to the approved repository
    Add {
        /// Phrase category
        category: String,

        /// The phrase text
        phrase: String,
    },

    /// Show repository statistics
    Stats,
}
