//! Command implementations for the CallAudit CLI.
//!
//! Each subcommand has a module with an `execute` entry point taking its
//! parsed arguments and a configuration service; the [`dispatcher`] routes
//! parsed commands to them.

pub mod audit_command;
pub mod config_command;
pub mod dispatcher;
pub mod phrases_command;
