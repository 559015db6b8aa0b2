use crate::{Result, cli::Commands, config::ConfigService};
use std::sync::Arc;

/// Central command dispatcher to avoid code duplication.
///
/// Both the CLI entry point and the library API route parsed commands
/// through here, so argument validation and configuration injection stay
/// in one place.
pub async fn dispatch_command(
    command: Commands,
    config_service: Arc<dyn ConfigService>,
) -> Result<()> {
    dispatch_command_with_ref(command, config_service.as_ref()).await
}

/// Dispatch command with a borrowed config service reference.
pub async fn dispatch_command_with_ref(
    command: Commands,
    config_service: &dyn ConfigService,
) -> Result<()> {
    match command {
        Commands::Audit(args) => {
            args.validate()
                .map_err(crate::error::AuditError::CommandExecution)?;
            crate::commands::audit_command::execute(args, config_service).await
        }
        Commands::Phrases(args) => {
            crate::commands::phrases_command::execute(args, config_service).await
        }
        Commands::Config(args) => {
            crate::commands::config_command::execute(args, config_service).await
        }
        Commands::GenerateCompletion(args) => {
            let mut cmd = <crate::cli::Cli as clap::CommandFactory>::command();
            let cmd_name = cmd.get_name().to_string();
            let mut stdout = std::io::stdout();
            clap_complete::generate(args.shell, &mut cmd, cmd_name, &mut stdout);
            Ok(())
        }
    }
}
