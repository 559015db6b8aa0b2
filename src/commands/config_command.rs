//! The `config` command: get, set, list and reset configuration.

use crate::Result;
use crate::cli::{ConfigAction, ConfigArgs, print_success};
use crate::config::ConfigService;

/// Execute the config command.
pub async fn execute(args: ConfigArgs, config_service: &dyn ConfigService) -> Result<()> {
    match args.action {
        ConfigAction::Set { key, value } => {
            config_service.set_config_value(&key, &value)?;
            print_success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Get { key } => {
            let value = config_service.get_config_value(&key)?;
            println!("{}", value);
        }
        ConfigAction::List => {
            let config = config_service.get_config()?;
            let toml_str = toml::to_string_pretty(&config)
                .map_err(|e| crate::error::AuditError::config(e.to_string()))?;
            println!("{}", toml_str);
        }
        ConfigAction::Reset => {
            config_service.reset_to_defaults()?;
            print_success("Configuration reset to defaults");
        }
        ConfigAction::Path => {
            println!("{}", config_service.get_config_file_path()?.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TestConfigService;

    #[tokio::test]
    async fn test_get_known_key() {
        let service = TestConfigService::with_defaults();
        let args = ConfigArgs {
            action: ConfigAction::Get {
                key: "semantic.threshold".to_string(),
            },
        };
        assert!(execute(args, &service).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_unknown_key_errors() {
        let service = TestConfigService::with_defaults();
        let args = ConfigArgs {
            action: ConfigAction::Get {
                key: "nope.nothing".to_string(),
            },
        };
        assert!(execute(args, &service).await.is_err());
    }

    #[tokio::test]
    async fn test_list_renders_toml() {
        let service = TestConfigService::with_defaults();
        let args = ConfigArgs {
            action: ConfigAction::List,
        };
        assert!(execute(args, &service).await.is_ok());
    }
}
