//! Test configuration service with controlled, in-memory behavior.
//!
//! `TestConfigService` never touches the filesystem or the process
//! environment; commands and components under test receive exactly the
//! configuration the test constructed.

use crate::config::{Config, ConfigService};
use crate::{Result, error::AuditError};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// In-memory configuration service for tests.
///
/// # Examples
///
/// ```rust
/// use callaudit::config::{ConfigService, TestConfigService};
///
/// let service = TestConfigService::with_defaults();
/// let config = service.get_config().unwrap();
/// assert_eq!(config.late_hello.threshold_sec, 5.0);
/// ```
pub struct TestConfigService {
    config: Mutex<Config>,
}

impl TestConfigService {
    /// Create a test service wrapping the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config: Mutex::new(config),
        }
    }

    /// Create a test service with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(Config::default())
    }

    /// Create a test service with transcriber credentials set.
    pub fn with_transcriber_key(api_key: &str) -> Self {
        let mut config = Config::default();
        config.transcriber.api_key = Some(api_key.to_string());
        Self::new(config)
    }

    /// Create a test service with a custom semantic threshold.
    pub fn with_semantic_threshold(threshold: f32) -> Self {
        let mut config = Config::default();
        config.semantic.threshold = threshold;
        Self::new(config)
    }

    /// Mutate the wrapped configuration in place.
    pub fn update_config<F: FnOnce(&mut Config)>(&self, f: F) {
        let mut config = self.config.lock().unwrap();
        f(&mut config);
    }
}

impl Default for TestConfigService {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ConfigService for TestConfigService {
    fn get_config(&self) -> Result<Config> {
        Ok(self.config.lock().unwrap().clone())
    }

    fn reload(&self) -> Result<()> {
        Ok(())
    }

    fn save_config(&self) -> Result<()> {
        Ok(())
    }

    fn save_config_to_file(&self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn get_config_file_path(&self) -> Result<PathBuf> {
        Ok(PathBuf::from("/tmp/callaudit-test-config.toml"))
    }

    fn get_config_value(&self, key: &str) -> Result<String> {
        let config = self.get_config()?;
        match key {
            "semantic.threshold" => Ok(config.semantic.threshold.to_string()),
            "late_hello.threshold_sec" => Ok(config.late_hello.threshold_sec.to_string()),
            _ => Err(AuditError::config(format!(
                "TestConfigService: unsupported key {}",
                key
            ))),
        }
    }

    fn set_config_value(&self, key: &str, value: &str) -> Result<()> {
        let mut config = self.config.lock().unwrap();
        match key {
            "semantic.threshold" => {
                config.semantic.threshold = value
                    .parse()
                    .map_err(|_| AuditError::config("invalid threshold"))?;
                Ok(())
            }
            _ => Err(AuditError::config(format!(
                "TestConfigService: unsupported key {}",
                key
            ))),
        }
    }

    fn reset_to_defaults(&self) -> Result<()> {
        let mut config = self.config.lock().unwrap();
        *config = Config::default();
        Ok(())
    }
}
