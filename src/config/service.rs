//! Configuration service system for dependency injection and test isolation.
//!
//! This module provides a clean abstraction for configuration management
//! that enables dependency injection and complete test isolation without
//! requiring unsafe code or global state resets.

use crate::config::{EnvironmentProvider, SystemEnvironmentProvider};
use crate::{Result, config::Config, error::AuditError};
use config::{Config as ConfigCrate, ConfigBuilder, Environment, File, builder::DefaultState};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Configuration service trait for dependency injection.
///
/// This trait abstracts configuration loading and reloading operations,
/// allowing different implementations for production and testing
/// environments.
pub trait ConfigService: Send + Sync {
    /// Get the current configuration.
    ///
    /// Returns the current [`Config`] instance loaded from files,
    /// environment variables, and defaults. This method may use internal
    /// caching for performance.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading fails due to:
    /// - Invalid TOML format in configuration files
    /// - Missing required configuration values
    /// - File system access issues
    fn get_config(&self) -> Result<Config>;

    /// Reload configuration from sources.
    ///
    /// Forces a reload of configuration from all sources, discarding
    /// any cached values.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration reloading fails.
    fn reload(&self) -> Result<()>;

    /// Save current configuration to the default file location.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Unable to determine config file path
    /// - File system write permissions are insufficient
    /// - TOML serialization fails
    fn save_config(&self) -> Result<()>;

    /// Save configuration to a specific file path.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the file write fails.
    fn save_config_to_file(&self, path: &Path) -> Result<()>;

    /// Get the default configuration file path.
    ///
    /// Returns the path where configuration files are expected to be
    /// located, typically `$CONFIG_DIR/callaudit/config.toml`.
    fn get_config_file_path(&self) -> Result<PathBuf>;

    /// Get a specific configuration value by key path.
    ///
    /// # Arguments
    ///
    /// - `key`: Dot-separated path to the configuration value
    ///   (e.g., "semantic.threshold")
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not recognized.
    fn get_config_value(&self, key: &str) -> Result<String>;

    /// Set a specific configuration value by key path.
    ///
    /// # Errors
    ///
    /// Returns an error if validation or persistence fails.
    fn set_config_value(&self, key: &str, value: &str) -> Result<()>;

    /// Reset configuration to default values.
    ///
    /// Overwrites the current configuration file with default values and
    /// reloads the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if save or reload fails.
    fn reset_to_defaults(&self) -> Result<()>;
}

/// Production configuration service implementation.
///
/// This service loads configuration from multiple sources in order of
/// priority:
/// 1. Environment variables (highest priority)
/// 2. User configuration file
/// 3. Built-in defaults (lowest priority)
///
/// Configuration is cached after first load for performance.
pub struct ProductionConfigService {
    config_builder: ConfigBuilder<DefaultState>,
    cached_config: Arc<RwLock<Option<Config>>>,
    env_provider: Arc<dyn EnvironmentProvider>,
    config_file_path: PathBuf,
}

impl ProductionConfigService {
    /// Create a new production configuration service using the system
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration builder cannot be initialized.
    pub fn new() -> Result<Self> {
        Self::with_env_provider(Arc::new(SystemEnvironmentProvider::new()))
    }

    /// Create a configuration service using the specified environment
    /// variable provider.
    ///
    /// # Arguments
    /// * `env_provider` - Environment variable provider
    pub fn with_env_provider(env_provider: Arc<dyn EnvironmentProvider>) -> Result<Self> {
        // A custom config path may be supplied through the environment
        let config_file_path =
            if let Some(custom_path) = env_provider.get_var("CALLAUDIT_CONFIG_PATH") {
                PathBuf::from(custom_path)
            } else {
                Self::user_config_path()
            };

        let config_builder = ConfigCrate::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::from(config_file_path.clone()).required(false))
            .add_source(Environment::with_prefix("CALLAUDIT").separator("_"));

        Ok(Self {
            config_builder,
            cached_config: Arc::new(RwLock::new(None)),
            env_provider,
            config_file_path,
        })
    }

    /// Add an additional configuration file source.
    pub fn with_custom_file(mut self, file_path: PathBuf) -> Result<Self> {
        self.config_builder = self.config_builder.add_source(File::from(file_path));
        Ok(self)
    }

    /// Get the user configuration file path.
    fn user_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("callaudit")
            .join("config.toml")
    }

    /// Load and validate configuration from all sources.
    fn load_and_validate(&self) -> Result<Config> {
        debug!("ProductionConfigService: Loading configuration from sources");

        let config_crate = self.config_builder.build_cloned().map_err(|e| {
            debug!("ProductionConfigService: Config build failed: {}", e);
            AuditError::config(format!("Failed to build configuration: {}", e))
        })?;

        let mut app_config = Config::default();

        if let Ok(config) = config_crate.clone().try_deserialize::<Config>() {
            app_config = config;
            debug!("ProductionConfigService: Full configuration loaded successfully");
        } else {
            debug!("ProductionConfigService: Full deserialization failed, attempting partial load");

            // Environment-only overrides arrive as a flat map; pick out the
            // credentials and endpoints individually.
            if let Ok(raw_map) = config_crate
                .try_deserialize::<std::collections::HashMap<String, serde_json::Value>>()
            {
                if let Some(section) = raw_map.get("transcriber").and_then(|v| v.as_object()) {
                    if let Some(api_key) = section.get("apikey").and_then(|v| v.as_str()) {
                        app_config.transcriber.api_key = Some(api_key.to_string());
                        debug!(
                            "ProductionConfigService: transcriber API key loaded from CALLAUDIT_TRANSCRIBER_APIKEY"
                        );
                    }
                    if let Some(base_url) = section.get("base_url").and_then(|v| v.as_str()) {
                        app_config.transcriber.base_url = base_url.to_string();
                    }
                }
                if let Some(section) = raw_map.get("embedder").and_then(|v| v.as_object()) {
                    if let Some(base_url) = section.get("base_url").and_then(|v| v.as_str()) {
                        app_config.embedder.base_url = base_url.to_string();
                    }
                    if let Some(model) = section.get("model").and_then(|v| v.as_str()) {
                        app_config.embedder.model = model.to_string();
                    }
                }
            }
        }

        // Direct service-key fallbacks for operators who export the
        // vendor-conventional variable names.
        if app_config.transcriber.api_key.is_none() {
            if let Some(api_key) = self.env_provider.get_var("ASSEMBLYAI_API_KEY") {
                debug!("ProductionConfigService: Found ASSEMBLYAI_API_KEY environment variable");
                app_config.transcriber.api_key = Some(api_key);
            }
        }

        crate::config::validator::validate_config(&app_config).map_err(|e| {
            debug!("ProductionConfigService: Config validation failed: {}", e);
            AuditError::config(format!("Configuration validation failed: {}", e))
        })?;

        debug!("ProductionConfigService: Configuration loaded and validated successfully");
        Ok(app_config)
    }

    fn set_value_internal(&self, config: &mut Config, key: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value
                .parse::<T>()
                .map_err(|_| AuditError::config(format!("Invalid value for {}: {}", key, value)))
        }

        match key {
            "vad.energy_threshold" => config.vad.energy_threshold = parse(key, value)?,
            "vad.min_speech_duration_ms" => {
                config.vad.min_speech_duration_ms = parse(key, value)?
            }
            "late_hello.threshold_sec" => config.late_hello.threshold_sec = parse(key, value)?,
            "semantic.threshold" => config.semantic.threshold = parse(key, value)?,
            "learning.confidence_threshold" => {
                config.learning.confidence_threshold = parse(key, value)?
            }
            "learning.frequency_threshold" => {
                config.learning.frequency_threshold = parse(key, value)?
            }
            "learning.auto_approve_threshold" => {
                config.learning.auto_approve_threshold = parse(key, value)?
            }
            "batch.max_workers" => config.batch.max_workers = Some(parse(key, value)?),
            "batch.account_tier" => config.batch.account_tier = value.to_string(),
            "batch.per_file_timeout_seconds" => {
                config.batch.per_file_timeout_seconds = parse(key, value)?
            }
            "batch.lite_timeout_seconds" => {
                config.batch.lite_timeout_seconds = parse(key, value)?
            }
            "transcriber.api_key" => config.transcriber.api_key = Some(value.to_string()),
            "transcriber.base_url" => config.transcriber.base_url = value.to_string(),
            "transcriber.request_timeout_seconds" => {
                config.transcriber.request_timeout_seconds = parse(key, value)?
            }
            "transcriber.speaker_labels" => {
                config.transcriber.speaker_labels = parse(key, value)?
            }
            "embedder.api_key" => config.embedder.api_key = Some(value.to_string()),
            "embedder.base_url" => config.embedder.base_url = value.to_string(),
            "embedder.model" => config.embedder.model = value.to_string(),
            "embedder.batch_size" => config.embedder.batch_size = parse(key, value)?,
            "classifier.enabled" => config.classifier.enabled = parse(key, value)?,
            "classifier.api_key" => config.classifier.api_key = Some(value.to_string()),
            "classifier.base_url" => config.classifier.base_url = value.to_string(),
            "classifier.model" => config.classifier.model = value.to_string(),
            "accent_correction.enabled" => {
                config.accent_correction.enabled = parse(key, value)?
            }
            "store.path" => config.store.path = Some(PathBuf::from(value)),
            _ => {
                return Err(AuditError::config(format!(
                    "Unknown configuration key: {}",
                    key
                )));
            }
        }
        Ok(())
    }

    fn get_value_internal(&self, config: &Config, key: &str) -> Result<String> {
        let value = match key {
            "vad.energy_threshold" => config.vad.energy_threshold.to_string(),
            "vad.min_speech_duration_ms" => config.vad.min_speech_duration_ms.to_string(),
            "late_hello.threshold_sec" => config.late_hello.threshold_sec.to_string(),
            "semantic.threshold" => config.semantic.threshold.to_string(),
            "learning.confidence_threshold" => config.learning.confidence_threshold.to_string(),
            "learning.frequency_threshold" => config.learning.frequency_threshold.to_string(),
            "learning.auto_approve_threshold" => {
                config.learning.auto_approve_threshold.to_string()
            }
            "batch.max_workers" => config
                .batch
                .max_workers
                .map(|w| w.to_string())
                .unwrap_or_else(|| "auto".to_string()),
            "batch.account_tier" => config.batch.account_tier.clone(),
            "batch.per_file_timeout_seconds" => config.batch.per_file_timeout_seconds.to_string(),
            "batch.lite_timeout_seconds" => config.batch.lite_timeout_seconds.to_string(),
            "transcriber.api_key" => config
                .transcriber
                .api_key
                .clone()
                .unwrap_or_else(|| "(unset)".to_string()),
            "transcriber.base_url" => config.transcriber.base_url.clone(),
            "transcriber.request_timeout_seconds" => {
                config.transcriber.request_timeout_seconds.to_string()
            }
            "transcriber.speaker_labels" => config.transcriber.speaker_labels.to_string(),
            "embedder.base_url" => config.embedder.base_url.clone(),
            "embedder.model" => config.embedder.model.clone(),
            "embedder.batch_size" => config.embedder.batch_size.to_string(),
            "classifier.enabled" => config.classifier.enabled.to_string(),
            "classifier.base_url" => config.classifier.base_url.clone(),
            "classifier.model" => config.classifier.model.clone(),
            "accent_correction.enabled" => config.accent_correction.enabled.to_string(),
            "store.path" => config.store.resolved_path().display().to_string(),
            _ => {
                return Err(AuditError::config(format!(
                    "Unknown configuration key: {}",
                    key
                )));
            }
        };
        Ok(value)
    }
}

impl ConfigService for ProductionConfigService {
    fn get_config(&self) -> Result<Config> {
        {
            let cache = self.cached_config.read().unwrap();
            if let Some(config) = cache.as_ref() {
                return Ok(config.clone());
            }
        }

        let config = self.load_and_validate()?;
        {
            let mut cache = self.cached_config.write().unwrap();
            *cache = Some(config.clone());
        }
        Ok(config)
    }

    fn reload(&self) -> Result<()> {
        let config = self.load_and_validate()?;
        let mut cache = self.cached_config.write().unwrap();
        *cache = Some(config);
        Ok(())
    }

    fn save_config(&self) -> Result<()> {
        let path = self.get_config_file_path()?;
        self.save_config_to_file(&path)
    }

    fn save_config_to_file(&self, path: &Path) -> Result<()> {
        let config = self.get_config()?;
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| AuditError::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    fn get_config_file_path(&self) -> Result<PathBuf> {
        Ok(self.config_file_path.clone())
    }

    fn get_config_value(&self, key: &str) -> Result<String> {
        let config = self.get_config()?;
        self.get_value_internal(&config, key)
    }

    fn set_config_value(&self, key: &str, value: &str) -> Result<()> {
        let mut config = self.get_config()?;
        self.set_value_internal(&mut config, key, value)?;
        crate::config::validator::validate_config(&config)?;

        {
            let mut cache = self.cached_config.write().unwrap();
            *cache = Some(config);
        }
        self.save_config()
    }

    fn reset_to_defaults(&self) -> Result<()> {
        {
            let mut cache = self.cached_config.write().unwrap();
            *cache = Some(Config::default());
        }
        self.save_config()
    }
}
