// src/config/mod.rs
//! Configuration management module for CallAudit.
//!
//! This module provides the complete configuration service system with
//! dependency injection support and comprehensive type definitions.
//!
//! # Key Components
//!
//! - [`Config`] - Main configuration structure containing all settings
//! - [`ConfigService`] - Service interface for configuration management
//! - [`ProductionConfigService`] - Production implementation with file I/O
//! - [`TestConfigService`] - Test implementation with controlled behavior
//!
//! # Examples
//!
//! ```rust
//! use callaudit::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! assert_eq!(config.late_hello.threshold_sec, 5.0);
//! assert_eq!(config.semantic.threshold, 0.68);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The configuration system uses dependency injection to provide testable
//! and maintainable configuration management. All configuration access
//! should go through the [`ConfigService`] trait.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod environment;
pub mod service;
pub mod test_service;
pub mod validator;

pub use environment::{EnvironmentProvider, SystemEnvironmentProvider, TestEnvironmentProvider};
pub use service::{ConfigService, ProductionConfigService};
pub use test_service::TestConfigService;

// ============================================================================
// Configuration Type Definitions
// ============================================================================

/// Full application configuration for CallAudit.
///
/// This struct aggregates all settings for voice-activity detection,
/// rebuttal matching, phrase learning, batch execution, and the remote
/// transcriber, embedder, and classifier adapters.
///
/// # Serialization
///
/// This struct can be serialized to/from TOML format for configuration files.
///
/// ```rust
/// use callaudit::config::Config;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let toml_str = toml::to_string(&config)?;
/// assert!(toml_str.contains("[vad]"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Voice-activity detection parameters.
    #[serde(default)]
    pub vad: VadConfig,
    /// Late-hello detector settings.
    #[serde(default)]
    pub late_hello: LateHelloConfig,
    /// Semantic rebuttal matching settings.
    #[serde(default)]
    pub semantic: SemanticConfig,
    /// Phrase learning pipeline settings.
    #[serde(default)]
    pub learning: LearningConfig,
    /// Batch engine and worker pool settings.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Cloud transcription service adapter settings.
    #[serde(default)]
    pub transcriber: TranscriberConfig,
    /// Sentence embedding service adapter settings.
    #[serde(default)]
    pub embedder: EmbedderConfig,
    /// Optional LLM rebuttal classifier settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Accent correction (phonetic normalizer) settings.
    #[serde(default)]
    pub accent_correction: AccentCorrectionConfig,
    /// Phrase learning store location.
    #[serde(default)]
    pub store: StoreConfig,
    /// Optional file path from which the configuration was loaded.
    #[serde(default)]
    pub loaded_from: Option<PathBuf>,
}

/// Voice-activity detection configuration.
///
/// # Examples
///
/// ```rust
/// use callaudit::config::VadConfig;
///
/// let vad = VadConfig::default();
/// assert_eq!(vad.energy_threshold, 400.0);
/// assert_eq!(vad.min_speech_duration_ms, 300);
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct VadConfig {
    /// Baseline RMS threshold (int16 scale) for the non-adaptive path and
    /// the anchor for the adaptive noise-floor formula.
    pub energy_threshold: f32,
    /// Segments shorter than this are discarded (milliseconds).
    pub min_speech_duration_ms: u32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 400.0,
            min_speech_duration_ms: 300,
        }
    }
}

/// Late-hello detector configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LateHelloConfig {
    /// Seconds after which the first agent speech counts as late.
    pub threshold_sec: f32,
}

impl Default for LateHelloConfig {
    fn default() -> Self {
        Self { threshold_sec: 5.0 }
    }
}

/// Semantic matching configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SemanticConfig {
    /// Minimum cosine similarity for a Tier-2 match.
    /// Clamped to `[0.5, 0.9]` at load time and again in the matcher.
    pub threshold: f32,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self { threshold: 0.68 }
    }
}

impl SemanticConfig {
    /// Threshold clamped to the supported range.
    pub fn clamped_threshold(&self) -> f32 {
        self.threshold.clamp(0.5, 0.9)
    }
}

/// Phrase learning pipeline configuration.
///
/// # Examples
///
/// ```rust
/// use callaudit::config::LearningConfig;
///
/// let learning = LearningConfig::default();
/// assert_eq!(learning.confidence_threshold, 0.85);
/// assert_eq!(learning.frequency_threshold, 5);
/// assert_eq!(learning.auto_approve_threshold, 0.95);
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LearningConfig {
    /// Minimum semantic confidence for a match to enter the pending queue.
    pub confidence_threshold: f32,
    /// Detections needed for standard auto-approval.
    pub frequency_threshold: u32,
    /// Confidence for standard auto-approval (with frequency requirement).
    pub auto_approve_threshold: f32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.85,
            frequency_threshold: 5,
            auto_approve_threshold: 0.95,
        }
    }
}

/// Batch engine configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BatchConfig {
    /// Explicit worker-pool upper bound. Overrides the account tier.
    pub max_workers: Option<usize>,
    /// Account tier for the transcription service: "free" (5 concurrent
    /// jobs) or "paid" (20), always capped by CPU core count.
    pub account_tier: String,
    /// Per-file wall-clock deadline in seconds.
    pub per_file_timeout_seconds: u64,
    /// Per-file deadline for lite mode (no transcription).
    pub lite_timeout_seconds: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_workers: None,
            account_tier: "free".to_string(),
            per_file_timeout_seconds: 600,
            lite_timeout_seconds: 30,
        }
    }
}

/// Cloud transcription service adapter configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TranscriberConfig {
    /// API key for authentication.
    pub api_key: Option<String>,
    /// API base URL.
    pub base_url: String,
    /// HTTP request timeout in seconds. Polling for a finished transcript
    /// is bounded separately by the per-file deadline.
    pub request_timeout_seconds: u64,
    /// Number of retries on request failure.
    pub retry_attempts: u32,
    /// Retry interval in milliseconds.
    pub retry_delay_ms: u64,
    /// Request per-word speaker labels from the service.
    pub speaker_labels: bool,
    /// Transcription language code.
    pub language_code: String,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.assemblyai.com/v2".to_string(),
            request_timeout_seconds: 120,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            speaker_labels: false,
            language_code: "en".to_string(),
        }
    }
}

/// Sentence embedding service adapter configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct EmbedderConfig {
    /// API key for authentication (optional for local deployments).
    pub api_key: Option<String>,
    /// API base URL.
    pub base_url: String,
    /// Embedding model name.
    pub model: String,
    /// Number of texts per encode request.
    pub batch_size: usize,
    /// HTTP request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "http://127.0.0.1:8080/v1".to_string(),
            model: "all-mpnet-base-v2".to_string(),
            batch_size: 8,
            request_timeout_seconds: 60,
        }
    }
}

/// Optional LLM rebuttal classifier configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Whether the Tier-3 LLM fallback is enabled at all.
    pub enabled: bool,
    /// API key for authentication.
    pub api_key: Option<String>,
    /// API base URL.
    pub base_url: String,
    /// Model name passed to the chat completion endpoint.
    pub model: String,
    /// HTTP request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            base_url: "http://127.0.0.1:8081/v1".to_string(),
            model: "llama-3.1-8b-instruct".to_string(),
            request_timeout_seconds: 60,
        }
    }
}

/// Accent correction configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AccentCorrectionConfig {
    /// Apply the phonetic normalizer to raw transcripts.
    pub enabled: bool,
}

impl Default for AccentCorrectionConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Phrase learning store configuration.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct StoreConfig {
    /// SQLite database path. Defaults to the user data directory.
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Resolve the configured path, falling back to the default location
    /// under the user's data directory.
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("callaudit")
                .join("learning.db")
        })
    }
}
