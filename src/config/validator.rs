//! Configuration validation for CallAudit.
//!
//! Section-level validators invoked by the configuration service after
//! every load and before every persisted change. Validation keeps the
//! detection pipeline inside its supported parameter ranges so a bad
//! config file degrades to an error message instead of silent nonsense.

use crate::config::Config;
use crate::{Result, error::AuditError};

/// Validate a full configuration, section by section.
///
/// # Errors
///
/// Returns a configuration error describing the first invalid value found.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_vad(config)?;
    validate_late_hello(config)?;
    validate_semantic(config)?;
    validate_learning(config)?;
    validate_batch(config)?;
    validate_remote_urls(config)?;
    Ok(())
}

fn validate_vad(config: &Config) -> Result<()> {
    if config.vad.energy_threshold <= 0.0 || config.vad.energy_threshold > 32767.0 {
        return Err(AuditError::config(format!(
            "vad.energy_threshold must be in (0, 32767], got {}",
            config.vad.energy_threshold
        )));
    }
    if config.vad.min_speech_duration_ms < 50 || config.vad.min_speech_duration_ms > 5000 {
        return Err(AuditError::config(format!(
            "vad.min_speech_duration_ms must be in [50, 5000], got {}",
            config.vad.min_speech_duration_ms
        )));
    }
    Ok(())
}

fn validate_late_hello(config: &Config) -> Result<()> {
    if config.late_hello.threshold_sec <= 0.0 || config.late_hello.threshold_sec > 60.0 {
        return Err(AuditError::config(format!(
            "late_hello.threshold_sec must be in (0, 60], got {}",
            config.late_hello.threshold_sec
        )));
    }
    Ok(())
}

fn validate_semantic(config: &Config) -> Result<()> {
    // The matcher clamps to [0.5, 0.9]; values outside [0, 1] are rejected
    // outright as they indicate a typo rather than an out-of-range tuning.
    if !(0.0..=1.0).contains(&config.semantic.threshold) {
        return Err(AuditError::config(format!(
            "semantic.threshold must be in [0, 1], got {}",
            config.semantic.threshold
        )));
    }
    Ok(())
}

fn validate_learning(config: &Config) -> Result<()> {
    let learning = &config.learning;
    if !(0.0..=1.0).contains(&learning.confidence_threshold) {
        return Err(AuditError::config(format!(
            "learning.confidence_threshold must be in [0, 1], got {}",
            learning.confidence_threshold
        )));
    }
    if !(0.0..=1.0).contains(&learning.auto_approve_threshold) {
        return Err(AuditError::config(format!(
            "learning.auto_approve_threshold must be in [0, 1], got {}",
            learning.auto_approve_threshold
        )));
    }
    if learning.frequency_threshold == 0 {
        return Err(AuditError::config(
            "learning.frequency_threshold must be at least 1",
        ));
    }
    if learning.auto_approve_threshold < learning.confidence_threshold {
        return Err(AuditError::config(
            "learning.auto_approve_threshold must not be below learning.confidence_threshold",
        ));
    }
    Ok(())
}

fn validate_batch(config: &Config) -> Result<()> {
    let batch = &config.batch;
    if let Some(workers) = batch.max_workers {
        if workers == 0 || workers > 256 {
            return Err(AuditError::config(format!(
                "batch.max_workers must be in [1, 256], got {}",
                workers
            )));
        }
    }
    if !matches!(batch.account_tier.as_str(), "free" | "paid") {
        return Err(AuditError::config(format!(
            "batch.account_tier must be \"free\" or \"paid\", got \"{}\"",
            batch.account_tier
        )));
    }
    if batch.per_file_timeout_seconds == 0 {
        return Err(AuditError::config(
            "batch.per_file_timeout_seconds must be greater than 0",
        ));
    }
    if batch.lite_timeout_seconds == 0 {
        return Err(AuditError::config(
            "batch.lite_timeout_seconds must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_remote_urls(config: &Config) -> Result<()> {
    validate_base_url("transcriber.base_url", &config.transcriber.base_url)?;
    validate_base_url("embedder.base_url", &config.embedder.base_url)?;
    if config.classifier.enabled {
        validate_base_url("classifier.base_url", &config.classifier.base_url)?;
    }
    Ok(())
}

/// Validate a service base URL: http/https scheme and a hostname.
pub fn validate_base_url(key: &str, value: &str) -> Result<()> {
    use url::Url;
    let parsed = Url::parse(value)
        .map_err(|e| AuditError::config(format!("Invalid {}: {}", key, e)))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AuditError::config(format!(
            "{} must use http or https protocol",
            key
        )));
    }

    if parsed.host().is_none() {
        return Err(AuditError::config(format!(
            "{} must contain a valid hostname",
            key
        )));
    }

    Ok(())
}
