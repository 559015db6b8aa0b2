//! Configuration service integration tests with isolated environments.

use callaudit::config::{
    ConfigService, ProductionConfigService, TestEnvironmentProvider,
};
use std::sync::Arc;
use tempfile::TempDir;

fn isolated_service() -> (ProductionConfigService, TempDir) {
    let tmp = TempDir::new().unwrap();
    let env = TestEnvironmentProvider::new();
    env.set_var(
        "CALLAUDIT_CONFIG_PATH",
        tmp.path().join("config.toml").to_str().unwrap(),
    );
    let service = ProductionConfigService::with_env_provider(Arc::new(env)).unwrap();
    (service, tmp)
}

#[test]
fn test_defaults_without_config_file() {
    let (service, _tmp) = isolated_service();
    let config = service.get_config().unwrap();
    assert_eq!(config.vad.energy_threshold, 400.0);
    assert_eq!(config.vad.min_speech_duration_ms, 300);
    assert_eq!(config.late_hello.threshold_sec, 5.0);
    assert_eq!(config.semantic.threshold, 0.68);
    assert_eq!(config.learning.confidence_threshold, 0.85);
    assert_eq!(config.learning.auto_approve_threshold, 0.95);
    assert_eq!(config.learning.frequency_threshold, 5);
    assert_eq!(config.batch.per_file_timeout_seconds, 600);
    assert!(config.accent_correction.enabled);
}

#[test]
fn test_config_file_round_trip() {
    let (service, tmp) = isolated_service();
    service
        .set_config_value("vad.energy_threshold", "350")
        .unwrap();
    service
        .set_config_value("batch.account_tier", "paid")
        .unwrap();

    // A fresh service over the same path sees the persisted values
    let env = TestEnvironmentProvider::new();
    env.set_var(
        "CALLAUDIT_CONFIG_PATH",
        tmp.path().join("config.toml").to_str().unwrap(),
    );
    let fresh = ProductionConfigService::with_env_provider(Arc::new(env)).unwrap();
    let config = fresh.get_config().unwrap();
    assert_eq!(config.vad.energy_threshold, 350.0);
    assert_eq!(config.batch.account_tier, "paid");
}

#[test]
fn test_spec_keys_are_settable() {
    let (service, _tmp) = isolated_service();
    for (key, value) in [
        ("vad.energy_threshold", "300"),
        ("vad.min_speech_duration_ms", "150"),
        ("late_hello.thresholdSec", "6"),
        ("semantic.threshold", "0.7"),
        ("learning.confidence_threshold", "0.8"),
        ("learning.frequency_threshold", "4"),
        ("learning.auto_approve_threshold", "0.93"),
        ("batch.max_workers", "12"),
        ("batch.per_file_timeout_seconds", "300"),
        ("accent_correction.enabled", "false"),
    ] {
        if key == "late_hello.thresholdSec" {
            // The canonical key is snake_case
            assert!(service.set_config_value(key, value).is_err());
            service
                .set_config_value("late_hello.threshold_sec", value)
                .unwrap();
        } else {
            service
                .set_config_value(key, value)
                .unwrap_or_else(|e| panic!("set {} failed: {}", key, e));
        }
    }
    assert_eq!(
        service.get_config_value("batch.max_workers").unwrap(),
        "12"
    );
}

#[test]
fn test_invalid_values_rejected() {
    let (service, _tmp) = isolated_service();
    assert!(service.set_config_value("semantic.threshold", "1.5").is_err());
    assert!(service.set_config_value("vad.energy_threshold", "-10").is_err());
    assert!(
        service
            .set_config_value("batch.account_tier", "platinum")
            .is_err()
    );
    assert!(
        service
            .set_config_value("unknown.key", "anything")
            .is_err()
    );
    // Failed sets leave the config untouched
    assert_eq!(
        service.get_config_value("semantic.threshold").unwrap(),
        "0.68"
    );
}

#[test]
fn test_reset_to_defaults() {
    let (service, _tmp) = isolated_service();
    service.set_config_value("semantic.threshold", "0.8").unwrap();
    service.reset_to_defaults().unwrap();
    assert_eq!(
        service.get_config_value("semantic.threshold").unwrap(),
        "0.68"
    );
}

#[test]
fn test_vendor_api_key_fallback() {
    let tmp = TempDir::new().unwrap();
    let env = TestEnvironmentProvider::new();
    env.set_var(
        "CALLAUDIT_CONFIG_PATH",
        tmp.path().join("config.toml").to_str().unwrap(),
    );
    env.set_var("ASSEMBLYAI_API_KEY", "aai-secret");
    let service = ProductionConfigService::with_env_provider(Arc::new(env)).unwrap();
    assert_eq!(
        service.get_config().unwrap().transcriber.api_key.as_deref(),
        Some("aai-secret")
    );
}
