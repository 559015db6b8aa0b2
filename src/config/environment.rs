//! Environment variable abstraction for configuration loading.
//!
//! Provides an injectable environment source so that configuration tests
//! never mutate process-global state.

use std::collections::HashMap;
use std::sync::RwLock;

/// Abstraction over environment variable access.
///
/// Production code reads the process environment; tests inject a
/// controlled map instead.
pub trait EnvironmentProvider: Send + Sync {
    /// Get an environment variable value by key.
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Environment provider backed by the real process environment.
pub struct SystemEnvironmentProvider;

impl SystemEnvironmentProvider {
    /// Create a new system environment provider.
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemEnvironmentProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentProvider for SystemEnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory environment provider for tests.
///
/// # Examples
///
/// ```rust
/// use callaudit::config::{EnvironmentProvider, TestEnvironmentProvider};
///
/// let env = TestEnvironmentProvider::new();
/// env.set_var("CALLAUDIT_TRANSCRIBER_APIKEY", "test-key");
/// assert_eq!(
///     env.get_var("CALLAUDIT_TRANSCRIBER_APIKEY"),
///     Some("test-key".to_string())
/// );
/// ```
pub struct TestEnvironmentProvider {
    vars: RwLock<HashMap<String, String>>,
}

impl TestEnvironmentProvider {
    /// Create an empty test environment.
    pub fn new() -> Self {
        Self {
            vars: RwLock::new(HashMap::new()),
        }
    }

    /// Set a variable in the test environment.
    pub fn set_var(&self, key: &str, value: &str) {
        self.vars
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    /// Remove a variable from the test environment.
    pub fn remove_var(&self, key: &str) {
        self.vars.write().unwrap().remove(key);
    }
}

impl Default for TestEnvironmentProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentProvider for TestEnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.read().unwrap().get(key).cloned()
    }
}
