//! Retry scheduling for remote service calls.
//!
//! Remote calls retry on a bounded doubling schedule: the first retry
//! waits the base delay, each further retry doubles it, and no single
//! wait exceeds the policy ceiling. The schedule is deterministic so
//! tests can assert it without wall-clock tolerances.

use crate::Result;
use tokio::time::{Duration, sleep};

/// Bounded doubling retry schedule.
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling for any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy from an attempt count and base delay in milliseconds.
    ///
    /// An attempt count of zero is lifted to one; the operation always
    /// runs at least once.
    pub fn new(max_attempts: u32, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (zero-based): the base delay
    /// doubled per retry, saturating at the ceiling.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Run an operation until it succeeds or the policy is exhausted.
///
/// Sleeps `policy.delay_for(n)` between attempt `n + 1` and attempt
/// `n + 2`. When attempts run out the last error is returned as-is, so
/// callers keep the typed failure (timeout vs. auth vs. service error).
pub async fn run_with_retries<F, Fut, T>(policy: &RetryPolicy, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        if attempt >= policy.max_attempts {
            return Err(error);
        }
        sleep(policy.delay_for(attempt - 1)).await;
    }
}
