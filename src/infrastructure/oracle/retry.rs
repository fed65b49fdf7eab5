//! Retry policy with exponential backoff for oracle requests.

use std::time::Duration;

use crate::domain::models::RetryConfig;

/// Retry policy with exponential backoff.
///
/// Backoff doubles with each retry: 2s → 4s → 8s, capped at the configured
/// maximum. Only transient errors are worth retrying; the engine consults
/// [`crate::domain::ports::OracleError::is_transient`] before asking for a
/// backoff, and all waiting goes through the injected
/// [`crate::domain::ports::Sleeper`] so tests never sleep for real.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries before giving up on a trial.
    max_retries: u32,
    /// Initial backoff duration in milliseconds.
    initial_backoff_ms: u64,
    /// Maximum backoff duration in milliseconds.
    max_backoff_ms: u64,
}

impl RetryPolicy {
    /// Create a new retry policy.
    ///
    /// # Arguments
    /// * `max_retries` - Maximum retry attempts (recommended: 3)
    /// * `initial_backoff_ms` - Starting backoff delay
    /// * `max_backoff_ms` - Backoff ceiling, must be >= the initial delay
    pub fn new(max_retries: u32, initial_backoff_ms: u64, max_backoff_ms: u64) -> Self {
        assert!(max_retries > 0, "max_retries must be greater than 0");
        assert!(
            initial_backoff_ms > 0,
            "initial_backoff_ms must be greater than 0"
        );
        assert!(
            max_backoff_ms >= initial_backoff_ms,
            "max_backoff_ms must be >= initial_backoff_ms"
        );

        Self {
            max_retries,
            initial_backoff_ms,
            max_backoff_ms,
        }
    }

    /// Maximum number of retries.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether another retry is allowed after `attempt` failures.
    pub fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Calculate exponential backoff duration for a given attempt.
    ///
    /// Formula: `min(initial_backoff * 2^attempt, max_backoff)`
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let backoff_ms = self
            .initial_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.max_backoff_ms);

        Duration::from_millis(backoff_ms)
    }
}

impl Default for RetryPolicy {
    /// Recommended defaults: 3 retries, 2 second initial backoff, 1 minute
    /// ceiling.
    fn default() -> Self {
        Self::new(3, 2_000, 60_000)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            config.initial_backoff_ms,
            config.max_backoff_ms,
        )
    }
}
