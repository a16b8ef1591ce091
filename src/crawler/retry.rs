//! Retry policy for page fetches
//!
//! The policy is a plain value injected into the [`Fetcher`](super::Fetcher):
//! it decides how many attempts a URL gets, how long to wait between
//! attempts, and which failures are worth retrying at all.

use crate::config::RetryConfig;
use crate::crawler::fetcher::{AttemptOutcome, FetchError};
use std::time::Duration;

/// Exponential backoff bounded between a minimum and maximum wait
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per URL, including the first
    pub max_attempts: u32,
    /// Backoff base; the wait after attempt `n` is `multiplier * 2^(n-1)` seconds
    pub multiplier: f64,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Builds a policy from the `[retry]` configuration section
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            multiplier: config.multiplier,
            min_wait: Duration::from_millis(config.min_wait_ms),
            max_wait: Duration::from_millis(config.max_wait_ms),
        }
    }

    /// Returns how long to wait after the given failed attempt (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(30) as i32;
        let seconds = self.multiplier * 2f64.powi(exponent);

        let delay = if seconds.is_finite() && seconds >= 0.0 {
            Duration::from_secs_f64(seconds.min(self.max_wait.as_secs_f64()))
        } else {
            self.max_wait
        };

        delay.clamp(self.min_wait, self.max_wait.max(self.min_wait))
    }

    /// Returns true if another attempt should follow this failed one
    pub fn should_retry(&self, outcome: &AttemptOutcome, attempt: u32) -> bool {
        matches!(outcome, AttemptOutcome::Transient(_)) && attempt < self.max_attempts
    }

    /// Classifies a fetch error as retryable or not
    pub fn is_retryable(&self, error: &FetchError) -> bool {
        error.is_transient()
    }
}
