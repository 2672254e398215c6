//! Retry policy with capped exponential backoff
//!
//! [`RetryPolicy::run`] wraps an async operation, retrying it while the
//! caller-supplied predicate classifies the error as retryable. It knows
//! nothing about HTTP; [`with_retry`] binds it to [`RemoteError`]'s
//! transient classification (network failures, 408, 429, 5xx).
//!
//! Backoff before retry `n` is `min(base * 2^(n-1), cap)`:
//! 400ms, 800ms, 1.6s, 3.2s, 4s, ... with the defaults.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rostersnap_core::config::SyncConfig;
use rostersnap_core::domain::errors::RemoteError;
use tracing::{info, warn};

/// Default number of attempts, including the first
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(400);

/// Default upper bound on a single delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(4);

/// Bounded exponential-backoff retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy; an attempt budget of zero is raised to one
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Builds the policy from the `sync` config section
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.retry_base_delay(),
            config.retry_max_delay(),
        )
    }

    /// Attempts per operation, including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after failed attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        2u32.checked_pow(exponent)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable
    /// error, or the attempt budget is spent
    ///
    /// The error of the last attempt is returned unchanged.
    pub async fn run<F, Fut, T, E, P>(
        &self,
        label: &str,
        is_retryable: P,
        mut operation: F,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: Display,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!(label, attempt, "Operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_attempts && is_retryable(&err) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }
}

/// Runs a remote operation under `policy`, retrying transient failures
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    label: &str,
    operation: F,
) -> Result<T, RemoteError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RemoteError>>,
{
    policy.run(label, RemoteError::is_transient, operation).await
}
