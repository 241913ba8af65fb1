//! Retry with exponential backoff
//!
//! Used by the metadata store adapter for rate-limited reads and writes.
//! Object storage operations are never retried here; presigned uploads
//! leave retry policy to the uploading client.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Backoff strategy for retry delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed,
    /// Exponential increase: delay * 2^attempt
    Exponential,
}

impl BackoffStrategy {
    /// Delay before retry number `attempt` (0 = first retry)
    pub fn calculate_delay(
        &self,
        attempt: u32,
        initial_delay: Duration,
        max_delay: Duration,
    ) -> Duration {
        let delay = match self {
            BackoffStrategy::Fixed => initial_delay,
            BackoffStrategy::Exponential => {
                let multiplier = 2u32.saturating_pow(attempt);
                initial_delay.saturating_mul(multiplier)
            }
        };

        delay.min(max_delay)
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first (1 = no retries)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Backoff strategy to use
    pub strategy: BackoffStrategy,
}

impl RetryPolicy {
    /// Three attempts with exponential backoff
    pub fn exponential() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(2),
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// Single attempt, never retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            strategy: BackoffStrategy::Fixed,
        }
    }

    /// Set total attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay before retry number `attempt`
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        self.strategy
            .calculate_delay(attempt, self.initial_delay, self.max_delay)
    }

    /// Run `operation`, retrying errors for which `retryable` holds
    ///
    /// Returns the first success, the first non-retryable error, or the last
    /// error once attempts are exhausted.
    pub async fn execute_if<F, Fut, T, E, P>(&self, retryable: P, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if !retryable(&err) || attempt + 1 >= self.max_attempts {
                        return Err(err);
                    }

                    let delay = self.calculate_delay(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;

                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential()
    }
}
