//! Bounded exponential backoff for rate-limited provider calls
//!
//! A rate-limited reply is not an error: the policy waits and asks again, and
//! once attempts run out it hands the last `RateLimited` reply back so the
//! fetch loop can skip that date.

use crate::error::Result;
use crate::provider::ProviderReply;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (1 means no retry)
    pub max_attempts: u32,

    /// Initial backoff duration
    pub initial_backoff: Duration,

    /// Maximum backoff duration
    pub max_backoff: Duration,

    /// Backoff multiplier (typically 2.0 for exponential backoff)
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(15),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            backoff_multiplier,
        }
    }

    /// Create a policy with no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_secs(0),
            max_backoff: Duration::from_secs(0),
            backoff_multiplier: 1.0,
        }
    }

    /// Create a policy with fast retries (for testing)
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(20),
            backoff_multiplier: 2.0,
        }
    }

    /// Calculate backoff duration for a given attempt
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_secs(0);
        }

        let backoff_ms = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi((attempt - 1) as i32);

        Duration::from_millis(backoff_ms as u64).min(self.max_backoff)
    }

    /// Run `operation` until it stops answering `RateLimited` or attempts run out
    ///
    /// Errors are returned immediately; they are never retried here.
    pub async fn execute<F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<ProviderReply>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<ProviderReply>>,
    {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            let reply = operation().await?;

            if !matches!(reply, ProviderReply::RateLimited) {
                if attempt > 0 {
                    debug!(
                        "Operation '{}' succeeded after {} retries",
                        operation_name, attempt
                    );
                }
                return Ok(reply);
            }

            if attempt + 1 < attempts {
                let backoff = self.backoff_duration(attempt + 1);
                warn!(
                    "Operation '{}' rate limited (attempt {}/{}). Retrying in {:?}",
                    operation_name,
                    attempt + 1,
                    attempts,
                    backoff
                );
                sleep(backoff).await;
            }
        }

        warn!(
            "Operation '{}' still rate limited after {} attempts",
            operation_name, attempts
        );
        Ok(ProviderReply::RateLimited)
    }
}
