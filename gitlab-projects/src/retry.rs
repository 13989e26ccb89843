//! Bounded retry around a single GitLab API call.

use crate::config::RetryConfig;
use crate::errors::ApiError;
use crate::metrics_defs::REQUEST_RETRY;
use shared::counter;
use std::future::Future;
use tokio::time::{Duration, sleep};

/// Default classification: not found responses and malformed requests are terminal,
/// everything else (5xx, 429, transport errors, undecodable bodies) is retried.
pub fn is_retryable(error: &ApiError) -> bool {
    !error.is_not_found() && !error.is_malformed()
}

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    is_retryable: fn(&ApiError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        RetryPolicy::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            is_retryable,
        }
    }

    /// Same attempt budget, no sleeping between attempts.
    pub fn without_delay(max_attempts: u32) -> Self {
        RetryPolicy::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn with_classifier(mut self, is_retryable: fn(&ApiError) -> bool) -> Self {
        self.is_retryable = is_retryable;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, fails with a terminal error or the
    /// attempt budget is spent. The last error is returned on failure.
    /// `context` identifies the call in logs (e.g. the page or group).
    pub async fn call<T, F, Fut>(&self, context: &str, mut operation: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 1;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !(self.is_retryable)(&err) {
                tracing::debug!(context, attempt, error = %err, "Terminal error, not retrying");
                return Err(err);
            }

            if attempt >= self.max_attempts {
                tracing::error!(context, attempts = attempt, error = %err, "Retries exhausted");
                return Err(err);
            }

            let delay = self.backoff(attempt);
            tracing::warn!(
                context,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Request failed, retrying"
            );
            counter!(REQUEST_RETRY).increment(1);

            sleep(delay).await;
            attempt += 1;
        }
    }
}
