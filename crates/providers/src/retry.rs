//! Bounded retries with exponential backoff.
//!
//! Wraps a single provider. Each attempt gets its own timeout; transient
//! failures (rate limits, timeouts, transport errors, 5xx) are retried up to
//! `max_retries` times, anything else is returned at once.

use async_trait::async_trait;
use mizan_core::error::ProviderError;
use mizan_core::provider::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy knobs.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    /// Timeout applied to each attempt.
    pub attempt_timeout: Duration,
    /// Delay before the first retry; doubles afterwards.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            attempt_timeout: Duration::from_secs(120),
            base_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based).
    fn backoff(&self, retry: u32, error: &ProviderError) -> Duration {
        let exponential = self
            .base_backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)));
        match error {
            ProviderError::RateLimited { retry_after_secs } => {
                exponential.max(Duration::from_secs(*retry_after_secs))
            }
            _ => exponential,
        }
    }
}

/// A provider that retries transient failures of the wrapped provider.
pub struct RetryProvider {
    inner: Arc<dyn mizan_core::Provider>,
    policy: RetryPolicy,
}

impl RetryProvider {
    pub fn new(inner: Arc<dyn mizan_core::Provider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl mizan_core::Provider for RetryProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let outcome =
                tokio::time::timeout(self.policy.attempt_timeout, self.inner.complete(request.clone()))
                    .await;

            let error = match outcome {
                Ok(Ok(response)) => {
                    if attempt > 1 {
                        debug!(provider = %self.inner.name(), attempt, "Retry succeeded");
                    }
                    return Ok(response);
                }
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}s",
                    self.inner.name(),
                    self.policy.attempt_timeout.as_secs()
                )),
            };

            if !error.is_retryable() || attempt > self.policy.max_retries {
                return Err(error);
            }

            let delay = self.policy.backoff(attempt, &error);
            warn!(
                provider = %self.inner.name(),
                attempt,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retryable provider failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
