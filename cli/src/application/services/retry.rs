//! Bounded retry of transient provider errors with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::config::RetryConfig;
use crate::domain::{PipelineError, ProviderError};

/// How many times to try a provider call, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. At least one.
    pub attempts: u32,
    /// Delay before the second attempt; doubled before each later one.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            initial_backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt + 1`, where `attempt` counts from 1.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Why a retried call gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryError {
    /// Every attempt failed transiently; carries the last error.
    Exhausted { attempts: u32, last: ProviderError },
    /// A non-transient error; not retried.
    Failed(ProviderError),
    Cancelled,
}

impl From<RetryError> for PipelineError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::Exhausted { attempts, last } => PipelineError::TransientProvider {
                attempts,
                source: last,
            },
            RetryError::Failed(source) => PipelineError::FatalProvider {
                what: source.operation().to_string(),
                reason: source.to_string(),
            },
            RetryError::Cancelled => PipelineError::Cancelled,
        }
    }
}

/// Call `call` until it succeeds, fails non-transiently, or the policy's
/// attempts run out. Backoff sleeps end early on cancellation.
///
/// # Errors
///
/// See [`RetryError`].
pub async fn retry_transient<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut call: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_transient() => return Err(RetryError::Failed(err)),
            Err(err) if attempt >= attempts => {
                return Err(RetryError::Exhausted {
                    attempts,
                    last: err,
                });
            }
            Err(err) => {
                let delay = policy.backoff(attempt);
                tracing::debug!(
                    operation = err.operation(),
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient provider error; retrying"
                );
                tokio::select! {
                    () = cancel.cancelled() => return Err(RetryError::Cancelled),
                    () = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
        }
    }
}
