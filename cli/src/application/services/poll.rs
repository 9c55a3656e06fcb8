//! Resource lifecycle poller.
//!
//! Refreshes a resource at a fixed interval until a readiness predicate
//! holds, the resource reaches a failed state, the deadline passes, or the
//! run is cancelled. Every wait is bounded.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::application::services::retry::{RetryPolicy, retry_transient};
use crate::domain::config::PollingConfig;
use crate::domain::{PipelineError, ProviderError};

/// Verdict of a readiness predicate on one refreshed snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    Pending,
    /// The resource can no longer become ready.
    Failed(String),
}

/// Poll cadence, deadline, and retry policy for one wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl PollOptions {
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            retry: RetryPolicy::default(),
        }
    }

    /// Options with the configured interval and the given timeout in seconds.
    #[must_use]
    pub fn from_config(polling: &PollingConfig, timeout_secs: u64, retry: RetryPolicy) -> Self {
        Self {
            interval: polling.interval(),
            timeout: Duration::from_secs(timeout_secs),
            retry,
        }
    }
}

/// Wait until `is_ready` holds for a snapshot returned by `refresh`.
///
/// Transient refresh errors are retried per `options.retry`. Returns the
/// first ready snapshot.
///
/// # Errors
///
/// - `Timeout` if no ready snapshot is observed before `options.timeout`.
/// - `TransientProvider` if a refresh keeps failing transiently.
/// - `FatalProvider` if a refresh is rejected or `is_ready` reports `Failed`.
/// - `Cancelled` if `cancel` fires.
pub async fn await_state<T, F, Fut, P>(
    what: &str,
    options: &PollOptions,
    cancel: &CancellationToken,
    mut refresh: F,
    is_ready: P,
) -> Result<T, PipelineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    P: Fn(&T) -> Readiness,
{
    let deadline = Instant::now() + options.timeout;
    let timeout = || PipelineError::Timeout {
        what: what.to_string(),
        waited: options.timeout,
    };

    let mut polls: u32 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        if Instant::now() >= deadline {
            return Err(timeout());
        }

        let snapshot = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PipelineError::Cancelled),
            () = tokio::time::sleep_until(deadline) => return Err(timeout()),
            result = retry_transient(&options.retry, cancel, &mut refresh) => result?,
        };
        polls += 1;

        match is_ready(&snapshot) {
            Readiness::Ready => {
                tracing::debug!(what, polls, "ready");
                return Ok(snapshot);
            }
            Readiness::Failed(reason) => {
                tracing::warn!(what, polls, %reason, "resource failed");
                return Err(PipelineError::FatalProvider {
                    what: what.to_string(),
                    reason,
                });
            }
            Readiness::Pending => tracing::debug!(what, polls, "not ready yet"),
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PipelineError::Cancelled),
            () = tokio::time::sleep_until(deadline) => return Err(timeout()),
            () = tokio::time::sleep(options.interval) => {}
        }
    }
}
