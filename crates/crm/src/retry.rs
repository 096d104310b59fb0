use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use leadgate_core::retry::{is_retryable_status, RetryPolicy};
use tracing::{debug, warn};

use crate::error::UpstreamError;

/// Suspension point between attempts. Injected so schedules can be
/// observed without waiting on the clock.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Records requested delays and returns immediately.
#[derive(Clone, Debug, Default)]
pub struct RecordingSleeper {
    delays: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().map(|delays| delays.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        if let Ok(mut delays) = self.delays.lock() {
            delays.push(delay);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub text: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor").field("policy", &self.policy).finish_non_exhaustive()
    }
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `attempt` until it yields a 2xx, a terminal status, or retries
    /// run out. Transport failures retry on the same schedule as 5xx/429.
    pub async fn run<F, Fut>(&self, operation: &str, mut attempt: F) -> Result<RawResponse, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<RawResponse, UpstreamError>>,
    {
        let max_retries = self.policy.effective_retries();
        let mut retries_done = 0_u32;

        loop {
            let error = match attempt().await {
                Ok(response) if response.is_success() => {
                    if retries_done > 0 {
                        debug!(
                            event_name = "upstream.retry.recovered",
                            operation,
                            retries = retries_done,
                            "upstream call succeeded after retry"
                        );
                    }
                    return Ok(response);
                }
                Ok(response) => UpstreamError::Status { status: response.status, body: response.text },
                Err(error) => error,
            };

            let retryable = match &error {
                UpstreamError::Status { status, .. } => is_retryable_status(*status),
                UpstreamError::Transport(_) => true,
                UpstreamError::InvalidUrl(_) => false,
            };

            if !retryable {
                return Err(error);
            }

            if retries_done >= max_retries {
                warn!(
                    event_name = "upstream.retry.exhausted",
                    operation,
                    attempts = retries_done + 1,
                    error = %error,
                    "upstream call failed after exhausting retries"
                );
                return Err(error);
            }

            let delay = self.policy.delay_for(retries_done);
            warn!(
                event_name = "upstream.retry.scheduled",
                operation,
                attempt = retries_done + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying upstream call"
            );
            self.sleeper.sleep(delay).await;
            retries_done += 1;
        }
    }
}
