//! Timeout and retry helpers for calls to external capabilities.

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Backoff policy for retryable failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt; doubled for each further attempt
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Run `fut` with a deadline, mapping expiry to [`AppError::Timeout`].
pub async fn with_timeout<T, F>(operation: &str, after: Duration, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout {
            operation: operation.to_string(),
            after,
        }),
    }
}

/// Retry `op` while it fails with a retryable error, up to the policy limit.
///
/// Non-retryable errors are returned immediately.
pub async fn retry_async<T, F, Fut>(operation: &str, policy: RetryPolicy, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                let backoff = policy.backoff_for(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %e,
                    "Retrying after transient failure"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Bound every attempt of `op` by `timeout` and retry transient failures.
///
/// Timeouts count as transient, so a slow provider is retried too.
pub async fn bounded_call<T, F, Fut>(
    operation: &str,
    timeout: Duration,
    policy: RetryPolicy,
    mut op: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    retry_async(operation, policy, || with_timeout(operation, timeout, op())).await
}
