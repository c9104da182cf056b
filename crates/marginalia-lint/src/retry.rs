//! Bounded retries with backoff.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::error::LintError;

/// Errors that know whether retrying could help.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for LintError {
    fn is_retryable(&self) -> bool {
        LintError::is_retryable(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Constant,
    Linear,
    Exponential { factor: u32 },
}

impl Backoff {
    /// Delay before retry number `retry` (1 for the first retry).
    pub fn delay(self, base: Duration, retry: u32) -> Duration {
        let step = retry.max(1);
        match self {
            Backoff::Constant => base,
            Backoff::Linear => base.saturating_mul(step),
            Backoff::Exponential { factor } => {
                base.saturating_mul(factor.saturating_pow(step - 1))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero behaves like one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff: Backoff::Constant,
        }
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff.delay(self.base_delay, retry).min(self.max_delay)
    }
}

/// Result of a retried operation, with how many attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, attempts: u32 },
    Failed { error: E, attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryOutcome::Succeeded { attempts, .. } | RetryOutcome::Failed { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            RetryOutcome::Succeeded { value, .. } => Ok(value),
            RetryOutcome::Failed { error, .. } => Err(error),
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. `op` receives the 1-based attempt number.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> RetryOutcome<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => {
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                };
            }
            Err(error) if attempt < max_attempts && error.is_retryable() => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    target: "marginalia::lint",
                    %error,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(error) => {
                return RetryOutcome::Failed {
                    error,
                    attempts: attempt,
                };
            }
        }
    }
}
