//! Bounded retry with linear backoff and cancellation
//!
//! Every attempt and every backoff sleep race the caller's
//! [`CancellationToken`]; cancellation ends the loop with
//! [`AssessError::Cancelled`] regardless of the remaining budget.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::AssessError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Sleep after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// A successful value and the attempt that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// The loop gave up; `last` is the error of the final attempt
#[derive(Debug, Clone)]
pub struct RetryError {
    pub attempts: u32,
    pub last: AssessError,
}

/// Run `operation` until it succeeds, fails with a non-retryable error, the
/// attempt budget is spent, or `cancel` fires. The closure receives the
/// 1-based attempt number.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    operation_name: &str,
    mut operation: F,
) -> Result<Attempted<T>, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AssessError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(RetryError {
                attempts: attempt,
                last: AssessError::Cancelled,
            });
        }
        attempt += 1;
        debug!(operation = operation_name, attempt, max_attempts, "starting attempt");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AssessError::Cancelled),
            result = operation(attempt) => result,
        };

        let err = match outcome {
            Ok(value) => {
                return Ok(Attempted {
                    value,
                    attempts: attempt,
                });
            }
            Err(err) => err,
        };

        if attempt >= max_attempts || !err.is_retryable() {
            return Err(RetryError {
                attempts: attempt,
                last: err,
            });
        }

        let delay = policy.delay_for(attempt);
        warn!(
            operation = operation_name,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "attempt failed, retrying"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(RetryError {
                    attempts: attempt,
                    last: AssessError::Cancelled,
                });
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[test]
    fn test_linear_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(3), Duration::from_millis(300));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_with_backoff(&fast_policy(3), &CancellationToken::new(), "test", |attempt| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(AssessError::Network("flaky".into()))
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result.value, "done");
        assert_eq!(result.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let err = retry_with_backoff(&fast_policy(2), &CancellationToken::new(), "test", |_| async {
            Err::<(), _>(AssessError::Plugin("always".into()))
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 2);
        assert!(matches!(err.last, AssessError::Plugin(_)));
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = retry_with_backoff(&fast_policy(5), &CancellationToken::new(), "test", |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AssessError::NotFound("gone".into()))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_before_first_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = retry_with_backoff(&fast_policy(3), &cancel, "test", |_| async { Ok(1) })
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 0);
        assert!(matches!(err.last, AssessError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_interrupts_backoff_sleep() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let policy = RetryPolicy::new(3, Duration::from_secs(30));

        let err = retry_with_backoff(&policy, &cancel, "test", |_| {
            let trigger = trigger.clone();
            async move {
                trigger.cancel();
                Err::<(), _>(AssessError::Network("down".into()))
            }
        })
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 1);
        assert!(matches!(err.last, AssessError::Cancelled));
    }
}
