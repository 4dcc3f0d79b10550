//! Bounded retry around a fallible async operation.
//!
//! Each attempt's outcome is recorded into the [`CircuitBreaker`] for the
//! target: success short-circuits with the result, failure sleeps a fixed
//! interval and tries again until the bound is hit. The inter-attempt sleep
//! is `tokio::time::sleep`, which is cancel-safe: dropping the in-flight
//! future (the waiter timing out, the task being aborted) aborts the retry
//! loop instead of swallowing the cancellation.

use std::future::Future;
use std::time::Duration;

use crate::breaker::CircuitBreaker;
use crate::error::{Result, RpcError};

/// Bounded-attempt wrapper integrated with circuit breaker recording.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    max_retries: u32,
    retry_interval: Duration,
}

impl RetryExecutor {
    /// Create an executor allowing `max_retries` retries after the first
    /// attempt, waiting `retry_interval` between attempts.
    pub fn new(max_retries: u32, retry_interval: Duration) -> Self {
        Self {
            max_retries,
            retry_interval,
        }
    }

    /// Run `operation` up to `max_retries + 1` times against `target`.
    ///
    /// # Errors
    ///
    /// [`RpcError::RetryExhausted`] wrapping the last failure once all
    /// attempts are spent.
    pub async fn execute_with_retry<T, F, Fut>(
        &self,
        breaker: &CircuitBreaker,
        target: &str,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_retries + 1;
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                tracing::debug!(endpoint = target, attempt, "retrying call");
            }

            match operation().await {
                Ok(result) => {
                    breaker.record_success(target);
                    if attempt > 0 {
                        tracing::debug!(endpoint = target, attempt, "retry succeeded");
                    }
                    return Ok(result);
                }
                Err(e) => {
                    breaker.record_failure(target);
                    tracing::warn!(endpoint = target, attempt, error = %e, "call attempt failed");
                    last_error = Some(e);
                }
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(self.retry_interval).await;
            }
        }

        // last_error is always set here: the loop ran at least once and the
        // success arm returns early.
        let source = last_error.unwrap_or(RpcError::Timeout);
        Err(RpcError::RetryExhausted {
            attempts,
            source: Box::new(source),
        })
    }
}
