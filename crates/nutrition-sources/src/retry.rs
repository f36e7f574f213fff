// ABOUTME: Retry with exponential backoff, jitter and per-attempt timeouts for source calls
// ABOUTME: Honors server-supplied Retry-After delays and retries only transient failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::future::Future;
use std::time::Duration;

use nutrition_core::constants::limits::{
    REQUEST_TIMEOUT_MS, RETRY_INITIAL_BACKOFF_MS, RETRY_MAX_ATTEMPTS, RETRY_MAX_BACKOFF_MS,
};
use nutrition_core::errors::SourceError;
use rand::Rng;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::circuit_breaker::CircuitBreaker;

/// Backoff and timeout settings for one source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_backoff: Duration,
    /// Upper bound on any single delay
    pub max_backoff: Duration,
    /// Deadline for each attempt; the attempt future is dropped when it passes
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(RETRY_INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(RETRY_MAX_BACKOFF_MS),
            attempt_timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no backoff
    #[must_use]
    pub const fn no_retry(attempt_timeout: Duration) -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            attempt_timeout,
        }
    }

    /// Exponential delay before attempt `attempt + 1`, without jitter
    #[must_use]
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1_u32 << exponent)
            .min(self.max_backoff)
    }

    /// Delay before the next attempt after `error`
    ///
    /// A server-supplied Retry-After wins (capped at `max_backoff`); otherwise
    /// the exponential delay is jittered into `[delay / 2, delay]`.
    fn delay_for(&self, attempt: u32, error: &SourceError) -> Duration {
        if let Some(retry_after) = error.retry_after() {
            return retry_after.min(self.max_backoff);
        }
        let base = self.base_delay(attempt);
        let half = base / 2;
        let jitter_ms = u64::try_from(half.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return base;
        }
        half + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts run out
    ///
    /// # Errors
    ///
    /// Non-retryable errors are returned as-is after the attempt that produced
    /// them. Persistent retryable failures become
    /// [`SourceError::RetriesExhausted`] wrapping the last error.
    pub async fn run<F, Fut, T>(&self, source_name: &str, mut operation: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        self.retry_loop(source_name, || self.attempt(source_name, operation()))
            .await
    }

    /// Like [`RetryPolicy::run`], with every attempt going through `breaker`
    ///
    /// The attempt timeout sits inside the breaker, so a hung source counts
    /// as a failure and a timed-out half-open probe reopens the circuit.
    ///
    /// # Errors
    ///
    /// Same as [`RetryPolicy::run`], plus [`SourceError::CircuitOpen`] once the
    /// breaker rejects an attempt.
    pub async fn run_guarded<F, Fut, T>(
        &self,
        source_name: &str,
        breaker: &CircuitBreaker,
        mut operation: F,
    ) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        self.retry_loop(source_name, || {
            breaker.call(self.attempt(source_name, operation()))
        })
        .await
    }

    /// One attempt bounded by `attempt_timeout`
    async fn attempt<Fut, T>(&self, source_name: &str, future: Fut) -> Result<T, SourceError>
    where
        Fut: Future<Output = Result<T, SourceError>>,
    {
        timeout(self.attempt_timeout, future)
            .await
            .unwrap_or_else(|_| {
                Err(SourceError::Timeout {
                    source_name: source_name.to_owned(),
                    timeout_ms: u64::try_from(self.attempt_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                })
            })
    }

    async fn retry_loop<F, Fut, T>(&self, source_name: &str, mut attempt_fn: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            let error = match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(error);
            }
            if attempt >= max_attempts {
                warn!(source = %source_name, attempts = attempt, error = %error, "retries exhausted");
                if max_attempts == 1 {
                    return Err(error);
                }
                return Err(SourceError::RetriesExhausted {
                    source_name: source_name.to_owned(),
                    attempts: attempt,
                    last_error: Box::new(error),
                });
            }

            let delay = self.delay_for(attempt, &error);
            debug!(
                source = %source_name,
                attempt,
                max_attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error,
                "retrying source call"
            );
            sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            attempt_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_base_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(350),
            attempt_timeout: Duration::from_secs(1),
        };
        assert_eq!(policy.base_delay(1), Duration::from_millis(100));
        assert_eq!(policy.base_delay(2), Duration::from_millis(200));
        assert_eq!(policy.base_delay(3), Duration::from_millis(350));
    }

    #[test]
    fn test_retry_after_overrides_backoff() {
        let policy = RetryPolicy {
            max_backoff: Duration::from_secs(10),
            ..RetryPolicy::default()
        };
        let error = SourceError::Http {
            source_name: "fatsecret".to_owned(),
            status: 429,
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(policy.delay_for(1, &error), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(3)
            .run("usda", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(SourceError::Http {
                        source_name: "usda".to_owned(),
                        status: 503,
                        retry_after: None,
                    })
                } else {
                    Ok("ok")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(3)
            .run("usda", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::Http {
                    source_name: "usda".to_owned(),
                    status: 404,
                    retry_after: None,
                })
            })
            .await;
        assert!(matches!(result, Err(SourceError::Http { status: 404, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_cancels_attempt_and_exhausts() {
        let policy = RetryPolicy {
            attempt_timeout: Duration::from_millis(5),
            ..fast_policy(2)
        };
        let result: Result<(), _> = policy
            .run("fatsecret", || async {
                sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(
            result,
            Err(SourceError::RetriesExhausted { attempts: 2, .. })
        ));
        if let Err(SourceError::RetriesExhausted { last_error, .. }) = result {
            assert!(matches!(*last_error, SourceError::Timeout { .. }));
        }
    }
}
