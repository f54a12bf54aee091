//! Bounded retry with exponential backoff and jitter.
//!
//! Adapted from this codebase's earlier `agent-agency-resilience`
//! retry executor. The circuit-breaker half of that module is not
//! carried forward: spec.md's object-store client (§4.4) calls for
//! per-operation bounded retry, not a stateful breaker that trips
//! across runs, and the core Non-goals exclude multi-writer
//! coordination that a breaker would otherwise protect.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{error, warn};

/// Retry configuration: exponential backoff `base_delay * 2^(attempt-1)`
/// bounded by `max_delay`, plus optional jitter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter_factor: 0.1,
        }
    }
}

/// Distinguishes retryable failures from ones that should abort the
/// retry loop immediately, per spec.md §4.4's transient/permanent split.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// Outcome of a retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryStats {
    pub attempts: u32,
    pub total_delay_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    #[error("operation failed after {attempts} attempt(s)")]
    Exhausted { attempts: u32, source: E },
    #[error("operation failed with a permanent error")]
    Permanent { source: E },
}

impl<E> RetryError<E> {
    pub fn into_source(self) -> E {
        match self {
            RetryError::Exhausted { source, .. } => source,
            RetryError::Permanent { source } => source,
        }
    }
}

fn calculate_delay(config: &RetryConfig, attempt: u32) -> u64 {
    let raw = (config.base_delay_ms as f64) * 2f64.powi(attempt as i32 - 1);
    let capped = raw.min(config.max_delay_ms as f64) as u64;
    if config.jitter_factor <= 0.0 {
        return capped;
    }
    let jitter_range = (capped as f64 * config.jitter_factor) as u64;
    if jitter_range == 0 {
        return capped;
    }
    let jitter = rand::random::<u64>() % (jitter_range + 1);
    capped.saturating_sub(jitter)
}

/// Run `operation` up to `config.max_attempts` times, sleeping with
/// exponential backoff between attempts. Stops immediately on a
/// permanent error (per `Retryable::is_transient`).
pub async fn retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::error::Error + 'static,
{
    let mut attempt = 0;
    let mut total_delay_ms = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() {
                    error!("permanent error on attempt {attempt}: {err}");
                    return Err(RetryError::Permanent { source: err });
                }
                if attempt >= config.max_attempts {
                    error!("exhausted {attempt} attempt(s): {err}");
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        source: err,
                    });
                }
                let delay_ms = calculate_delay(config, attempt);
                total_delay_ms += delay_ms;
                warn!("attempt {attempt} failed, retrying in {delay_ms}ms: {err}");
                sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct TestError(bool);
    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "test error")
        }
    }
    impl std::error::Error for TestError {}
    impl Retryable for TestError {
        fn is_transient(&self) -> bool {
            self.0
        }
    }

    #[tokio::test]
    async fn succeeds_first_try() {
        let config = RetryConfig::default();
        let result: Result<i32, RetryError<TestError>> =
            retry(&config, || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 1,
            max_delay_ms: 5,
            jitter_factor: 0.0,
        };
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();
        let result = retry(&config, move || {
            let attempts = attempts_clone.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(TestError(true))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn gives_up_on_permanent_error() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 1,
            max_delay_ms: 5,
            jitter_factor: 0.0,
        };
        let result: Result<i32, _> = retry(&config, || async { Err(TestError(false)) }).await;
        assert!(matches!(result, Err(RetryError::Permanent { .. })));
    }

    #[tokio::test]
    async fn exhausts_attempts() {
        let config = RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
            jitter_factor: 0.0,
        };
        let result: Result<i32, _> = retry(&config, || async { Err(TestError(true)) }).await;
        match result {
            Err(RetryError::Exhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[test]
    fn delay_grows_exponentially_without_jitter() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 100,
            max_delay_ms: 10_000,
            jitter_factor: 0.0,
        };
        assert_eq!(calculate_delay(&config, 1), 100);
        assert_eq!(calculate_delay(&config, 2), 200);
        assert_eq!(calculate_delay(&config, 3), 400);
    }

    #[test]
    fn delay_is_capped() {
        let config = RetryConfig {
            max_attempts: 10,
            base_delay_ms: 1000,
            max_delay_ms: 3000,
            jitter_factor: 0.0,
        };
        assert_eq!(calculate_delay(&config, 10), 3000);
    }
}
