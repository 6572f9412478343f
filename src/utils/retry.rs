//! Retry utilities with exponential backoff.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Initial delay between attempts.
    pub initial_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Backoff multiplier applied after each attempt.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }
}

/// Determines if an error is worth retrying.
pub trait Retryable {
    /// Returns true if the operation should be retried.
    fn is_retryable(&self) -> bool;
}

/// Terminal outcome of a retried operation.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub last_error: E,
    pub attempts: u32,
}

/// Execute an async operation with exponential backoff.
///
/// Non-retryable errors short-circuit after the first attempt; retryable
/// errors are retried until `max_attempts` is reached. Either way the caller
/// receives the last error together with the attempt count.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    E: Retryable + std::fmt::Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempts = 0;
    let mut delay = config.initial_delay;

    loop {
        attempts += 1;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if attempts >= config.max_attempts || !error.is_retryable() {
                    return Err(RetryExhausted {
                        last_error: error,
                        attempts,
                    });
                }

                // Jitter avoids thundering-herd retries against a recovering endpoint
                let jitter = Duration::from_millis(pseudo_jitter(delay.as_millis() as u64 / 4));
                sleep(delay + jitter).await;

                delay = Duration::from_secs_f64(delay.as_secs_f64() * config.multiplier)
                    .min(config.max_delay);
            }
        }
    }
}

/// Cheap non-cryptographic jitter derived from the wall clock.
fn pseudo_jitter(max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    seed % max
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError(bool);

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let counter = AtomicU32::new(0);
        let result = with_retry(&RetryConfig::new(3), || async {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TestError>(42)
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let config = RetryConfig::new(3).with_initial_delay(Duration::from_millis(5));
        let result = with_retry(&config, || async {
            let count = counter.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                Err(TestError(true))
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_short_circuits() {
        let counter = AtomicU32::new(0);
        let result = with_retry(&RetryConfig::new(3), || async {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(TestError(false))
        })
        .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let counter = AtomicU32::new(0);
        let config = RetryConfig::new(3).with_initial_delay(Duration::from_millis(5));
        let result = with_retry(&config, || async {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(TestError(true))
        })
        .await;

        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
