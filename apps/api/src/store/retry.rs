use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::store::StoreError;

/// Bounded retry with linear backoff and a per-attempt timeout.
/// Only errors for which `StoreError::is_retryable` holds are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before attempt `n + 1` is `base_delay * n`.
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(self.attempt_timeout)),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{operation} attempt {attempt}/{max_attempts} failed: {e}; retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if attempt > 1 {
                        warn!("{operation} failed after {attempt} attempts: {e}");
                    }
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_are_retried_with_linear_backoff() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let result = RetryPolicy::default()
            .run("insert", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(StoreError::Transient("connection reset".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s after the first failure, 2s after the second
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::default()
            .run("insert", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::Transient("down".into())) }
            })
            .await;

        assert!(matches!(result, Err(StoreError::Transient(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_constraint_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::default()
            .run("insert", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(StoreError::Duplicate("email".into())) }
            })
            .await;

        assert!(matches!(result, Err(StoreError::Duplicate(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_attempts_time_out_and_retry() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::default()
            .run("insert", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                    Ok::<_, StoreError>(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let calls = AtomicU32::new(0);
        let result = rt.block_on(policy.run("noop", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, StoreError>(()) }
        }));
        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
