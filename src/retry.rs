use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::{RETRY_BACKOFF_FACTOR, RETRY_BASE_DELAY_MS, RETRY_MAX_ATTEMPTS};
use crate::error::Result;

/// Explicit retry loop with exponential backoff. The original error from the
/// final attempt is surfaced once attempts are exhausted; non-retryable
/// errors (bad credentials, validation) fail immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            factor,
        }
    }

    /// Policy used for all persistence calls: 3 attempts, 2s backoff, x1.5.
    pub fn persistence() -> Self {
        Self::new(
            RETRY_MAX_ATTEMPTS,
            Duration::from_millis(RETRY_BASE_DELAY_MS),
            RETRY_BACKOFF_FACTOR,
        )
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.base_delay;
        let mut attempt = 1u32;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if !e.is_retryable() || attempt >= self.max_attempts {
                        return Err(e);
                    }
                    warn!(
                        "{label}: attempt {attempt}/{} failed: {e}. Retrying in {:?}",
                        self.max_attempts, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.mul_f64(self.factor);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), 1.5)
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast_policy()
            .run("test", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(AppError::Provider {
                            provider: "mock",
                            message: "transient".to_string(),
                        })
                    } else {
                        Ok(42u32)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn surfaces_original_error_after_exhaustion() {
        let calls = AtomicU32::new(0);
        let result: crate::error::Result<()> = fast_policy()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(AppError::Provider {
                        provider: "mock",
                        message: "still down".to_string(),
                    })
                }
            })
            .await;
        assert!(matches!(result, Err(AppError::Provider { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let result: crate::error::Result<()> = fast_policy()
            .run("test", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AppError::Unauthorized { provider: "mock" }) }
            })
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
