//! Bounded retry with exponential backoff and jitter
//!
//! Only network failures are retried. Validation, configuration and
//! not-found errors are returned on the first attempt.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, the first one included (1 = no retry)
    pub max_attempts: u32,

    /// Delay before the second attempt (milliseconds)
    pub initial_delay_ms: u64,

    /// Delay cap (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

/// Retry policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create new policy
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Configured attempts
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Delay before retry number `retry` (0-based), with 10% jitter
    fn delay(&self, retry: u32) -> Duration {
        let base = self.config.initial_delay_ms as f64 * 2f64.powi(retry as i32);
        let capped = base.min(self.config.max_delay_ms as f64);
        let jitter = (rand::random::<f64>() - 0.5) * capped * 0.2;
        Duration::from_millis((capped + jitter).max(0.0) as u64)
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    pub async fn run<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("{} succeeded after {} attempts", operation_name, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_network() && attempt < max_attempts => {
                    let delay = self.delay(attempt - 1);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        operation_name, attempt, max_attempts, delay, e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_attempts,
            initial_delay_ms: 10,
            max_delay_ms: 40,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_network_errors() {
        let calls = &AtomicU32::new(0);
        let result = policy(3)
            .run("op", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::Network("busy".to_string()))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = policy(2)
            .run("op", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Network("down".to_string()))
            })
            .await;

        assert!(result.unwrap_err().is_network());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_does_not_retry_validation() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = policy(5)
            .run("op", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::missing("alert_id"))
            })
            .await;

        assert!(matches!(result, Err(Error::Validation { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_is_capped() {
        let p = policy(10);
        for retry in 0..8 {
            assert!(p.delay(retry) <= Duration::from_millis(44));
        }
    }
}
