//! Explicit retry policy with exponential backoff and jitter.
//!
//! Applied at each network call site rather than as cross-cutting
//! decoration. Only errors whose [`ContribError::is_retryable`] predicate
//! holds are retried; authentication failures bail out immediately without
//! consuming the attempt budget.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::{ContribError, Result};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the initial one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            ..RetryPolicy::default()
        }
    }

    /// Backoff before the attempt following `completed_attempts` failures.
    pub fn delay_for(&self, completed_attempts: u32) -> Duration {
        let exponent = completed_attempts.saturating_sub(1) as i32;
        let raw = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        let capped = raw.min(self.max_delay.as_secs_f64());
        let jittered = if self.jitter {
            let mut rng = rand::thread_rng();
            capped * rng.gen_range(0.5..1.5)
        } else {
            capped
        };
        Duration::from_secs_f64(jittered.min(self.max_delay.as_secs_f64()))
    }

    /// Run `call` until it succeeds, fails terminally, or the attempt budget
    /// is exhausted. The last error is returned on exhaustion.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts.max(1) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
