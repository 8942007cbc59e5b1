use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

/// Result of a single attempt at a fallible operation
#[derive(Debug)]
pub enum Attempt<T, E> {
    Ok(T),
    /// Worth trying again. `retry_after` is a server-requested minimum delay.
    Retryable {
        error: E,
        retry_after: Option<Duration>,
    },
    /// Retrying would give the same answer
    Permanent(E),
}

/// Final result of [`RetryPolicy::run`]
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    /// Attempts made, including the last one
    pub attempts: u32,
}

/// Exponential backoff schedule
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub multiplier: f64,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2.0,
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `failed`-th failed attempt (1-based)
    #[must_use]
    pub fn backoff(&self, failed: u32) -> Duration {
        let exponent = i32::try_from(failed.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.initial_backoff.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            self.max_backoff
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }

    /// Run `op` until it succeeds, fails permanently, or the attempt budget
    /// is spent. The error returned is the last one seen.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match op().await {
                Attempt::Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        attempts,
                    }
                }
                Attempt::Permanent(error) => {
                    return RetryOutcome {
                        result: Err(error),
                        attempts,
                    }
                }
                Attempt::Retryable { error, .. } if attempts >= max_attempts => {
                    return RetryOutcome {
                        result: Err(error),
                        attempts,
                    }
                }
                Attempt::Retryable { error, retry_after } => {
                    let delay = self
                        .backoff(attempts)
                        .max(retry_after.unwrap_or_default());
                    debug!("Attempt {attempts}/{max_attempts} failed ({error}); retrying in {delay:?}");
                    sleep(delay).await;
                }
            }
        }
    }
}
