//! Retry with exponential backoff for network calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// An error that may go away when the same request is sent again.
pub trait Retryable: Display + Sized {
    /// Whether another attempt may succeed.
    fn is_retryable(&self) -> bool;

    /// Wait requested by the server (e.g. `Retry-After` on a 429).
    fn retry_after(&self) -> Option<Duration> {
        None
    }

    /// Wrap the last error once the attempt budget is spent.
    #[must_use]
    fn exhausted(self, _attempts: u32) -> Self {
        self
    }
}

/// Configuration for retry behavior on retryable errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial one).
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Maximum delay between retries (backoff and `Retry-After` are capped here).
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(16),
        }
    }
}

impl RetryPolicy {
    /// Policy from configuration values; at least one attempt is always made.
    #[must_use]
    pub fn from_millis(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(base_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Server-requested wait when there is one, else the backoff; capped.
    #[must_use]
    pub fn delay_for<E: Retryable>(&self, retry: u32, err: &E) -> Duration {
        err.retry_after()
            .map_or_else(|| self.backoff(retry), |wait| wait.min(self.max_delay))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the non-retryable error as-is, or the last retryable one
    /// passed through [`Retryable::exhausted`].
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if retry + 1 >= self.max_attempts => {
                    return Err(e.exhausted(self.max_attempts));
                }
                Err(e) => {
                    let delay = self.delay_for(retry, &e);
                    tracing::warn!(
                        label,
                        attempt = retry + 1,
                        max_attempts = self.max_attempts,
                        ?delay,
                        %e,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
            }
        }
    }
}
