//! Retry with exponential back-off and jitter for one fetch+parse unit
//!
//! Transient failures (see [`FetchError::class`]) are retried up to
//! `max_retries` times; permanent failures are returned at once. The
//! back-off sleep races the caller's cancellation token so that a cancelled
//! session never waits out a delay.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::ScraperConfig;
use crate::FetchError;

/// Share of the computed delay added as random jitter (0..=10%)
const JITTER_FRACTION: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.retry_base_delay),
            Duration::from_millis(config.retry_max_delay),
        )
    }

    /// Back-off before retry number `attempt` (1-based)
    ///
    /// | Retry | Delay (base 1 000 ms, before jitter) |
    /// |-------|--------------------------------------|
    /// | 1     | 1 000 ms                             |
    /// | 2     | 2 000 ms                             |
    /// | 3     | 4 000 ms                             |
    ///
    /// Jitter adds up to 10% and the result never exceeds `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let computed = base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(20));
        let jitter = (computed as f64 * rand::random::<f64>() * JITTER_FRACTION) as u64;
        let capped = computed
            .saturating_add(jitter)
            .min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }

    /// Runs `action` until it succeeds, fails permanently, or retries run out
    ///
    /// # Arguments
    ///
    /// * `cancel` - Aborts the back-off sleep; the result is then `FetchError::Cancelled`
    /// * `action` - Produces one complete attempt; called once per attempt
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - The first successful attempt's value
    /// * `Err(FetchError)` - The permanent error, or the last transient error
    ///   after `1 + max_retries` attempts
    pub async fn execute<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut action: F,
    ) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut state = RetryState::default();
        loop {
            state.attempt_count += 1;
            let err = match action().await {
                Ok(value) => {
                    if state.attempt_count > 1 {
                        tracing::debug!("Succeeded on attempt {}", state.attempt_count);
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            let retries_used = state.attempt_count - 1;
            if !err.is_transient() || retries_used >= self.max_retries {
                if err.is_transient() {
                    tracing::warn!(
                        attempts = state.attempt_count,
                        error = %err,
                        "Retries exhausted"
                    );
                }
                return Err(err);
            }

            state.next_delay = self.delay_for(retries_used + 1);
            tracing::warn!(
                attempt = state.attempt_count,
                max_retries = self.max_retries,
                delay_ms = state.next_delay.as_millis() as u64,
                error = %err,
                "Transient fetch error, retrying after back-off"
            );
            state.last_error = Some(err);

            tokio::select! {
                _ = cancel.cancelled() => {
                    if let Some(last) = &state.last_error {
                        tracing::debug!("Back-off cancelled, last error: {}", last);
                    }
                    return Err(FetchError::Cancelled);
                }
                _ = tokio::time::sleep(state.next_delay) => {}
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ScraperConfig::default())
    }
}

/// Bookkeeping for one `execute` call; never escapes it
#[derive(Debug, Default)]
struct RetryState {
    attempt_count: u32,
    last_error: Option<FetchError>,
    next_delay: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(100), Duration::from_secs(5))
    }

    fn unavailable() -> FetchError {
        FetchError::Status {
            url: "https://www.daraz.pk/catalog/?q=fan&page=2".to_string(),
            status: 503,
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1000), Duration::from_millis(3000));
        let first = policy.delay_for(1);
        assert!(first >= Duration::from_millis(1000) && first <= Duration::from_millis(1100));
        let second = policy.delay_for(2);
        assert!(second >= Duration::from_millis(2000) && second <= Duration::from_millis(2200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(3000));
        assert_eq!(policy.delay_for(30), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_transient_makes_four_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<(), _> = policy(3)
            .execute(&CancellationToken::new(), || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(unavailable())
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(result.unwrap_err(), unavailable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<(), _> = policy(3)
            .execute(&CancellationToken::new(), || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::Status {
                        url: "https://www.amazon.com/s?k=x".to_string(),
                        status: 404,
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = policy(3)
            .execute(&CancellationToken::new(), || {
                let c = Arc::clone(&c);
                async move {
                    let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                    if attempt < 3 {
                        Err(FetchError::Timeout {
                            url: "https://www.amazon.com/s?k=x".to_string(),
                        })
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<(), _> = policy(0)
            .execute(&CancellationToken::new(), || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(unavailable())
                }
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let token = cancel.clone();
        let result: Result<(), _> = policy(3)
            .execute(&cancel, || {
                let c = Arc::clone(&c);
                let token = token.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    token.cancel();
                    Err(unavailable())
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err(), FetchError::Cancelled);
    }
}
