use std::future::Future;
use std::time::Instant;

use airouter_core::{EventListeners, RouterError, RouterEvent};

use crate::backoff::next_delay;
use crate::config::RetryConfig;

/// §4.7 `Execute(op) -> result`.
///
/// Error classification is the single decision point: [`RouterError::is_retryable`]
/// dispatches on [`airouter_core::ErrorKind`] exclusively, never on the
/// message text, so an error's retry classification can't be lost by
/// wrapping it along the way.
pub struct RetryPolicy {
    config: RetryConfig,
    event_listeners: EventListeners<RouterEvent>,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            event_listeners: EventListeners::new(),
        }
    }

    pub fn with_event_listeners(mut self, listeners: EventListeners<RouterEvent>) -> Self {
        self.event_listeners = listeners;
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Runs `op`, retrying up to `max_attempts` times. `op` receives the
    /// zero-based attempt number so callers can, e.g., rotate to the next
    /// provider in the fallback list between attempts (design doc §4.8 step 4).
    pub async fn execute<F, Fut, T>(&self, mut op: F) -> Result<T, RouterError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RouterError>>,
    {
        let mut attempt = 0;

        loop {
            match op(attempt).await {
                Ok(value) => {
                    #[cfg(feature = "tracing")]
                    if attempt > 0 {
                        tracing::info!(attempts = attempt + 1, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    if !error.is_retryable() {
                        return Err(error);
                    }

                    if attempt + 1 >= self.config.max_attempts {
                        #[cfg(feature = "metrics")]
                        metrics::counter!("retry_exhausted_total").increment(1);
                        return Err(error);
                    }

                    let delay = next_delay(&self.config, attempt);

                    #[cfg(feature = "metrics")]
                    metrics::counter!("retry_attempts_total").increment(1);

                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt = attempt + 1, delay_ms = delay.as_millis() as u64, "retrying after delay");

                    self.event_listeners.emit(&RouterEvent::RetryAttempt {
                        attempt: attempt + 1,
                        delay_ms: delay.as_millis() as u64,
                        timestamp: Instant::now(),
                    });

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airouter_core::ErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            exponential_base: 2.0,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn succeeds_without_retrying_when_first_attempt_succeeds() {
        let policy = RetryPolicy::new(fast_config());
        let calls = AtomicU32::new(0);

        let result = policy
            .execute(|_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, RouterError>("ok") }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn terminal_errors_surface_on_first_attempt_with_no_backoff() {
        let policy = RetryPolicy::new(fast_config());
        let calls = AtomicU32::new(0);

        let result: Result<(), RouterError> = policy
            .execute(|_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RouterError::new(ErrorKind::TokenInvalid, "bad token")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retryable_errors_retry_until_exhausted() {
        let policy = RetryPolicy::new(fast_config());
        let calls = AtomicU32::new(0);

        let result: Result<(), RouterError> = policy
            .execute(|_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RouterError::new(ErrorKind::Provider5xx, "bad gateway")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retryable_error_recovers_on_a_later_attempt() {
        let policy = RetryPolicy::new(fast_config());
        let calls = AtomicU32::new(0);

        let result = policy
            .execute(|_attempt| {
                let count = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if count < 2 {
                        Err(RouterError::new(ErrorKind::ProviderTimeout, "timed out"))
                    } else {
                        Ok("recovered")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
