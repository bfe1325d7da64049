use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use airouter_core::{EventListeners, RouterEvent};

use crate::config::CircuitBreakerConfig;

/// The three states a provider's circuit can be in (design doc §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Per-provider state machine. Mutable fields are only ever touched from
/// behind the `Mutex` the manager wraps each circuit in; the atomic mirror
/// exists so `state()` reads never need to take that lock.
pub(crate) struct Circuit {
    provider: String,
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    consecutive_failures: u32,
    half_open_successes: u32,
    half_open_calls_inflight: u32,
    opened_at: Option<Instant>,
}

impl Circuit {
    pub(crate) fn new(provider: impl Into<String>, state_atomic: Arc<AtomicU8>) -> Self {
        Self {
            provider: provider.into(),
            state: CircuitState::Closed,
            state_atomic,
            consecutive_failures: 0,
            half_open_successes: 0,
            half_open_calls_inflight: 0,
            opened_at: None,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    /// §4.6: `IsAvailable`. In `Open`, flips to `HalfOpen` once `timeout`
    /// has elapsed since opening. In `HalfOpen`, admits up to
    /// `half_open_max_calls` concurrent probes.
    pub(crate) fn is_available(
        &mut self,
        config: &CircuitBreakerConfig,
        listeners: &EventListeners<RouterEvent>,
    ) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = self
                    .opened_at
                    .map(|opened_at| opened_at.elapsed() >= config.timeout)
                    .unwrap_or(false);
                if elapsed {
                    self.transition_to(CircuitState::HalfOpen, listeners);
                    self.half_open_calls_inflight = 1;
                    true
                } else {
                    self.emit_rejected(listeners);
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.half_open_calls_inflight < config.half_open_max_calls {
                    self.half_open_calls_inflight += 1;
                    true
                } else {
                    self.emit_rejected(listeners);
                    false
                }
            }
        }
    }

    /// §4.6: half_open -> closed once `success_threshold` consecutive
    /// half-open successes accumulate; closed stays closed with the
    /// failure count cleared.
    pub(crate) fn record_success(
        &mut self,
        config: &CircuitBreakerConfig,
        listeners: &EventListeners<RouterEvent>,
    ) {
        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                self.half_open_successes += 1;
                self.half_open_calls_inflight = self.half_open_calls_inflight.saturating_sub(1);
                if self.half_open_successes >= config.success_threshold {
                    self.transition_to(CircuitState::Closed, listeners);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// §4.6: closed -> open at `failure_threshold` consecutive failures;
    /// any half-open failure reopens immediately.
    pub(crate) fn record_failure(
        &mut self,
        config: &CircuitBreakerConfig,
        listeners: &EventListeners<RouterEvent>,
    ) {
        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= config.failure_threshold {
                    self.transition_to(CircuitState::Open, listeners);
                }
            }
            CircuitState::HalfOpen => {
                self.half_open_calls_inflight = self.half_open_calls_inflight.saturating_sub(1);
                self.transition_to(CircuitState::Open, listeners);
            }
            CircuitState::Open => {}
        }
    }

    fn transition_to(&mut self, next: CircuitState, listeners: &EventListeners<RouterEvent>) {
        if self.state == next {
            return;
        }
        let from = self.state;

        self.state = next;
        self.state_atomic.store(next as u8, Ordering::Release);
        self.consecutive_failures = 0;
        self.half_open_successes = 0;
        self.half_open_calls_inflight = 0;
        self.opened_at = if next == CircuitState::Open {
            Some(Instant::now())
        } else {
            None
        };

        #[cfg(feature = "tracing")]
        tracing::info!(provider = %self.provider, from = from.label(), to = next.label(), "circuit breaker state transition");

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(
                "circuitbreaker_transitions_total",
                "provider" => self.provider.clone(),
                "from" => from.label(),
                "to" => next.label()
            )
            .increment(1);
            metrics::gauge!("circuitbreaker_state", "provider" => self.provider.clone())
                .set(next as u8 as f64);
        }

        listeners.emit(&RouterEvent::CircuitStateTransition {
            provider: self.provider.clone(),
            from: from.label(),
            to: next.label(),
            timestamp: Instant::now(),
        });
    }

    fn emit_rejected(&self, listeners: &EventListeners<RouterEvent>) {
        #[cfg(feature = "metrics")]
        metrics::counter!("circuitbreaker_calls_rejected_total", "provider" => self.provider.clone())
            .increment(1);

        listeners.emit(&RouterEvent::CircuitCallRejected {
            provider: self.provider.clone(),
            timestamp: Instant::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            success_threshold: 2,
            timeout: Duration::from_millis(20),
            half_open_max_calls: 1,
        }
    }

    fn new_circuit() -> Circuit {
        Circuit::new("legal-encoder", Arc::new(AtomicU8::new(0)))
    }

    #[test]
    fn opens_after_consecutive_failures_reach_threshold() {
        let listeners = EventListeners::new();
        let config = test_config();
        let mut circuit = new_circuit();

        for _ in 0..2 {
            circuit.record_failure(&config, &listeners);
            assert_eq!(circuit.state(), CircuitState::Closed);
        }
        circuit.record_failure(&config, &listeners);
        assert_eq!(circuit.state(), CircuitState::Open);
    }

    #[test]
    fn rejects_calls_while_open_and_before_timeout() {
        let listeners = EventListeners::new();
        let config = test_config();
        let mut circuit = new_circuit();

        for _ in 0..3 {
            circuit.record_failure(&config, &listeners);
        }
        assert_eq!(circuit.state(), CircuitState::Open);
        assert!(!circuit.is_available(&config, &listeners));
    }

    #[test]
    fn half_open_closes_after_success_threshold_and_reopens_on_failure() {
        let listeners = EventListeners::new();
        let config = test_config();
        let mut circuit = new_circuit();

        for _ in 0..3 {
            circuit.record_failure(&config, &listeners);
        }
        std::thread::sleep(Duration::from_millis(25));
        assert!(circuit.is_available(&config, &listeners));
        assert_eq!(circuit.state(), CircuitState::HalfOpen);

        circuit.record_success(&config, &listeners);
        assert_eq!(circuit.state(), CircuitState::HalfOpen);
        circuit.record_success(&config, &listeners);
        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let listeners = EventListeners::new();
        let config = test_config();
        let mut circuit = new_circuit();

        for _ in 0..3 {
            circuit.record_failure(&config, &listeners);
        }
        std::thread::sleep(Duration::from_millis(25));
        assert!(circuit.is_available(&config, &listeners));

        circuit.record_failure(&config, &listeners);
        assert_eq!(circuit.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_limits_concurrent_probes() {
        let listeners = EventListeners::new();
        let config = test_config();
        let mut circuit = new_circuit();

        for _ in 0..3 {
            circuit.record_failure(&config, &listeners);
        }
        std::thread::sleep(Duration::from_millis(25));
        assert!(circuit.is_available(&config, &listeners));
        assert!(!circuit.is_available(&config, &listeners));
    }
}
