use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use airouter_core::{EventListeners, RouterEvent};

use crate::circuit::{Circuit, CircuitState};
use crate::config::CircuitBreakerConfig;

/// Owns one [`Circuit`] per provider name, all sharing the same
/// [`CircuitBreakerConfig`]. Breakers are created lazily on first reference
/// so callers don't need to know the provider list up front.
pub struct CircuitBreakerManager {
    config: CircuitBreakerConfig,
    breakers: Mutex<HashMap<String, Arc<Mutex<Circuit>>>>,
    state_atomics: Mutex<HashMap<String, Arc<AtomicU8>>>,
    event_listeners: EventListeners<RouterEvent>,
}

impl CircuitBreakerManager {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
            state_atomics: Mutex::new(HashMap::new()),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn with_event_listeners(mut self, listeners: EventListeners<RouterEvent>) -> Self {
        self.event_listeners = listeners;
        self
    }

    fn breaker_for(&self, provider: &str) -> Arc<Mutex<Circuit>> {
        let mut breakers = self.breakers.lock().expect("circuit breaker map poisoned");
        if let Some(existing) = breakers.get(provider) {
            return Arc::clone(existing);
        }

        let state_atomic = {
            let mut atomics = self.state_atomics.lock().expect("state atomic map poisoned");
            Arc::clone(
                atomics
                    .entry(provider.to_string())
                    .or_insert_with(|| Arc::new(AtomicU8::new(CircuitState::Closed as u8))),
            )
        };

        let circuit = Arc::new(Mutex::new(Circuit::new(provider, state_atomic)));
        breakers.insert(provider.to_string(), Arc::clone(&circuit));
        circuit
    }

    /// §4.6 `IsAvailable`.
    pub fn is_available(&self, provider: &str) -> bool {
        let circuit = self.breaker_for(provider);
        let mut circuit = circuit.lock().expect("circuit poisoned");
        circuit.is_available(&self.config, &self.event_listeners)
    }

    /// §4.6 `RecordSuccess`.
    pub fn record_success(&self, provider: &str) {
        let circuit = self.breaker_for(provider);
        let mut circuit = circuit.lock().expect("circuit poisoned");
        circuit.record_success(&self.config, &self.event_listeners);
    }

    /// §4.6 `RecordFailure`.
    pub fn record_failure(&self, provider: &str) {
        let circuit = self.breaker_for(provider);
        let mut circuit = circuit.lock().expect("circuit poisoned");
        circuit.record_failure(&self.config, &self.event_listeners);
    }

    /// §4.6 `GetState`. Lock-free: reads the atomic mirror rather than the
    /// mutex-guarded circuit.
    pub fn get_state(&self, provider: &str) -> CircuitState {
        let atomics = self.state_atomics.lock().expect("state atomic map poisoned");
        atomics
            .get(provider)
            .map(|atomic| CircuitState::from_u8(atomic.load(Ordering::Acquire)))
            .unwrap_or(CircuitState::Closed)
    }

    /// Admin operation: force a provider's breaker back to `closed`,
    /// clearing its failure count (design doc §6 admin endpoints).
    pub fn reset(&self, provider: &str) {
        let circuit = self.breaker_for(provider);
        let mut circuit = circuit.lock().expect("circuit poisoned");
        // record_success on Closed just clears the failure count; forcing
        // through half_open guarantees a definite transition regardless of
        // current state without introducing a bespoke "force" code path.
        if circuit.state() != CircuitState::Closed {
            circuit.record_success(&self.config, &self.event_listeners);
            circuit.record_success(&self.config, &self.event_listeners);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn manager() -> CircuitBreakerManager {
        CircuitBreakerManager::new(CircuitBreakerConfig {
            failure_threshold: 2,
            success_threshold: 1,
            timeout: Duration::from_millis(10),
            half_open_max_calls: 1,
        })
    }

    #[test]
    fn breakers_are_independent_per_provider() {
        let manager = manager();
        manager.record_failure("legal-encoder");
        manager.record_failure("legal-encoder");
        assert_eq!(manager.get_state("legal-encoder"), CircuitState::Open);
        assert_eq!(manager.get_state("primary-chat"), CircuitState::Closed);
    }

    #[test]
    fn get_state_is_readable_without_lock_contention_on_breaker() {
        let manager = manager();
        assert_eq!(manager.get_state("unknown-provider"), CircuitState::Closed);
    }
}
