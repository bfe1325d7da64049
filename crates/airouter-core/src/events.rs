//! Event system used for observability across admission, queue, circuit
//! breaker, retry, and RAG orchestration.

#[cfg(feature = "tracing")]
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trait for events emitted by router components.
pub trait RouterEventTrait: Send + Sync + fmt::Debug {
    /// e.g. "state_transition", "call_rejected", "quota_exceeded".
    fn event_type(&self) -> &'static str;
    fn timestamp(&self) -> Instant;
    /// Name of the component instance that emitted this event (a provider
    /// name, a tenant id, a circuit breaker name, ...).
    fn source(&self) -> &str;
}

/// Trait for listening to router events.
pub trait EventListener<E: RouterEventTrait>: Send + Sync {
    fn on_event(&self, event: &E);
}

pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// A collection of event listeners, shared cheaply via `Arc` clones.
#[derive(Clone)]
pub struct EventListeners<E: RouterEventTrait> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: RouterEventTrait> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to all registered listeners. A panicking listener is
    /// caught so one misbehaving listener can't block the others from
    /// observing the event.
    pub fn emit(&self, event: &E) {
        for (index, listener) in self.listeners.iter().enumerate() {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));

            if let Err(_panic_payload) = result {
                #[cfg(feature = "tracing")]
                log_listener_panic(index, event, _panic_payload.as_ref());

                #[cfg(feature = "metrics")]
                record_listener_panic_metric(event);

                #[cfg(not(feature = "tracing"))]
                let _ = index;

                #[cfg(not(any(feature = "tracing", feature = "metrics")))]
                let _ = _panic_payload;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: RouterEventTrait> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A simple function-based event listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<E>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: RouterEventTrait,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

#[cfg(feature = "tracing")]
fn log_listener_panic<E: RouterEventTrait>(
    index: usize,
    event: &E,
    panic_payload: &(dyn Any + Send),
) {
    let panic_message = panic_payload
        .downcast_ref::<&'static str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic_payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    tracing::warn!(
        listener_index = index,
        source = event.source(),
        event_type = event.event_type(),
        panic_message = %panic_message,
        "router event listener panicked"
    );
}

#[cfg(feature = "metrics")]
fn record_listener_panic_metric<E: RouterEventTrait>(event: &E) {
    let source_label = event.source().to_string();
    let event_type_label = event.event_type().to_string();

    metrics::counter!(
        "router_event_listener_panics_total",
        "source" => source_label,
        "event_type" => event_type_label
    )
    .increment(1);
}

/// Concrete events emitted across the dispatch core. Kept as a single enum
/// (rather than one type per component) so a single `EventListeners<RouterEvent>`
/// can be wired into the application context and fanned out to a metrics
/// exporter or a log sink without per-component glue.
#[derive(Debug, Clone)]
pub enum RouterEvent {
    AdmissionAccepted {
        tenant_id: String,
        endpoint: String,
        timestamp: Instant,
    },
    AdmissionRejected {
        tenant_id: String,
        endpoint: String,
        reason: &'static str,
        timestamp: Instant,
    },
    JobEnqueued {
        job_id: String,
        priority: &'static str,
        timestamp: Instant,
    },
    JobDequeued {
        job_id: String,
        timestamp: Instant,
    },
    BatchFlushed {
        provider: String,
        size: usize,
        timestamp: Instant,
    },
    CircuitStateTransition {
        provider: String,
        from: &'static str,
        to: &'static str,
        timestamp: Instant,
    },
    CircuitCallRejected {
        provider: String,
        timestamp: Instant,
    },
    RetryAttempt {
        attempt: u32,
        delay_ms: u64,
        timestamp: Instant,
    },
    ProviderFallback {
        from_provider: String,
        to_provider: String,
        timestamp: Instant,
    },
    JobDeadLettered {
        job_id: String,
        error_code: &'static str,
        timestamp: Instant,
    },
    RagCacheHit {
        idempotency_key: String,
        timestamp: Instant,
    },
}

impl RouterEventTrait for RouterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RouterEvent::AdmissionAccepted { .. } => "admission_accepted",
            RouterEvent::AdmissionRejected { .. } => "admission_rejected",
            RouterEvent::JobEnqueued { .. } => "job_enqueued",
            RouterEvent::JobDequeued { .. } => "job_dequeued",
            RouterEvent::BatchFlushed { .. } => "batch_flushed",
            RouterEvent::CircuitStateTransition { .. } => "circuit_state_transition",
            RouterEvent::CircuitCallRejected { .. } => "circuit_call_rejected",
            RouterEvent::RetryAttempt { .. } => "retry_attempt",
            RouterEvent::ProviderFallback { .. } => "provider_fallback",
            RouterEvent::JobDeadLettered { .. } => "job_dead_lettered",
            RouterEvent::RagCacheHit { .. } => "rag_cache_hit",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RouterEvent::AdmissionAccepted { timestamp, .. }
            | RouterEvent::AdmissionRejected { timestamp, .. }
            | RouterEvent::JobEnqueued { timestamp, .. }
            | RouterEvent::JobDequeued { timestamp, .. }
            | RouterEvent::BatchFlushed { timestamp, .. }
            | RouterEvent::CircuitStateTransition { timestamp, .. }
            | RouterEvent::CircuitCallRejected { timestamp, .. }
            | RouterEvent::RetryAttempt { timestamp, .. }
            | RouterEvent::ProviderFallback { timestamp, .. }
            | RouterEvent::JobDeadLettered { timestamp, .. }
            | RouterEvent::RagCacheHit { timestamp, .. } => *timestamp,
        }
    }

    fn source(&self) -> &str {
        match self {
            RouterEvent::AdmissionAccepted { tenant_id, .. }
            | RouterEvent::AdmissionRejected { tenant_id, .. } => tenant_id,
            RouterEvent::JobEnqueued { job_id, .. }
            | RouterEvent::JobDequeued { job_id, .. }
            | RouterEvent::JobDeadLettered { job_id, .. } => job_id,
            RouterEvent::BatchFlushed { provider, .. }
            | RouterEvent::CircuitStateTransition { provider, .. }
            | RouterEvent::CircuitCallRejected { provider, .. } => provider,
            RouterEvent::RetryAttempt { .. } => "retry",
            RouterEvent::ProviderFallback { from_provider, .. } => from_provider,
            RouterEvent::RagCacheHit { idempotency_key, .. } => idempotency_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn listeners_are_invoked_in_registration_order_and_panic_does_not_block_others() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let f1 = Arc::clone(&first);
        let f2 = Arc::clone(&second);

        let mut listeners: EventListeners<RouterEvent> = EventListeners::new();
        listeners.add(FnListener::new(move |_: &RouterEvent| {
            f1.fetch_add(1, Ordering::SeqCst);
        }));
        listeners.add(FnListener::new(move |_: &RouterEvent| {
            f2.fetch_add(1, Ordering::SeqCst);
        }));

        let event = RouterEvent::JobEnqueued {
            job_id: "job-1".into(),
            priority: "high",
            timestamp: Instant::now(),
        };

        listeners.emit(&event);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn event_type_and_source_are_stable() {
        let event = RouterEvent::CircuitStateTransition {
            provider: "legal-encoder".into(),
            from: "closed",
            to: "open",
            timestamp: Instant::now(),
        };
        assert_eq!(event.event_type(), "circuit_state_transition");
        assert_eq!(event.source(), "legal-encoder");
    }
}
