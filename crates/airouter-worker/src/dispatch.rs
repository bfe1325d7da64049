//! The per-job dispatch algorithm (design doc §4.8 steps 1-5): consult the
//! breaker, call the provider under the retry policy with a per-attempt
//! deadline, and on terminal failure rotate to the next provider in the
//! router's preference list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;

use airouter_core::{ErrorKind, EventListeners, Job, JobType, RouterError, RouterEvent};
use airouter_circuitbreaker::CircuitBreakerManager;
use airouter_providers::{EmbedRequest, InferenceRequest, ProviderAdapter, SearchRequest};
use airouter_retry::RetryPolicy;

pub struct DispatchOutcome {
    pub value: serde_json::Value,
    pub provider_used: String,
}

/// Why [`dispatch_job`] failed to produce a result. `ShuttingDown` is
/// distinguished from `Exhausted` so the caller can mark the job `cancelled`
/// rather than `dead_letter`/`failed` (design doc §4.8's shutdown semantics).
pub enum DispatchFailure {
    Exhausted(RouterError),
    ShuttingDown,
}

fn payload_as<T: DeserializeOwned>(job: &Job) -> Result<T, RouterError> {
    let value = serde_json::Value::Object(job.payload.clone().into_iter().collect());
    serde_json::from_value(value)
        .map_err(|error| RouterError::new(ErrorKind::InvalidParameter, error.to_string()))
}

async fn call_provider(provider: &dyn ProviderAdapter, job: &Job) -> Result<serde_json::Value, RouterError> {
    match job.job_type {
        JobType::Inference => {
            let request: InferenceRequest = payload_as(job)?;
            let outcome = provider.inference(&request).await?;
            Ok(serde_json::to_value(outcome).expect("InferenceOutcome always serializes"))
        }
        JobType::Embedding => {
            let request: EmbedRequest = payload_as(job)?;
            let outcome = provider.embed(&request).await?;
            Ok(serde_json::to_value(outcome).expect("EmbedOutcome always serializes"))
        }
        JobType::Search => {
            let request: SearchRequest = payload_as(job)?;
            let outcome = provider.search(&request).await?;
            Ok(serde_json::to_value(outcome).expect("SearchOutcome always serializes"))
        }
    }
}

/// Runs the full candidate list for `job`, honoring `job.per_attempt_timeout`
/// per call and stopping early if `shutdown` flips true between providers.
/// `candidates` is expected pre-filtered to `job.target_provider` when the
/// job names one.
pub async fn dispatch_job(
    job: &Job,
    candidates: &[Arc<dyn ProviderAdapter>],
    breaker: &CircuitBreakerManager,
    retry: &RetryPolicy,
    event_listeners: &EventListeners<RouterEvent>,
    shutdown: &AtomicBool,
) -> Result<DispatchOutcome, DispatchFailure> {
    if candidates.is_empty() {
        return Err(DispatchFailure::Exhausted(RouterError::new(
            ErrorKind::AllProvidersFailed,
            "no providers configured for this job type",
        )));
    }

    let mut last_error = RouterError::new(ErrorKind::AllProvidersFailed, "no providers attempted");

    for (index, provider) in candidates.iter().enumerate() {
        if shutdown.load(Ordering::Acquire) {
            return Err(DispatchFailure::ShuttingDown);
        }

        let provider_name = provider.name().to_string();
        let per_attempt_timeout = job.per_attempt_timeout;

        let result = retry
            .execute(|_attempt| {
                let provider_name = provider_name.clone();
                async move {
                    if !breaker.is_available(&provider_name) {
                        return Err(RouterError::new(
                            ErrorKind::Provider5xx,
                            format!("circuit open for provider {provider_name}"),
                        ));
                    }

                    match tokio::time::timeout(per_attempt_timeout, call_provider(provider.as_ref(), job)).await {
                        Ok(Ok(value)) => {
                            breaker.record_success(&provider_name);
                            Ok(value)
                        }
                        Ok(Err(error)) => {
                            breaker.record_failure(&provider_name);
                            Err(error)
                        }
                        Err(_elapsed) => {
                            breaker.record_failure(&provider_name);
                            Err(RouterError::new(ErrorKind::ProviderTimeout, "per-attempt deadline exceeded"))
                        }
                    }
                }
            })
            .await;

        match result {
            Ok(value) => {
                return Ok(DispatchOutcome {
                    value,
                    provider_used: provider_name,
                })
            }
            Err(error) => {
                if let Some(next) = candidates.get(index + 1) {
                    event_listeners.emit(&RouterEvent::ProviderFallback {
                        from_provider: provider_name,
                        to_provider: next.name().to_string(),
                        timestamp: Instant::now(),
                    });
                }
                last_error = error;
            }
        }
    }

    Err(DispatchFailure::Exhausted(last_error))
}
