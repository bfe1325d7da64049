//! The application context: constructs every component, wires the
//! cross-component callbacks, and is the one place in the workspace that
//! owns `Arc`s to all of them (design doc §9 Design Notes: "replace
//! process-wide singletons... with an explicit application context
//! constructed once at startup and passed as the first argument through
//! call chains").
//!
//! Builds in two steps, per §9's "Cyclic references" note: first every
//! component is constructed independently (queue, batcher, breaker, retry,
//! providers, storage), then [`AppContext::build`] performs the one-time
//! `Bind` — wiring the batcher's flush callback to the worker pool's
//! `run_batch`, and the worker pool's provider lookup to the configured
//! per-job-type provider lists — so no two components hold owning
//! references to each other.

use std::collections::HashMap;
use std::sync::Arc;

use airouter_admission::AdmissionGate;
use airouter_batcher::Batcher;
use airouter_cache::RagResultCache;
use airouter_circuitbreaker::CircuitBreakerManager;
use airouter_core::{EventListeners, Job, JobType, RouterEvent};
use airouter_providers::{HttpProviderAdapter, ProviderAdapter};
use airouter_quota::QuotaManager;
use airouter_queue::{EnqueueOutcome, InProcessQueue, PriorityQueue};
use airouter_ratelimiter::RateLimiter;
use airouter_rag::{NullRetriever, RagPipeline, Retriever};
use airouter_retry::RetryPolicy;
use airouter_worker::{JobStorage, WorkerPool};

use crate::config::{AppConfig, CHAT_PRIMARY, LEGAL_ENCODER};
use crate::error::AppError;

/// Outcome of handing a job to the context's single ingress point,
/// collapsing the batcher's "did this flush synchronously" signal and the
/// queue's idempotency/overflow signals into one type callers switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Queued for an in-process worker to pick up, or handed to an
    /// already-open batch for its (provider, job type) key.
    Accepted(uuid::Uuid),
    /// An identical idempotency key was already in flight or completed;
    /// this call did not create a duplicate job.
    Deduplicated(uuid::Uuid),
    /// The queue is at capacity (design doc §4.4: admission then rejects
    /// the request as overload).
    Overloaded,
}

/// Everything constructed once at startup and shared for the life of the
/// process (design doc §9's "explicit application context").
pub struct AppContext {
    pub config: AppConfig,
    pub admission: Arc<AdmissionGate>,
    pub rate_limiter: Arc<RateLimiter>,
    pub quota: Arc<QuotaManager>,
    pub queue: Arc<PriorityQueue<InProcessQueue>>,
    pub batcher: Arc<Batcher>,
    pub breaker: Arc<CircuitBreakerManager>,
    pub retry: Arc<RetryPolicy>,
    pub providers: HashMap<String, Arc<dyn ProviderAdapter>>,
    pub chat_order: Vec<Arc<dyn ProviderAdapter>>,
    pub embedding_order: Vec<Arc<dyn ProviderAdapter>>,
    pub storage: Arc<JobStorage>,
    pub worker_pool: Arc<WorkerPool<InProcessQueue>>,
    pub cache: Arc<RagResultCache>,
    pub rag: Arc<RagPipeline>,
}

impl AppContext {
    /// Constructs and binds every component from `config`, using a
    /// [`NullRetriever`] for the RAG orchestrator's vector-search contract
    /// (design doc §1: the vector index is an external collaborator this
    /// workspace only consumes — a real deployment calls
    /// [`AppContext::build_with_retriever`] with its own implementation).
    pub fn build(config: AppConfig) -> Result<Self, AppError> {
        Self::build_with_retriever(config, Arc::new(NullRetriever))
    }

    pub fn build_with_retriever(
        config: AppConfig,
        retriever: Arc<dyn Retriever>,
    ) -> Result<Self, AppError> {
        if config.jwt_secret.is_empty() {
            return Err(AppError::InvalidConfig(
                "jwt_secret must be set (design doc §1's secret store collaborator)".to_string(),
            ));
        }

        let event_listeners = tracing_event_listeners();

        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limiter_config()));
        let quota = Arc::new(QuotaManager::new(config.quota_config()));
        let revocation = Arc::new(airouter_admission::InMemoryRevocationStore::new());

        let mut admission = AdmissionGate::new(
            config.jwt_secret.as_bytes(),
            revocation,
            Arc::clone(&rate_limiter),
            Arc::clone(&quota),
        );
        admission.require_scope("/inference", "inference:write");
        admission.require_scope("/embed", "embed:write");
        admission.require_scope("/search", "search:read");
        admission.require_scope("/rag/query", "rag:query");
        admission.require_scope("/admin", "admin:manage");

        let queue = Arc::new(PriorityQueue::new(InProcessQueue::new(config.queue.max_size)));
        let batcher = Arc::new(Batcher::new(config.batcher_config()));
        let breaker = Arc::new(
            CircuitBreakerManager::new(config.circuit_breaker_config())
                .with_event_listeners(event_listeners.clone()),
        );
        let retry = Arc::new(RetryPolicy::new(config.retry_config()).with_event_listeners(event_listeners.clone()));
        let storage = Arc::new(JobStorage::new(config.storage_config()));

        let providers = build_providers(&config);
        let chat_order = resolve_order(&providers, &config.providers.chat_order());
        let embedding_order = resolve_order(&providers, &[LEGAL_ENCODER.to_string()]);

        if chat_order.is_empty() {
            return Err(AppError::InvalidConfig(format!(
                "no chat provider resolved from configured order (primary={})",
                config.providers.primary
            )));
        }

        let pool_chat_order = chat_order.clone();
        let pool_embedding_order = embedding_order.clone();
        let worker_pool = Arc::new(
            WorkerPool::new(
                config.worker_pool_config(),
                Arc::clone(&queue),
                move |job_type| match job_type {
                    JobType::Embedding => pool_embedding_order.clone(),
                    JobType::Inference | JobType::Search => pool_chat_order.clone(),
                },
                Arc::clone(&breaker),
                Arc::clone(&retry),
                Arc::clone(&storage),
            )
            .with_event_listeners(event_listeners.clone()),
        );

        let cache = Arc::new(RagResultCache::new(airouter_cache::CacheConfig::default()));
        let rag = Arc::new(
            RagPipeline::new(
                config.rag_config(),
                retriever,
                Arc::clone(&cache) as Arc<dyn airouter_rag::RagCache>,
                chat_order.clone(),
                Arc::clone(&breaker),
                Arc::clone(&retry),
            )
            .with_event_listeners(event_listeners),
        );

        Ok(Self {
            config,
            admission: Arc::new(admission),
            rate_limiter,
            quota,
            queue,
            batcher,
            breaker,
            retry,
            providers,
            chat_order,
            embedding_order,
            storage,
            worker_pool,
            cache,
            rag,
        })
    }

    /// Starts the worker pool's long-lived dequeue loop. Must be called
    /// before [`AppContext::submit`] will make progress on jobs that go
    /// straight to the priority queue (the batcher's flush path dispatches
    /// independently of this loop).
    pub fn start(&self) {
        self.worker_pool.start();
    }

    /// Signals the worker pool and RAG pipeline to stop, then awaits
    /// in-flight work (design doc §5: "Shutdown cancels pending dequeues
    /// immediately; in-flight attempts run to their per-attempt deadline").
    pub async fn shutdown(&self) {
        self.rag.shutdown();
        self.worker_pool.stop().await;
    }

    /// The single ingress point a (not-yet-built) HTTP layer would call
    /// after `Admit` succeeds and the Job Factory has materialized a `Job`
    /// (design doc §2 steps 2-5): try the batcher first, and fall back to
    /// the priority queue when batching is disabled for this job's key
    /// (design doc §4.5: "Disabled mode returns false immediately so the
    /// caller processes single jobs in-line").
    pub async fn submit(&self, job: Job) -> SubmitOutcome {
        let pool = Arc::clone(&self.worker_pool);
        let batched = self
            .batcher
            .add(job.clone(), move |batch| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move { pool.run_batch(batch).await });
            })
            .await;

        if batched {
            return SubmitOutcome::Accepted(job.id);
        }

        match self.worker_pool.submit(job).await {
            EnqueueOutcome::Enqueued(id) => SubmitOutcome::Accepted(id),
            EnqueueOutcome::Deduplicated(id) => SubmitOutcome::Deduplicated(id),
            EnqueueOutcome::Rejected => SubmitOutcome::Overloaded,
        }
    }
}

fn build_providers(config: &AppConfig) -> HashMap<String, Arc<dyn ProviderAdapter>> {
    config
        .providers
        .adapter_configs()
        .into_iter()
        .map(|(name, adapter_config)| {
            let adapter: Arc<dyn ProviderAdapter> = Arc::new(HttpProviderAdapter::new(adapter_config));
            (name, adapter)
        })
        .collect()
}

fn resolve_order(
    providers: &HashMap<String, Arc<dyn ProviderAdapter>>,
    order: &[String],
) -> Vec<Arc<dyn ProviderAdapter>> {
    order
        .iter()
        .filter_map(|name| providers.get(name).cloned())
        .collect()
}

fn tracing_event_listeners() -> EventListeners<RouterEvent> {
    let mut listeners = EventListeners::new();
    #[cfg(feature = "tracing")]
    listeners.add(airouter_core::FnListener::new(|event: &RouterEvent| {
        tracing::info!(event_type = event.event_type(), source = %airouter_core::RouterEventTrait::source(event), "router event");
    }));
    listeners
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_secret() -> AppConfig {
        let mut config = AppConfig::default();
        config.jwt_secret = "test-secret".to_string();
        config
    }

    #[test]
    fn rejects_missing_jwt_secret() {
        let err = AppContext::build(AppConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig(_)));
    }

    #[test]
    fn binds_default_provider_order_from_chat_primary_and_alternative() {
        let context = AppContext::build(config_with_secret()).expect("context builds");
        let names: Vec<_> = context.chat_order.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec![CHAT_PRIMARY, "chat_alternative"]);
        assert_eq!(context.embedding_order.len(), 1);
        assert_eq!(context.embedding_order[0].name(), LEGAL_ENCODER);
    }

    #[tokio::test]
    async fn submit_enqueues_when_batching_is_disabled() {
        let mut config = config_with_secret();
        config.batcher.enabled = false;
        let context = AppContext::build(config).expect("context builds");

        let mut payload = std::collections::HashMap::new();
        payload.insert("query".to_string(), serde_json::json!("hello"));
        let job = Job::new(
            "tenant-a",
            "req-1",
            JobType::Inference,
            airouter_core::Priority::Normal,
            payload,
        );

        match context.submit(job).await {
            SubmitOutcome::Accepted(_) => {}
            other => panic!("expected Accepted, got {other:?}"),
        }
        assert_eq!(context.queue.size().await, 1);
    }
}
