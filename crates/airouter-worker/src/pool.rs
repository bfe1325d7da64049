//! The worker pool itself (design doc §4.8): `Start`, `Stop`, `Submit`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;

use airouter_circuitbreaker::CircuitBreakerManager;
use airouter_core::{EventListeners, Job, JobStatus, JobType, RouterEvent};
use airouter_providers::ProviderAdapter;
use airouter_queue::{EnqueueOutcome, PriorityQueue, QueueBackend};
use airouter_retry::RetryPolicy;

use crate::config::WorkerPoolConfig;
use crate::dispatch::{dispatch_job, DispatchFailure};
use crate::storage::JobStorage;

/// Shared state every worker task reads from; held behind `Arc` so `Start`
/// can hand one clone per spawned task.
struct WorkerContext<B: QueueBackend> {
    config: WorkerPoolConfig,
    queue: Arc<PriorityQueue<B>>,
    router_by_job_type: Box<dyn Fn(JobType) -> Vec<Arc<dyn ProviderAdapter>> + Send + Sync>,
    breaker: Arc<CircuitBreakerManager>,
    retry: Arc<RetryPolicy>,
    storage: Arc<JobStorage>,
    event_listeners: EventListeners<RouterEvent>,
    shutdown: Arc<AtomicBool>,
}

/// `concurrency` long-lived workers dequeuing from a [`PriorityQueue`] and
/// dispatching through [`dispatch_job`] (design doc §4.8).
pub struct WorkerPool<B: QueueBackend + 'static> {
    context: Arc<WorkerContext<B>>,
    handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<B: QueueBackend + 'static> WorkerPool<B> {
    /// `router_by_job_type` resolves a job's candidate provider list: the
    /// full preference order for an unpinned job, or a single-element slice
    /// when `Job.target_provider` names one.
    pub fn new(
        config: WorkerPoolConfig,
        queue: Arc<PriorityQueue<B>>,
        router_by_job_type: impl Fn(JobType) -> Vec<Arc<dyn ProviderAdapter>> + Send + Sync + 'static,
        breaker: Arc<CircuitBreakerManager>,
        retry: Arc<RetryPolicy>,
        storage: Arc<JobStorage>,
    ) -> Self {
        Self {
            context: Arc::new(WorkerContext {
                config,
                queue,
                router_by_job_type: Box::new(router_by_job_type),
                breaker,
                retry,
                storage,
                event_listeners: EventListeners::new(),
                shutdown: Arc::new(AtomicBool::new(false)),
            }),
            handles: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn with_event_listeners(mut self, listeners: EventListeners<RouterEvent>) -> Self {
        let context = Arc::get_mut(&mut self.context)
            .expect("with_event_listeners must be called before start()");
        context.event_listeners = listeners;
        self
    }

    /// §4.8 `Start(concurrency)`.
    pub fn start(&self) {
        let mut handles = self.handles.lock().expect("worker handle list poisoned");
        for _ in 0..self.context.config.concurrency {
            let context = Arc::clone(&self.context);
            handles.push(tokio::spawn(run_worker(context)));
        }
    }

    /// §4.8 `Stop()`. Signals workers to finish their current attempt, skip
    /// remaining retries/fallbacks, and then return; awaits their completion.
    pub async fn stop(&self) {
        self.context.shutdown.store(true, Ordering::Release);
        let handles: Vec<JoinHandle<()>> = {
            let mut guard = self.handles.lock().expect("worker handle list poisoned");
            std::mem::take(&mut *guard)
        };
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// §4.8 `Submit(job)`, delegating to the priority queue's idempotency-aware
    /// enqueue.
    pub async fn submit(&self, mut job: Job) -> EnqueueOutcome {
        job.transition(JobStatus::Queued);
        let outcome = self.context.queue.enqueue(job).await;
        if let EnqueueOutcome::Enqueued(job_id) = outcome {
            self.context.event_listeners.emit(&RouterEvent::JobEnqueued {
                job_id: job_id.to_string(),
                priority: "queued",
                timestamp: Instant::now(),
            });
        }
        outcome
    }

    /// Internal `RunBatch(batch)`: the hook a caller wires as a
    /// [`airouter_batcher::Batcher`] flush callback. Each job in the batch
    /// is dispatched independently through the same breaker/retry/fallback
    /// path as a single-job `Submit` — batching groups jobs for scheduling
    /// efficiency, not into one combined provider request, since no adapter
    /// in this workspace exposes a bulk endpoint.
    pub async fn run_batch(&self, batch: airouter_core::Batch) {
        for job in batch.jobs {
            process_job(&self.context, job).await;
        }
    }
}

async fn run_worker<B: QueueBackend>(context: Arc<WorkerContext<B>>) {
    loop {
        if context.shutdown.load(Ordering::Acquire) {
            return;
        }

        match context.queue.dequeue().await {
            Some(job) => process_job(&context, job).await,
            None => tokio::time::sleep(context.config.idle_poll_interval).await,
        }
    }
}

async fn process_job<B: QueueBackend>(context: &Arc<WorkerContext<B>>, mut job: Job) {
    job.transition(JobStatus::Running);
    context.storage.save_job(job.clone());

    context.event_listeners.emit(&RouterEvent::JobDequeued {
        job_id: job.id.to_string(),
        timestamp: Instant::now(),
    });

    let candidates = match &job.target_provider {
        Some(name) => (context.router_by_job_type)(job.job_type)
            .into_iter()
            .filter(|p| p.name() == name)
            .collect::<Vec<_>>(),
        None => (context.router_by_job_type)(job.job_type),
    };

    let total_timeout = job.total_timeout;
    let dispatch_future = dispatch_job(
        &job,
        &candidates,
        &context.breaker,
        &context.retry,
        &context.event_listeners,
        &context.shutdown,
    );

    match tokio::time::timeout(total_timeout, dispatch_future).await {
        Ok(Ok(outcome)) => {
            job.transition(JobStatus::Completed);
            job.outcome = Some(airouter_core::JobOutcome::success(outcome.value, outcome.provider_used));
            context.storage.save_job(job.clone());
            context.storage.save_result(job.to_result());
        }
        Ok(Err(DispatchFailure::ShuttingDown)) => {
            job.transition(JobStatus::Cancelled);
            context.storage.save_job(job);
        }
        Ok(Err(DispatchFailure::Exhausted(error))) => {
            context.event_listeners.emit(&RouterEvent::JobDeadLettered {
                job_id: job.id.to_string(),
                error_code: error.kind.code(),
                timestamp: Instant::now(),
            });
            context.storage.add_to_dead_letter(job, error);
        }
        Err(_elapsed) => {
            job.transition(JobStatus::Timeout);
            context.storage.save_job(job.clone());
            context.storage.save_result(job.to_result());
        }
    }
}
