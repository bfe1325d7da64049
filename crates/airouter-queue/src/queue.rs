use airouter_core::Job;
use uuid::Uuid;

use crate::backend::QueueBackend;
use crate::idempotency::IdempotencyMap;

/// Result of an [`PriorityQueue::enqueue`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The job was admitted under this id.
    Enqueued(Uuid),
    /// An earlier job with the same idempotency key already exists; this
    /// call did not enqueue a duplicate.
    Deduplicated(Uuid),
    /// The backend is at capacity.
    Rejected,
}

/// Priority queue with an idempotency interlock layered over a
/// [`QueueBackend`] (design doc §4.4).
pub struct PriorityQueue<B: QueueBackend> {
    backend: B,
    idempotency: IdempotencyMap,
}

impl<B: QueueBackend> PriorityQueue<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            idempotency: IdempotencyMap::new(),
        }
    }

    /// §4.4 `Enqueue(job) -> bool`, extended to report idempotent
    /// deduplication to the caller (the admission layer uses this to return
    /// the existing job id instead of silently dropping the request).
    pub async fn enqueue(&self, job: Job) -> EnqueueOutcome {
        if let Some(key) = job.idempotency_key.as_deref() {
            if let Some(existing) = self.idempotency.existing(key) {
                return EnqueueOutcome::Deduplicated(existing);
            }
        }

        let job_id = job.id;
        let key = job.idempotency_key.clone();

        if !self.backend.enqueue(job).await {
            return EnqueueOutcome::Rejected;
        }

        if let Some(key) = key {
            self.idempotency.record(&key, job_id);
        }

        #[cfg(feature = "metrics")]
        metrics::counter!("queue_enqueued_total").increment(1);

        EnqueueOutcome::Enqueued(job_id)
    }

    /// §4.4 `Dequeue() -> job or empty`.
    pub async fn dequeue(&self) -> Option<Job> {
        self.backend.dequeue().await
    }

    /// §4.4 `Peek() -> job or empty`.
    pub async fn peek(&self) -> Option<Job> {
        self.backend.peek().await
    }

    /// §4.4 `Size() -> int`.
    pub async fn size(&self) -> usize {
        self.backend.size().await
    }

    /// §4.4 `Remove(jobId) -> bool`.
    pub async fn remove(&self, job_id: Uuid) -> bool {
        self.backend.remove(job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_process::InProcessQueue;
    use airouter_core::{JobType, Priority};
    use std::collections::HashMap;

    fn job(idempotency_key: Option<&str>) -> Job {
        let mut job = Job::new("tenant-a", "req-1", JobType::Inference, Priority::Normal, HashMap::new());
        if let Some(key) = idempotency_key {
            job = job.with_idempotency_key(key);
        }
        job
    }

    #[tokio::test]
    async fn repeat_idempotency_key_returns_existing_job() {
        let queue = PriorityQueue::new(InProcessQueue::new(10));
        let first = queue.enqueue(job(Some("key-1"))).await;
        let first_id = match first {
            EnqueueOutcome::Enqueued(id) => id,
            other => panic!("expected Enqueued, got {other:?}"),
        };

        let second = queue.enqueue(job(Some("key-1"))).await;
        assert_eq!(second, EnqueueOutcome::Deduplicated(first_id));
        assert_eq!(queue.size().await, 1);
    }

    #[tokio::test]
    async fn jobs_without_idempotency_keys_always_enqueue() {
        let queue = PriorityQueue::new(InProcessQueue::new(10));
        queue.enqueue(job(None)).await;
        queue.enqueue(job(None)).await;
        assert_eq!(queue.size().await, 2);
    }

    #[tokio::test]
    async fn overflow_is_reported_as_rejected() {
        let queue = PriorityQueue::new(InProcessQueue::new(1));
        assert!(matches!(queue.enqueue(job(None)).await, EnqueueOutcome::Enqueued(_)));
        assert_eq!(queue.enqueue(job(None)).await, EnqueueOutcome::Rejected);
    }
}
