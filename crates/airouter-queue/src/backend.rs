use airouter_core::Job;
use async_trait::async_trait;
use uuid::Uuid;

/// Storage backend for the priority queue (design doc §4.4). Two
/// interchangeable implementations share this contract: [`InProcessQueue`]
/// and, behind the `redis-backend` feature, a sorted-set backend.
///
/// [`InProcessQueue`]: crate::InProcessQueue
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Adds `job` to the queue. Returns `false` on overflow; the caller
    /// treats that as an overload rejection rather than an error.
    async fn enqueue(&self, job: Job) -> bool;
    async fn dequeue(&self) -> Option<Job>;
    async fn peek(&self) -> Option<Job>;
    async fn size(&self) -> usize;
    async fn remove(&self, job_id: Uuid) -> bool;
}
