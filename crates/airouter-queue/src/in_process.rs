use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;

use airouter_core::Job;
use async_trait::async_trait;
use uuid::Uuid;

use crate::backend::QueueBackend;

struct Entry {
    priority_rank: u64,
    sequence: u64,
    job: Job,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.priority_rank == other.priority_rank && self.sequence == other.sequence
    }
}
impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    /// Higher priority rank wins; within the same rank, the lower sequence
    /// number (enqueued earlier) wins, so `BinaryHeap`'s max-heap pops jobs
    /// in FIFO order within a priority class.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority_rank
            .cmp(&other.priority_rank)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Single ordered multiset under a mutex, keyed by (priority rank descending,
/// enqueue sequence ascending) (design doc §4.4).
pub struct InProcessQueue {
    max_size: usize,
    heap: Mutex<BinaryHeap<Entry>>,
    sequence: AtomicU64,
}

impl InProcessQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            heap: Mutex::new(BinaryHeap::new()),
            sequence: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl QueueBackend for InProcessQueue {
    async fn enqueue(&self, job: Job) -> bool {
        let mut heap = self.heap.lock().expect("queue heap poisoned");
        if heap.len() >= self.max_size {
            #[cfg(feature = "tracing")]
            tracing::warn!(max_size = self.max_size, "queue at max capacity, rejecting job");
            return false;
        }
        let sequence = self.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        heap.push(Entry {
            priority_rank: job.priority.rank(),
            sequence,
            job,
        });
        true
    }

    async fn dequeue(&self) -> Option<Job> {
        self.heap.lock().expect("queue heap poisoned").pop().map(|e| e.job)
    }

    async fn peek(&self) -> Option<Job> {
        self.heap
            .lock()
            .expect("queue heap poisoned")
            .peek()
            .map(|e| e.job.clone())
    }

    async fn size(&self) -> usize {
        self.heap.lock().expect("queue heap poisoned").len()
    }

    async fn remove(&self, job_id: Uuid) -> bool {
        let mut heap = self.heap.lock().expect("queue heap poisoned");
        let original_len = heap.len();
        let remaining: Vec<Entry> = heap.drain().filter(|e| e.job.id != job_id).collect();
        *heap = remaining.into_iter().collect();
        heap.len() < original_len
    }
}
