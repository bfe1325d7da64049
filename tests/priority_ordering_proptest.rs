//! Property test for the dequeue-ordering invariant in design doc §8:
//! "for all pairs of enqueue events (A, B) with equal priority and
//! enqueue(A) < enqueue(B), dequeue order is A then B", plus the
//! cross-priority half of the same invariant (higher priority rank always
//! dequeues before a lower one, regardless of arrival order).

use std::collections::HashMap;

use airouter_core::{Job, JobType, Priority};
use airouter_queue::{InProcessQueue, PriorityQueue};
use proptest::prelude::*;

fn priority_strategy() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Normal),
        Just(Priority::High),
    ]
}

fn job_with(tenant: &str, priority: Priority) -> Job {
    Job::new(tenant, "req-prop", JobType::Inference, priority, HashMap::new())
}

proptest! {
    /// Enqueuing any sequence of priorities and draining the queue must
    /// produce a dequeue order that is non-increasing in priority rank, and
    /// stable (FIFO) among jobs that share a rank.
    #[test]
    fn dequeue_order_is_priority_major_fifo_minor(priorities in prop::collection::vec(priority_strategy(), 1..64)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let queue = PriorityQueue::new(InProcessQueue::new(1024));
            let mut enqueued = Vec::new();
            for (i, priority) in priorities.iter().enumerate() {
                let job = job_with(&format!("tenant-{i}"), *priority);
                enqueued.push(job.id);
                queue.enqueue(job).await;
            }

            let mut drained = Vec::new();
            while let Some(job) = queue.dequeue().await {
                drained.push((job.priority.rank(), job.id));
            }

            prop_assert_eq!(drained.len(), enqueued.len());

            // Priority rank is non-increasing across the whole drain.
            for window in drained.windows(2) {
                prop_assert!(window[0].0 >= window[1].0);
            }

            // Within a rank, relative enqueue order (the index the id first
            // appeared at in `enqueued`) must be preserved.
            let enqueue_index: HashMap<_, _> = enqueued.iter().enumerate().map(|(i, id)| (*id, i)).collect();
            let mut by_rank: HashMap<u64, Vec<usize>> = HashMap::new();
            for (rank, id) in &drained {
                by_rank.entry(*rank).or_default().push(enqueue_index[id]);
            }
            for indices in by_rank.values() {
                let mut sorted = indices.clone();
                sorted.sort_unstable();
                prop_assert_eq!(indices, &sorted);
            }
        });
    }
}
