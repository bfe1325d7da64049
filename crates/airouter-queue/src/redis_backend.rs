use airouter_core::Job;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::backend::QueueBackend;

/// Shared-key-value backend (design doc §4.4): a sorted set scored by
/// `priority_rank * 10^9 - sequence`, so `ZPOPMIN` returns the highest
/// priority, oldest-enqueued job first.
pub struct RedisQueue {
    manager: ConnectionManager,
    key: String,
    counter_key: String,
    max_size: usize,
}

impl RedisQueue {
    pub fn new(manager: ConnectionManager, key_prefix: impl Into<String>, max_size: usize) -> Self {
        let key_prefix = key_prefix.into();
        Self {
            manager,
            key: format!("{key_prefix}:jobs"),
            counter_key: format!("{key_prefix}:counter"),
            max_size,
        }
    }

    /// Lower score pops first via `ZPOPMIN`. Higher priority contributes a
    /// large negative offset so it always sorts ahead of lower priorities;
    /// within a priority class the smaller sequence (older job) sorts first.
    fn score(priority_rank: u64, sequence: u64) -> f64 {
        (-(priority_rank as i64 * 1_000_000_000) + sequence as i64) as f64
    }
}

#[async_trait]
impl QueueBackend for RedisQueue {
    async fn enqueue(&self, mut job: Job) -> bool {
        let mut conn = self.manager.clone();

        let size: usize = match conn.zcard(&self.key).await {
            Ok(size) => size,
            Err(_) => return false,
        };
        if size >= self.max_size {
            #[cfg(feature = "tracing")]
            tracing::warn!(max_size = self.max_size, "redis queue at max capacity, rejecting job");
            return false;
        }

        let sequence: u64 = match conn.incr(&self.counter_key, 1u64).await {
            Ok(value) => value,
            Err(_) => return false,
        };
        job.sequence = sequence;

        let payload = match serde_json::to_string(&job) {
            Ok(payload) => payload,
            Err(_) => return false,
        };
        let score = Self::score(job.priority.rank(), sequence);

        conn.zadd::<_, _, _, ()>(&self.key, payload, score).await.is_ok()
    }

    async fn dequeue(&self) -> Option<Job> {
        let mut conn = self.manager.clone();
        let popped: Vec<(String, f64)> = conn.zpopmin(&self.key, 1).await.ok()?;
        let (payload, _) = popped.into_iter().next()?;
        serde_json::from_str(&payload).ok()
    }

    async fn peek(&self) -> Option<Job> {
        let mut conn = self.manager.clone();
        let range: Vec<String> = conn.zrange(&self.key, 0, 0).await.ok()?;
        let payload = range.into_iter().next()?;
        serde_json::from_str(&payload).ok()
    }

    async fn size(&self) -> usize {
        let mut conn = self.manager.clone();
        conn.zcard(&self.key).await.unwrap_or(0)
    }

    async fn remove(&self, job_id: Uuid) -> bool {
        let mut conn = self.manager.clone();
        let all: Vec<String> = match conn.zrange(&self.key, 0, -1).await {
            Ok(all) => all,
            Err(_) => return false,
        };

        for payload in all {
            if let Ok(job) = serde_json::from_str::<Job>(&payload) {
                if job.id == job_id {
                    return conn.zrem::<_, _, i64>(&self.key, payload).await.unwrap_or(0) > 0;
                }
            }
        }
        false
    }
}
