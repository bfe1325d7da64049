//! Step 2 of the RAG pipeline (design doc §4.11): idempotency-keyed result
//! cache lookup and population. The concrete LRU+TTL store lives in the
//! sibling cache crate; this trait is the narrow seam
//! [`crate::pipeline::RagPipeline`] depends on, mirroring the way
//! `airouter-worker` depends on `JobStorage` rather than a concrete store.

use async_trait::async_trait;

use crate::models::RagResult;

#[async_trait]
pub trait RagCache: Send + Sync {
    async fn get(&self, idempotency_key: &str) -> Option<RagResult>;
    async fn put(&self, idempotency_key: &str, result: RagResult);
}

/// A cache that never stores anything. Every lookup misses and every write
/// is dropped; useful as the composition root's placeholder before a real
/// cache is wired in, and in tests that don't care about cache behavior.
pub struct NullRagCache;

#[async_trait]
impl RagCache for NullRagCache {
    async fn get(&self, _idempotency_key: &str) -> Option<RagResult> {
        None
    }

    async fn put(&self, _idempotency_key: &str, _result: RagResult) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_cache_always_misses() {
        let cache = NullRagCache;
        cache.put("key", RagResult::empty_for("tenant-a")).await;
        assert!(cache.get("key").await.is_none());
    }
}
