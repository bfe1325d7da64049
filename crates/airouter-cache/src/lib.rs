//! The RAG result cache (design doc §4.11 step 2/step 10, §5's "bounded
//! in-memory map with LRU eviction").
//!
//! [`RagResultCache`] is the concrete, idempotency-keyed implementation of
//! [`airouter_rag::RagCache`]: a capacity-bounded map from idempotency key to
//! [`airouter_rag::RagResult`], evicted by whichever of LRU/LFU/FIFO the
//! deployment picks, with an optional TTL on top. §5 notes that writers under
//! the same key race and last write wins, which is sound here because every
//! writer producing a given idempotency key is, by construction, recomputing
//! the same answer.
//!
//! The store itself ([`store::CacheStore`]) is synchronous and single
//! threaded; this crate wraps it in a [`tokio::sync::Mutex`] so the async
//! [`airouter_rag::RagCache`] trait can hold the lock only across the pure
//! memory work of a get/insert, never across I/O.

mod config;
mod eviction;
mod store;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use eviction::EvictionPolicy;

use async_trait::async_trait;
use tokio::sync::Mutex;

use airouter_rag::{RagCache, RagResult};
use store::CacheStore;

/// Capacity-bounded, TTL-aware cache of RAG results keyed by idempotency key.
pub struct RagResultCache {
    store: Mutex<CacheStore<String, RagResult>>,
    #[cfg(feature = "metrics")]
    name: String,
}

impl RagResultCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::named("rag-result-cache", config)
    }

    pub fn named(_name: impl Into<String>, config: CacheConfig) -> Self {
        Self {
            store: Mutex::new(CacheStore::new(config.max_size, config.ttl, config.eviction_policy)),
            #[cfg(feature = "metrics")]
            name: _name.into(),
        }
    }

    /// Snapshot of the number of live (not necessarily unexpired) entries.
    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RagCache for RagResultCache {
    async fn get(&self, idempotency_key: &str) -> Option<RagResult> {
        let mut store = self.store.lock().await;
        let hit = store.get(&idempotency_key.to_string());
        #[cfg(feature = "tracing")]
        tracing::debug!(cache = %self.name, key = %idempotency_key, hit = hit.is_some(), "rag cache lookup");
        #[cfg(feature = "metrics")]
        {
            let outcome = if hit.is_some() { "hit" } else { "miss" };
            metrics::counter!("airouter_rag_cache_lookups_total", "cache" => self.name.clone(), "outcome" => outcome)
                .increment(1);
        }
        hit
    }

    async fn put(&self, idempotency_key: &str, result: RagResult) {
        let mut store = self.store.lock().await;
        let evicted = store.insert(idempotency_key.to_string(), result);
        #[cfg(feature = "tracing")]
        tracing::debug!(cache = %self.name, key = %idempotency_key, evicted = evicted.is_some(), "rag cache insert");
        #[cfg(feature = "metrics")]
        if evicted.is_some() {
            metrics::counter!("airouter_rag_cache_evictions_total", "cache" => self.name.clone()).increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn miss_then_hit() {
        let cache = RagResultCache::new(CacheConfig::default());
        assert!(cache.get("k1").await.is_none());
        cache.put("k1", RagResult::empty_for("tenant-a")).await;
        let hit = cache.get("k1").await;
        assert!(hit.is_some());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn evicts_under_capacity_pressure() {
        let cache = RagResultCache::new(
            CacheConfig::builder()
                .max_size(1)
                .eviction_policy(EvictionPolicy::Lru)
                .build(),
        );
        cache.put("k1", RagResult::empty_for("tenant-a")).await;
        cache.put("k2", RagResult::empty_for("tenant-a")).await;
        assert!(cache.get("k1").await.is_none());
        assert!(cache.get("k2").await.is_some());
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = RagResultCache::new(
            CacheConfig::builder()
                .max_size(10)
                .ttl(Duration::from_millis(20))
                .build(),
        );
        cache.put("k1", RagResult::empty_for("tenant-a")).await;
        assert!(cache.get("k1").await.is_some());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(cache.get("k1").await.is_none());
    }

    #[tokio::test]
    async fn identical_idempotency_key_returns_byte_identical_payload_modulo_timing() {
        // §8: "For all RAG requests with identical canonical cache key, the
        // cache returns byte-identical result payloads (excluding timing
        // fields)." Two logically-identical writers race; whichever wins,
        // readers observe one coherent value, not a torn mix.
        let cache = RagResultCache::new(CacheConfig::default());
        let mut result = RagResult::empty_for("tenant-a");
        result.answer = "same answer".to_string();
        cache.put("k1", result.clone()).await;
        cache.put("k1", result.clone()).await;
        let hit = cache.get("k1").await.unwrap();
        assert_eq!(hit.answer, result.answer);
    }
}
