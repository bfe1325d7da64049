//! Tunables for [`crate::RagResultCache`] (design doc §4.11 step 2/step 10:
//! the idempotency-keyed result cache sitting in front of the pipeline).

use std::time::Duration;

use crate::eviction::EvictionPolicy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheConfig {
    pub max_size: usize,
    pub ttl: Option<Duration>,
    pub eviction_policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            ttl: Some(Duration::from_secs(3600)),
            eviction_policy: EvictionPolicy::Lru,
        }
    }
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheConfigBuilder {
    max_size: Option<usize>,
    ttl: Option<Option<Duration>>,
    eviction_policy: Option<EvictionPolicy>,
}

impl CacheConfigBuilder {
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(Some(ttl));
        self
    }

    pub fn no_ttl(mut self) -> Self {
        self.ttl = Some(None);
        self
    }

    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }

    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();
        CacheConfig {
            max_size: self.max_size.unwrap_or(defaults.max_size),
            ttl: self.ttl.unwrap_or(defaults.ttl),
            eviction_policy: self.eviction_policy.unwrap_or(defaults.eviction_policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_a_one_hour_lru() {
        let config = CacheConfig::default();
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.ttl, Some(Duration::from_secs(3600)));
        assert_eq!(config.eviction_policy, EvictionPolicy::Lru);
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = CacheConfig::builder()
            .max_size(50)
            .ttl(Duration::from_secs(10))
            .eviction_policy(EvictionPolicy::Lfu)
            .build();
        assert_eq!(config.max_size, 50);
        assert_eq!(config.ttl, Some(Duration::from_secs(10)));
        assert_eq!(config.eviction_policy, EvictionPolicy::Lfu);
    }

    #[test]
    fn no_ttl_disables_expiration() {
        let config = CacheConfig::builder().no_ttl().build();
        assert_eq!(config.ttl, None);
    }
}
