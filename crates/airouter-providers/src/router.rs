//! The ordered provider preference list (design doc §4.9's "Provider Router").
//!
//! Deliberately thin: this holds only the ordered list and a by-name lookup.
//! The fallback-rotation loop that walks this list under retry/circuit-breaker
//! control lives in the worker pool, not here — duplicating that loop in both
//! crates would mean two copies of the same algorithm and would force this
//! crate to depend on the circuit breaker and retry crates for no reason of
//! its own.

use std::sync::Arc;

use crate::adapter::ProviderAdapter;

pub struct ProviderRouter {
    providers: Vec<Arc<dyn ProviderAdapter>>,
}

impl ProviderRouter {
    pub fn new(providers: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self { providers }
    }

    /// The configured fallback order, first to last.
    pub fn ordered(&self) -> &[Arc<dyn ProviderAdapter>] {
        &self.providers
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use airouter_core::RouterError;

    use super::*;
    use crate::types::{EmbedOutcome, EmbedRequest, InferenceOutcome, InferenceRequest, SearchOutcome, SearchRequest};

    struct StubAdapter(&'static str);

    #[async_trait]
    impl ProviderAdapter for StubAdapter {
        fn name(&self) -> &str {
            self.0
        }

        fn cost_per_1k_tokens(&self) -> f64 {
            0.0
        }

        async fn inference(&self, _: &InferenceRequest) -> Result<InferenceOutcome, RouterError> {
            unimplemented!()
        }

        async fn embed(&self, _: &EmbedRequest) -> Result<EmbedOutcome, RouterError> {
            unimplemented!()
        }

        async fn search(&self, _: &SearchRequest) -> Result<SearchOutcome, RouterError> {
            unimplemented!()
        }

        async fn health_check(&self) -> Result<bool, RouterError> {
            Ok(true)
        }
    }

    #[test]
    fn preserves_configured_order() {
        let router = ProviderRouter::new(vec![
            Arc::new(StubAdapter("primary")),
            Arc::new(StubAdapter("alternative")),
        ]);
        let names: Vec<_> = router.ordered().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["primary", "alternative"]);
    }

    #[test]
    fn looks_up_by_name() {
        let router = ProviderRouter::new(vec![Arc::new(StubAdapter("legal-encoder"))]);
        assert!(router.by_name("legal-encoder").is_some());
        assert!(router.by_name("missing").is_none());
    }
}
