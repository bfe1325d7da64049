use async_trait::async_trait;

use airouter_core::RouterError;

use crate::types::{
    EmbedOutcome, EmbedRequest, InferenceOutcome, InferenceRequest, SearchOutcome, SearchRequest,
};

/// The fixed capability set every provider implements (design doc §9 Design
/// Notes: "replace duck-typed provider classes with a fixed capability set").
/// Each implementation is an independent value carrying only its own
/// configuration; there is no shared base behaviour beyond this trait.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// The name this adapter is registered and addressed under (matches the
    /// circuit breaker and job `target_provider` namespace).
    fn name(&self) -> &str;

    /// Externalized as configuration rather than a hard-coded per-provider
    /// cost-per-1000-tokens table.
    fn cost_per_1k_tokens(&self) -> f64;

    async fn inference(&self, request: &InferenceRequest) -> Result<InferenceOutcome, RouterError>;

    async fn embed(&self, request: &EmbedRequest) -> Result<EmbedOutcome, RouterError>;

    async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome, RouterError>;

    async fn health_check(&self) -> Result<bool, RouterError>;
}
