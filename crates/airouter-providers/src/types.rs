//! Request/response shapes exchanged with a [`crate::ProviderAdapter`]. These
//! are deliberately narrower than the HTTP surface's own request/response
//! bodies (design doc §6) — an adapter is free to shape its own wire format,
//! as long as it can satisfy these three capabilities.

use serde::{Deserialize, Serialize};

/// §4.9 `Inference(query, context, tenant) -> result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest {
    pub query: String,
    pub context: String,
    pub tenant_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceOutcome {
    pub answer: String,
    pub model: String,
    pub tokens_used: u32,
}

/// §4.9 `Embed(docId, text) -> result`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub doc_id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedOutcome {
    pub vector_id: String,
    pub dimension: usize,
    pub tokens_used: u32,
}

/// §4.9 `Search(query, k, tenant) -> results`. Distinct from the RAG
/// Orchestrator's own vector-index contract (§6, out of scope): this is the
/// `search` job type running through the same dispatch core as inference
/// and embedding, when a provider itself exposes a search capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: u32,
    pub tenant_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub results: Vec<serde_json::Value>,
    pub total_count: usize,
}
