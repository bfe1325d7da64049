//! The RAG data model (design doc §3 "RAG Request" / "RAG Result"), with the
//! concrete enums and provenance breakdown supplemented from
//! `orchestration/models.py` and `rag/models.py`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationStyle {
    InlineNumbers,
    BracketedIds,
    EndList,
}

impl Default for CitationStyle {
    fn default() -> Self {
        CitationStyle::InlineNumbers
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStyle {
    Terse,
    Balanced,
    Detailed,
}

impl Default for ResponseStyle {
    fn default() -> Self {
        ResponseStyle::Balanced
    }
}

/// Controls how aggressively the prompt instructs the model to stay grounded
/// in retrieved snippets, and how strict the hallucination detector is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrictnessLevel {
    Lenient,
    Normal,
    Strict,
}

impl Default for StrictnessLevel {
    fn default() -> Self {
        StrictnessLevel::Normal
    }
}

/// A single turn of prior conversation, formatted into the `conversational`
/// template's `conversation_history` placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
}

/// Structured filters narrowing the retrieval candidate set (design doc §3,
/// §4.11 step 4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentFilters {
    pub jurisdictions: Option<Vec<String>>,
    pub doc_types: Option<Vec<String>>,
    pub sources: Option<Vec<String>>,
    pub exclude_doc_ids: Option<Vec<String>>,
}

/// Input to the RAG Orchestrator (design doc §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagRequest {
    pub tenant_id: String,
    pub request_id: Option<String>,
    pub query: String,

    pub top_k: u32,
    pub min_similarity_threshold: f32,
    pub filters: Option<DocumentFilters>,

    pub template: Option<String>,
    pub citation_style: CitationStyle,
    pub response_style: ResponseStyle,
    pub strictness: StrictnessLevel,

    pub follow_up_count: usize,
    pub token_budget: u32,
    pub snippet_size: usize,

    pub conversation_history: Vec<ConversationTurn>,

    pub dry_run: bool,
    pub idempotency_key: Option<String>,
}

impl RagRequest {
    pub fn new(tenant_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            request_id: None,
            query: query.into(),
            top_k: 5,
            min_similarity_threshold: 0.5,
            filters: None,
            template: None,
            citation_style: CitationStyle::default(),
            response_style: ResponseStyle::default(),
            strictness: StrictnessLevel::default(),
            follow_up_count: 2,
            token_budget: 3000,
            snippet_size: 200,
            conversation_history: Vec::new(),
            dry_run: false,
            idempotency_key: None,
        }
    }
}

/// A document candidate returned by the external vector-search collaborator
/// (design doc §6, out of scope as a bundled implementation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub doc_id: String,
    pub content: String,
    pub title: String,
    pub source: String,
    pub source_url: Option<String>,
    pub similarity_score: f32,
    pub safety_score: f32,
    pub rank: u32,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RetrievedDocument {
    /// Combined rank score used by step 4's "keep top-k by rank score":
    /// similarity weighted by safety (design doc §4.11 step 4 "apply
    /// safety-score weighting").
    pub fn rank_score(&self) -> f32 {
        self.similarity_score * self.safety_score
    }
}

/// The assembled, token-bounded context block (design doc §4.11 step 5).
#[derive(Debug, Clone, Default)]
pub struct ContextWindow {
    pub documents: Vec<RetrievedDocument>,
    pub formatted_context: String,
    pub token_count: u32,
    pub truncated: bool,
}

/// A resolved source citation (design doc §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub citation_id: String,
    pub doc_id: String,
    pub title: String,
    pub source: String,
    pub source_url: Option<String>,
    pub snippet: String,
    pub similarity_score: f32,
    pub rank_score: f32,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpQuestion {
    pub question: String,
    pub reasoning: String,
    pub priority: u8,
}

/// Timing breakdown, model used, tokens, and cost (design doc §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Provenance {
    pub sanitization_ms: f64,
    pub retrieval_ms: f64,
    pub ranking_ms: f64,
    pub context_build_ms: f64,
    pub inference_ms: f64,
    pub post_process_ms: f64,
    pub follow_up_ms: f64,
    pub total_ms: f64,

    pub model_used: String,
    pub tokens_used: u32,
    pub cost_estimate: f64,

    pub total_candidates: usize,
    pub filtered_candidates: usize,
    pub context_tokens: u32,
}

/// Output of the RAG Orchestrator (design doc §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResult {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub follow_up_questions: Vec<FollowUpQuestion>,
    pub confidence_score: f32,

    pub hallucination_warning: bool,
    pub redactions_applied: bool,
    pub cache_hit: bool,
    pub needs_verification: bool,

    pub provenance: Option<Provenance>,

    pub request_id: Option<String>,
    pub tenant_id: String,
    pub template_used: String,
    pub timestamp: DateTime<Utc>,

    /// Populated only in dry-run mode (design doc §4.11: "short-circuits at
    /// step 6 and returns the assembled prompt plus the list of snippets").
    pub generated_prompt: Option<String>,
    pub selected_snippets: Option<Vec<String>>,
}

impl RagResult {
    pub fn empty_for(tenant_id: impl Into<String>) -> Self {
        Self {
            answer: String::new(),
            citations: Vec::new(),
            follow_up_questions: Vec::new(),
            confidence_score: 0.0,
            hallucination_warning: false,
            redactions_applied: false,
            cache_hit: false,
            needs_verification: false,
            provenance: None,
            request_id: None,
            tenant_id: tenant_id.into(),
            template_used: String::new(),
            timestamp: Utc::now(),
            generated_prompt: None,
            selected_snippets: None,
        }
    }
}
