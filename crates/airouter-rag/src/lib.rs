//! The RAG Orchestrator (design doc §4.11): sanitize, retrieve, rank and
//! filter, build context, select a template, dispatch inference through the
//! same breaker/retry/fallback core the worker pool uses, post-process the
//! answer (citations, PII redaction, hallucination detection), generate
//! follow-up questions, and assemble the result.
//!
//! ## Feature Flags
//! - `metrics`: forwarded to the circuit breaker and retry crates
//! - `tracing`: forwarded to the circuit breaker and retry crates

mod cache;
mod config;
mod context_builder;
mod models;
mod pipeline;
mod postprocess;
mod ranking;
mod retriever;
mod sanitize;
mod templates;

pub use cache::{NullRagCache, RagCache};
pub use config::{RagConfig, RagConfigBuilder};
pub use models::{
    Citation, CitationStyle, ContextWindow, ConversationTurn, DocumentFilters, FollowUpQuestion,
    Provenance, RagRequest, RagResult, ResponseStyle, RetrievedDocument, StrictnessLevel,
};
pub use pipeline::RagPipeline;
pub use retriever::{NullRetriever, Retriever};
pub use templates::{PromptTemplate, TemplateRegistry};
