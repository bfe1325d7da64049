//! Step 8 of the RAG pipeline (design doc §4.11): resolve citation markers,
//! redact disallowed content, and run the hallucination detector.
//! Citation extraction is ported from `rag/rag_pipeline.py`'s
//! `_extract_citations`/`_is_document_cited`. The hallucination detector has
//! no reference implementation to port, so it is implemented here as a
//! pluggable overlap-ratio predicate: the cited document text is compared
//! against the answer text and flagged when the overlap falls below a
//! configurable threshold.

use std::collections::HashSet;

use regex::Regex;
use std::sync::OnceLock;

use crate::config::RagConfig;
use crate::models::{Citation, ContextWindow, RagRequest, StrictnessLevel};
use crate::context_builder::extract_snippet;

fn is_document_cited(answer: &str, doc_number: usize) -> bool {
    answer.contains(&format!("[{doc_number}]")) || answer.contains(&format!("Document {doc_number}"))
}

/// Resolves citation markers in `answer` to the documents that produced
/// `context_window`. Falls back to the top 3 documents when the answer
/// cites none explicitly, mirroring `rag_pipeline.py`.
pub fn extract_citations(answer: &str, context_window: &ContextWindow, request: &RagRequest) -> Vec<Citation> {
    let mut citations = Vec::new();

    for (index, doc) in context_window.documents.iter().enumerate() {
        let doc_number = index + 1;
        if is_document_cited(answer, doc_number) {
            let snippet = extract_snippet(&doc.content, &request.query, request.snippet_size);
            citations.push(Citation {
                citation_id: format!("c{doc_number}"),
                doc_id: doc.doc_id.clone(),
                title: doc.title.clone(),
                source: doc.source.clone(),
                source_url: doc.source_url.clone(),
                snippet,
                similarity_score: doc.similarity_score,
                rank_score: doc.rank_score(),
                location: doc
                    .metadata
                    .get("section")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
            });
        }
    }

    if citations.is_empty() {
        for (index, doc) in context_window.documents.iter().take(3).enumerate() {
            let snippet = extract_snippet(&doc.content, &request.query, request.snippet_size);
            citations.push(Citation {
                citation_id: format!("c{}", index + 1),
                doc_id: doc.doc_id.clone(),
                title: doc.title.clone(),
                source: doc.source.clone(),
                source_url: doc.source_url.clone(),
                snippet,
                similarity_score: doc.similarity_score,
                rank_score: doc.rank_score(),
                location: doc
                    .metadata
                    .get("section")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string()),
            });
        }
    }

    citations
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").expect("valid regex"))
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b(?:\+?\d{1,3}[-.\s]?)?(?:\(\d{3}\)|\d{3})[-.\s]\d{3}[-.\s]\d{4}\b").expect("valid regex"))
}

fn national_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid regex"))
}

/// Redacts email addresses, phone numbers, and SSN-shaped national IDs.
/// Returns the redacted text and whether any redaction was applied.
pub fn redact_pii(config: &RagConfig, text: &str) -> (String, bool) {
    if !config.redact_pii {
        return (text.to_string(), false);
    }

    let mut redacted = text.to_string();
    let mut applied = false;

    for pattern in [email_pattern(), phone_pattern(), national_id_pattern()] {
        if pattern.is_match(&redacted) {
            applied = true;
            redacted = pattern.replace_all(&redacted, "[REDACTED]").into_owned();
        }
    }

    (redacted, applied)
}

/// A pluggable predicate over (answer, citations): a minimal overlap-ratio
/// detector. Returns `(hallucination_suspected, confidence_score)`.
pub fn detect_hallucination(answer: &str, citations: &[Citation], strictness: StrictnessLevel, config: &RagConfig) -> (bool, f32) {
    if citations.is_empty() {
        return (true, 0.0);
    }

    let answer_words: HashSet<String> = answer
        .to_ascii_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| w.len() > 3)
        .collect();

    if answer_words.is_empty() {
        return (true, 0.0);
    }

    let citation_words: HashSet<String> = citations
        .iter()
        .flat_map(|c| c.snippet.to_ascii_lowercase().split_whitespace().map(|w| w.to_string()).collect::<Vec<_>>())
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| w.len() > 3)
        .collect();

    let overlap = answer_words.intersection(&citation_words).count();
    let overlap_ratio = overlap as f32 / answer_words.len() as f32;

    let floor = config.hallucination_floor(strictness);
    let suspected = overlap_ratio < floor;
    let confidence = overlap_ratio.min(1.0);

    (suspected, confidence)
}
