//! Step 5 of the RAG pipeline (design doc §4.11): serialize ranked
//! candidates into a token-bounded context block. Ported from
//! `rag/context_builder.py`'s `ContextBuilder`.

use crate::config::RagConfig;
use crate::models::{ContextWindow, ConversationTurn, RetrievedDocument};

const DOC_SEPARATOR: &str = "\n\n==================================================\n\n";
const TRUNCATION_MARKER: &str = "\n[... content truncated ...]\n";

pub fn estimate_tokens(config: &RagConfig, text: &str) -> u32 {
    (text.chars().count() as f32 / config.chars_per_token) as u32
}

fn format_document(doc: &RetrievedDocument, doc_number: usize, include_metadata: bool) -> String {
    let mut parts = vec![format!("[Document {doc_number}]")];

    if include_metadata {
        let mut metadata_parts = vec![format!("Title: {}", doc.title), format!("Source: {}", doc.source)];
        if let Some(url) = &doc.source_url {
            metadata_parts.push(format!("URL: {url}"));
        }
        if let Some(date) = doc.metadata.get("date").and_then(|v| v.as_str()) {
            metadata_parts.push(format!("Date: {date}"));
        }
        if let Some(section) = doc.metadata.get("section").and_then(|v| v.as_str()) {
            metadata_parts.push(format!("Section: {section}"));
        }
        metadata_parts.push(format!("Relevance Score: {:.3}", doc.similarity_score));

        parts.push(metadata_parts.join("\n"));
        parts.push(String::new());
    }

    parts.push(doc.content.clone());
    parts.join("\n")
}

fn truncate_document(config: &RagConfig, doc_text: &str, max_tokens: u32) -> String {
    let max_chars = (max_tokens as f32 * config.chars_per_token) as usize;
    if doc_text.chars().count() <= max_chars {
        return doc_text.to_string();
    }

    let keep = max_chars.saturating_sub(TRUNCATION_MARKER.chars().count());
    let truncated: String = doc_text.chars().take(keep).collect();
    format!("{truncated}{TRUNCATION_MARKER}")
}

/// Builds a context window from rank-ordered documents, adding them in
/// order until the next document would exceed `max_tokens`. If the very
/// first document alone exceeds the budget, it is truncated with a marker
/// and `truncated` is set (design doc §4.11 step 5).
pub fn build_context(config: &RagConfig, documents: &[RetrievedDocument], max_tokens: u32) -> ContextWindow {
    let mut window = ContextWindow::default();
    let mut formatted_parts = Vec::new();
    let mut current_tokens = 0u32;

    for (index, doc) in documents.iter().enumerate() {
        let doc_text = format_document(doc, index + 1, config.include_metadata);
        let doc_tokens = estimate_tokens(config, &doc_text);

        if current_tokens + doc_tokens > max_tokens {
            if formatted_parts.is_empty() {
                let truncated_text = truncate_document(config, &doc_text, max_tokens);
                formatted_parts.push(truncated_text);
                current_tokens = max_tokens;
                window.truncated = true;
                window.documents.push(doc.clone());
            }
            break;
        }

        formatted_parts.push(doc_text);
        window.documents.push(doc.clone());
        current_tokens += doc_tokens;
    }

    window.formatted_context = formatted_parts.join(DOC_SEPARATOR);
    window.token_count = current_tokens;
    window
}

/// Formats the last 5 turns of conversation history (design doc §4.11 step 6
/// "optionally `conversation_history`"), mirroring
/// `format_conversation_history` in `rag/context_builder.py`.
pub fn format_conversation_history(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let start = history.len().saturating_sub(5);
    history[start..]
        .iter()
        .map(|turn| {
            let mut role = turn.role.clone();
            if let Some(first) = role.get_mut(0..1) {
                first.make_ascii_uppercase();
            }
            format!("{role}: {}", turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Extracts the snippet most relevant to `query` via a sliding-window
/// word-overlap score, mirroring `extract_snippet` in
/// `rag/context_builder.py`.
pub fn extract_snippet(content: &str, query: &str, snippet_length: usize) -> String {
    if content.chars().count() <= snippet_length {
        return content.trim().to_string();
    }

    let content_lower = content.to_ascii_lowercase();
    let query_lower = query.to_ascii_lowercase();
    let query_words: Vec<&str> = query_lower.split_whitespace().collect();

    let chars: Vec<char> = content_lower.chars().collect();
    let total_len = chars.len();
    let mut best_position = 0usize;
    let mut max_matches = 0usize;

    let mut i = 0usize;
    while i + snippet_length < total_len {
        let segment: String = chars[i..i + snippet_length].iter().collect();
        let matches = query_words.iter().filter(|word| segment.contains(*word)).count();
        if matches > max_matches {
            max_matches = matches;
            best_position = i;
        }
        i += 50;
    }

    let content_chars: Vec<char> = content.chars().collect();
    let start = best_position.min(content_chars.len());
    let end = (start + snippet_length).min(content_chars.len());

    let mut snippet: String = content_chars[start..end].iter().collect();
    snippet = snippet.trim().to_string();
    if start > 0 {
        snippet = format!("...{snippet}");
    }
    if end < content_chars.len() {
        snippet.push_str("...");
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn doc(id: &str, content: &str, score: f32) -> RetrievedDocument {
        RetrievedDocument {
            doc_id: id.to_string(),
            content: content.to_string(),
            title: format!("Title {id}"),
            source: "Test Source".to_string(),
            source_url: None,
            similarity_score: score,
            safety_score: 1.0,
            rank: 1,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn builds_context_from_rank_ordered_documents() {
        let config = RagConfig::default();
        let docs = vec![doc("doc_1", "short content here", 0.9), doc("doc_2", "more content here", 0.8)];
        let window = build_context(&config, &docs, 3000);
        assert_eq!(window.documents.len(), 2);
        assert!(!window.truncated);
        assert!(window.formatted_context.contains("[Document 1]"));
        assert!(window.formatted_context.contains("[Document 2]"));
    }

    #[test]
    fn truncates_oversized_first_document() {
        let config = RagConfig::default();
        let huge_content = "word ".repeat(5000);
        let docs = vec![doc("doc_1", &huge_content, 0.9)];
        let window = build_context(&config, &docs, 50);
        assert!(window.truncated);
        assert_eq!(window.documents.len(), 1);
        assert!(window.formatted_context.contains("truncated"));
    }

    #[test]
    fn stops_adding_documents_once_budget_exceeded() {
        let config = RagConfig::default();
        let huge_content = "word ".repeat(2000);
        let docs = vec![doc("doc_1", "short", 0.9), doc("doc_2", &huge_content, 0.8), doc("doc_3", "also short", 0.7)];
        let window = build_context(&config, &docs, 600);
        assert!(window.documents.len() < 3);
    }

    #[test]
    fn formats_only_last_five_turns() {
        let history: Vec<ConversationTurn> = (0..8)
            .map(|i| ConversationTurn {
                role: "user".to_string(),
                content: format!("turn {i}"),
            })
            .collect();
        let formatted = format_conversation_history(&history);
        assert!(!formatted.contains("turn 0"));
        assert!(formatted.contains("turn 7"));
    }

    #[test]
    fn extracts_snippet_around_best_matching_window() {
        let content = format!("{}the contract term is defined in section ten{}", "filler ".repeat(60), " filler".repeat(60));
        let snippet = extract_snippet(&content, "contract term section", 60);
        assert!(snippet.contains("contract") || snippet.contains("..."));
    }

    #[test]
    fn short_content_is_returned_whole() {
        let snippet = extract_snippet("short content", "content", 200);
        assert_eq!(snippet, "short content");
    }
}
