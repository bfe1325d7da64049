//! Step 4 of the RAG pipeline (design doc §4.11): drop candidates below the
//! similarity floor or failing the declared filters, then keep the top-k by
//! rank score (similarity weighted by safety, via
//! [`RetrievedDocument::rank_score`]).

use crate::models::{DocumentFilters, RagRequest, RetrievedDocument};

fn passes_filters(doc: &RetrievedDocument, filters: &DocumentFilters) -> bool {
    if let Some(jurisdictions) = &filters.jurisdictions {
        let matches = doc
            .metadata
            .get("jurisdiction")
            .and_then(|v| v.as_str())
            .map(|j| jurisdictions.iter().any(|want| want == j))
            .unwrap_or(false);
        if !matches {
            return false;
        }
    }

    if let Some(doc_types) = &filters.doc_types {
        let matches = doc
            .metadata
            .get("doc_type")
            .and_then(|v| v.as_str())
            .map(|t| doc_types.iter().any(|want| want == t))
            .unwrap_or(false);
        if !matches {
            return false;
        }
    }

    if let Some(sources) = &filters.sources {
        if !sources.iter().any(|want| want == &doc.source) {
            return false;
        }
    }

    if let Some(excluded) = &filters.exclude_doc_ids {
        if excluded.iter().any(|id| id == &doc.doc_id) {
            return false;
        }
    }

    true
}

/// Drops candidates below `request.min_similarity_threshold` or failing
/// `request.filters`, then sorts the survivors by rank score (descending)
/// and keeps the top `request.top_k`.
pub fn rank_and_filter(candidates: &[RetrievedDocument], request: &RagRequest) -> Vec<RetrievedDocument> {
    let mut kept: Vec<RetrievedDocument> = candidates
        .iter()
        .filter(|doc| doc.similarity_score >= request.min_similarity_threshold)
        .filter(|doc| request.filters.as_ref().map(|f| passes_filters(doc, f)).unwrap_or(true))
        .cloned()
        .collect();

    kept.sort_by(|a, b| b.rank_score().partial_cmp(&a.rank_score()).unwrap_or(std::cmp::Ordering::Equal));
    kept.truncate(request.top_k as usize);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn doc(id: &str, similarity: f32, safety: f32) -> RetrievedDocument {
        RetrievedDocument {
            doc_id: id.to_string(),
            content: format!("content for {id}"),
            title: format!("Title {id}"),
            source: "Test Source".to_string(),
            source_url: None,
            similarity_score: similarity,
            safety_score: safety,
            rank: 1,
            metadata: HashMap::new(),
        }
    }

    fn request(top_k: u32, min_similarity: f32) -> RagRequest {
        let mut request = RagRequest::new("tenant-a", "query");
        request.top_k = top_k;
        request.min_similarity_threshold = min_similarity;
        request
    }

    #[test]
    fn drops_candidates_below_the_similarity_floor() {
        let candidates = vec![doc("a", 0.9, 1.0), doc("b", 0.3, 1.0)];
        let kept = rank_and_filter(&candidates, &request(5, 0.5));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].doc_id, "a");
    }

    #[test]
    fn sorts_by_rank_score_descending() {
        let candidates = vec![doc("a", 0.6, 1.0), doc("b", 0.9, 1.0), doc("c", 0.8, 1.0)];
        let kept = rank_and_filter(&candidates, &request(5, 0.0));
        assert_eq!(kept.iter().map(|d| d.doc_id.as_str()).collect::<Vec<_>>(), vec!["b", "c", "a"]);
    }

    #[test]
    fn truncates_to_top_k() {
        let candidates = vec![doc("a", 0.9, 1.0), doc("b", 0.8, 1.0), doc("c", 0.7, 1.0)];
        let kept = rank_and_filter(&candidates, &request(2, 0.0));
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn safety_score_weighs_the_rank() {
        let candidates = vec![doc("a", 0.9, 0.1), doc("b", 0.8, 1.0)];
        let kept = rank_and_filter(&candidates, &request(5, 0.0));
        assert_eq!(kept[0].doc_id, "b");
    }

    #[test]
    fn filters_by_jurisdiction_metadata() {
        let mut indian = doc("a", 0.9, 1.0);
        indian.metadata.insert("jurisdiction".to_string(), serde_json::json!("IN"));
        let mut us = doc("b", 0.9, 1.0);
        us.metadata.insert("jurisdiction".to_string(), serde_json::json!("US"));

        let mut request = request(5, 0.0);
        request.filters = Some(DocumentFilters {
            jurisdictions: Some(vec!["IN".to_string()]),
            ..Default::default()
        });

        let kept = rank_and_filter(&[indian, us], &request);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].doc_id, "a");
    }

    #[test]
    fn excludes_named_doc_ids() {
        let mut request = request(5, 0.0);
        request.filters = Some(DocumentFilters {
            exclude_doc_ids: Some(vec!["b".to_string()]),
            ..Default::default()
        });
        let kept = rank_and_filter(&[doc("a", 0.9, 1.0), doc("b", 0.9, 1.0)], &request);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].doc_id, "a");
    }
}
