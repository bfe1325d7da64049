//! The external vector-search contract (design doc §6: out of scope as a
//! bundled implementation; step 3 of §4.11 calls it "the external
//! vector-search contract"). `rag_pipeline.py`'s own `search_service` is a
//! constructor-injected optional collaborator with the same shape — the
//! Python prototype falls back to mock documents when none is configured,
//! which this trait mirrors via [`NullRetriever`].

use async_trait::async_trait;

use airouter_core::RouterError;

use crate::models::{DocumentFilters, RetrievedDocument};

/// Implemented by whatever owns the vector index; this crate only consumes
/// it. `k` bounds the candidate list the caller wants back, not the final
/// post-rank count (rank/filter in the pipeline may keep fewer).
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        k: u32,
        tenant_id: &str,
        filters: Option<&DocumentFilters>,
    ) -> Result<Vec<RetrievedDocument>, RouterError>;
}

/// A retriever that always returns no candidates. Useful as a default in
/// tests and as the composition root's placeholder before a real vector
/// index is wired in, matching `rag_pipeline.py`'s own "no search service
/// configured" branch — except this crate does not fabricate mock
/// documents in non-test code; an empty retrieval surfaces as
/// `retrieval_empty` per design doc §7's propagation policy.
pub struct NullRetriever;

#[async_trait]
impl Retriever for NullRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _k: u32,
        _tenant_id: &str,
        _filters: Option<&DocumentFilters>,
    ) -> Result<Vec<RetrievedDocument>, RouterError> {
        Ok(Vec::new())
    }
}
