//! Collaborator trait definitions

use async_trait::async_trait;
use tracing::debug;

use super::{BackendError, RetrievedDocument, SearchHit};

/// Stateless text-generation backend - each call is independent
///
/// The engine does not retry through this trait; any retry policy belongs
/// to the implementation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Produce text for a prompt
    async fn generate(
        &self,
        prompt: &str,
        model: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<String, BackendError>;
}

/// Document-retrieval backend over the curriculum corpus
///
/// An empty or unmatched query yields an empty list, never an error.
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    async fn search(&self, query: &str, doc_type: &str, top_k: usize) -> Result<Vec<RetrievedDocument>, BackendError>;
}

/// Live web-search backend, consulted only when retrieval is sparse
#[async_trait]
pub trait LiveSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, BackendError>;
}

/// Retrieval backend for deployments without a corpus service
pub struct NullIndex;

#[async_trait]
impl DocumentIndex for NullIndex {
    async fn search(&self, query: &str, doc_type: &str, _top_k: usize) -> Result<Vec<RetrievedDocument>, BackendError> {
        debug!(%query, %doc_type, "NullIndex::search: no corpus configured");
        Ok(Vec::new())
    }
}

/// Live-search backend for deployments without a search provider
pub struct NullSearch;

#[async_trait]
impl LiveSearch for NullSearch {
    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SearchHit>, BackendError> {
        debug!(%query, "NullSearch::search: no provider configured");
        Ok(Vec::new())
    }
}
