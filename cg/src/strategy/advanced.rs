//! Advanced strategy - multi-reference synthesis with live-search fallback
//!
//! Pulls a wider set of references and asks for an elaborated synthesis.
//! When corpus retrieval is sparse (fewer than 3 hits) it supplements the
//! references with live web-search snippets.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::backends::{BackendError, DocumentIndex, LiveSearch, RetrievedDocument, TextGenerator};
use crate::config::GeneratorConfig;
use crate::domain::ContentRequest;

use super::prompts::{artifact_instruction, context_block, reference_block};
use super::{GenerationStrategy, Strategy};

/// Corpus hit count below which live search is consulted
const SPARSE_RETRIEVAL_THRESHOLD: usize = 3;

/// Similarity assigned to live-search supplements (unranked by the corpus)
const LIVE_HIT_SCORE: f64 = 0.5;

pub struct AdvancedStrategy {
    generator: Arc<dyn TextGenerator>,
    index: Arc<dyn DocumentIndex>,
    live_search: Arc<dyn LiveSearch>,
    max_tokens: u32,
    temperature: f64,
}

impl AdvancedStrategy {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        index: Arc<dyn DocumentIndex>,
        live_search: Arc<dyn LiveSearch>,
        config: &GeneratorConfig,
    ) -> Self {
        Self {
            generator,
            index,
            live_search,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl GenerationStrategy for AdvancedStrategy {
    fn name(&self) -> Strategy {
        Strategy::Advanced
    }

    async fn retrieve(&self, query: &str, artifact: &str, top_k: usize) -> Result<Vec<RetrievedDocument>, BackendError> {
        debug!(%query, artifact, top_k, "AdvancedStrategy::retrieve: called");
        let mut docs = self.index.search(query, artifact, top_k).await?;

        if docs.len() < SPARSE_RETRIEVAL_THRESHOLD {
            debug!(corpus_hits = docs.len(), "AdvancedStrategy::retrieve: sparse corpus, consulting live search");
            let needed = top_k.saturating_sub(docs.len()).max(1);
            match self.live_search.search(query, needed).await {
                Ok(hits) => {
                    for hit in hits {
                        docs.push(RetrievedDocument::new(
                            format!("{}: {}", hit.title, hit.snippet),
                            hit.url,
                            LIVE_HIT_SCORE,
                        ));
                    }
                }
                Err(e) => {
                    // Live search is a supplement; its failure must not sink retrieval
                    debug!(error = %e, "AdvancedStrategy::retrieve: live search failed, continuing with corpus hits");
                }
            }
        }

        Ok(docs)
    }

    async fn generate(
        &self,
        query: &str,
        docs: &[RetrievedDocument],
        artifact: &str,
        request: &ContentRequest,
        extra_context: Option<&str>,
    ) -> Result<String, BackendError> {
        debug!(%query, artifact, doc_count = docs.len(), "AdvancedStrategy::generate: called");
        let mut prompt = artifact_instruction(artifact, request);
        prompt.push_str(
            "\n\nSintesiskan seluruh dokumen referensi di bawah ini menjadi hasil yang lengkap, \
             mendalam, dan sesuai konteks sekolah.",
        );
        prompt.push_str(&reference_block(docs));
        prompt.push_str(&context_block(extra_context));

        self.generator
            .generate(&prompt, &request.model, self.max_tokens, self.temperature)
            .await
    }
}
