//! Adaptive strategy - the fallback when no score clears its threshold
//!
//! Combines the other policies' techniques based on what retrieval
//! actually returns: strong top match leans on template adaptation, weak
//! or sparse results lean on broad synthesis with live-search supplements.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::backends::{BackendError, DocumentIndex, LiveSearch, RetrievedDocument, TextGenerator};
use crate::config::GeneratorConfig;
use crate::domain::ContentRequest;

use super::prompts::{artifact_instruction, context_block, reference_block};
use super::{GenerationStrategy, Strategy};

/// Top-match similarity above which template adaptation is trusted
const STRONG_MATCH_SCORE: f64 = 0.75;

pub struct AdaptiveStrategy {
    generator: Arc<dyn TextGenerator>,
    index: Arc<dyn DocumentIndex>,
    live_search: Arc<dyn LiveSearch>,
    max_tokens: u32,
    temperature: f64,
}

impl AdaptiveStrategy {
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
impl GenerationStrategy for AdaptiveStrategy {
    fn name(&self) -> Strategy {
        Strategy::Adaptive
    }

    async fn retrieve(&self, query: &str, artifact: &str, top_k: usize) -> Result<Vec<RetrievedDocument>, BackendError> {
        debug!(%query, artifact, top_k, "AdaptiveStrategy::retrieve: called");
        let mut docs = self.index.search(query, artifact, top_k).await?;

        if docs.is_empty() {
            debug!("AdaptiveStrategy::retrieve: empty corpus result, trying live search");
            match self.live_search.search(query, top_k).await {
                Ok(hits) => {
                    for hit in hits {
                        docs.push(RetrievedDocument::new(
                            format!("{}: {}", hit.title, hit.snippet),
                            hit.url,
                            0.4,
                        ));
                    }
                }
                Err(e) => {
                    debug!(error = %e, "AdaptiveStrategy::retrieve: live search failed, generating without references");
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
        debug!(%query, artifact, doc_count = docs.len(), "AdaptiveStrategy::generate: called");
        let mut prompt = artifact_instruction(artifact, request);

        let strong_match = docs.first().is_some_and(|d| d.score >= STRONG_MATCH_SCORE);
        if strong_match {
            debug!("AdaptiveStrategy::generate: strong top match, template mode");
            prompt.push_str("\n\nGunakan contoh terbaik berikut sebagai pola utama, lalu perkaya dengan referensi lain bila relevan:");
        } else {
            debug!("AdaptiveStrategy::generate: weak matches, synthesis mode");
            prompt.push_str("\n\nTidak ada contoh yang sangat mirip; susun hasil baru dengan menyintesis referensi yang ada dan pengetahuan kurikulum umum.");
        }
        prompt.push_str(&reference_block(docs));
        prompt.push_str(&context_block(extra_context));

        self.generator
            .generate(&prompt, &request.model, self.max_tokens, self.temperature)
            .await
    }
}
