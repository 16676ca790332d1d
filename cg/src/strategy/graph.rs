//! Graph strategy - relation-centric generation
//!
//! For requests with relational intent, the reference snippets are mined
//! for concept co-occurrence pairs and the prompt asks the generator to
//! make those relations explicit in the artifact.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::backends::{BackendError, DocumentIndex, RetrievedDocument, TextGenerator};
use crate::config::GeneratorConfig;
use crate::domain::ContentRequest;

use super::prompts::{artifact_instruction, context_block, reference_block};
use super::{GenerationStrategy, Strategy};

/// Stop words skipped during concept extraction
const CONNECTIVES: [&str; 8] = ["dan", "atau", "dengan", "terhadap", "pada", "dari", "ke", "untuk"];

/// Cap on relation lines injected into the prompt
const MAX_RELATIONS: usize = 10;

pub struct GraphStrategy {
    generator: Arc<dyn TextGenerator>,
    index: Arc<dyn DocumentIndex>,
    max_tokens: u32,
    temperature: f64,
}

impl GraphStrategy {
    pub fn new(generator: Arc<dyn TextGenerator>, index: Arc<dyn DocumentIndex>, config: &GeneratorConfig) -> Self {
        Self {
            generator,
            index,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Extract adjacent-concept pairs from query and snippets
    ///
    /// A lightweight approximation of a concept graph: consecutive
    /// non-connective tokens form a relation edge.
    fn extract_relations(query: &str, docs: &[RetrievedDocument]) -> Vec<(String, String)> {
        let mut relations = Vec::new();
        let mut seen = HashSet::new();

        let mut texts = vec![query.to_string()];
        texts.extend(docs.iter().map(|d| d.content.clone()));

        for text in texts {
            let concepts: Vec<String> = text
                .split_whitespace()
                .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
                .filter(|w| w.len() > 2 && !CONNECTIVES.contains(&w.as_str()))
                .collect();

            for pair in concepts.windows(2) {
                let key = format!("{}|{}", pair[0], pair[1]);
                if seen.insert(key) {
                    relations.push((pair[0].clone(), pair[1].clone()));
                    if relations.len() >= MAX_RELATIONS {
                        return relations;
                    }
                }
            }
        }

        relations
    }
}

#[async_trait]
impl GenerationStrategy for GraphStrategy {
    fn name(&self) -> Strategy {
        Strategy::Graph
    }

    async fn retrieve(&self, query: &str, artifact: &str, top_k: usize) -> Result<Vec<RetrievedDocument>, BackendError> {
        debug!(%query, artifact, top_k, "GraphStrategy::retrieve: called");
        self.index.search(query, artifact, top_k).await
    }

    async fn generate(
        &self,
        query: &str,
        docs: &[RetrievedDocument],
        artifact: &str,
        request: &ContentRequest,
        extra_context: Option<&str>,
    ) -> Result<String, BackendError> {
        debug!(%query, artifact, doc_count = docs.len(), "GraphStrategy::generate: called");
        let relations = Self::extract_relations(query, docs);

        let mut prompt = artifact_instruction(artifact, request);
        if !relations.is_empty() {
            prompt.push_str("\n\nHubungan antar konsep yang harus dijelaskan secara eksplisit:\n");
            for (a, b) in &relations {
                prompt.push_str(&format!("- {} <-> {}\n", a, b));
            }
        }
        prompt.push_str(&reference_block(docs));
        prompt.push_str(&context_block(extra_context));

        self.generator
            .generate(&prompt, &request.model, self.max_tokens, self.temperature)
            .await
    }
}
