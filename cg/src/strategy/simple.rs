//! Simple strategy - template matching against the closest retrieved example
//!
//! Cheapest policy: retrieve a few high-similarity examples and generate by
//! adapting the best match to the request.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::backends::{BackendError, DocumentIndex, RetrievedDocument, TextGenerator};
use crate::config::GeneratorConfig;
use crate::domain::ContentRequest;

use super::prompts::{artifact_instruction, context_block};
use super::{GenerationStrategy, Strategy};

pub struct SimpleStrategy {
    generator: Arc<dyn TextGenerator>,
    index: Arc<dyn DocumentIndex>,
    max_tokens: u32,
    temperature: f64,
}

impl SimpleStrategy {
    pub fn new(generator: Arc<dyn TextGenerator>, index: Arc<dyn DocumentIndex>, config: &GeneratorConfig) -> Self {
        Self {
            generator,
            index,
            max_tokens: config.max_tokens,
            // Template adaptation wants low variance
            temperature: (config.temperature * 0.5).min(0.3),
        }
    }
}

#[async_trait]
impl GenerationStrategy for SimpleStrategy {
    fn name(&self) -> Strategy {
        Strategy::Simple
    }

    async fn retrieve(&self, query: &str, artifact: &str, top_k: usize) -> Result<Vec<RetrievedDocument>, BackendError> {
        debug!(%query, artifact, top_k, "SimpleStrategy::retrieve: called");
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
        debug!(%query, artifact, doc_count = docs.len(), "SimpleStrategy::generate: called");
        let mut prompt = artifact_instruction(artifact, request);

        // Only the single best match drives template adaptation
        if let Some(best) = docs.first() {
            prompt.push_str("\n\nGunakan contoh berikut sebagai pola, sesuaikan dengan topik yang diminta:\n");
            prompt.push_str(&best.content);
        }
        prompt.push_str(&context_block(extra_context));

        self.generator
            .generate(&prompt, &request.model, self.max_tokens, self.temperature)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::client::mock::{FixtureIndex, MockGenerator};

    fn request() -> ContentRequest {
        ContentRequest {
            teacher: "Bu Sari".to_string(),
            school: "SMA 1".to_string(),
            subject: "matematika".to_string(),
            grade: 10,
            phase: "E".to_string(),
            topic: "aljabar linear".to_string(),
            sub_topic: String::new(),
            time_allocation: 90,
            model: String::new(),
            primary: None,
            secondary: None,
        }
    }

    #[tokio::test]
    async fn test_retrieve_delegates_to_index() {
        let strategy = SimpleStrategy::new(
            Arc::new(MockGenerator::new(vec![])),
            Arc::new(FixtureIndex::new(vec![
                RetrievedDocument::new("CP contoh", "corpus", 0.92),
                RetrievedDocument::new("CP lain", "corpus", 0.85),
            ])),
            &GeneratorConfig::default(),
        );

        let docs = strategy.retrieve("matematika aljabar", "cp", 1).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "CP contoh");
    }

    #[tokio::test]
    async fn test_generate_uses_generator() {
        let strategy = SimpleStrategy::new(
            Arc::new(MockGenerator::new(vec!["Peserta didik mampu ...".to_string()])),
            Arc::new(FixtureIndex::empty()),
            &GeneratorConfig::default(),
        );

        let docs = vec![RetrievedDocument::new("CP contoh", "corpus", 0.92)];
        let text = strategy
            .generate("matematika aljabar", &docs, "cp", &request(), None)
            .await
            .unwrap();
        assert_eq!(text, "Peserta didik mampu ...");
    }

    #[tokio::test]
    async fn test_generate_works_with_zero_docs() {
        let strategy = SimpleStrategy::new(
            Arc::new(MockGenerator::new(vec!["CP tanpa referensi".to_string()])),
            Arc::new(FixtureIndex::empty()),
            &GeneratorConfig::default(),
        );

        let text = strategy.generate("q", &[], "cp", &request(), None).await.unwrap();
        assert_eq!(text, "CP tanpa referensi");
    }
}
