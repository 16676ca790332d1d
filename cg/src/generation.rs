//! Generation coordinator - produces draft artifacts via a strategy
//!
//! The coordinator drives one retrieve/generate pass per missing artifact:
//! primary first, then secondary with the primary's text passed verbatim as
//! additional context. Collaborator failures propagate tagged with the
//! strategy and artifact; there is no retry at this layer.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::backends::BackendError;
use crate::domain::{ContentRequest, GenerationResult, ARTIFACT_PRIMARY, ARTIFACT_SECONDARY};
use crate::events::EventEmitter;
use crate::strategy::{Strategy, StrategySet};

/// Snippets retrieved per artifact
const DEFAULT_TOP_K: usize = 5;

/// A failed generation pass, tagged with where it failed
#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error("{strategy} strategy failed on {artifact}: {source}")]
    Backend {
        strategy: Strategy,
        artifact: String,
        #[source]
        source: BackendError,
    },

    #[error("no implementation registered for strategy {0}")]
    UnknownStrategy(Strategy),
}

pub struct GenerationCoordinator {
    strategies: Arc<StrategySet>,
    top_k: usize,
}

impl GenerationCoordinator {
    pub fn new(strategies: Arc<StrategySet>) -> Self {
        Self {
            strategies,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Produce both artifacts for a request with the given strategy
    ///
    /// Pre-supplied artifacts are passed through untouched; a request with
    /// both artifacts supplied triggers no collaborator calls at all.
    pub async fn generate(
        &self,
        request: &ContentRequest,
        strategy: Strategy,
        emitter: &EventEmitter,
    ) -> Result<GenerationResult, GenerationFailure> {
        debug!(%strategy, "generate: called");

        if request.is_complete() {
            debug!("generate: request already complete, skipping generation");
            return Ok(GenerationResult {
                primary: request.primary.clone().unwrap_or_default(),
                secondary: request.secondary.clone().unwrap_or_default(),
                strategy,
                confidence: 1.0,
                sources: vec![],
            });
        }

        emitter.generation_started(strategy, &request.missing_artifacts());

        let implementation = self
            .strategies
            .get(strategy)
            .ok_or(GenerationFailure::UnknownStrategy(strategy))?;
        let query = request.query();
        let mut sources = Vec::new();

        // Primary artifact first
        let primary = match supplied(&request.primary) {
            Some(text) => text,
            None => {
                let docs = implementation
                    .retrieve(&query, ARTIFACT_PRIMARY, self.top_k)
                    .await
                    .map_err(|source| GenerationFailure::Backend {
                        strategy,
                        artifact: ARTIFACT_PRIMARY.to_string(),
                        source,
                    })?;
                collect_sources(&mut sources, &docs);

                let text = implementation
                    .generate(&query, &docs, ARTIFACT_PRIMARY, request, None)
                    .await
                    .map_err(|source| GenerationFailure::Backend {
                        strategy,
                        artifact: ARTIFACT_PRIMARY.to_string(),
                        source,
                    })?;
                emitter.generation_progress("primary artifact generated", 40);
                text
            }
        };

        // Secondary artifact receives the primary verbatim as context
        let secondary = match supplied(&request.secondary) {
            Some(text) => text,
            None => {
                let docs = implementation
                    .retrieve(&query, ARTIFACT_SECONDARY, self.top_k)
                    .await
                    .map_err(|source| GenerationFailure::Backend {
                        strategy,
                        artifact: ARTIFACT_SECONDARY.to_string(),
                        source,
                    })?;
                collect_sources(&mut sources, &docs);

                let context = format!("Capaian Pembelajaran (CP) yang sudah dihasilkan:\n{}", primary);
                let text = implementation
                    .generate(&query, &docs, ARTIFACT_SECONDARY, request, Some(&context))
                    .await
                    .map_err(|source| GenerationFailure::Backend {
                        strategy,
                        artifact: ARTIFACT_SECONDARY.to_string(),
                        source,
                    })?;
                emitter.generation_progress("secondary artifact generated", 60);
                text
            }
        };

        debug!(%strategy, source_count = sources.len(), "generate: complete");
        Ok(GenerationResult {
            primary,
            secondary,
            strategy,
            confidence: 0.0,
            sources,
        })
    }

    /// Regenerate both artifacts with prior content and feedback as context
    pub async fn refine(
        &self,
        request: &ContentRequest,
        strategy: Strategy,
        prior: &GenerationResult,
        feedback: &str,
        emitter: &EventEmitter,
    ) -> Result<GenerationResult, GenerationFailure> {
        debug!(%strategy, "refine: called");

        let implementation = self
            .strategies
            .get(strategy)
            .ok_or(GenerationFailure::UnknownStrategy(strategy))?;
        let query = request.query();
        let mut sources = Vec::new();
        emitter.generation_started(strategy, &request.missing_artifacts());

        // Pre-supplied artifacts are the user's text and stay fixed even
        // through refinement
        let primary = match supplied(&request.primary) {
            Some(text) => text,
            None => {
                let docs = implementation
                    .retrieve(&query, ARTIFACT_PRIMARY, self.top_k)
                    .await
                    .map_err(|source| GenerationFailure::Backend {
                        strategy,
                        artifact: ARTIFACT_PRIMARY.to_string(),
                        source,
                    })?;
                collect_sources(&mut sources, &docs);

                let context = format!(
                    "Hasil sebelumnya (CP):\n{}\n\nUmpan balik pengguna:\n{}\n\nPerbaiki hasil sesuai umpan balik.",
                    prior.primary, feedback
                );
                let text = implementation
                    .generate(&query, &docs, ARTIFACT_PRIMARY, request, Some(&context))
                    .await
                    .map_err(|source| GenerationFailure::Backend {
                        strategy,
                        artifact: ARTIFACT_PRIMARY.to_string(),
                        source,
                    })?;
                emitter.generation_progress("primary artifact refined", 40);
                text
            }
        };

        let secondary = match supplied(&request.secondary) {
            Some(text) => text,
            None => {
                let docs = implementation
                    .retrieve(&query, ARTIFACT_SECONDARY, self.top_k)
                    .await
                    .map_err(|source| GenerationFailure::Backend {
                        strategy,
                        artifact: ARTIFACT_SECONDARY.to_string(),
                        source,
                    })?;
                collect_sources(&mut sources, &docs);

                let context = format!(
                    "Capaian Pembelajaran (CP) yang sudah dihasilkan:\n{}\n\nHasil sebelumnya (ATP):\n{}\n\n\
                     Umpan balik pengguna:\n{}\n\nPerbaiki hasil sesuai umpan balik.",
                    primary, prior.secondary, feedback
                );
                let text = implementation
                    .generate(&query, &docs, ARTIFACT_SECONDARY, request, Some(&context))
                    .await
                    .map_err(|source| GenerationFailure::Backend {
                        strategy,
                        artifact: ARTIFACT_SECONDARY.to_string(),
                        source,
                    })?;
                emitter.generation_progress("secondary artifact refined", 60);
                text
            }
        };

        Ok(GenerationResult {
            primary,
            secondary,
            strategy,
            confidence: prior.confidence,
            sources,
        })
    }
}

fn supplied(artifact: &Option<String>) -> Option<String> {
    artifact.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}

fn collect_sources(sources: &mut Vec<String>, docs: &[crate::backends::RetrievedDocument]) {
    for doc in docs {
        if !sources.contains(&doc.source) {
            sources.push(doc.source.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::client::mock::{FixtureIndex, MockGenerator};
    use crate::backends::RetrievedDocument;
    use crate::config::GeneratorConfig;
    use crate::events::EventBus;
    use crate::strategy::SimpleStrategy;

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

    fn coordinator_with(generator: Arc<MockGenerator>) -> GenerationCoordinator {
        let strategies = StrategySet::new().with(Arc::new(SimpleStrategy::new(
            generator,
            Arc::new(FixtureIndex::new(vec![RetrievedDocument::new("CP contoh", "corpus", 0.9)])),
            &GeneratorConfig::default(),
        )));
        GenerationCoordinator::new(Arc::new(strategies))
    }

    fn emitter() -> EventEmitter {
        EventBus::new(16).emitter_for("cg-test12345678")
    }

    #[tokio::test]
    async fn test_generates_primary_then_secondary() {
        let generator = Arc::new(MockGenerator::new(vec![
            "CP hasil".to_string(),
            "ATP hasil".to_string(),
        ]));
        let coordinator = coordinator_with(generator.clone());

        let result = coordinator
            .generate(&request(), Strategy::Simple, &emitter())
            .await
            .unwrap();

        assert_eq!(result.primary, "CP hasil");
        assert_eq!(result.secondary, "ATP hasil");
        assert_eq!(result.strategy, Strategy::Simple);
        assert_eq!(generator.call_count(), 2);
        assert_eq!(result.sources, vec!["corpus".to_string()]);
    }

    #[tokio::test]
    async fn test_complete_request_never_generates() {
        let generator = Arc::new(MockGenerator::new(vec![]));
        let coordinator = coordinator_with(generator.clone());

        let mut req = request();
        req.primary = Some("CP milik guru".to_string());
        req.secondary = Some("ATP milik guru".to_string());

        let result = coordinator.generate(&req, Strategy::Simple, &emitter()).await.unwrap();
        assert_eq!(result.primary, "CP milik guru");
        assert_eq!(result.secondary, "ATP milik guru");
        assert_eq!(result.confidence, 1.0);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_supplied_primary_only_generates_secondary() {
        let generator = Arc::new(MockGenerator::new(vec!["ATP hasil".to_string()]));
        let coordinator = coordinator_with(generator.clone());

        let mut req = request();
        req.primary = Some("CP milik guru".to_string());

        let result = coordinator.generate(&req, Strategy::Simple, &emitter()).await.unwrap();
        assert_eq!(result.primary, "CP milik guru");
        assert_eq!(result.secondary, "ATP hasil");
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_tagged_with_strategy_and_artifact() {
        let coordinator = coordinator_with(Arc::new(MockGenerator::failing("backend down")));

        let err = coordinator
            .generate(&request(), Strategy::Simple, &emitter())
            .await
            .unwrap_err();

        match err {
            GenerationFailure::Backend { strategy, artifact, .. } => {
                assert_eq!(strategy, Strategy::Simple);
                assert_eq!(artifact, "cp");
            }
            other => panic!("unexpected failure: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_strategy_is_rejected() {
        let coordinator = GenerationCoordinator::new(Arc::new(StrategySet::new()));
        let err = coordinator
            .generate(&request(), Strategy::Graph, &emitter())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationFailure::UnknownStrategy(Strategy::Graph)));
    }

    #[tokio::test]
    async fn test_refine_keeps_prior_confidence() {
        let generator = Arc::new(MockGenerator::new(vec![
            "CP diperbaiki".to_string(),
            "ATP diperbaiki".to_string(),
        ]));
        let coordinator = coordinator_with(generator);

        let prior = GenerationResult {
            primary: "CP lama".to_string(),
            secondary: "ATP lama".to_string(),
            strategy: Strategy::Simple,
            confidence: 0.6,
            sources: vec![],
        };

        let refined = coordinator
            .refine(&request(), Strategy::Simple, &prior, "tolong lebih detail", &emitter())
            .await
            .unwrap();
        assert_eq!(refined.primary, "CP diperbaiki");
        assert_eq!(refined.confidence, 0.6);
    }
}
