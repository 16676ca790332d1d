//! Quality monitor - confidence combination and the re-routing gate
//!
//! Overall confidence is the weaker of retrieval confidence and generation
//! confidence. Both legs must independently succeed, so the gate uses min,
//! not an average. Below the threshold the monitor substitutes the
//! Adaptive strategy for one regeneration and keeps the better result.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{ContentRequest, GenerationResult};
use crate::events::EventEmitter;
use crate::generation::{GenerationCoordinator, GenerationFailure};
use crate::strategy::Strategy;

/// Target length for an adequate primary artifact
const PRIMARY_LENGTH_TARGET: usize = 100;

/// Target length for an adequate secondary artifact
const SECONDARY_LENGTH_TARGET: usize = 150;

/// Length signal when the target is met / missed
const LENGTH_OK: f64 = 0.8;
const LENGTH_SHORT: f64 = 0.4;

/// Domain vocabulary expected in a competency statement
const PRIMARY_VOCABULARY: [&str; 4] = ["kompetensi", "pembelajaran", "peserta", "mampu"];

/// Domain vocabulary expected in a learning sequence
const SECONDARY_VOCABULARY: [&str; 4] = ["tujuan", "pembelajaran", "indikator", "evaluasi"];

/// One quality gate evaluation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QualityReport {
    pub retrieval_confidence: f64,
    pub generation_confidence: f64,
    pub overall_confidence: f64,
    pub passed: bool,
    /// Fraction of expected domain vocabulary present across artifacts
    pub educational_relevance: f64,
    /// Whether both artifacts are non-empty
    pub complete: bool,
}

pub struct QualityMonitor {
    threshold: f64,
}

impl QualityMonitor {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Generation confidence: mean of four signals
    ///
    /// Two length-adequacy signals and two vocabulary-presence ratios, one
    /// pair per artifact.
    pub fn generation_confidence(&self, result: &GenerationResult) -> f64 {
        let primary_length = if result.primary.chars().count() >= PRIMARY_LENGTH_TARGET {
            LENGTH_OK
        } else {
            LENGTH_SHORT
        };
        let secondary_length = if result.secondary.chars().count() >= SECONDARY_LENGTH_TARGET {
            LENGTH_OK
        } else {
            LENGTH_SHORT
        };
        let primary_vocab = vocabulary_ratio(&result.primary, &PRIMARY_VOCABULARY);
        let secondary_vocab = vocabulary_ratio(&result.secondary, &SECONDARY_VOCABULARY);

        let confidence = (primary_length + secondary_length + primary_vocab + secondary_vocab) / 4.0;
        debug!(
            primary_length,
            secondary_length, primary_vocab, secondary_vocab, confidence, "generation_confidence: computed"
        );
        confidence.clamp(0.0, 1.0)
    }

    /// Evaluate the gate for a result
    pub fn assess(&self, retrieval_confidence: f64, result: &GenerationResult) -> QualityReport {
        let retrieval_confidence = retrieval_confidence.clamp(0.0, 1.0);
        let generation_confidence = self.generation_confidence(result);
        let overall_confidence = retrieval_confidence.min(generation_confidence);
        let passed = overall_confidence >= self.threshold;

        let educational_relevance = (vocabulary_ratio(&result.primary, &PRIMARY_VOCABULARY)
            + vocabulary_ratio(&result.secondary, &SECONDARY_VOCABULARY))
            / 2.0;
        let complete = !result.primary.trim().is_empty() && !result.secondary.trim().is_empty();

        debug!(
            retrieval_confidence,
            generation_confidence, overall_confidence, passed, "assess: evaluated"
        );

        QualityReport {
            retrieval_confidence,
            generation_confidence,
            overall_confidence,
            passed,
            educational_relevance,
            complete,
        }
    }

    /// Gate a result, substituting Adaptive once when the gate fails
    ///
    /// The regeneration is single-shot: whichever of the two results scores
    /// higher overall is kept. An Adaptive result that fails the gate is
    /// kept as-is; there is no further substitution to try. Requests that
    /// supplied both artifacts are never re-routed either: regeneration
    /// cannot change user-provided text.
    pub async fn gate(
        &self,
        coordinator: &GenerationCoordinator,
        request: &ContentRequest,
        retrieval_confidence: f64,
        result: GenerationResult,
        emitter: &EventEmitter,
    ) -> Result<(GenerationResult, QualityReport), GenerationFailure> {
        let report = self.assess(retrieval_confidence, &result);
        emitter.quality_monitoring(
            report.retrieval_confidence,
            report.generation_confidence,
            report.overall_confidence,
            report.passed,
        );

        if report.passed || result.strategy == Strategy::Adaptive || request.is_complete() {
            return Ok((result, report));
        }

        info!(
            overall = report.overall_confidence,
            threshold = self.threshold,
            "gate: below threshold, substituting adaptive strategy"
        );
        emitter.re_routing(
            result.strategy,
            Strategy::Adaptive,
            &format!(
                "overall confidence {:.2} below threshold {:.2}",
                report.overall_confidence, self.threshold
            ),
        );

        let regenerated = coordinator.generate(request, Strategy::Adaptive, emitter).await?;
        let regenerated_report = self.assess(retrieval_confidence, &regenerated);
        emitter.quality_monitoring(
            regenerated_report.retrieval_confidence,
            regenerated_report.generation_confidence,
            regenerated_report.overall_confidence,
            regenerated_report.passed,
        );

        if regenerated_report.overall_confidence > report.overall_confidence {
            debug!("gate: adaptive regeneration scored higher, keeping it");
            Ok((regenerated, regenerated_report))
        } else {
            debug!("gate: original result scored higher, keeping it");
            Ok((result, report))
        }
    }
}

/// Fraction of expected vocabulary terms present in the text
fn vocabulary_ratio(text: &str, vocabulary: &[&str]) -> f64 {
    if vocabulary.is_empty() {
        return 0.0;
    }
    let lower = text.to_lowercase();
    let hits = vocabulary.iter().filter(|term| lower.contains(*term)).count();
    hits as f64 / vocabulary.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Strategy;
    use proptest::prelude::*;

    fn result(primary: &str, secondary: &str) -> GenerationResult {
        GenerationResult {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
            strategy: Strategy::Simple,
            confidence: 0.0,
            sources: vec![],
        }
    }

    fn good_primary() -> String {
        "Peserta didik mampu menunjukkan kompetensi pembelajaran aljabar linear, \
         menyelesaikan sistem persamaan, dan menerapkannya dalam konteks nyata."
            .to_string()
    }

    fn good_secondary() -> String {
        "Tujuan pembelajaran 1: memahami konsep dasar dengan indikator tertulis. \
         Tujuan pembelajaran 2: menerapkan konsep dengan evaluasi berbentuk proyek. \
         Setiap tahap memiliki indikator evaluasi yang terukur."
            .to_string()
    }

    #[test]
    fn test_overall_is_min_of_both_legs() {
        let monitor = QualityMonitor::new(0.8);
        let result = result(&good_primary(), &good_secondary());

        let report = monitor.assess(0.95, &result);
        assert!((report.overall_confidence - report.generation_confidence.min(0.95)).abs() < 1e-9);

        let report = monitor.assess(0.1, &result);
        assert!((report.overall_confidence - 0.1).abs() < 1e-9);
        assert!(!report.passed);
    }

    #[test]
    fn test_short_artifacts_score_low() {
        let monitor = QualityMonitor::new(0.8);
        let confidence = monitor.generation_confidence(&result("CP pendek", "ATP pendek"));
        // Both length signals at 0.4, both vocab ratios at 0
        assert!((confidence - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_adequate_artifacts_score_high() {
        let monitor = QualityMonitor::new(0.8);
        let confidence = monitor.generation_confidence(&result(&good_primary(), &good_secondary()));
        // Both lengths adequate (0.8), vocab 3/4 and 4/4
        assert!(confidence > 0.75);
    }

    #[test]
    fn test_vocabulary_ratio() {
        assert_eq!(vocabulary_ratio("tujuan pembelajaran dan indikator", &SECONDARY_VOCABULARY), 0.75);
        assert_eq!(vocabulary_ratio("tanpa istilah", &SECONDARY_VOCABULARY), 0.0);
    }

    #[test]
    fn test_report_flags() {
        let monitor = QualityMonitor::new(0.8);
        let report = monitor.assess(0.9, &result(&good_primary(), ""));
        assert!(!report.complete);
    }

    #[tokio::test]
    async fn test_gate_passes_good_result_without_regeneration() {
        use crate::backends::client::mock::{FixtureIndex, MockGenerator};
        use crate::config::GeneratorConfig;
        use crate::events::EventBus;
        use crate::strategy::{AdaptiveStrategy, StrategySet};
        use std::sync::Arc;

        let generator = Arc::new(MockGenerator::new(vec![]));
        let strategies = StrategySet::new().with(Arc::new(AdaptiveStrategy::new(
            generator.clone(),
            Arc::new(FixtureIndex::empty()),
            Arc::new(crate::backends::client::mock::StubSearch::new(vec![])),
            &GeneratorConfig::default(),
        )));
        let coordinator = GenerationCoordinator::new(Arc::new(strategies));
        let emitter = EventBus::new(16).emitter_for("cg-test12345678");

        let monitor = QualityMonitor::new(0.8);
        let good = result(&good_primary(), &good_secondary());
        let request = ContentRequest {
            teacher: "Bu Sari".to_string(),
            school: "SMA 1".to_string(),
            subject: "matematika".to_string(),
            grade: 10,
            phase: "E".to_string(),
            topic: "aljabar".to_string(),
            sub_topic: String::new(),
            time_allocation: 90,
            model: String::new(),
            primary: None,
            secondary: None,
        };

        let (kept, report) = monitor.gate(&coordinator, &request, 0.95, good, &emitter).await.unwrap();
        assert!(report.passed);
        assert_eq!(kept.strategy, Strategy::Simple);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_gate_substitutes_adaptive_on_low_confidence() {
        use crate::backends::client::mock::{FixtureIndex, MockGenerator, StubSearch};
        use crate::config::GeneratorConfig;
        use crate::events::EventBus;
        use crate::strategy::{AdaptiveStrategy, StrategySet};
        use std::sync::Arc;

        // Adaptive regeneration produces adequate artifacts
        let generator = Arc::new(MockGenerator::new(vec![good_primary(), good_secondary()]));
        let strategies = StrategySet::new().with(Arc::new(AdaptiveStrategy::new(
            generator.clone(),
            Arc::new(FixtureIndex::empty()),
            Arc::new(StubSearch::new(vec![])),
            &GeneratorConfig::default(),
        )));
        let coordinator = GenerationCoordinator::new(Arc::new(strategies));
        let emitter = EventBus::new(16).emitter_for("cg-test12345678");

        let monitor = QualityMonitor::new(0.8);
        let poor = result("CP pendek", "ATP pendek");
        let request = ContentRequest {
            teacher: "Bu Sari".to_string(),
            school: "SMA 1".to_string(),
            subject: "matematika".to_string(),
            grade: 10,
            phase: "E".to_string(),
            topic: "aljabar".to_string(),
            sub_topic: String::new(),
            time_allocation: 90,
            model: String::new(),
            primary: None,
            secondary: None,
        };

        let (kept, report) = monitor.gate(&coordinator, &request, 0.95, poor, &emitter).await.unwrap();
        assert_eq!(kept.strategy, Strategy::Adaptive);
        assert_eq!(generator.call_count(), 2);
        assert!(report.overall_confidence > 0.2);
    }

    #[tokio::test]
    async fn test_gate_never_reroutes_supplied_artifacts() {
        use crate::backends::client::mock::{FixtureIndex, MockGenerator, StubSearch};
        use crate::config::GeneratorConfig;
        use crate::events::EventBus;
        use crate::strategy::{AdaptiveStrategy, StrategySet};
        use std::sync::Arc;

        let generator = Arc::new(MockGenerator::new(vec![]));
        let strategies = StrategySet::new().with(Arc::new(AdaptiveStrategy::new(
            generator.clone(),
            Arc::new(FixtureIndex::empty()),
            Arc::new(StubSearch::new(vec![])),
            &GeneratorConfig::default(),
        )));
        let coordinator = GenerationCoordinator::new(Arc::new(strategies));
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let emitter = bus.emitter_for("cg-test12345678");

        let monitor = QualityMonitor::new(0.8);
        // User-supplied artifacts that fail the gate
        let supplied = result("CP pendek", "ATP pendek");
        let request = ContentRequest {
            teacher: "Bu Sari".to_string(),
            school: "SMA 1".to_string(),
            subject: "matematika".to_string(),
            grade: 10,
            phase: "E".to_string(),
            topic: "aljabar".to_string(),
            sub_topic: String::new(),
            time_allocation: 90,
            model: String::new(),
            primary: Some("CP pendek".to_string()),
            secondary: Some("ATP pendek".to_string()),
        };

        let (kept, report) = monitor.gate(&coordinator, &request, 0.5, supplied, &emitter).await.unwrap();
        assert!(!report.passed);
        assert_eq!(kept.strategy, Strategy::Simple);
        assert_eq!(generator.call_count(), 0);

        // Only the assessment event goes out, no re-routing
        while let Ok(event) = rx.try_recv() {
            let json = serde_json::to_value(&event).unwrap();
            assert_ne!(json["type"], "re_routing");
        }
    }

    proptest! {
        #[test]
        fn prop_overall_confidence_in_range_and_is_min(
            retrieval in -0.5f64..=1.5,
            primary in ".{0,300}",
            secondary in ".{0,300}",
        ) {
            let monitor = QualityMonitor::new(0.8);
            let report = monitor.assess(retrieval, &result(&primary, &secondary));
            prop_assert!((0.0..=1.0).contains(&report.overall_confidence));
            prop_assert!(
                (report.overall_confidence
                    - report.retrieval_confidence.min(report.generation_confidence)).abs() < 1e-12
            );
        }
    }
}
