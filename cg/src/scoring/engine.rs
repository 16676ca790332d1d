//! Scoring engine - complexity and per-strategy suitability scores
//!
//! All scores are pure functions of the request and the retrieved
//! snippets, clamped to [0, 1], and defined even for zero retrieval
//! results.

use std::collections::HashSet;

use tracing::debug;

use crate::backends::RetrievedDocument;
use crate::config::ScoreWeights;
use crate::domain::{
    ComplexityFactors, ComplexityLevel, ContentRequest, StrategyDecision, StrategyScores, TaskAnalysis,
};
use crate::strategy::Strategy;

/// Keywords whose presence in the topic signals complexity
const COMPLEXITY_KEYWORDS: [&str; 8] = [
    "analisis",
    "evaluasi",
    "sintesis",
    "kompleks",
    "mendalam",
    "lanjutan",
    "perbandingan",
    "penerapan",
];

/// Relational connectives counted for graph density
const RELATIONAL_CONNECTIVES: [&str; 8] = ["dan", "atau", "dengan", "terhadap", "pada", "dari", "ke", "untuk"];

/// Keywords signalling explicit relational intent
const RELATIONAL_KEYWORDS: [&str; 6] = ["hubungan", "relasi", "koneksi", "keterkaitan", "perbandingan", "konversi"];

/// Subject difficulty lookup; unknown subjects default to 0.6
fn subject_difficulty(subject: &str) -> f64 {
    match subject.trim().to_lowercase().as_str() {
        "matematika" => 0.8,
        "fisika" => 0.9,
        "kimia" => 0.85,
        "biologi" => 0.7,
        "informatika" => 0.75,
        "ekonomi" => 0.65,
        "bahasa indonesia" => 0.5,
        "bahasa inggris" => 0.6,
        "sejarah" => 0.5,
        _ => 0.6,
    }
}

/// Query word-count ceiling for the length factor
const QUERY_LENGTH_CEILING: f64 = 30.0;

/// Entity-count ceiling for the entity factor
const ENTITY_CEILING: f64 = 5.0;

/// Time-allocation ceiling in minutes
const TIME_CEILING_MINUTES: f64 = 120.0;

/// Grade ceiling (12-point school scale)
const GRADE_CEILING: f64 = 12.0;

/// Concept-count ceiling for graph density approximation
const CONCEPT_CEILING: f64 = 10.0;

/// Base processing estimate in seconds
const BASE_ESTIMATE_SECS: u64 = 30;

/// Additional estimate per missing artifact
const PER_ARTIFACT_SECS: u64 = 20;

pub struct ScoringEngine {
    weights: ScoreWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Complexity score: mean of keyword density, subject difficulty,
    /// grade factor, and time factor
    pub fn complexity(&self, request: &ContentRequest) -> (f64, ComplexityFactors) {
        let topic = format!("{} {}", request.topic, request.sub_topic).to_lowercase();
        let keyword_hits = COMPLEXITY_KEYWORDS.iter().filter(|k| topic.contains(*k)).count();
        let factors = ComplexityFactors {
            keyword_density: keyword_hits as f64 / COMPLEXITY_KEYWORDS.len() as f64,
            subject_difficulty: subject_difficulty(&request.subject),
            grade_factor: (f64::from(request.grade) / GRADE_CEILING).clamp(0.0, 1.0),
            time_factor: (f64::from(request.time_allocation) / TIME_CEILING_MINUTES).clamp(0.0, 1.0),
        };

        let score = (factors.keyword_density + factors.subject_difficulty + factors.grade_factor + factors.time_factor)
            / 4.0;
        let score = score.clamp(0.0, 1.0);
        debug!(score, ?factors, "complexity: computed");
        (score, factors)
    }

    /// Template-matching suitability: weighted mean similarity plus the
    /// top-1 vs top-2 margin
    pub fn template_matching_score(&self, docs: &[RetrievedDocument]) -> f64 {
        if docs.is_empty() {
            return 0.0;
        }
        let mean = docs.iter().map(|d| d.score).sum::<f64>() / docs.len() as f64;
        let margin = if docs.len() >= 2 { (docs[0].score - docs[1].score).max(0.0) } else { 0.0 };

        let [w_mean, w_margin] = self.weights.template;
        (w_mean * mean + w_margin * margin).clamp(0.0, 1.0)
    }

    /// Advanced suitability: query length, entity count, similarity
    /// dispersion, and query specificity
    pub fn advanced_score(&self, query: &str, docs: &[RetrievedDocument]) -> f64 {
        let words: Vec<String> = query.split_whitespace().map(|w| w.to_lowercase()).collect();
        if words.is_empty() {
            return 0.0;
        }

        let length = (words.len() as f64 / QUERY_LENGTH_CEILING).clamp(0.0, 1.0);

        // Long tokens stand in for named entities in curriculum queries
        let entities = words.iter().filter(|w| w.chars().count() > 5).collect::<HashSet<_>>().len();
        let entity = (entities as f64 / ENTITY_CEILING).clamp(0.0, 1.0);

        let dispersion = score_std_dev(docs);

        let unique = words.iter().collect::<HashSet<_>>().len();
        let specificity = unique as f64 / words.len() as f64;

        let [w_len, w_ent, w_disp, w_spec] = self.weights.advanced;
        (w_len * length + w_ent * entity + w_disp * dispersion + w_spec * specificity).clamp(0.0, 1.0)
    }

    /// Graph suitability: relational connective density, concept density,
    /// and explicit relational intent
    pub fn graph_score(&self, query: &str) -> f64 {
        let words: Vec<String> = query.split_whitespace().map(|w| w.to_lowercase()).collect();
        if words.is_empty() {
            return 0.0;
        }

        let connective_count = words.iter().filter(|w| RELATIONAL_CONNECTIVES.contains(&w.as_str())).count();
        let relational_density = connective_count as f64 / words.len() as f64;

        let concepts = words
            .iter()
            .filter(|w| !RELATIONAL_CONNECTIVES.contains(&w.as_str()))
            .collect::<HashSet<_>>()
            .len();
        let concept_density = (concepts as f64 / CONCEPT_CEILING).clamp(0.0, 1.0);

        let query_lower = query.to_lowercase();
        let intent = if RELATIONAL_KEYWORDS.iter().any(|k| query_lower.contains(k)) { 1.0 } else { 0.0 };

        let [w_rel, w_con, w_int] = self.weights.graph;
        (w_rel * relational_density + w_con * concept_density + w_int * intent).clamp(0.0, 1.0)
    }

    /// All three suitability scores for a request
    pub fn score(&self, request: &ContentRequest, docs: &[RetrievedDocument]) -> StrategyScores {
        let query = request.query();
        let scores = StrategyScores {
            template_matching: self.template_matching_score(docs),
            advanced: self.advanced_score(&query, docs),
            graph: self.graph_score(&query),
        };
        debug!(?scores, "score: computed suitability scores");
        scores
    }

    /// Assemble the read-only analysis for a request
    pub fn analyze(&self, request: &ContentRequest, scores: StrategyScores, decision: &StrategyDecision) -> TaskAnalysis {
        debug!(strategy = %decision.strategy, "analyze: called");
        let (complexity_score, factors) = self.complexity(request);
        let complexity_level = ComplexityLevel::from_score(complexity_score);
        let missing = request.missing_artifacts();

        let confidence = scores
            .template_matching
            .min(scores.advanced)
            .min(scores.graph)
            .min(1.0 - 0.2 * missing.len() as f64)
            .clamp(0.0, 1.0);

        let estimated_seconds = estimate_seconds(complexity_level, missing.len(), decision.strategy);

        TaskAnalysis {
            complexity_level,
            complexity_score,
            factors,
            scores,
            missing_artifacts: missing,
            strategy: decision.strategy,
            confidence,
            estimated_seconds,
        }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScoreWeights::default())
    }
}

/// Population standard deviation of retrieval scores, 0 for short inputs
fn score_std_dev(docs: &[RetrievedDocument]) -> f64 {
    if docs.len() < 2 {
        return 0.0;
    }
    let mean = docs.iter().map(|d| d.score).sum::<f64>() / docs.len() as f64;
    let variance = docs.iter().map(|d| (d.score - mean).powi(2)).sum::<f64>() / docs.len() as f64;
    variance.sqrt()
}

/// Rough wall-clock estimate for the processing pipeline
fn estimate_seconds(level: ComplexityLevel, missing_count: usize, strategy: Strategy) -> u64 {
    let complexity_bump = match level {
        ComplexityLevel::Simple => 0,
        ComplexityLevel::Medium => 15,
        ComplexityLevel::Complex => 30,
    };
    let strategy_bump = match strategy {
        Strategy::Simple => 0,
        Strategy::Advanced => 20,
        Strategy::Graph => 40,
        Strategy::Adaptive => 60,
    };
    BASE_ESTIMATE_SECS + complexity_bump + PER_ARTIFACT_SECS * missing_count as u64 + strategy_bump
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::Strategy;
    use proptest::prelude::*;

    fn request(subject: &str, grade: u8, topic: &str, minutes: u32) -> ContentRequest {
        ContentRequest {
            teacher: "Bu Sari".to_string(),
            school: "SMA 1".to_string(),
            subject: subject.to_string(),
            grade,
            phase: "E".to_string(),
            topic: topic.to_string(),
            sub_topic: String::new(),
            time_allocation: minutes,
            model: String::new(),
            primary: None,
            secondary: None,
        }
    }

    fn docs(scores: &[f64]) -> Vec<RetrievedDocument> {
        scores
            .iter()
            .enumerate()
            .map(|(i, s)| RetrievedDocument::new(format!("doc {}", i), format!("src {}", i), *s))
            .collect()
    }

    #[test]
    fn test_complexity_uses_all_four_factors() {
        let engine = ScoringEngine::default();
        let (score, factors) = engine.complexity(&request("fisika", 12, "analisis mendalam gerak", 120));
        assert_eq!(factors.keyword_density, 2.0 / 8.0);
        assert_eq!(factors.subject_difficulty, 0.9);
        assert_eq!(factors.grade_factor, 1.0);
        assert_eq!(factors.time_factor, 1.0);
        let expected = (0.25 + 0.9 + 1.0 + 1.0) / 4.0;
        assert!((score - expected).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_subject_defaults() {
        let engine = ScoringEngine::default();
        let (_, factors) = engine.complexity(&request("astronomi", 10, "tata surya", 90));
        assert_eq!(factors.subject_difficulty, 0.6);
    }

    #[test]
    fn test_complexity_levels() {
        assert_eq!(ComplexityLevel::from_score(0.2), ComplexityLevel::Simple);
        assert_eq!(ComplexityLevel::from_score(0.5), ComplexityLevel::Medium);
        assert_eq!(ComplexityLevel::from_score(0.8), ComplexityLevel::Complex);
    }

    #[test]
    fn test_template_score_formula() {
        let engine = ScoringEngine::default();
        let score = engine.template_matching_score(&docs(&[0.9, 0.5]));
        // 0.8 * mean(0.7) + 0.2 * margin(0.4)
        assert!((score - (0.8 * 0.7 + 0.2 * 0.4)).abs() < 1e-9);
    }

    #[test]
    fn test_template_score_single_doc_has_no_margin() {
        let engine = ScoringEngine::default();
        let score = engine.template_matching_score(&docs(&[0.9]));
        assert!((score - 0.8 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_zero_results_degrade_to_zero() {
        let engine = ScoringEngine::default();
        assert_eq!(engine.template_matching_score(&[]), 0.0);
        assert_eq!(engine.advanced_score("", &[]), 0.0);
        assert_eq!(engine.graph_score(""), 0.0);
        // A real query with no docs still scores, dispersion degrades to 0
        assert!(engine.advanced_score("matematika aljabar linear", &[]) > 0.0);
    }

    #[test]
    fn test_graph_score_detects_relational_intent() {
        let engine = ScoringEngine::default();
        let relational = engine.graph_score("hubungan mol dan konsentrasi larutan");
        let plain = engine.graph_score("mol konsentrasi larutan");
        assert!(relational > plain);
        // Intent keyword contributes its full 0.2 weight
        assert!(relational >= 0.2);
    }

    #[test]
    fn test_advanced_score_rewards_longer_queries() {
        let engine = ScoringEngine::default();
        let short = engine.advanced_score("aljabar", &[]);
        let long = engine.advanced_score(
            "analisis penerapan persamaan diferensial dalam pemodelan pertumbuhan populasi dengan metode numerik",
            &[],
        );
        assert!(long > short);
    }

    #[test]
    fn test_estimate_seconds() {
        assert_eq!(estimate_seconds(ComplexityLevel::Simple, 0, Strategy::Simple), 30);
        assert_eq!(estimate_seconds(ComplexityLevel::Medium, 2, Strategy::Graph), 30 + 15 + 40 + 40);
        assert_eq!(estimate_seconds(ComplexityLevel::Complex, 1, Strategy::Adaptive), 30 + 30 + 20 + 60);
    }

    proptest! {
        #[test]
        fn prop_template_score_in_range(scores in proptest::collection::vec(0.0f64..=1.0, 0..10)) {
            let engine = ScoringEngine::default();
            let s = engine.template_matching_score(&docs(&scores));
            prop_assert!((0.0..=1.0).contains(&s));
        }

        #[test]
        fn prop_advanced_score_in_range(
            query in "[a-z ]{0,200}",
            scores in proptest::collection::vec(0.0f64..=1.0, 0..10),
        ) {
            let engine = ScoringEngine::default();
            let s = engine.advanced_score(&query, &docs(&scores));
            prop_assert!((0.0..=1.0).contains(&s));
        }

        #[test]
        fn prop_graph_score_in_range(query in "[a-z ]{0,200}") {
            let engine = ScoringEngine::default();
            let s = engine.graph_score(&query);
            prop_assert!((0.0..=1.0).contains(&s));
        }

        #[test]
        fn prop_complexity_in_range(grade in 1u8..=12, minutes in 1u32..=600, topic in "[a-z ]{1,80}") {
            let engine = ScoringEngine::default();
            let (score, _) = engine.complexity(&request("matematika", grade, &topic, minutes));
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
