//! Task analysis and strategy decision types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::strategy::Strategy;

/// Complexity bucket derived from the complexity score
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Simple,
    Medium,
    Complex,
}

impl ComplexityLevel {
    /// Bucket a score: <0.3 simple, <0.7 medium, else complex
    pub fn from_score(score: f64) -> Self {
        if score < 0.3 {
            ComplexityLevel::Simple
        } else if score < 0.7 {
            ComplexityLevel::Medium
        } else {
            ComplexityLevel::Complex
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplexityLevel::Simple => "simple",
            ComplexityLevel::Medium => "medium",
            ComplexityLevel::Complex => "complex",
        }
    }
}

/// The four sub-scores that average into the complexity score
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct ComplexityFactors {
    pub keyword_density: f64,
    pub subject_difficulty: f64,
    pub grade_factor: f64,
    pub time_factor: f64,
}

/// Per-strategy suitability scores, each clamped to [0, 1]
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct StrategyScores {
    pub template_matching: f64,
    pub advanced: f64,
    pub graph: f64,
}

/// Read-only analysis of a request, created once and never mutated
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskAnalysis {
    pub complexity_level: ComplexityLevel,
    pub complexity_score: f64,
    pub factors: ComplexityFactors,
    pub scores: StrategyScores,
    pub missing_artifacts: Vec<String>,
    pub strategy: Strategy,
    pub confidence: f64,
    pub estimated_seconds: u64,
}

/// Outcome of strategy selection
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StrategyDecision {
    pub strategy: Strategy,
    /// Score per candidate strategy, including the Adaptive constant
    pub scores: BTreeMap<Strategy, f64>,
    /// Max of the three computed suitability scores
    pub confidence: f64,
    /// Ordered substitutes if the selected strategy underperforms
    pub fallbacks: Vec<Strategy>,
    pub justification: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complexity_level_buckets() {
        assert_eq!(ComplexityLevel::from_score(0.0), ComplexityLevel::Simple);
        assert_eq!(ComplexityLevel::from_score(0.29), ComplexityLevel::Simple);
        assert_eq!(ComplexityLevel::from_score(0.3), ComplexityLevel::Medium);
        assert_eq!(ComplexityLevel::from_score(0.69), ComplexityLevel::Medium);
        assert_eq!(ComplexityLevel::from_score(0.7), ComplexityLevel::Complex);
        assert_eq!(ComplexityLevel::from_score(1.0), ComplexityLevel::Complex);
    }

    #[test]
    fn test_task_analysis_serialization_round_trip() {
        let analysis = TaskAnalysis {
            complexity_level: ComplexityLevel::Medium,
            complexity_score: 0.55,
            factors: ComplexityFactors {
                keyword_density: 0.2,
                subject_difficulty: 0.8,
                grade_factor: 0.83,
                time_factor: 0.75,
            },
            scores: StrategyScores {
                template_matching: 0.4,
                advanced: 0.6,
                graph: 0.3,
            },
            missing_artifacts: vec!["cp".to_string(), "atp".to_string()],
            strategy: Strategy::Advanced,
            confidence: 0.6,
            estimated_seconds: 85,
        };

        let json = serde_json::to_string(&analysis).unwrap();
        let back: TaskAnalysis = serde_json::from_str(&json).unwrap();
        assert_eq!(back.complexity_level, ComplexityLevel::Medium);
        assert_eq!(back.strategy, Strategy::Advanced);
        assert_eq!(back.missing_artifacts.len(), 2);
    }
}
