//! Strategy selector - deterministic threshold rule
//!
//! Priority order is fixed and intentional: Simple is cheapest and checked
//! first; Graph is checked before Advanced because relational intent is
//! rarer and more specific than generic complexity.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::Thresholds;
use crate::domain::{StrategyDecision, StrategyScores};
use crate::strategy::Strategy;

/// Score entry recorded for the always-available Adaptive fallback
const ADAPTIVE_BASELINE: f64 = 0.8;

/// Template score above which Simple is worth keeping as a fallback
const SIMPLE_FALLBACK_CUTOFF: f64 = 0.5;

pub struct StrategySelector {
    thresholds: Thresholds,
}

impl StrategySelector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Pick a strategy from the suitability scores
    pub fn select(&self, scores: &StrategyScores) -> StrategyDecision {
        debug!(?scores, "select: called");
        let strategy = if scores.template_matching >= self.thresholds.simple {
            Strategy::Simple
        } else if scores.graph >= self.thresholds.graph {
            Strategy::Graph
        } else if scores.advanced >= self.thresholds.advanced {
            Strategy::Advanced
        } else {
            Strategy::Adaptive
        };

        let mut score_map = BTreeMap::new();
        score_map.insert(Strategy::Simple, scores.template_matching);
        score_map.insert(Strategy::Advanced, scores.advanced);
        score_map.insert(Strategy::Graph, scores.graph);
        score_map.insert(Strategy::Adaptive, ADAPTIVE_BASELINE);

        let confidence = scores.template_matching.max(scores.advanced).max(scores.graph);

        let mut fallbacks = vec![Strategy::Adaptive];
        if scores.template_matching > SIMPLE_FALLBACK_CUTOFF && strategy != Strategy::Simple {
            fallbacks.push(Strategy::Simple);
        }

        let justification = self.justify(strategy, scores);
        debug!(%strategy, confidence, "select: decided");

        StrategyDecision {
            strategy,
            scores: score_map,
            confidence,
            fallbacks,
            justification,
        }
    }

    fn justify(&self, strategy: Strategy, scores: &StrategyScores) -> String {
        match strategy {
            Strategy::Simple => format!(
                "template matching score {:.2} meets the {:.2} threshold; close corpus examples exist",
                scores.template_matching, self.thresholds.simple
            ),
            Strategy::Graph => format!(
                "graph score {:.2} meets the {:.2} threshold; request shows relational intent",
                scores.graph, self.thresholds.graph
            ),
            Strategy::Advanced => format!(
                "advanced score {:.2} meets the {:.2} threshold; request needs multi-reference synthesis",
                scores.advanced, self.thresholds.advanced
            ),
            Strategy::Adaptive => format!(
                "no score met its threshold (template {:.2}, graph {:.2}, advanced {:.2}); falling back to adaptive",
                scores.template_matching, scores.graph, scores.advanced
            ),
        }
    }
}

impl Default for StrategySelector {
    fn default() -> Self {
        Self::new(Thresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(template: f64, graph: f64, advanced: f64) -> StrategyScores {
        StrategyScores {
            template_matching: template,
            advanced,
            graph,
        }
    }

    #[test]
    fn test_high_template_selects_simple_regardless_of_others() {
        let selector = StrategySelector::default();
        let decision = selector.select(&scores(0.9, 1.0, 1.0));
        assert_eq!(decision.strategy, Strategy::Simple);
    }

    #[test]
    fn test_graph_threshold_met_selects_graph() {
        // (simple, graph, advanced) = (0.5, 0.55, 0.4): graph wins on priority
        let selector = StrategySelector::default();
        let decision = selector.select(&scores(0.5, 0.55, 0.4));
        assert_eq!(decision.strategy, Strategy::Graph);
    }

    #[test]
    fn test_advanced_selected_when_graph_misses() {
        let selector = StrategySelector::default();
        let decision = selector.select(&scores(0.4, 0.3, 0.65));
        assert_eq!(decision.strategy, Strategy::Advanced);
    }

    #[test]
    fn test_adaptive_fallback_when_nothing_meets_threshold() {
        let selector = StrategySelector::default();
        let decision = selector.select(&scores(0.3, 0.2, 0.1));
        assert_eq!(decision.strategy, Strategy::Adaptive);
        assert!(decision.justification.contains("falling back"));
    }

    #[test]
    fn test_confidence_is_max_of_scores() {
        let selector = StrategySelector::default();
        let decision = selector.select(&scores(0.3, 0.55, 0.42));
        assert!((decision.confidence - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_list_includes_simple_when_plausible() {
        let selector = StrategySelector::default();
        let decision = selector.select(&scores(0.6, 0.55, 0.4));
        assert_eq!(decision.strategy, Strategy::Graph);
        assert_eq!(decision.fallbacks, vec![Strategy::Adaptive, Strategy::Simple]);

        let decision = selector.select(&scores(0.3, 0.55, 0.4));
        assert_eq!(decision.fallbacks, vec![Strategy::Adaptive]);
    }

    #[test]
    fn test_score_map_carries_adaptive_baseline() {
        let selector = StrategySelector::default();
        let decision = selector.select(&scores(0.3, 0.2, 0.1));
        assert_eq!(decision.scores[&Strategy::Adaptive], 0.8);
        assert_eq!(decision.scores.len(), 4);
    }

    #[test]
    fn test_custom_thresholds() {
        let selector = StrategySelector::new(Thresholds {
            simple: 0.5,
            ..Thresholds::default()
        });
        let decision = selector.select(&scores(0.55, 0.9, 0.9));
        assert_eq!(decision.strategy, Strategy::Simple);
    }
}
