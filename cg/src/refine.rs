//! Refinement loop - bounded generate/validate/refine cycling
//!
//! Each rejection classifies the feedback text, moves the strategy along
//! the fixed cycle [Simple, Advanced, Graph], regenerates with the prior
//! artifacts and feedback as context, and bumps confidence. The loop is
//! bounded; exhaustion fails open by accepting the last result.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::{ContentRequest, GenerationResult, ValidationFeedback};
use crate::events::EventEmitter;
use crate::generation::{GenerationCoordinator, GenerationFailure};
use crate::strategy::Strategy;

/// Fixed confidence increment per refinement, capped at 1.0
const CONFIDENCE_INCREMENT: f64 = 0.1;

/// Direction extracted from feedback text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackSignal {
    /// The user wants more detail
    MoreDetail,
    /// The user wants a simpler, shorter result
    MoreBrevity,
    /// No directional signal
    Neutral,
}

/// Pluggable feedback classification
///
/// The keyword implementation below can be swapped for a model-based
/// classifier without touching the loop control flow.
pub trait FeedbackClassifier: Send + Sync {
    fn classify(&self, feedback: &str) -> FeedbackSignal;
}

/// Keyword-presence classifier
pub struct KeywordClassifier {
    detail_keywords: Vec<String>,
    brevity_keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new(detail_keywords: Vec<String>, brevity_keywords: Vec<String>) -> Self {
        Self {
            detail_keywords,
            brevity_keywords,
        }
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(
            ["detail", "lengkap", "spesifik", "mendalam", "komprehensif"]
                .map(String::from)
                .to_vec(),
            ["sederhana", "singkat", "ringkas", "simple", "basic"].map(String::from).to_vec(),
        )
    }
}

impl FeedbackClassifier for KeywordClassifier {
    fn classify(&self, feedback: &str) -> FeedbackSignal {
        let lower = feedback.to_lowercase();
        // Detail wins ties; a request for "ringkas tapi lengkap" leans detail
        if self.detail_keywords.iter().any(|k| lower.contains(k.as_str())) {
            FeedbackSignal::MoreDetail
        } else if self.brevity_keywords.iter().any(|k| lower.contains(k.as_str())) {
            FeedbackSignal::MoreBrevity
        } else {
            FeedbackSignal::Neutral
        }
    }
}

/// Result of one refinement step
pub enum IterationResult {
    /// A regenerated result to put back in front of the user
    Refined(GenerationResult),
    /// The bound was reached; accept the prior result as final
    Exhausted,
}

/// Per-session refinement state
///
/// The loop is driven externally: the session machine calls [`Self::refine`]
/// once per rejected validation.
pub struct RefinementLoop {
    coordinator: Arc<GenerationCoordinator>,
    classifier: Arc<dyn FeedbackClassifier>,
    max_iterations: u32,
    iteration: u32,
    strategy: Strategy,
}

impl RefinementLoop {
    pub fn new(
        coordinator: Arc<GenerationCoordinator>,
        classifier: Arc<dyn FeedbackClassifier>,
        max_iterations: u32,
        initial_strategy: Strategy,
    ) -> Self {
        Self {
            coordinator,
            classifier,
            max_iterations,
            iteration: 0,
            strategy: initial_strategy,
        }
    }

    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// True once no further refinement will run
    pub fn exhausted(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    /// Run one refinement step for a rejected validation
    pub async fn refine(
        &mut self,
        request: &ContentRequest,
        prior: &GenerationResult,
        feedback: &ValidationFeedback,
        emitter: &EventEmitter,
    ) -> Result<IterationResult, GenerationFailure> {
        debug!(iteration = self.iteration, max = self.max_iterations, "refine: called");
        if self.exhausted() {
            info!(iterations = self.iteration, "refine: bound reached, accepting last result");
            return Ok(IterationResult::Exhausted);
        }

        let feedback_text = feedback_text(feedback);
        let signal = self.classifier.classify(&feedback_text);
        let next = match signal {
            FeedbackSignal::MoreDetail => self.strategy.advance(),
            FeedbackSignal::MoreBrevity => self.strategy.retreat(),
            FeedbackSignal::Neutral => self.strategy.next_cyclic(),
        };
        debug!(?signal, from = %self.strategy, to = %next, "refine: strategy transition");
        if next != self.strategy {
            emitter.re_routing(self.strategy, next, "user feedback");
        }
        self.strategy = next;

        let mut refined = self.coordinator.refine(request, next, prior, &feedback_text, emitter).await?;
        refined.confidence = (prior.confidence + CONFIDENCE_INCREMENT).min(1.0);

        self.iteration += 1;
        emitter.generation_completed(refined.strategy, refined.confidence);
        Ok(IterationResult::Refined(refined))
    }
}

fn feedback_text(feedback: &ValidationFeedback) -> String {
    let mut parts: Vec<String> = Vec::new();
    if let Some(text) = &feedback.feedback {
        parts.push(text.clone());
    }
    parts.extend(feedback.requested_changes.iter().cloned());
    parts.join("\n")
}
