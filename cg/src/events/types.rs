//! Event types for session activity streaming
//!
//! Every observable step of a session emits one of these events:
//! - analysis and strategy selection
//! - generation lifecycle (start, progress, complete)
//! - validation and quality gating
//! - re-routing, final result, errors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::FinalResult;
use crate::strategy::Strategy;

/// Core event enum - the vocabulary of session activity
///
/// Serialized payload rides under `data`, discriminated by `type`, so the
/// wire shape of a full [`SessionEvent`] is
/// `{type, session_id, timestamp, data}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventData {
    /// Task analysis finished for the session's request
    TaskAnalysisComplete {
        complexity_level: String,
        complexity_score: f64,
        strategy: Strategy,
        estimated_seconds: u64,
    },
    /// A strategy was selected
    StrategySelectionComplete {
        strategy: Strategy,
        confidence: f64,
        justification: String,
    },
    /// Generation has started
    GenerationStarted {
        strategy: Strategy,
        artifacts: Vec<String>,
    },
    /// A generation step finished
    GenerationProgress { step: String, progress: u8 },
    /// Generation produced a full draft
    GenerationCompleted { strategy: Strategy, confidence: f64 },
    /// The draft awaits user validation
    ValidationRequired { iteration: u32 },
    /// Quality gate evaluation
    QualityMonitoring {
        retrieval_confidence: f64,
        generation_confidence: f64,
        overall_confidence: f64,
        passed: bool,
    },
    /// Low confidence triggered a strategy substitution
    ReRouting {
        from: Strategy,
        to: Strategy,
        reason: String,
    },
    /// The session completed with a final result
    FinalResult { result: Box<FinalResult> },
    /// An error occurred
    Error { context: String, message: String },
}

impl EventData {
    /// Get the wire type name
    pub fn event_type(&self) -> &'static str {
        match self {
            EventData::TaskAnalysisComplete { .. } => "task_analysis_complete",
            EventData::StrategySelectionComplete { .. } => "strategy_selection_complete",
            EventData::GenerationStarted { .. } => "generation_started",
            EventData::GenerationProgress { .. } => "generation_progress",
            EventData::GenerationCompleted { .. } => "generation_completed",
            EventData::ValidationRequired { .. } => "validation_required",
            EventData::QualityMonitoring { .. } => "quality_monitoring",
            EventData::ReRouting { .. } => "re_routing",
            EventData::FinalResult { .. } => "final_result",
            EventData::Error { .. } => "error",
        }
    }
}

/// A session event as delivered to subscribers and live channels
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionEvent {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub data: EventData,
}

impl SessionEvent {
    /// Wrap payload data with the session id and a timestamp of now
    pub fn new(session_id: impl Into<String>, data: EventData) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp: Utc::now(),
            data,
        }
    }

    /// Get the wire type name
    pub fn event_type(&self) -> &'static str {
        self.data.event_type()
    }
}
