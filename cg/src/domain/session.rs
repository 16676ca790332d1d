//! Session aggregate and its lifecycle vocabulary

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::strategy::Strategy;

use super::analysis::TaskAnalysis;
use super::request::ContentRequest;

/// Lifecycle status of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Created,
    InputCollection,
    Processing,
    CpAtpGeneration,
    Direct,
    UserValidation,
    Refinement,
    Completed,
    Error,
}

impl SessionStatus {
    /// Terminal states admit no further transitions except Error over Completed
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Error)
    }

    /// Target progress percentage for this status
    pub fn target_progress(&self) -> u8 {
        match self {
            SessionStatus::Created => 0,
            SessionStatus::InputCollection => 10,
            SessionStatus::Processing => 20,
            SessionStatus::CpAtpGeneration | SessionStatus::Direct => 60,
            SessionStatus::Refinement => 70,
            SessionStatus::UserValidation => 80,
            SessionStatus::Completed => 100,
            SessionStatus::Error => 0,
        }
    }

    /// Human-readable step label shown to the client
    pub fn step_label(&self) -> &'static str {
        match self {
            SessionStatus::Created => "session created",
            SessionStatus::InputCollection => "collecting request input",
            SessionStatus::Processing => "analyzing request",
            SessionStatus::CpAtpGeneration => "generating curriculum artifacts",
            SessionStatus::Direct => "using supplied artifacts",
            SessionStatus::UserValidation => "awaiting user validation",
            SessionStatus::Refinement => "refining artifacts",
            SessionStatus::Completed => "completed",
            SessionStatus::Error => "error",
        }
    }
}

/// Draft content produced by one generation pass
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationResult {
    pub primary: String,
    pub secondary: String,
    pub strategy: Strategy,
    pub confidence: f64,
    pub sources: Vec<String>,
}

/// One validation verdict from the user
///
/// History is ordered and append-only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationFeedback {
    pub approved: bool,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub requested_changes: Vec<String>,
}

/// Default session time-to-live
pub(crate) const SESSION_TTL_HOURS: i64 = 24;

/// The aggregate root tracking one request's journey
///
/// Only the session store actor mutates a session; everything else reads
/// snapshots.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub status: SessionStatus,
    pub current_step: String,
    pub progress: u8,
    #[serde(default)]
    pub request: Option<ContentRequest>,
    #[serde(default)]
    pub analysis: Option<TaskAnalysis>,
    #[serde(default)]
    pub result: Option<GenerationResult>,
    #[serde(default)]
    pub validation_history: Vec<ValidationFeedback>,
    pub error_count: u32,
    #[serde(default)]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session with a TTL measured from now
    pub fn new(ttl_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            id: new_session_id(),
            status: SessionStatus::Created,
            current_step: SessionStatus::Created.step_label().to_string(),
            progress: 0,
            request: None,
            analysis: None,
            result: None,
            validation_history: Vec::new(),
            error_count: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::hours(ttl_hours),
        }
    }

    /// True once the TTL has elapsed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Apply a status transition, keeping progress monotone outside Error
    pub(crate) fn apply_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.current_step = status.step_label().to_string();
        if status != SessionStatus::Error {
            self.progress = self.progress.max(status.target_progress());
        }
        self.updated_at = Utc::now();
    }

    /// Record an error, bumping the error count
    pub(crate) fn apply_error(&mut self, message: String) {
        self.error_count += 1;
        self.last_error = Some(message);
        self.apply_status(SessionStatus::Error);
    }
}

fn new_session_id() -> String {
    let hex = Uuid::now_v7().simple().to_string();
    format!("cg-{}", &hex[..12])
}

/// How a completed session's content was produced
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    pub strategy: Strategy,
    pub confidence: f64,
    pub refinement_iterations: u32,
    pub processing_seconds: i64,
}

/// Export shape for a completed session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FinalResult {
    pub request: ContentRequest,
    pub primary_artifact: String,
    pub secondary_artifact: String,
    pub processing_metadata: ProcessingMetadata,
    pub validation_history: Vec<ValidationFeedback>,
}
