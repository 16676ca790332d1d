//! Session store messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use crate::domain::{ContentRequest, GenerationResult, Session, SessionStatus, TaskAnalysis, ValidationFeedback};

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Request rejected, missing fields: {0:?}")]
    InvalidRequest(Vec<String>),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Session already processing: {0}")]
    AlreadyProcessing(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from session operations
pub type SessionResponse<T> = Result<T, SessionError>;

/// Commands sent to the SessionStore actor
#[derive(Debug)]
pub enum SessionCommand {
    Create {
        ttl_hours: i64,
        reply: oneshot::Sender<SessionResponse<Session>>,
    },
    Get {
        id: String,
        reply: oneshot::Sender<SessionResponse<Option<Session>>>,
    },
    List {
        reply: oneshot::Sender<SessionResponse<Vec<Session>>>,
    },
    SubmitRequest {
        id: String,
        request: ContentRequest,
        reply: oneshot::Sender<SessionResponse<Session>>,
    },
    Transition {
        id: String,
        status: SessionStatus,
        reply: oneshot::Sender<SessionResponse<Session>>,
    },
    MarkQueued {
        id: String,
        reply: oneshot::Sender<SessionResponse<Session>>,
    },
    SetAnalysis {
        id: String,
        analysis: TaskAnalysis,
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    SetResult {
        id: String,
        result: GenerationResult,
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    AppendValidation {
        id: String,
        feedback: ValidationFeedback,
        reply: oneshot::Sender<SessionResponse<Session>>,
    },
    RecordError {
        id: String,
        message: String,
        reply: oneshot::Sender<SessionResponse<Session>>,
    },
    Delete {
        id: String,
        reply: oneshot::Sender<SessionResponse<()>>,
    },
    SweepExpired {
        reply: oneshot::Sender<SessionResponse<Vec<String>>>,
    },
    Shutdown,
}
