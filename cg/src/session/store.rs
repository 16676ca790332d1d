//! SessionStore - actor that owns the session registry
//!
//! Processes commands via channels so every read-modify-write on a session
//! is atomic. The registry is the only cross-session shared mutable state;
//! nothing else mutates a Session.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::domain::{ContentRequest, GenerationResult, Session, SessionStatus, TaskAnalysis, ValidationFeedback};

use super::messages::{SessionCommand, SessionError, SessionResponse};

/// Handle to send commands to the SessionStore actor
#[derive(Clone)]
pub struct SessionStore {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionStore {
    /// Spawn a new SessionStore actor
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(actor_loop(rx));
        info!("SessionStore spawned");
        Self { tx }
    }

    async fn send<T>(
        &self,
        command: SessionCommand,
        reply_rx: oneshot::Receiver<SessionResponse<T>>,
    ) -> SessionResponse<T> {
        self.tx.send(command).await.map_err(|_| SessionError::ChannelError)?;
        reply_rx.await.map_err(|_| SessionError::ChannelError)?
    }

    /// Create a fresh session
    pub async fn create(&self, ttl_hours: i64) -> SessionResponse<Session> {
        debug!(ttl_hours, "create: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::Create { ttl_hours, reply: reply_tx }, reply_rx).await
    }

    /// Get a session snapshot; expired sessions are unreachable
    pub async fn get(&self, id: &str) -> SessionResponse<Option<Session>> {
        debug!(%id, "get: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(
            SessionCommand::Get {
                id: id.to_string(),
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Get a session, returning an error if absent or expired
    pub async fn get_required(&self, id: &str) -> Result<Session, SessionError> {
        debug!(%id, "get_required: called");
        self.get(id).await?.ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// List all live sessions
    pub async fn list(&self) -> SessionResponse<Vec<Session>> {
        debug!("list: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::List { reply: reply_tx }, reply_rx).await
    }

    /// Attach a request and move the session into input collection
    pub async fn submit_request(&self, id: &str, request: ContentRequest) -> SessionResponse<Session> {
        debug!(%id, "submit_request: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(
            SessionCommand::SubmitRequest {
                id: id.to_string(),
                request,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Apply a status transition
    pub async fn transition(&self, id: &str, status: SessionStatus) -> SessionResponse<Session> {
        debug!(%id, ?status, "transition: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(
            SessionCommand::Transition {
                id: id.to_string(),
                status,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Mark a session as waiting for a free processing slot
    pub async fn mark_queued(&self, id: &str) -> SessionResponse<Session> {
        debug!(%id, "mark_queued: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(
            SessionCommand::MarkQueued {
                id: id.to_string(),
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Store the task analysis
    pub async fn set_analysis(&self, id: &str, analysis: TaskAnalysis) -> SessionResponse<()> {
        debug!(%id, "set_analysis: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(
            SessionCommand::SetAnalysis {
                id: id.to_string(),
                analysis,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Store the current generation result
    pub async fn set_result(&self, id: &str, result: GenerationResult) -> SessionResponse<()> {
        debug!(%id, "set_result: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(
            SessionCommand::SetResult {
                id: id.to_string(),
                result,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Append validation feedback; only legal in USER_VALIDATION
    pub async fn append_validation(&self, id: &str, feedback: ValidationFeedback) -> SessionResponse<Session> {
        debug!(%id, approved = feedback.approved, "append_validation: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(
            SessionCommand::AppendValidation {
                id: id.to_string(),
                feedback,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Record an error and transition to ERROR
    pub async fn record_error(&self, id: &str, message: impl Into<String>) -> SessionResponse<Session> {
        let message = message.into();
        debug!(%id, %message, "record_error: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(
            SessionCommand::RecordError {
                id: id.to_string(),
                message,
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Delete a session
    pub async fn delete(&self, id: &str) -> SessionResponse<()> {
        debug!(%id, "delete: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(
            SessionCommand::Delete {
                id: id.to_string(),
                reply: reply_tx,
            },
            reply_rx,
        )
        .await
    }

    /// Remove all expired sessions, returning their ids
    pub async fn sweep_expired(&self) -> SessionResponse<Vec<String>> {
        debug!("sweep_expired: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(SessionCommand::SweepExpired { reply: reply_tx }, reply_rx).await
    }

    /// Stop the actor
    pub async fn shutdown(&self) {
        let _ = self.tx.send(SessionCommand::Shutdown).await;
    }
}

async fn actor_loop(mut rx: mpsc::Receiver<SessionCommand>) {
    debug!("actor_loop: started");
    let mut sessions: HashMap<String, Session> = HashMap::new();

    while let Some(command) = rx.recv().await {
        match command {
            SessionCommand::Create { ttl_hours, reply } => {
                let session = Session::new(ttl_hours);
                debug!(id = %session.id, "actor_loop: created session");
                sessions.insert(session.id.clone(), session.clone());
                let _ = reply.send(Ok(session));
            }
            SessionCommand::Get { id, reply } => {
                let _ = reply.send(Ok(get_live(&mut sessions, &id)));
            }
            SessionCommand::List { reply } => {
                let now = Utc::now();
                sessions.retain(|_, s| !s.is_expired(now));
                let _ = reply.send(Ok(sessions.values().cloned().collect()));
            }
            SessionCommand::SubmitRequest { id, request, reply } => {
                let _ = reply.send(submit_request(&mut sessions, &id, request));
            }
            SessionCommand::Transition { id, status, reply } => {
                let _ = reply.send(transition(&mut sessions, &id, status));
            }
            SessionCommand::MarkQueued { id, reply } => {
                let _ = reply.send(mark_queued(&mut sessions, &id));
            }
            SessionCommand::SetAnalysis { id, analysis, reply } => {
                let _ = reply.send(with_session(&mut sessions, &id, |s| {
                    s.analysis = Some(analysis);
                    s.updated_at = Utc::now();
                }));
            }
            SessionCommand::SetResult { id, result, reply } => {
                let _ = reply.send(with_session(&mut sessions, &id, |s| {
                    s.result = Some(result);
                    s.updated_at = Utc::now();
                }));
            }
            SessionCommand::AppendValidation { id, feedback, reply } => {
                let _ = reply.send(append_validation(&mut sessions, &id, feedback));
            }
            SessionCommand::RecordError { id, message, reply } => {
                let _ = reply.send(record_error(&mut sessions, &id, message));
            }
            SessionCommand::Delete { id, reply } => {
                let result = if sessions.remove(&id).is_some() {
                    Ok(())
                } else {
                    Err(SessionError::NotFound(id))
                };
                let _ = reply.send(result);
            }
            SessionCommand::SweepExpired { reply } => {
                let now = Utc::now();
                let expired: Vec<String> = sessions
                    .values()
                    .filter(|s| s.is_expired(now))
                    .map(|s| s.id.clone())
                    .collect();
                for id in &expired {
                    sessions.remove(id);
                }
                if !expired.is_empty() {
                    info!(count = expired.len(), "actor_loop: swept expired sessions");
                }
                let _ = reply.send(Ok(expired));
            }
            SessionCommand::Shutdown => {
                debug!("actor_loop: shutdown");
                break;
            }
        }
    }
}

/// Get a session if it exists and has not expired; expired entries are
/// dropped on access
fn get_live(sessions: &mut HashMap<String, Session>, id: &str) -> Option<Session> {
    let expired = sessions.get(id).is_some_and(|s| s.is_expired(Utc::now()));
    if expired {
        debug!(%id, "get_live: session expired, removing");
        sessions.remove(id);
        return None;
    }
    sessions.get(id).cloned()
}

fn with_session<F>(sessions: &mut HashMap<String, Session>, id: &str, mutate: F) -> SessionResponse<()>
where
    F: FnOnce(&mut Session),
{
    let session = sessions.get_mut(id).ok_or_else(|| SessionError::NotFound(id.to_string()))?;
    mutate(session);
    Ok(())
}

fn submit_request(
    sessions: &mut HashMap<String, Session>,
    id: &str,
    request: ContentRequest,
) -> SessionResponse<Session> {
    let session = sessions.get_mut(id).ok_or_else(|| SessionError::NotFound(id.to_string()))?;
    if !matches!(session.status, SessionStatus::Created | SessionStatus::InputCollection) {
        return Err(SessionError::InvalidState(format!(
            "cannot submit a request while {:?}",
            session.status
        )));
    }
    session.request = Some(request);
    session.apply_status(SessionStatus::InputCollection);
    Ok(session.clone())
}

fn transition(sessions: &mut HashMap<String, Session>, id: &str, status: SessionStatus) -> SessionResponse<Session> {
    let session = sessions.get_mut(id).ok_or_else(|| SessionError::NotFound(id.to_string()))?;

    // Terminal states are final, with one exception: an ERROR transition
    // wins a race against COMPLETED, never the other way around.
    if session.status.is_terminal() {
        let error_over_completed = session.status == SessionStatus::Completed && status == SessionStatus::Error;
        if !error_over_completed {
            return Err(SessionError::InvalidState(format!(
                "cannot transition from {:?} to {:?}",
                session.status, status
            )));
        }
    }

    session.apply_status(status);
    Ok(session.clone())
}

fn mark_queued(sessions: &mut HashMap<String, Session>, id: &str) -> SessionResponse<Session> {
    let session = sessions.get_mut(id).ok_or_else(|| SessionError::NotFound(id.to_string()))?;
    session.current_step = "queued for processing".to_string();
    session.updated_at = Utc::now();
    Ok(session.clone())
}

fn append_validation(
    sessions: &mut HashMap<String, Session>,
    id: &str,
    feedback: ValidationFeedback,
) -> SessionResponse<Session> {
    let session = sessions.get_mut(id).ok_or_else(|| SessionError::NotFound(id.to_string()))?;
    if session.status != SessionStatus::UserValidation {
        return Err(SessionError::InvalidState(format!(
            "validation feedback only accepted in USER_VALIDATION, session is {:?}",
            session.status
        )));
    }
    session.validation_history.push(feedback);
    session.updated_at = Utc::now();
    Ok(session.clone())
}

fn record_error(sessions: &mut HashMap<String, Session>, id: &str, message: String) -> SessionResponse<Session> {
    let session = sessions.get_mut(id).ok_or_else(|| SessionError::NotFound(id.to_string()))?;
    session.apply_error(message);
    Ok(session.clone())
}
