//! Event Logger - persists events to JSONL files
//!
//! The EventLogger subscribes to the EventBus and writes all events to
//! per-session JSONL files for history, debugging, and replay.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use super::bus::EventBus;
use super::types::{EventData, SessionEvent};

/// Event logger that writes events to JSONL files
///
/// Events are written to `{sessions_dir}/{session-id}/events.jsonl`
pub struct EventLogger {
    /// Base directory for session data
    sessions_dir: PathBuf,
    /// Open file writers per session
    writers: HashMap<String, BufWriter<File>>,
}

impl EventLogger {
    /// Create a new event logger
    pub fn new(sessions_dir: impl AsRef<Path>) -> Self {
        let sessions_dir = sessions_dir.as_ref().to_path_buf();
        debug!(?sessions_dir, "EventLogger::new: creating logger");
        Self {
            sessions_dir,
            writers: HashMap::new(),
        }
    }

    /// Create a logger under the platform data dir (~/.local/share/curricula/sessions)
    pub fn with_default_path() -> eyre::Result<Self> {
        let data = dirs::data_dir().ok_or_else(|| eyre::eyre!("Could not determine data directory"))?;
        let sessions_dir = data.join("curricula").join("sessions");
        fs::create_dir_all(&sessions_dir)?;
        Ok(Self::new(sessions_dir))
    }

    /// Write an event to its session's log file
    pub fn write_event(&mut self, event: &SessionEvent) -> eyre::Result<()> {
        let session_id = event.session_id.as_str();
        debug!(%session_id, event_type = event.event_type(), "EventLogger::write_event");

        // Get or create writer for this session
        if !self.writers.contains_key(session_id) {
            let session_dir = self.sessions_dir.join(session_id);
            fs::create_dir_all(&session_dir)?;

            let log_path = session_dir.join("events.jsonl");
            debug!(?log_path, "EventLogger: creating new log file");

            let file = OpenOptions::new().create(true).append(true).open(&log_path)?;
            self.writers.insert(session_id.to_string(), BufWriter::new(file));
        }
        let writer = self
            .writers
            .get_mut(session_id)
            .ok_or_else(|| eyre::eyre!("writer vanished for session {session_id}"))?;

        let json = serde_json::to_string(event)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        Ok(())
    }

    /// Close writer for a session (when it reaches a terminal state)
    pub fn close_session(&mut self, session_id: &str) {
        debug!(%session_id, "EventLogger::close_session");
        if let Some(mut writer) = self.writers.remove(session_id) {
            let _ = writer.flush();
        }
    }

    /// Run the logger, consuming events from the bus until shutdown
    ///
    /// This is meant to be spawned as a background task.
    pub async fn run(mut self, event_bus: Arc<EventBus>) {
        debug!("EventLogger::run: starting event logger");
        let mut rx = event_bus.subscribe();

        loop {
            match rx.recv().await {
                Ok(event) => {
                    let session_id = event.session_id.clone();
                    let is_terminal = matches!(event.data, EventData::FinalResult { .. } | EventData::Error { .. });

                    if let Err(e) = self.write_event(&event) {
                        error!(%session_id, error = %e, "EventLogger: failed to write event");
                    }

                    if is_terminal {
                        self.close_session(&session_id);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "EventLogger: lagged behind, missed events");
                    // Continue processing - we'll catch up
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("EventLogger: channel closed, shutting down");
                    break;
                }
            }
        }

        // Flush all remaining writers
        for (session_id, mut writer) in self.writers.drain() {
            debug!(%session_id, "EventLogger: flushing writer on shutdown");
            let _ = writer.flush();
        }
    }
}

/// Read events from a session's log file
pub fn read_session_events(sessions_dir: impl AsRef<Path>, session_id: &str) -> eyre::Result<Vec<SessionEvent>> {
    let log_path = sessions_dir.as_ref().join(session_id).join("events.jsonl");
    debug!(?log_path, "read_session_events: reading log file");

    if !log_path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(&log_path)?;
    let mut entries = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SessionEvent>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(line, error = %e, "read_session_events: failed to parse line");
            }
        }
    }

    debug!(count = entries.len(), "read_session_events: loaded entries");
    Ok(entries)
}

/// Spawn the event logger as a background task
pub fn spawn_event_logger(event_bus: Arc<EventBus>) -> eyre::Result<tokio::task::JoinHandle<()>> {
    let logger = EventLogger::with_default_path()?;
    Ok(tokio::spawn(async move {
        logger.run(event_bus).await;
    }))
}
