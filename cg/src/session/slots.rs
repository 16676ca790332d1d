//! Processing slots - bounded concurrency with FIFO queueing
//!
//! At most `max` sessions run the processing pipeline at once. Excess
//! sessions queue in arrival order and are drained one-for-one as slots
//! free up. Callers hold this behind a mutex; nothing here is async.

use std::collections::{HashMap, VecDeque};

use tokio::task::JoinHandle;
use tracing::debug;

/// Outcome of a slot request
#[derive(Debug, PartialEq, Eq)]
pub enum SlotDecision {
    /// A slot is free; the caller should start the pipeline now
    Acquired,
    /// All slots busy; the session was appended to the queue
    Queued,
    /// The session already holds a slot or a queue position
    AlreadyActive,
}

pub struct ProcessingSlots {
    active: HashMap<String, JoinHandle<()>>,
    queue: VecDeque<String>,
    max: usize,
}

impl ProcessingSlots {
    pub fn new(max: usize) -> Self {
        Self {
            active: HashMap::new(),
            queue: VecDeque::new(),
            max: max.max(1),
        }
    }

    /// Request a slot for a session
    pub fn try_acquire(&mut self, id: &str) -> SlotDecision {
        if self.active.contains_key(id) || self.queue.iter().any(|queued| queued == id) {
            return SlotDecision::AlreadyActive;
        }
        if self.active.len() < self.max {
            debug!(%id, active = self.active.len() + 1, "try_acquire: slot granted");
            SlotDecision::Acquired
        } else {
            debug!(%id, queued = self.queue.len() + 1, "try_acquire: all slots busy, queueing");
            self.queue.push_back(id.to_string());
            SlotDecision::Queued
        }
    }

    /// Attach the pipeline task handle for an acquired slot
    pub fn attach(&mut self, id: &str, handle: JoinHandle<()>) {
        self.active.insert(id.to_string(), handle);
    }

    /// Release a session's slot, returning the next queued session id
    ///
    /// The caller must start the promoted session's pipeline and attach its
    /// handle before dropping the lock guarding this struct.
    pub fn release(&mut self, id: &str) -> Option<String> {
        self.active.remove(id);
        let next = self.queue.pop_front()?;
        debug!(released = %id, promoted = %next, "release: promoting queued session");
        Some(next)
    }

    /// Abort a session's running pipeline, if any
    ///
    /// Returns true when a task was aborted or a queue position dropped.
    pub fn cancel(&mut self, id: &str) -> bool {
        if let Some(handle) = self.active.remove(id) {
            handle.abort();
            return true;
        }
        if let Some(pos) = self.queue.iter().position(|queued| queued == id) {
            self.queue.remove(pos);
            return true;
        }
        false
    }

    /// True while the session holds a running pipeline task
    pub fn is_active(&self, id: &str) -> bool {
        self.active.contains_key(id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }
}
