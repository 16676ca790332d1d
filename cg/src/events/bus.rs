//! Event Bus - central pub/sub system for session events
//!
//! The EventBus uses tokio broadcast channels to deliver events to all
//! subscribers with minimal latency. Components emit events, consumers
//! (live channels, the JSONL logger) subscribe.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::FinalResult;
use crate::strategy::Strategy;

use super::types::{EventData, SessionEvent};

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 10_000;

/// Central event bus for session activity streaming
///
/// Every significant session transition emits an event to this bus.
/// All consumers (live channel bridges, the file logger) subscribe.
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
    #[allow(dead_code)]
    channel_capacity: usize,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            channel_capacity: capacity,
        }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// This is fire-and-forget: if there are no subscribers, the event is
    /// dropped. If the channel is full, oldest events are dropped.
    pub fn emit(&self, event: SessionEvent) {
        debug!(
            event_type = event.event_type(),
            session_id = %event.session_id,
            "EventBus::emit"
        );
        // Ignore send errors (no subscribers is OK)
        let _ = self.tx.send(event);
    }

    /// Subscribe to receive events
    ///
    /// Returns a receiver that will receive all events emitted after
    /// subscription. Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter handle for a specific session
    ///
    /// The emitter provides convenience methods for emitting events and
    /// automatically includes the session ID.
    pub fn emitter_for(&self, session_id: impl Into<String>) -> EventEmitter {
        let session_id = session_id.into();
        debug!(%session_id, "EventBus::emitter_for: creating emitter");
        EventEmitter {
            tx: self.tx.clone(),
            session_id,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for components to emit events without owning the bus
///
/// EventEmitter is cheap to clone and provides convenience methods for
/// emitting events with a pre-set session ID.
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<SessionEvent>,
    session_id: String,
}

impl EventEmitter {
    /// Get the session ID this emitter is bound to
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Emit a raw event payload
    pub fn emit(&self, data: EventData) {
        debug!(event_type = data.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(SessionEvent::new(self.session_id.clone(), data));
    }

    // === Convenience methods ===

    /// Emit a task analysis complete event
    pub fn task_analysis_complete(
        &self,
        complexity_level: &str,
        complexity_score: f64,
        strategy: Strategy,
        estimated_seconds: u64,
    ) {
        self.emit(EventData::TaskAnalysisComplete {
            complexity_level: complexity_level.to_string(),
            complexity_score,
            strategy,
            estimated_seconds,
        });
    }

    /// Emit a strategy selection complete event
    pub fn strategy_selection_complete(&self, strategy: Strategy, confidence: f64, justification: &str) {
        self.emit(EventData::StrategySelectionComplete {
            strategy,
            confidence,
            justification: justification.to_string(),
        });
    }

    /// Emit a generation started event
    pub fn generation_started(&self, strategy: Strategy, artifacts: &[String]) {
        self.emit(EventData::GenerationStarted {
            strategy,
            artifacts: artifacts.to_vec(),
        });
    }

    /// Emit a generation progress event
    pub fn generation_progress(&self, step: &str, progress: u8) {
        self.emit(EventData::GenerationProgress {
            step: step.to_string(),
            progress,
        });
    }

    /// Emit a generation completed event
    pub fn generation_completed(&self, strategy: Strategy, confidence: f64) {
        self.emit(EventData::GenerationCompleted { strategy, confidence });
    }

    /// Emit a validation required event
    pub fn validation_required(&self, iteration: u32) {
        self.emit(EventData::ValidationRequired { iteration });
    }

    /// Emit a quality monitoring event
    pub fn quality_monitoring(&self, retrieval: f64, generation: f64, overall: f64, passed: bool) {
        self.emit(EventData::QualityMonitoring {
            retrieval_confidence: retrieval,
            generation_confidence: generation,
            overall_confidence: overall,
            passed,
        });
    }

    /// Emit a re-routing event
    pub fn re_routing(&self, from: Strategy, to: Strategy, reason: &str) {
        self.emit(EventData::ReRouting {
            from,
            to,
            reason: reason.to_string(),
        });
    }

    /// Emit a final result event
    pub fn final_result(&self, result: FinalResult) {
        self.emit(EventData::FinalResult {
            result: Box::new(result),
        });
    }

    /// Emit an error event
    pub fn error(&self, context: &str, message: &str) {
        self.emit(EventData::Error {
            context: context.to_string(),
            message: message.to_string(),
        });
    }
}

/// Create an event bus wrapped in an Arc for shared ownership
pub fn create_event_bus() -> Arc<EventBus> {
    Arc::new(EventBus::with_default_capacity())
}
