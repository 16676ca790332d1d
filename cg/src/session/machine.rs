//! Session state machine - orchestrates the full session lifecycle
//!
//! Pulls the analysis, selection, generation, quality, and refinement
//! components together behind the session store. Processing runs on a
//! bounded set of slots; excess sessions queue FIFO. Validation and
//! refinement are driven by the client one verdict at a time.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::backends::DocumentIndex;
use crate::config::{Config, SessionLimits, Thresholds};
use crate::domain::{
    ContentRequest, FinalResult, ProcessingMetadata, Session, SessionStatus, ValidationFeedback, ARTIFACT_PRIMARY,
};
use crate::events::EventBus;
use crate::generation::GenerationCoordinator;
use crate::quality::QualityMonitor;
use crate::refine::{FeedbackClassifier, IterationResult, RefinementLoop};
use crate::scoring::{ScoringEngine, StrategySelector};
use crate::session::messages::{SessionError, SessionResponse};
use crate::session::slots::{ProcessingSlots, SlotDecision};
use crate::session::store::SessionStore;

/// Snapshot returned by status polling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionStatusReport {
    pub session_id: String,
    pub status: SessionStatus,
    pub current_step: String,
    pub progress_percentage: u8,
    pub error_count: u32,
    #[serde(default)]
    pub last_error: Option<String>,
}

pub struct SessionStateMachine {
    store: SessionStore,
    scoring: ScoringEngine,
    selector: StrategySelector,
    coordinator: Arc<GenerationCoordinator>,
    quality: QualityMonitor,
    classifier: Arc<dyn FeedbackClassifier>,
    index: Arc<dyn DocumentIndex>,
    bus: Arc<EventBus>,
    thresholds: Thresholds,
    limits: SessionLimits,
    slots: Mutex<ProcessingSlots>,
    loops: Mutex<HashMap<String, RefinementLoop>>,
}

impl SessionStateMachine {
    pub fn new(
        bus: Arc<EventBus>,
        index: Arc<dyn DocumentIndex>,
        coordinator: Arc<GenerationCoordinator>,
        classifier: Arc<dyn FeedbackClassifier>,
        config: &Config,
    ) -> Arc<Self> {
        let machine = Arc::new(Self {
            store: SessionStore::spawn(),
            scoring: ScoringEngine::new(config.weights.clone()),
            selector: StrategySelector::new(config.thresholds.clone()),
            coordinator,
            quality: QualityMonitor::new(config.thresholds.overall_confidence),
            classifier,
            index,
            bus,
            thresholds: config.thresholds.clone(),
            limits: config.sessions.clone(),
            slots: Mutex::new(ProcessingSlots::new(config.sessions.max_concurrent)),
            loops: Mutex::new(HashMap::new()),
        });
        machine.clone().spawn_expiry_sweep();
        machine
    }

    /// Create a fresh session
    pub async fn create_session(&self) -> SessionResponse<Session> {
        self.store.create(self.limits.ttl_hours).await
    }

    /// List live sessions
    pub async fn list_sessions(&self) -> SessionResponse<Vec<Session>> {
        self.store.list().await
    }

    /// Fetch one session snapshot
    pub async fn get_session(&self, id: &str) -> SessionResponse<Session> {
        self.store.get_required(id).await
    }

    /// Attach a validated request to a session
    pub async fn submit_request(&self, id: &str, request: ContentRequest) -> SessionResponse<Session> {
        debug!(%id, "submit_request: called");
        let missing = request.missing_fields();
        if !missing.is_empty() {
            warn!(%id, ?missing, "submit_request: rejected");
            return Err(SessionError::InvalidRequest(missing));
        }
        self.store.submit_request(id, request).await
    }

    /// Start processing, or queue the session when all slots are busy
    ///
    /// Returns the session snapshot after the slot decision was applied.
    pub async fn start_processing(self: &Arc<Self>, id: &str) -> SessionResponse<Session> {
        debug!(%id, "start_processing: called");
        let session = self.store.get_required(id).await?;
        if session.status != SessionStatus::InputCollection {
            return Err(SessionError::InvalidState(format!(
                "processing requires a submitted request, session is {:?}",
                session.status
            )));
        }

        let mut slots = self.slots.lock().await;
        match slots.try_acquire(id) {
            SlotDecision::Acquired => {
                let handle = self.clone().spawn_pipeline(id.to_string());
                slots.attach(id, handle);
                drop(slots);
                self.store.get_required(id).await
            }
            SlotDecision::Queued => {
                drop(slots);
                self.store.mark_queued(id).await
            }
            SlotDecision::AlreadyActive => Err(SessionError::AlreadyProcessing(id.to_string())),
        }
    }

    fn spawn_pipeline(self: Arc<Self>, id: String) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(err) = self.run_pipeline(&id).await {
                error!(%id, %err, "pipeline failed");
                let message = err.to_string();
                if let Err(store_err) = self.store.record_error(&id, &message).await {
                    error!(%id, %store_err, "could not record pipeline error");
                }
                self.bus.emitter_for(id.clone()).error("processing", &message);
            }
            self.finish_pipeline(&id).await;
        })
    }

    /// Release the session's slot and start the next queued pipeline
    async fn finish_pipeline(self: &Arc<Self>, id: &str) {
        let mut slots = self.slots.lock().await;
        if let Some(next) = slots.release(id) {
            info!(finished = %id, promoted = %next, "finish_pipeline: starting queued session");
            let handle = self.clone().spawn_pipeline(next.clone());
            slots.attach(&next, handle);
        }
    }

    /// The processing pipeline: analyze, select, generate, gate
    async fn run_pipeline(&self, id: &str) -> Result<(), SessionError> {
        let emitter = self.bus.emitter_for(id.to_string());
        let session = self.store.transition(id, SessionStatus::Processing).await?;
        let request = session
            .request
            .ok_or_else(|| SessionError::InvalidState("no request attached".to_string()))?;

        // Retrieval and analysis
        let docs = self
            .index
            .search(&request.query(), ARTIFACT_PRIMARY, 5)
            .await
            .map_err(|err| SessionError::Generation(err.to_string()))?;

        let scores = self.scoring.score(&request, &docs);
        let decision = self.selector.select(&scores);
        // The decision confidence doubles as the retrieval leg of the gate
        let retrieval_confidence = decision.confidence;
        let analysis = self.scoring.analyze(&request, scores, &decision);
        emitter.task_analysis_complete(
            analysis.complexity_level.as_str(),
            analysis.complexity_score,
            decision.strategy,
            analysis.estimated_seconds,
        );
        emitter.strategy_selection_complete(decision.strategy, decision.confidence, &decision.justification);
        self.store.set_analysis(id, analysis).await?;

        if request.is_complete() {
            self.store.transition(id, SessionStatus::Direct).await?;
        } else {
            self.store.transition(id, SessionStatus::CpAtpGeneration).await?;
            if decision.confidence < self.thresholds.refinement_path {
                debug!(%id, confidence = decision.confidence, "run_pipeline: low decision confidence, iterative path likely");
            }
        }

        // Generate, then gate
        let result = self
            .coordinator
            .generate(&request, decision.strategy, &emitter)
            .await
            .map_err(|err| SessionError::Generation(err.to_string()))?;
        let (mut kept, report) = self
            .quality
            .gate(&self.coordinator, &request, retrieval_confidence, result, &emitter)
            .await
            .map_err(|err| SessionError::Generation(err.to_string()))?;

        // A supplied-artifact pass keeps its perfect confidence
        if !request.is_complete() {
            kept.confidence = report.generation_confidence;
        }
        emitter.generation_completed(kept.strategy, kept.confidence);

        let initial_strategy = kept.strategy;
        self.store.set_result(id, kept).await?;
        self.store.transition(id, SessionStatus::UserValidation).await?;

        let mut loops = self.loops.lock().await;
        loops.insert(
            id.to_string(),
            RefinementLoop::new(
                self.coordinator.clone(),
                self.classifier.clone(),
                self.limits.max_refinement_iterations,
                initial_strategy,
            ),
        );
        drop(loops);

        emitter.validation_required(0);
        info!(%id, "run_pipeline: awaiting user validation");
        Ok(())
    }

    /// Apply a user verdict: approve to complete, reject to refine
    pub async fn submit_validation(&self, id: &str, feedback: ValidationFeedback) -> SessionResponse<Session> {
        debug!(%id, approved = feedback.approved, "submit_validation: called");
        let emitter = self.bus.emitter_for(id.to_string());
        let session = self.store.append_validation(id, feedback.clone()).await?;

        if feedback.approved {
            return self.complete(id).await;
        }

        let request = session
            .request
            .clone()
            .ok_or_else(|| SessionError::InvalidState("no request attached".to_string()))?;
        let prior = session
            .result
            .clone()
            .ok_or_else(|| SessionError::InvalidState("no result to refine".to_string()))?;

        self.store.transition(id, SessionStatus::Refinement).await?;

        // Check the loop out of the map for the duration of the generation
        // call; holding the map lock across it would serialize refinements
        // of unrelated sessions
        let mut looper = self.loops.lock().await.remove(id).unwrap_or_else(|| {
            RefinementLoop::new(
                self.coordinator.clone(),
                self.classifier.clone(),
                self.limits.max_refinement_iterations,
                prior.strategy,
            )
        });

        let outcome = looper.refine(&request, &prior, &feedback, &emitter).await;
        let iteration = looper.iteration();
        self.loops.lock().await.insert(id.to_string(), looper);

        match outcome {
            Ok(IterationResult::Refined(refined)) => {
                self.store.set_result(id, refined).await?;
                let updated = self.store.transition(id, SessionStatus::UserValidation).await?;
                emitter.validation_required(iteration);
                Ok(updated)
            }
            Ok(IterationResult::Exhausted) => {
                // Fail open: the last result stands
                info!(%id, "submit_validation: refinement exhausted, accepting last result");
                self.complete(id).await
            }
            Err(err) => {
                let message = err.to_string();
                emitter.error("refinement", &message);
                self.store.record_error(id, &message).await?;
                Err(SessionError::Generation(message))
            }
        }
    }

    async fn complete(&self, id: &str) -> SessionResponse<Session> {
        let completed = self.store.transition(id, SessionStatus::Completed).await?;
        self.loops.lock().await.remove(id);
        if let Some(result) = final_result_of(&completed) {
            self.bus.emitter_for(id.to_string()).final_result(result);
        }
        Ok(completed)
    }

    /// Status snapshot for polling clients
    pub async fn get_status(&self, id: &str) -> SessionResponse<SessionStatusReport> {
        let session = self.store.get_required(id).await?;
        Ok(SessionStatusReport {
            session_id: session.id,
            status: session.status,
            current_step: session.current_step,
            progress_percentage: session.progress,
            error_count: session.error_count,
            last_error: session.last_error,
        })
    }

    /// Export shape for a completed session
    pub async fn get_final_result(&self, id: &str) -> SessionResponse<FinalResult> {
        let session = self.store.get_required(id).await?;
        if session.status != SessionStatus::Completed {
            return Err(SessionError::InvalidState(format!(
                "final result requires COMPLETED, session is {:?}",
                session.status
            )));
        }
        final_result_of(&session).ok_or_else(|| SessionError::InvalidState("session has no result".to_string()))
    }

    /// Abort a running or queued pipeline
    pub async fn cancel_session(self: &Arc<Self>, id: &str) -> SessionResponse<Session> {
        debug!(%id, "cancel_session: called");
        let mut slots = self.slots.lock().await;
        let was_active = slots.is_active(id);
        let cancelled = slots.cancel(id);
        if was_active {
            if let Some(next) = slots.release(id) {
                let handle = self.clone().spawn_pipeline(next.clone());
                slots.attach(&next, handle);
            }
        }
        drop(slots);

        if !cancelled {
            return Err(SessionError::InvalidState("session is not processing".to_string()));
        }

        self.loops.lock().await.remove(id);
        let message = "cancelled by user request";
        self.bus.emitter_for(id.to_string()).error("cancel", message);
        self.store.record_error(id, message).await
    }

    /// Delete a session and any processing state it holds
    pub async fn delete_session(self: &Arc<Self>, id: &str) -> SessionResponse<()> {
        debug!(%id, "delete_session: called");
        let mut slots = self.slots.lock().await;
        let was_active = slots.is_active(id);
        slots.cancel(id);
        if was_active {
            if let Some(next) = slots.release(id) {
                let handle = self.clone().spawn_pipeline(next.clone());
                slots.attach(&next, handle);
            }
        }
        drop(slots);

        self.loops.lock().await.remove(id);
        self.store.delete(id).await
    }

    /// Periodic expiry sweep covering idle, queued, and completed sessions
    fn spawn_expiry_sweep(self: Arc<Self>) {
        let interval = std::time::Duration::from_secs(self.limits.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match self.store.sweep_expired().await {
                    Ok(removed) => {
                        if removed.is_empty() {
                            continue;
                        }
                        info!(count = removed.len(), "expiry sweep removed sessions");
                        self.clear_processing_state(&removed).await;
                    }
                    Err(err) => warn!(%err, "expiry sweep failed"),
                }
            }
        });
    }

    /// Drop slot, queue, and refinement state for swept sessions
    ///
    /// Expired queue positions are dropped first so promotion only ever
    /// picks a live session, then each freed slot starts the next queued
    /// pipeline, same as cancellation.
    async fn clear_processing_state(self: &Arc<Self>, removed: &[String]) {
        let mut slots = self.slots.lock().await;
        let mut loops = self.loops.lock().await;
        let mut freed = Vec::new();
        for id in removed {
            if slots.is_active(id) {
                freed.push(id.clone());
            }
            slots.cancel(id);
            loops.remove(id);
        }
        for id in &freed {
            if let Some(next) = slots.release(id) {
                let handle = self.clone().spawn_pipeline(next.clone());
                slots.attach(&next, handle);
            }
        }
    }
}

fn final_result_of(session: &Session) -> Option<FinalResult> {
    let request = session.request.clone()?;
    let result = session.result.clone()?;
    let refinement_iterations = session.validation_history.iter().filter(|v| !v.approved).count() as u32;
    let processing_seconds = (session.updated_at - session.created_at).num_seconds().max(0);
    Some(FinalResult {
        request,
        primary_artifact: result.primary,
        secondary_artifact: result.secondary,
        processing_metadata: ProcessingMetadata {
            strategy: result.strategy,
            confidence: result.confidence,
            refinement_iterations,
            processing_seconds,
        },
        validation_history: session.validation_history.clone(),
    })
}
