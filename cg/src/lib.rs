//! Curricula - CP/ATP generation decision engine
//!
//! Turns a teacher's curriculum request into two artifacts - a Capaian
//! Pembelajaran (CP, competency statement) and an Alur Tujuan Pembelajaran
//! (ATP, learning objective sequence) - by scoring the request, selecting
//! one of four generation strategies, gating the result on confidence, and
//! refining it through bounded user-validation cycles.
//!
//! # Modules
//!
//! - [`domain`] - requests, analyses, sessions, and results
//! - [`scoring`] - complexity factors, suitability scores, strategy selection
//! - [`strategy`] - the four generation strategies behind one trait
//! - [`generation`] - per-artifact generation coordination
//! - [`quality`] - the confidence gate and adaptive re-routing
//! - [`refine`] - bounded feedback-driven refinement
//! - [`session`] - session store actor, slots, and the state machine
//! - [`backends`] - collaborator traits and the OpenAI-compatible client
//! - [`events`] - broadcast event bus and JSONL event logging
//! - [`config`] - thresholds, weights, and limits from YAML

pub mod backends;
pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod generation;
pub mod quality;
pub mod refine;
pub mod scoring;
pub mod session;
pub mod strategy;

// Re-export commonly used types
pub use config::{Config, GeneratorConfig, ScoreWeights, SessionLimits, Thresholds};
pub use domain::{
    ContentRequest, FinalResult, GenerationResult, Session, SessionStatus, TaskAnalysis, ValidationFeedback,
};
pub use events::{EventBus, EventEmitter, SessionEvent, create_event_bus, spawn_event_logger};
pub use generation::GenerationCoordinator;
pub use quality::{QualityMonitor, QualityReport};
pub use refine::{FeedbackClassifier, KeywordClassifier, RefinementLoop};
pub use scoring::{ScoringEngine, StrategySelector};
pub use session::{SessionError, SessionStateMachine, SessionStatusReport, SessionStore};
pub use strategy::{GenerationStrategy, Strategy, StrategySet};
