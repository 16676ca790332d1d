//! Core domain types for the curriculum engine
//!
//! Value types are plain serde structs. Mutation of a [`Session`] only
//! happens through the session store actor; every other component receives
//! these types by reference and returns new values.

mod analysis;
mod request;
mod session;

pub use analysis::{ComplexityFactors, ComplexityLevel, StrategyDecision, StrategyScores, TaskAnalysis};
pub use request::{ContentRequest, ARTIFACT_PRIMARY, ARTIFACT_SECONDARY};
pub use session::{
    FinalResult, GenerationResult, ProcessingMetadata, Session, SessionStatus, ValidationFeedback,
};
