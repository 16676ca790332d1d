//! Request scoring and strategy selection
//!
//! The engine turns a request plus retrieved snippets into numeric
//! suitability scores; the selector applies fixed-priority thresholds to
//! those scores.

mod engine;
mod selector;

pub use engine::ScoringEngine;
pub use selector::StrategySelector;
