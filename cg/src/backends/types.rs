//! Shared types for backend collaborators

use serde::{Deserialize, Serialize};

/// One ranked snippet from the document-retrieval backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub content: String,
    pub source: String,
    /// Similarity score in [0, 1]
    pub score: f64,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl RetrievedDocument {
    pub fn new(content: impl Into<String>, source: impl Into<String>, score: f64) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
            score: score.clamp(0.0, 1.0),
            metadata: serde_json::Value::Null,
        }
    }
}

/// One result from the live-search backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}
