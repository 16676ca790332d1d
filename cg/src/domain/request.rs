//! Content request - the immutable input to a session

use serde::{Deserialize, Serialize};

/// Name of the primary artifact (competency statement, "CP")
pub const ARTIFACT_PRIMARY: &str = "cp";

/// Name of the secondary artifact (learning sequence, "ATP")
pub const ARTIFACT_SECONDARY: &str = "atp";

/// A curriculum content request as submitted by a teacher
///
/// Immutable once accepted into a session. If both artifact texts are
/// pre-supplied the session takes the direct path and never generates.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ContentRequest {
    /// Requesting teacher's name
    pub teacher: String,
    /// School name
    pub school: String,
    /// Subject (e.g. "matematika", "fisika")
    pub subject: String,
    /// Grade level, 1-12
    pub grade: u8,
    /// Curriculum phase label (e.g. "A".."F")
    #[serde(default)]
    pub phase: String,
    /// Main topic
    pub topic: String,
    /// Optional sub-topic
    #[serde(default)]
    pub sub_topic: String,
    /// Time allocation in minutes
    pub time_allocation: u32,
    /// Generation backend model to use
    #[serde(default)]
    pub model: String,
    /// Pre-supplied primary artifact text, if the teacher already has one
    #[serde(default)]
    pub primary: Option<String>,
    /// Pre-supplied secondary artifact text
    #[serde(default)]
    pub secondary: Option<String>,
}

impl ContentRequest {
    /// True when both artifacts are already supplied and non-empty
    ///
    /// A complete request never triggers a generation call.
    pub fn is_complete(&self) -> bool {
        let has = |a: &Option<String>| a.as_deref().is_some_and(|s| !s.trim().is_empty());
        has(&self.primary) && has(&self.secondary)
    }

    /// Names of the artifacts that still need to be generated
    pub fn missing_artifacts(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.primary.as_deref().is_none_or(|s| s.trim().is_empty()) {
            missing.push(ARTIFACT_PRIMARY.to_string());
        }
        if self.secondary.as_deref().is_none_or(|s| s.trim().is_empty()) {
            missing.push(ARTIFACT_SECONDARY.to_string());
        }
        missing
    }

    /// Names of required fields that are absent or invalid
    ///
    /// An empty return means the request is acceptable for processing.
    pub fn missing_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.teacher.trim().is_empty() {
            missing.push("teacher".to_string());
        }
        if self.school.trim().is_empty() {
            missing.push("school".to_string());
        }
        if self.subject.trim().is_empty() {
            missing.push("subject".to_string());
        }
        if self.grade == 0 || self.grade > 12 {
            missing.push("grade".to_string());
        }
        if self.topic.trim().is_empty() {
            missing.push("topic".to_string());
        }
        if self.time_allocation == 0 {
            missing.push("time_allocation".to_string());
        }
        missing
    }

    /// The retrieval/generation query for this request
    pub fn query(&self) -> String {
        if self.sub_topic.trim().is_empty() {
            format!("{} {}", self.subject, self.topic)
        } else {
            format!("{} {} {}", self.subject, self.topic, self.sub_topic)
        }
    }
}
