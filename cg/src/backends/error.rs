//! Backend collaborator errors

use std::time::Duration;
use thiserror::Error;

/// Errors from external collaborators (generation, retrieval, live search)
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BackendError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::RateLimited { .. } => true,
            BackendError::ApiError { status, .. } => *status >= 500,
            BackendError::Network(_) => true,
            BackendError::Timeout(_) => true,
            BackendError::InvalidResponse(_) => false,
            BackendError::Json(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(BackendError::ApiError {
            status: 503,
            message: "unavailable".to_string()
        }
        .is_retryable());
        assert!(!BackendError::ApiError {
            status: 401,
            message: "unauthorized".to_string()
        }
        .is_retryable());
        assert!(!BackendError::InvalidResponse("empty choices".to_string()).is_retryable());
    }
}
