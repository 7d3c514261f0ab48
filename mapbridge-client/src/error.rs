//! Error types for the mapbridge client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the mapbridge client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response or document
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Local file access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No matching outbox document appeared in time
    #[error("Timed out waiting for results of batch {0}")]
    Timeout(String),

    /// A task of an evaluated batch did not succeed
    #[error("Evaluation of task {index} failed: {message}")]
    EvaluationFailed {
        /// Position of the task in the batch
        index: usize,
        /// Diagnostic reported by the bridge
        message: String,
    },
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        assert!(ClientError::api_error(404, "gone").is_not_found());
        assert!(!ClientError::api_error(500, "boom").is_not_found());
        assert!(!ClientError::ParseError("bad".to_string()).is_not_found());
    }

    #[test]
    fn test_error_messages() {
        let err = ClientError::EvaluationFailed {
            index: 3,
            message: "remote job failed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Evaluation of task 3 failed: remote job failed"
        );
    }
}
