//! Error types for client orchestration operations

use thiserror::Error;

/// Client-side orchestration errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// REST endpoint returned a non-success response
    #[error("API error: {0}")]
    Api(String),

    /// Analysis task could not be created
    #[error("Task creation failed: {0}")]
    TaskCreation(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Streaming channel error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base K-line series could not be fetched; without it there
    /// is no alignment axis for a merged result
    #[error("Base series unavailable for {subject}: {reason}")]
    BaseSeriesUnavailable { subject: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ClientError::TaskCreation("stock 600519 not found".to_string());
        assert_eq!(err.to_string(), "Task creation failed: stock 600519 not found");

        let err = ClientError::BaseSeriesUnavailable {
            subject: "600519/daily".to_string(),
            reason: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Base series unavailable for 600519/daily: timeout"
        );
    }
}
