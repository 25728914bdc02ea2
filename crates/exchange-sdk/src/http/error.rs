/*
[INPUT]:  Error sources (HTTP, API, serialization, WebSocket transport, reference data)
[OUTPUT]: Structured error types with context and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

use crate::ws::transport::TransportError;

/// Main error type for the exchange SDK
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-2xx response
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket wire failure
    #[error("WebSocket transport error: {0}")]
    Transport(#[from] TransportError),

    /// Value could not be converted, or reference data is missing
    #[error("Validation error: {0}")]
    Validation(String),

    /// Server answered with an unexpected payload
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation timed out
    #[error("Timeout after {duration}s")]
    Timeout { duration: u64 },
}

impl ExchangeError {
    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ExchangeError::Http(_)
            | ExchangeError::Timeout { .. }
            | ExchangeError::Transport(_)
            | ExchangeError::InvalidResponse(_) => true,
            ExchangeError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Get retry delay in seconds (if retryable)
    pub fn retry_delay(&self) -> Option<u64> {
        match self {
            ExchangeError::Api { status: 429, .. } => Some(5),
            ExchangeError::Timeout { .. } | ExchangeError::Transport(_) => Some(1),
            _ => None,
        }
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        ExchangeError::Api {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ExchangeError::Validation(message.into())
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, ExchangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_retryable() {
        let timeout_err = ExchangeError::Timeout { duration: 30 };
        assert!(timeout_err.is_retryable());
        assert_eq!(timeout_err.retry_delay(), Some(1));

        let closed = ExchangeError::Transport(TransportError::Closed);
        assert!(closed.is_retryable());

        assert!(!ExchangeError::validation("unknown market").is_retryable());
    }

    #[test]
    fn test_api_error_retry_depends_on_status() {
        assert!(ExchangeError::api_error(StatusCode::BAD_GATEWAY, "upstream").is_retryable());
        assert!(!ExchangeError::api_error(StatusCode::NOT_FOUND, "missing").is_retryable());

        let limited = ExchangeError::api_error(StatusCode::TOO_MANY_REQUESTS, "slow down");
        assert_eq!(limited.retry_delay(), Some(5));
    }

    #[test]
    fn test_api_error_creation() {
        let err = ExchangeError::api_error(StatusCode::BAD_REQUEST, "Invalid market");
        match err {
            ExchangeError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid market");
            }
            _ => panic!("Expected Api error variant"),
        }
    }
}
