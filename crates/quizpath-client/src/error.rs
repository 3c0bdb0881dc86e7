//! HTTP client error types.

use quizpath_core::QuizError;
use thiserror::Error;

/// Errors that can occur when talking to the quiz API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The bearer token was missing, expired or rejected (401/403).
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// The addressed subject, topic or question does not exist (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The server rejected the request body (400/422).
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The configured base URL cannot address API paths.
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
}

impl From<ClientError> for QuizError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Unauthorized(message) => QuizError::Unauthorized(message),
            ClientError::NotFound(message) => QuizError::NotFound(message),
            ClientError::Rejected { message, .. } => QuizError::Validation(message),
            other => QuizError::ServiceUnavailable(other.to_string()),
        }
    }
}
