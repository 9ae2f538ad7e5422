//! Staging-store error types

use std::fmt;

/// Staging store operation errors
#[derive(Debug)]
pub enum StagingError {
    /// Connection-related errors (Redis unavailable, network issues, etc.)
    ConnectionError(String),
    /// Serialization/deserialization errors
    SerializationError(String),
    /// Operation-specific errors
    OperationError(String),
}

impl fmt::Display for StagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StagingError::ConnectionError(msg) => write!(f, "Staging connection error: {}", msg),
            StagingError::SerializationError(msg) => {
                write!(f, "Staging serialization error: {}", msg)
            }
            StagingError::OperationError(msg) => write!(f, "Staging operation error: {}", msg),
        }
    }
}

impl std::error::Error for StagingError {}

impl From<redis::RedisError> for StagingError {
    fn from(err: redis::RedisError) -> Self {
        StagingError::ConnectionError(err.to_string())
    }
}

impl From<serde_json::Error> for StagingError {
    fn from(err: serde_json::Error) -> Self {
        StagingError::SerializationError(err.to_string())
    }
}

impl From<bb8::RunError<redis::RedisError>> for StagingError {
    fn from(err: bb8::RunError<redis::RedisError>) -> Self {
        StagingError::ConnectionError(format!("Pool error: {}", err))
    }
}

/// Result type alias for staging operations
pub type StagingResult<T> = Result<T, StagingError>;
