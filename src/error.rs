//! Error types for the vote relay worker.

use thiserror::Error;

/// Worker error taxonomy.
///
/// Connectivity errors (`Database`, `Queue`) are transient: the connectors
/// retry them with fixed backoff and they never terminate the process.
/// `Configuration` and `SecretUnavailable` are fatal at startup and never
/// retried. `MalformedPayload` is logged and the offending event skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Secret unavailable: {0}")]
    SecretUnavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Shutdown in progress")]
    ShutdownInProgress,
}

impl From<sqlx::Error> for WorkerError {
    fn from(err: sqlx::Error) -> Self {
        WorkerError::Database(err.to_string())
    }
}

impl From<redis::RedisError> for WorkerError {
    fn from(err: redis::RedisError) -> Self {
        WorkerError::Queue(err.to_string())
    }
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        WorkerError::MalformedPayload(err.to_string())
    }
}

/// Result type alias for `WorkerError`
pub type Result<T> = std::result::Result<T, WorkerError>;
