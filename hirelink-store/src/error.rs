//! Store error types.

use hirelink_fetch::ApiError;
use thiserror::Error;

/// Errors that can occur in the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Background monitoring was requested outside a Tokio runtime.
    #[error("No Tokio runtime available to run the connection monitor")]
    NoRuntime,

    /// Error raised while talking to the backend.
    #[error(transparent)]
    Api(#[from] ApiError),
}
