//! Core error types for `Hirelink`.

use thiserror::Error;

/// Core error type for `Hirelink` operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The request method is not one the dispatcher understands.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),
}
