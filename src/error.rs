//! Error types for the fathom search core.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FathomError>;

/// Unified error type for all fathom operations.
#[derive(Debug, Error)]
pub enum FathomError {
    /// Invalid argument or configuration supplied by the caller.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Two vectors of different lengths were combined.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A vector-store entry id was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An embedding provider call failed. The message preserves the
    /// provider's own description of the cause.
    #[error("embedding provider error: {0}")]
    Provider(String),

    /// Snapshot persistence failed (missing backup source, bad layout, ...).
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot or config (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FathomError {
    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        FathomError::InvalidArgument(msg.into())
    }

    /// Create a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        FathomError::NotFound(msg.into())
    }

    /// Create a provider error, preserving the original cause text.
    pub fn provider(msg: impl Into<String>) -> Self {
        FathomError::Provider(msg.into())
    }

    /// Create a persistence error.
    pub fn persistence(msg: impl Into<String>) -> Self {
        FathomError::Persistence(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        FathomError::Internal(msg.into())
    }
}
