//! Error types for tentacool
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for tentacool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tentacool
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input: bad CIDR, empty required field, reserved id
    #[error("Validation error: {0}")]
    Validation(String),

    /// A record with the same key already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Config store I/O or encoding failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The system adapter failed (or timed out) applying or removing live state
    #[error("System apply error ({adapter}): {message}")]
    SystemApply {
        /// Adapter name
        adapter: String,
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors outside the store
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Coarse classification of [`Error`], used by outer layers to pick a status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Persistence,
    SystemApply,
    Config,
    Internal,
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a system apply error
    pub fn system_apply(adapter: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SystemApply {
            adapter: adapter.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Persistence(_) => ErrorKind::Persistence,
            Error::SystemApply { .. } => ErrorKind::SystemApply,
            Error::Config(_) => ErrorKind::Config,
            Error::Io(_) | Error::Json(_) | Error::Other(_) => ErrorKind::Internal,
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
