// Central Error Type for the Application

use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A job capability (load_data / process_item) or job type was never supplied
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Checkpoint store could not be reached or rejected the operation
    #[error("Store error: {0}")]
    Store(String),

    /// Checkpoint exists but cannot be decoded; never treated as "absent"
    #[error("Corrupt checkpoint at {key}: {reason}")]
    CorruptCheckpoint { key: String, reason: String },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the caller may retry the same invocation unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Store(_) | AppError::Io(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
