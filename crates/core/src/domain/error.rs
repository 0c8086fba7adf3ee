// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Missing job identifier")]
    MissingIdentifier,

    #[error("Invalid job identifier {0:?}: normalizes to an empty key")]
    InvalidIdentifier(String),

    #[error("Invalid batch size: {0} (must be at least 1)")]
    InvalidBatchSize(i64),

    #[error("Invalid scope {0:?}")]
    InvalidScope(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
