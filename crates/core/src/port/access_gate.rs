// Access Gate Port
// Runs before any engine work; a denial never touches job state.

use crate::error::{AppError, Result};

/// Caller credentials presented with an invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub token: Option<String>,
}

impl Credentials {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

/// Decides who may start or continue a job
pub trait AccessGate: Send + Sync {
    /// # Errors
    /// `AppError::AccessDenied` when the caller may not run jobs
    fn check(&self, credentials: &Credentials) -> Result<()>;
}

/// Gate that admits everyone (tests, trusted local deployments)
pub struct AllowAll;

impl AccessGate for AllowAll {
    fn check(&self, _credentials: &Credentials) -> Result<()> {
        Ok(())
    }
}

/// Gate that admits nobody
pub struct DenyAll;

impl AccessGate for DenyAll {
    fn check(&self, _credentials: &Credentials) -> Result<()> {
        Err(AppError::AccessDenied("access gate is closed".to_string()))
    }
}
