// Allowlist scope switcher
// Scopes here are tenant names; checkpoint isolation comes from the key prefix,
// so switching only has to validate the scope and mark the span.
use chunkwise_core::error::{AppError, Result};
use chunkwise_core::port::ScopeSwitcher;
use std::collections::BTreeSet;
use tracing::debug;

pub struct AllowlistScopeSwitcher {
    allowed: BTreeSet<String>,
}

impl AllowlistScopeSwitcher {
    /// An empty allowlist admits any scope
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(Into::into)
                .map(|s: String| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn admits(&self, scope: &str) -> bool {
        self.allowed.is_empty() || self.allowed.contains(scope)
    }
}

impl ScopeSwitcher for AllowlistScopeSwitcher {
    fn enter(&self, scope: &str) -> Result<()> {
        if !self.admits(scope) {
            return Err(AppError::NotFound(format!("Scope {:?} does not exist", scope)));
        }
        debug!(scope, "Entered scope");
        Ok(())
    }

    fn restore(&self) {
        debug!("Restored previous scope");
    }
}
