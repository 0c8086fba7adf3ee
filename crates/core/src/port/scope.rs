// Scope Switcher Port
// Ambient sub-scope (tenant) context an invocation may run inside.

use crate::error::Result;

/// Enters and leaves an external sub-scope (e.g. a tenant context).
///
/// The engine pairs every successful `enter` with exactly one `restore`,
/// on every exit path.
pub trait ScopeSwitcher: Send + Sync {
    /// Switch into `scope`
    fn enter(&self, scope: &str) -> Result<()>;

    /// Return to the scope active before the matching `enter`
    fn restore(&self);
}

/// No sub-scopes: entering is a no-op
pub struct NoopScopeSwitcher;

impl ScopeSwitcher for NoopScopeSwitcher {
    fn enter(&self, scope: &str) -> Result<()> {
        tracing::debug!(scope = %scope, "Scope switching not configured; ignoring scope");
        Ok(())
    }

    fn restore(&self) {}
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;

    /// Records enter/restore calls; can refuse named scopes
    #[derive(Default)]
    pub struct RecordingScopeSwitcher {
        events: Mutex<Vec<String>>,
        rejected: Mutex<Vec<String>>,
    }

    impl RecordingScopeSwitcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reject(&self, scope: &str) {
            self.rejected.lock().unwrap().push(scope.to_string());
        }

        /// `enter:<scope>` / `restore` in call order
        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ScopeSwitcher for RecordingScopeSwitcher {
        fn enter(&self, scope: &str) -> Result<()> {
            if self.rejected.lock().unwrap().iter().any(|s| s == scope) {
                return Err(AppError::NotFound(format!("Scope {} not found", scope)));
            }
            self.events.lock().unwrap().push(format!("enter:{}", scope));
            Ok(())
        }

        fn restore(&self) {
            self.events.lock().unwrap().push("restore".to_string());
        }
    }
}
