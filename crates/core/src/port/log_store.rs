// Log Store Port
// Durable, append-only progress log, one per job identifier.

use crate::domain::JobId;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait LogStore: Send + Sync {
    /// Append lines (each terminated by a newline). Never truncates.
    async fn append(&self, job: &JobId, lines: &[String]) -> Result<()>;

    /// Last `lines` lines of the job's log, oldest first. Empty when no log exists.
    async fn tail(&self, job: &JobId, lines: usize) -> Result<Vec<String>>;

    /// Human-readable location of the log (path, URL), if it has one
    fn location(&self, job: &JobId) -> Option<String>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory log store
    #[derive(Default)]
    pub struct InMemoryLogStore {
        logs: Mutex<HashMap<String, String>>,
    }

    impl InMemoryLogStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Full log content of a job
        pub fn contents(&self, job: &JobId) -> String {
            self.logs
                .lock()
                .unwrap()
                .get(job.as_str())
                .cloned()
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl LogStore for InMemoryLogStore {
        async fn append(&self, job: &JobId, lines: &[String]) -> Result<()> {
            let mut logs = self.logs.lock().unwrap();
            let log = logs.entry(job.as_str().to_string()).or_default();
            for line in lines {
                log.push_str(line);
                log.push('\n');
            }
            Ok(())
        }

        async fn tail(&self, job: &JobId, lines: usize) -> Result<Vec<String>> {
            let content = self.contents(job);
            let all: Vec<&str> = content.lines().collect();
            let start = all.len().saturating_sub(lines);
            Ok(all[start..].iter().map(|s| s.to_string()).collect())
        }

        fn location(&self, _job: &JobId) -> Option<String> {
            None
        }
    }
}
