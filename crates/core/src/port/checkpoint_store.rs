// Checkpoint Store Port (Interface)
// The only persistence for in-flight queue state.

use crate::domain::{JobProgress, Queue};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Checkpoint lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// Survive until explicitly deleted
    #[default]
    Never,
    /// Expire after the given duration
    After(Duration),
}

impl Ttl {
    /// Absolute expiry in epoch ms, if any
    pub fn expires_at(&self, now_millis: i64) -> Option<i64> {
        match self {
            Ttl::Never => None,
            Ttl::After(d) => Some(now_millis.saturating_add(d.as_millis() as i64)),
        }
    }
}

/// Key-value store for queue checkpoints and progress markers.
///
/// `get` on a never-set or expired key is `Ok(None)`. A store that cannot
/// answer must return `Err`, never a false "absent": the engine reloads
/// from scratch on absent.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Read the remaining queue
    async fn get(&self, key: &str) -> Result<Option<Queue>>;

    /// Replace the remaining queue
    async fn set(&self, key: &str, queue: &Queue, ttl: Ttl) -> Result<()>;

    /// Delete the queue checkpoint (no-op when absent)
    async fn delete(&self, key: &str) -> Result<()>;

    /// Read the progress / completion marker
    async fn get_progress(&self, key: &str) -> Result<Option<JobProgress>>;

    /// Upsert the progress / completion marker
    async fn set_progress(&self, key: &str, progress: &JobProgress) -> Result<()>;

    /// Delete the progress marker (no-op when absent)
    async fn delete_progress(&self, key: &str) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use crate::port::TimeProvider;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory checkpoint store with TTL support and fault injection
    pub struct InMemoryCheckpointStore {
        queues: Mutex<HashMap<String, (Queue, Option<i64>)>>,
        progress: Mutex<HashMap<String, JobProgress>>,
        time_provider: Option<Arc<dyn TimeProvider>>,
        unavailable: AtomicBool,
        writes: AtomicUsize,
        fail_from_write: AtomicUsize,
    }

    impl InMemoryCheckpointStore {
        pub fn new() -> Self {
            Self {
                queues: Mutex::new(HashMap::new()),
                progress: Mutex::new(HashMap::new()),
                time_provider: None,
                unavailable: AtomicBool::new(false),
                writes: AtomicUsize::new(0),
                fail_from_write: AtomicUsize::new(usize::MAX),
            }
        }

        /// Honour TTLs against the given clock
        pub fn with_clock(time_provider: Arc<dyn TimeProvider>) -> Self {
            Self {
                time_provider: Some(time_provider),
                ..Self::new()
            }
        }

        /// Make every operation fail as if the backend were down
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        /// Go down once `writes` queue writes have happened, as a crash
        /// between two store calls would look to the next invocation
        pub fn fail_after_writes(&self, writes: usize) {
            self.fail_from_write.store(writes, Ordering::SeqCst);
        }

        /// Bring the store back after `set_unavailable` or `fail_after_writes`
        pub fn recover(&self) {
            self.unavailable.store(false, Ordering::SeqCst);
            self.fail_from_write.store(usize::MAX, Ordering::SeqCst);
        }

        /// Number of queue writes so far
        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        /// Seed a queue directly
        pub fn seed(&self, key: &str, queue: Queue) {
            self.queues
                .lock()
                .unwrap()
                .insert(key.to_string(), (queue, None));
        }

        fn check_available(&self) -> Result<()> {
            if self.unavailable.load(Ordering::SeqCst)
                || self.writes.load(Ordering::SeqCst) >= self.fail_from_write.load(Ordering::SeqCst)
            {
                return Err(AppError::Store("in-memory store unavailable".to_string()));
            }
            Ok(())
        }

        fn now(&self) -> i64 {
            self.time_provider
                .as_ref()
                .map(|t| t.now_millis())
                .unwrap_or(0)
        }
    }

    impl Default for InMemoryCheckpointStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl CheckpointStore for InMemoryCheckpointStore {
        async fn get(&self, key: &str) -> Result<Option<Queue>> {
            self.check_available()?;
            let now = self.now();
            let mut queues = self.queues.lock().unwrap();
            match queues.get(key) {
                Some((_, Some(expires_at))) if *expires_at <= now => {
                    queues.remove(key);
                    Ok(None)
                }
                Some((queue, _)) => Ok(Some(queue.clone())),
                None => Ok(None),
            }
        }

        async fn set(&self, key: &str, queue: &Queue, ttl: Ttl) -> Result<()> {
            self.check_available()?;
            let expires_at = ttl.expires_at(self.now());
            self.queues
                .lock()
                .unwrap()
                .insert(key.to_string(), (queue.clone(), expires_at));
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.check_available()?;
            self.queues.lock().unwrap().remove(key);
            Ok(())
        }

        async fn get_progress(&self, key: &str) -> Result<Option<JobProgress>> {
            self.check_available()?;
            Ok(self.progress.lock().unwrap().get(key).cloned())
        }

        async fn set_progress(&self, key: &str, progress: &JobProgress) -> Result<()> {
            self.check_available()?;
            self.progress
                .lock()
                .unwrap()
                .insert(key.to_string(), progress.clone());
            Ok(())
        }

        async fn delete_progress(&self, key: &str) -> Result<()> {
            self.check_available()?;
            self.progress.lock().unwrap().remove(key);
            Ok(())
        }
    }

}
