// Per-job invocation lock
// Serializes overlapping invocations of the same checkpoint key in this process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct JobLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl JobLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other invocation holds `key`
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody holds or waits on
            locks.retain(|k, l| k == key || Arc::strong_count(l) > 1);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Keys currently tracked (held or recently used)
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(JobLocks::new());
        let guard = locks.acquire("job_data").await;

        let locks2 = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _g = locks2.acquire("job_data").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = JobLocks::new();
        let _a = locks.acquire("a_data").await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b_data"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = JobLocks::new();
        for i in 0..10 {
            let _g = locks.acquire(&format!("job{}_data", i)).await;
        }
        let _g = locks.acquire("last_data").await;
        assert_eq!(locks.tracked(), 1);
    }
}
