// Batch Engine - resume-or-load, chunked processing, checkpointing, continuation

pub mod constants;
mod lock;
mod scope_guard;

pub use lock::JobLocks;

use crate::application::continuation::ContinuationSignal;
use crate::application::log_sink::LogSink;
use crate::domain::{Item, Job, JobProgress, JobStatus, Queue};
use crate::error::Result;
use crate::port::{
    CheckpointStore, JobDefinition, LogStore, ResourceProbe, ScopeSwitcher, TimeProvider, Ttl,
};
use constants::{DEFAULT_RETRY_AFTER, DEFAULT_STALL_THRESHOLD};
use scope_guard::ScopeGuard;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tunables of the continuation protocol
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Delay the driver should wait before re-invoking
    pub retry_after: Duration,
    /// Zero-success invocations before a job is flagged as stalled (0 disables)
    pub stall_threshold: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            retry_after: DEFAULT_RETRY_AFTER,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
        }
    }
}

/// What one invocation did, before it is rendered as a signal
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Ran {
        processed: usize,
        remaining: usize,
        stalled_invocations: u32,
        completed_at: Option<i64>,
    },
    AlreadyCompleted {
        completed_at: i64,
    },
}

/// Owns the per-invocation lifecycle of a job
pub struct BatchEngine {
    store: Arc<dyn CheckpointStore>,
    log_store: Arc<dyn LogStore>,
    scopes: Arc<dyn ScopeSwitcher>,
    probe: Arc<dyn ResourceProbe>,
    time_provider: Arc<dyn TimeProvider>,
    locks: Arc<JobLocks>,
    settings: EngineSettings,
}

impl BatchEngine {
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        log_store: Arc<dyn LogStore>,
        scopes: Arc<dyn ScopeSwitcher>,
        probe: Arc<dyn ResourceProbe>,
        time_provider: Arc<dyn TimeProvider>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            log_store,
            scopes,
            probe,
            time_provider,
            locks: Arc::new(JobLocks::new()),
            settings,
        }
    }

    /// Share invocation locks with other engines over the same store
    pub fn with_locks(mut self, locks: Arc<JobLocks>) -> Self {
        self.locks = locks;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run one invocation of `job`.
    ///
    /// 1. Resume the checkpoint, or load and checkpoint the backlog
    /// 2. Process items in order until `batch_size` succeed, removing each
    ///    success from the persisted queue immediately
    /// 3. Decide continue / done from the persisted remaining count
    /// 4. Flush the job log
    ///
    /// Overlapping invocations of the same job in this process run one
    /// after another.
    ///
    /// # Errors
    /// Store failures, corrupt checkpoints, `NotImplemented` capabilities and
    /// errors raised by the job definition abort the invocation. Progress
    /// already checkpointed is kept.
    pub async fn process(
        &self,
        job: &Job,
        definition: &dyn JobDefinition,
    ) -> Result<ContinuationSignal> {
        let _lock = self.locks.acquire(&job.checkpoint_key()).await;
        let _scope = ScopeGuard::enter(self.scopes.as_ref(), job.scope.as_deref())?;

        info!(
            job = %job.id,
            batch_size = job.batch_size,
            scope = ?job.scope,
            "Invocation started"
        );

        let mut sink = LogSink::new(job.id.clone(), Arc::clone(&self.log_store));
        let outcome = self.run_invocation(job, definition, &mut sink).await;

        // Lines logged before a failure are still worth keeping
        let flushed = sink.flush().await;
        let outcome = outcome?;
        flushed?;

        Ok(self.signal(job, outcome).await)
    }

    async fn run_invocation(
        &self,
        job: &Job,
        definition: &dyn JobDefinition,
        sink: &mut LogSink,
    ) -> Result<Outcome> {
        let checkpoint_key = job.checkpoint_key();
        let progress_key = job.progress_key();

        if job.restart {
            info!(job = %job.id, "Restart requested; discarding checkpoint and progress");
            self.store.delete(&checkpoint_key).await?;
            self.store.delete_progress(&progress_key).await?;
        }

        let progress = self.store.get_progress(&progress_key).await?;
        if let Some(completed_at) = progress.as_ref().and_then(|p| p.completed_at) {
            info!(job = %job.id, completed_at, "Job already completed; not reloading");
            return Ok(Outcome::AlreadyCompleted { completed_at });
        }

        let now = self.time_provider.now_millis();
        let (queue, mut progress) = match (self.store.get(&checkpoint_key).await?, progress) {
            // An empty checkpoint is a drained job, never a fresh one
            (Some(queue), progress) => {
                debug!(job = %job.id, remaining = queue.len(), "Resuming from checkpoint");
                (queue, progress.unwrap_or_else(|| JobProgress::new(now)))
            }
            (None, Some(progress)) => (Queue::default(), progress),
            (None, None) => {
                let queue = Queue::new(definition.load_data().await?);
                self.store.set(&checkpoint_key, &queue, Ttl::Never).await?;
                // Started marker goes in before any item is touched
                let progress = JobProgress::new(now);
                self.store.set_progress(&progress_key, &progress).await?;
                info!(job = %job.id, items = queue.len(), "Loaded initial backlog");
                sink.log(format!("Loaded {} items.", queue.len()));
                (queue, progress)
            }
        };

        let processed = self
            .process_chunk(job, definition, &queue, &checkpoint_key, sink)
            .await?;

        let remaining = self
            .store
            .get(&checkpoint_key)
            .await?
            .map(|q| q.len())
            .unwrap_or(0);

        let now = self.time_provider.now_millis();
        progress.record_invocation(processed, remaining, now);

        if remaining == 0 {
            // Marker first: a crash between the two writes must not look like "never started"
            progress.complete(now);
            self.store.set_progress(&progress_key, &progress).await?;
            self.store.delete(&checkpoint_key).await?;
            info!(
                job = %job.id,
                processed,
                processed_total = progress.processed_total,
                "Job completed"
            );
            sink.log("Finished processing all items.");
        } else {
            self.store.set_progress(&progress_key, &progress).await?;
            info!(job = %job.id, processed, remaining, "Batch finished");
            sink.log(format!(
                "Finished processing {} items. {} remaining.",
                processed, remaining
            ));
            if progress.is_stalled(self.settings.stall_threshold) {
                warn!(
                    job = %job.id,
                    stalled_invocations = progress.stalled_invocations,
                    remaining,
                    "No item succeeded across consecutive invocations"
                );
                sink.log(format!(
                    "Stalled: no item succeeded in {} consecutive invocations.",
                    progress.stalled_invocations
                ));
            }
        }

        Ok(Outcome::Ran {
            processed,
            remaining,
            stalled_invocations: progress.stalled_invocations,
            completed_at: progress.completed_at,
        })
    }

    /// Walk `queue` in order until `batch_size` items succeed.
    /// Returns the number of successes.
    async fn process_chunk(
        &self,
        job: &Job,
        definition: &dyn JobDefinition,
        queue: &Queue,
        checkpoint_key: &str,
        sink: &mut LogSink,
    ) -> Result<usize> {
        let mut succeeded: Vec<&Item> = Vec::new();

        for item in queue {
            // Duplicates of an item that already succeeded are gone from the checkpoint
            if succeeded.contains(&item) {
                continue;
            }

            if definition.process_item(item, sink.buffer_mut()).await? {
                let removed = self.remove_item(checkpoint_key, item).await?;
                succeeded.push(item);
                debug!(job = %job.id, removed, "Item processed");
                sink.log(format!("Processed item: {}", item));

                if succeeded.len() == job.batch_size {
                    break;
                }
            } else {
                debug!(job = %job.id, "Item not processed; leaving it queued");
                sink.log(format!("Failed to process item (will retry): {}", item));
            }
        }

        Ok(succeeded.len())
    }

    /// Re-fetch, drop every copy of `item`, store back
    async fn remove_item(&self, checkpoint_key: &str, item: &Item) -> Result<usize> {
        let mut queue = self.store.get(checkpoint_key).await?.unwrap_or_default();
        let removed = queue.remove_all(item);
        self.store.set(checkpoint_key, &queue, Ttl::Never).await?;
        Ok(removed)
    }

    async fn signal(&self, job: &Job, outcome: Outcome) -> ContinuationSignal {
        let signal = match outcome {
            Outcome::AlreadyCompleted { completed_at } => {
                ContinuationSignal::already_completed(&job.identifier, completed_at)
            }
            Outcome::Ran {
                processed,
                remaining: 0,
                completed_at,
                ..
            } => ContinuationSignal::complete(
                &job.identifier,
                processed,
                completed_at.unwrap_or_else(|| self.time_provider.now_millis()),
            ),
            Outcome::Ran {
                processed,
                remaining,
                stalled_invocations,
                ..
            } => ContinuationSignal::incomplete(
                &job.identifier,
                processed,
                remaining,
                self.settings.retry_after,
            )
            .with_stall(stalled_invocations, self.settings.stall_threshold),
        };

        signal.with_memory(self.probe.memory_usage().await)
    }

    /// Fails the way `process` would if the job's scope is not admitted
    pub fn check_scope(&self, job: &Job) -> Result<()> {
        ScopeGuard::enter(self.scopes.as_ref(), job.scope.as_deref()).map(drop)
    }

    /// Read-only view of the job's persisted state
    pub async fn status(&self, job: &Job) -> Result<JobStatus> {
        let _scope = ScopeGuard::enter(self.scopes.as_ref(), job.scope.as_deref())?;
        let remaining = self
            .store
            .get(&job.checkpoint_key())
            .await?
            .map(|q| q.len())
            .unwrap_or(0);
        let progress = self.store.get_progress(&job.progress_key()).await?;
        Ok(JobStatus::new(&job.identifier, remaining, progress))
    }

    /// Forget the job entirely. The next invocation reloads from `load_data`.
    /// Returns whether anything was stored.
    pub async fn reset(&self, job: &Job) -> Result<bool> {
        let _lock = self.locks.acquire(&job.checkpoint_key()).await;
        let _scope = ScopeGuard::enter(self.scopes.as_ref(), job.scope.as_deref())?;

        let existed = self.store.get(&job.checkpoint_key()).await?.is_some()
            || self.store.get_progress(&job.progress_key()).await?.is_some();

        self.store.delete(&job.checkpoint_key()).await?;
        self.store.delete_progress(&job.progress_key()).await?;

        info!(job = %job.id, existed, "Job reset");
        Ok(existed)
    }
}
