// Job Progress Domain Model
// Persisted next to the queue checkpoint so "never started" and
// "completed" are distinguishable once the queue is gone.

use serde::{Deserialize, Serialize};

/// Durable progress record of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    pub started_at: i64, // epoch ms
    pub invocations: u64,
    pub processed_total: u64,

    /// Consecutive invocations that left work behind without a single success
    pub stalled_invocations: u32,

    pub completed_at: Option<i64>, // epoch ms, terminal marker
    pub updated_at: i64,
}

impl JobProgress {
    pub fn new(now_millis: i64) -> Self {
        Self {
            started_at: now_millis,
            invocations: 0,
            processed_total: 0,
            stalled_invocations: 0,
            completed_at: None,
            updated_at: now_millis,
        }
    }

    /// Account for one finished invocation
    pub fn record_invocation(&mut self, processed: usize, remaining: usize, now_millis: i64) {
        self.invocations += 1;
        self.processed_total += processed as u64;
        self.updated_at = now_millis;

        if processed == 0 && remaining > 0 {
            self.stalled_invocations = self.stalled_invocations.saturating_add(1);
        } else {
            self.stalled_invocations = 0;
        }
    }

    /// Set the terminal marker
    pub fn complete(&mut self, now_millis: i64) {
        self.completed_at = Some(now_millis);
        self.updated_at = now_millis;
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_stalled(&self, threshold: u32) -> bool {
        threshold > 0 && self.stalled_invocations >= threshold
    }
}

/// Lifecycle phase as observed from storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPhase {
    NotStarted,
    InProgress,
    Completed,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::NotStarted => write!(f, "NOT_STARTED"),
            JobPhase::InProgress => write!(f, "IN_PROGRESS"),
            JobPhase::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// Read-only snapshot of a job's persisted state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub identifier: String,
    pub phase: JobPhase,
    pub remaining: usize,
    pub progress: Option<JobProgress>,
}

impl JobStatus {
    pub fn new(identifier: impl Into<String>, remaining: usize, progress: Option<JobProgress>) -> Self {
        let phase = match &progress {
            Some(p) if p.is_completed() => JobPhase::Completed,
            Some(_) => JobPhase::InProgress,
            None if remaining > 0 => JobPhase::InProgress,
            None => JobPhase::NotStarted,
        };
        Self {
            identifier: identifier.into(),
            phase,
            remaining,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stall_counter_increments_and_resets() {
        let mut progress = JobProgress::new(1000);

        progress.record_invocation(0, 4, 2000);
        progress.record_invocation(0, 4, 3000);
        assert_eq!(progress.stalled_invocations, 2);
        assert!(progress.is_stalled(2));
        assert!(!progress.is_stalled(3));

        progress.record_invocation(1, 3, 4000);
        assert_eq!(progress.stalled_invocations, 0);
        assert_eq!(progress.processed_total, 1);
        assert_eq!(progress.invocations, 3);
    }

    #[test]
    fn test_empty_queue_is_not_a_stall() {
        let mut progress = JobProgress::new(0);
        progress.record_invocation(0, 0, 10);
        assert_eq!(progress.stalled_invocations, 0);
    }

    #[test]
    fn test_status_phase() {
        assert_eq!(JobStatus::new("x", 0, None).phase, JobPhase::NotStarted);

        let mut progress = JobProgress::new(0);
        assert_eq!(
            JobStatus::new("x", 3, Some(progress.clone())).phase,
            JobPhase::InProgress
        );

        progress.complete(50);
        assert_eq!(JobStatus::new("x", 0, Some(progress)).phase, JobPhase::Completed);
    }
}
