//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results.

use chunkwise_core::application::ContinuationSignal;
use chunkwise_core::domain::{JobConfig, JobPhase, JobProgress};
use chunkwise_core::port::Credentials;
use serde::{Deserialize, Serialize};

/// How `batch.process.v1` renders its result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Json,
    Html,
}

/// Job selector shared by every job-scoped method
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSelector {
    pub identifier: Option<String>,
    pub scope: Option<String>,
    pub token: Option<String>,
}

impl JobSelector {
    pub fn credentials(&self) -> Credentials {
        Credentials {
            token: self.token.clone(),
        }
    }

    pub fn job_config(&self) -> JobConfig {
        JobConfig {
            identifier: self.identifier.clone(),
            scope: self.scope.clone(),
            ..JobConfig::default()
        }
    }
}

/// batch.process.v1 - Run one invocation
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessRequest {
    #[serde(flatten)]
    pub job: JobSelector,
    pub job_type: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub batch_size: Option<i64>,
    #[serde(default)]
    pub restart: bool,
    #[serde(default)]
    pub format: ResponseFormat,
}

impl ProcessRequest {
    pub fn job_config(&self) -> JobConfig {
        JobConfig {
            batch_size: self.batch_size,
            restart: self.restart,
            ..self.job.job_config()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    #[serde(flatten)]
    pub signal: ContinuationSignal,
    pub log_path: Option<String>,
    /// Status page, only when `format = "html"`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// batch.status.v1 - Inspect persisted state
#[derive(Debug, Clone, Deserialize)]
pub struct StatusRequest {
    #[serde(flatten)]
    pub job: JobSelector,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub identifier: String,
    pub phase: JobPhase,
    pub remaining: usize,
    pub progress: Option<JobProgress>,
    pub log_path: Option<String>,
}

/// batch.reset.v1 - Forget checkpoint and completion marker
#[derive(Debug, Clone, Deserialize)]
pub struct ResetRequest {
    #[serde(flatten)]
    pub job: JobSelector,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub identifier: String,
    pub cleared: bool,
}

/// logs.tail.v1 - Tail a job's log
#[derive(Debug, Clone, Deserialize)]
pub struct TailLogsRequest {
    #[serde(flatten)]
    pub job: JobSelector,
    #[serde(default = "default_lines")]
    pub lines: usize,
}

fn default_lines() -> usize {
    50
}

#[derive(Debug, Clone, Serialize)]
pub struct TailLogsResponse {
    pub identifier: String,
    pub log_path: Option<String>,
    pub lines: Vec<String>,
}

/// admin.maintenance.v1 - Run maintenance now
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceRequest {
    pub token: Option<String>,
    #[serde(default)]
    pub force_vacuum: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceResponse {
    pub vacuum_run: bool,
    pub expired_checkpoints_deleted: i64,
    /// Completion markers held by the store; maintenance never removes them
    pub completed_jobs: i64,
    pub db_size_before: i64,
    pub db_size_after: i64,
}
