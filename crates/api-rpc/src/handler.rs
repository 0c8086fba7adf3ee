//! RPC Method Handlers
//!
//! Every method checks the access gate first: a denied caller never reaches
//! the engine, the registry or the store.

use crate::error::{throttled, to_rpc_error};
use crate::rate_limiter::RateLimiter;
use crate::types::{
    JobSelector, MaintenanceRequest, MaintenanceResponse, ProcessRequest, ProcessResponse,
    ResetRequest, ResetResponse, ResponseFormat, StatusRequest, StatusResponse, TailLogsRequest,
    TailLogsResponse,
};
use chunkwise_core::application::{BatchEngine, JobRegistry};
use chunkwise_core::domain::Job;
use chunkwise_core::error::{AppError, Result};
use chunkwise_core::port::{AccessGate, Credentials, LogStore, Maintenance, MaintenanceConfig};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tracing::{info, warn};

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    engine: Arc<BatchEngine>,
    registry: Arc<JobRegistry>,
    gate: Arc<dyn AccessGate>,
    log_store: Arc<dyn LogStore>,
    maintenance: Arc<dyn Maintenance>,
    maintenance_config: MaintenanceConfig,
    rate_limiter: RateLimiter,
}

impl RpcHandler {
    pub fn new(
        engine: Arc<BatchEngine>,
        registry: Arc<JobRegistry>,
        gate: Arc<dyn AccessGate>,
        log_store: Arc<dyn LogStore>,
        maintenance: Arc<dyn Maintenance>,
    ) -> Self {
        Self {
            engine,
            registry,
            gate,
            log_store,
            maintenance,
            maintenance_config: MaintenanceConfig::default(),
            rate_limiter: RateLimiter::new(200, 100),
        }
    }

    pub fn with_rate_limit(mut self, burst: u32, rate_per_sec: u32) -> Self {
        self.rate_limiter = RateLimiter::new(burst, rate_per_sec);
        self
    }

    pub fn with_maintenance_config(mut self, config: MaintenanceConfig) -> Self {
        self.maintenance_config = config;
        self
    }

    fn admit(&self, credentials: &Credentials) -> std::result::Result<(), ErrorObjectOwned> {
        self.gate.check(credentials).map_err(|e| {
            warn!(error = %e, "Request rejected by access gate");
            to_rpc_error(e)
        })
    }

    fn job(selector: &JobSelector) -> Result<Job> {
        Ok(Job::new(selector.job_config())?)
    }

    /// batch.process.v1
    pub async fn process(
        &self,
        params: ProcessRequest,
    ) -> std::result::Result<ProcessResponse, ErrorObjectOwned> {
        self.admit(&params.job.credentials())?;

        if !self.rate_limiter.check() {
            return Err(throttled());
        }

        let job = Job::new(params.job_config())
            .map_err(AppError::from)
            .map_err(to_rpc_error)?;
        let definition = self
            .registry
            .resolve(&params.job_type, &params.params)
            .map_err(to_rpc_error)?;

        let signal = self
            .engine
            .process(&job, definition.as_ref())
            .await
            .map_err(|e| {
                warn!(job = %job.id, error = %e, "Invocation failed");
                to_rpc_error(e)
            })?;

        info!(
            job = %job.id,
            processed = signal.processed,
            remaining = signal.remaining,
            keep_going = signal.should_continue(),
            "Invocation finished"
        );

        let html = match params.format {
            ResponseFormat::Html => Some(signal.render_html()),
            ResponseFormat::Json => None,
        };

        Ok(ProcessResponse {
            log_path: self.log_store.location(&job.id),
            signal,
            html,
        })
    }

    /// batch.status.v1
    pub async fn status(
        &self,
        params: StatusRequest,
    ) -> std::result::Result<StatusResponse, ErrorObjectOwned> {
        self.admit(&params.job.credentials())?;

        let job = Self::job(&params.job).map_err(to_rpc_error)?;
        let status = self.engine.status(&job).await.map_err(to_rpc_error)?;

        Ok(StatusResponse {
            identifier: status.identifier,
            phase: status.phase,
            remaining: status.remaining,
            progress: status.progress,
            log_path: self.log_store.location(&job.id),
        })
    }

    /// batch.reset.v1
    pub async fn reset(
        &self,
        params: ResetRequest,
    ) -> std::result::Result<ResetResponse, ErrorObjectOwned> {
        self.admit(&params.job.credentials())?;

        let job = Self::job(&params.job).map_err(to_rpc_error)?;
        let cleared = self.engine.reset(&job).await.map_err(to_rpc_error)?;

        Ok(ResetResponse {
            identifier: job.identifier,
            cleared,
        })
    }

    /// logs.tail.v1
    pub async fn tail_logs(
        &self,
        params: TailLogsRequest,
    ) -> std::result::Result<TailLogsResponse, ErrorObjectOwned> {
        self.admit(&params.job.credentials())?;

        let job = Self::job(&params.job).map_err(to_rpc_error)?;
        self.engine.check_scope(&job).map_err(to_rpc_error)?;
        let lines = self
            .log_store
            .tail(&job.id, params.lines)
            .await
            .map_err(to_rpc_error)?;

        Ok(TailLogsResponse {
            log_path: self.log_store.location(&job.id),
            identifier: job.identifier,
            lines,
        })
    }

    /// admin.maintenance.v1
    pub async fn maintenance(
        &self,
        params: MaintenanceRequest,
    ) -> std::result::Result<MaintenanceResponse, ErrorObjectOwned> {
        self.admit(&Credentials {
            token: params.token.clone(),
        })?;

        let stats_before = self.maintenance.get_stats().await.map_err(to_rpc_error)?;

        let expired_checkpoints_deleted = self
            .maintenance
            .purge_expired_checkpoints()
            .await
            .map_err(to_rpc_error)?;

        let vacuum_run = params.force_vacuum
            || stats_before.db_size_mb > self.maintenance_config.max_db_size_mb;
        if vacuum_run {
            self.maintenance.vacuum().await.map_err(to_rpc_error)?;
        }

        let stats_after = self.maintenance.get_stats().await.map_err(to_rpc_error)?;

        Ok(MaintenanceResponse {
            vacuum_run,
            expired_checkpoints_deleted,
            completed_jobs: stats_after.completed_job_count,
            db_size_before: stats_before.db_size_bytes,
            db_size_after: stats_after.db_size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code;
    use crate::gate::TokenAccessGate;
    use crate::types::JobSelector;
    use chunkwise_core::application::EngineSettings;
    use chunkwise_core::port::checkpoint_store::mocks::InMemoryCheckpointStore;
    use chunkwise_core::port::job_definition::mocks::ScriptedJob;
    use chunkwise_core::port::log_store::mocks::InMemoryLogStore;
    use chunkwise_core::port::resource_probe::mocks::FixedResourceProbe;
    use chunkwise_core::port::{
        CheckpointStore, JobDefinition, MaintenanceStats, NoopScopeSwitcher, ScopeSwitcher,
        SystemTimeProvider,
    };
    use chunkwise_core::port::scope::mocks::RecordingScopeSwitcher;

    struct NoMaintenance;

    #[async_trait::async_trait]
    impl Maintenance for NoMaintenance {
        async fn vacuum(&self) -> Result<f64> {
            Ok(0.0)
        }

        async fn purge_expired_checkpoints(&self) -> Result<i64> {
            Ok(0)
        }

        async fn get_stats(&self) -> Result<MaintenanceStats> {
            Ok(MaintenanceStats {
                db_size_mb: 0.0,
                db_size_bytes: 0,
                checkpoint_count: 0,
                expired_checkpoint_count: 0,
                completed_job_count: 0,
                fragmentation_percent: 0.0,
            })
        }
    }

    struct Fixture {
        handler: RpcHandler,
        store: Arc<InMemoryCheckpointStore>,
        job: Arc<ScriptedJob>,
    }

    fn fixture() -> Fixture {
        fixture_with_scopes(Arc::new(NoopScopeSwitcher))
    }

    fn fixture_with_scopes(scopes: Arc<dyn ScopeSwitcher>) -> Fixture {
        let store = Arc::new(InMemoryCheckpointStore::new());
        let log_store = Arc::new(InMemoryLogStore::new());
        let engine = Arc::new(BatchEngine::new(
            store.clone(),
            log_store.clone(),
            scopes,
            Arc::new(FixedResourceProbe::default()),
            Arc::new(SystemTimeProvider),
            EngineSettings::default(),
        ));

        let job = Arc::new(ScriptedJob::named(&["A", "B", "C"]));
        let mut registry = JobRegistry::new();
        registry.register_definition("users", job.clone() as Arc<dyn JobDefinition>);

        let handler = RpcHandler::new(
            engine,
            Arc::new(registry),
            Arc::new(TokenAccessGate::new(["s3cret"], false)),
            log_store,
            Arc::new(NoMaintenance),
        );

        Fixture {
            handler,
            store,
            job,
        }
    }

    fn selector(token: Option<&str>) -> JobSelector {
        JobSelector {
            identifier: Some("User Import".to_string()),
            scope: None,
            token: token.map(str::to_string),
        }
    }

    fn process_request(token: Option<&str>) -> ProcessRequest {
        ProcessRequest {
            job: selector(token),
            job_type: "users".to_string(),
            params: serde_json::Value::Null,
            batch_size: Some(2),
            restart: false,
            format: ResponseFormat::Json,
        }
    }

    #[tokio::test]
    async fn test_denied_caller_gets_not_found_and_touches_nothing() {
        let f = fixture();

        let err = f.handler.process(process_request(Some("guess"))).await.unwrap_err();
        assert_eq!(err.code(), code::NOT_FOUND);

        let err = f.handler.process(process_request(None)).await.unwrap_err();
        assert_eq!(err.code(), code::NOT_FOUND);

        assert_eq!(f.job.load_calls(), 0);
        assert!(f.store.get("user-import_data").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_process_and_status() {
        let f = fixture();

        let resp = f.handler.process(process_request(Some("s3cret"))).await.unwrap();
        assert!(resp.signal.should_continue());
        assert_eq!(resp.signal.remaining, 1);
        assert!(resp.html.is_none());

        let status = f
            .handler
            .status(StatusRequest {
                job: selector(Some("s3cret")),
            })
            .await
            .unwrap();
        assert_eq!(status.remaining, 1);
        assert_eq!(status.progress.unwrap().processed_total, 2);
    }

    #[tokio::test]
    async fn test_html_format() {
        let f = fixture();
        let mut req = process_request(Some("s3cret"));
        req.format = ResponseFormat::Html;

        let resp = f.handler.process(req).await.unwrap();
        let html = resp.html.unwrap();
        assert!(html.contains("<title>User Import</title>"));
        assert!(html.contains(r#"http-equiv="refresh""#));
    }

    #[tokio::test]
    async fn test_invalid_batch_size_is_validation_error() {
        let f = fixture();
        let mut req = process_request(Some("s3cret"));
        req.batch_size = Some(0);

        let err = f.handler.process(req).await.unwrap_err();
        assert_eq!(err.code(), code::VALIDATION_ERROR);
        assert_eq!(f.job.load_calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_job_type_is_not_implemented() {
        let f = fixture();
        let mut req = process_request(Some("s3cret"));
        req.job_type = "nope".to_string();

        let err = f.handler.process(req).await.unwrap_err();
        assert_eq!(err.code(), code::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_store_failure_is_store_error() {
        let f = fixture();
        f.store.set_unavailable(true);

        let err = f
            .handler
            .process(process_request(Some("s3cret")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::STORE_ERROR);
    }

    #[tokio::test]
    async fn test_throttled() {
        let f = fixture();
        let handler = f.handler.with_rate_limit(1, 0);

        handler.process(process_request(Some("s3cret"))).await.unwrap();
        let err = handler
            .process(process_request(Some("s3cret")))
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::THROTTLED);
    }

    #[tokio::test]
    async fn test_reset_and_tail() {
        let f = fixture();
        f.handler.process(process_request(Some("s3cret"))).await.unwrap();

        let tail = f
            .handler
            .tail_logs(TailLogsRequest {
                job: selector(Some("s3cret")),
                lines: 1,
            })
            .await
            .unwrap();
        assert_eq!(tail.lines.len(), 1);

        let reset = f
            .handler
            .reset(ResetRequest {
                job: selector(Some("s3cret")),
            })
            .await
            .unwrap();
        assert!(reset.cleared);

        let err = f
            .handler
            .reset(ResetRequest {
                job: selector(None),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rejected_scope_is_not_found_everywhere() {
        let scopes = Arc::new(RecordingScopeSwitcher::new());
        scopes.reject("other-tenant");
        let f = fixture_with_scopes(scopes);
        let scoped = JobSelector {
            scope: Some("other-tenant".to_string()),
            ..selector(Some("s3cret"))
        };

        let err = f
            .handler
            .status(StatusRequest { job: scoped.clone() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::NOT_FOUND);

        let err = f
            .handler
            .reset(ResetRequest { job: scoped.clone() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::NOT_FOUND);

        let err = f
            .handler
            .tail_logs(TailLogsRequest {
                job: scoped,
                lines: 10,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_maintenance_requires_token() {
        let f = fixture();
        let err = f
            .handler
            .maintenance(MaintenanceRequest {
                token: None,
                force_vacuum: true,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::NOT_FOUND);

        let resp = f
            .handler
            .maintenance(MaintenanceRequest {
                token: Some("s3cret".to_string()),
                force_vacuum: true,
            })
            .await
            .unwrap();
        assert!(resp.vacuum_run);
    }
}
