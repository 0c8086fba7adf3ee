//! Chunkwise Daemon - Main Entry Point
//! Serves the batch engine over JSON-RPC; drivers (the CLI) re-invoke it until jobs drain.

mod config;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chunkwise_api_rpc::{RpcHandler, RpcServer, RpcServerConfig, TokenAccessGate};
use chunkwise_core::application::{shutdown_channel, BatchEngine, JobRegistry, MaintenanceScheduler};
use chunkwise_core::port::SystemTimeProvider;
use chunkwise_infra_sqlite::{create_pool, run_migrations, SqliteCheckpointStore, SqliteMaintenance};
use chunkwise_infra_system::{
    json_import_factory, AllowlistScopeSwitcher, FileLogStore, SystemResourceProbe,
    JSON_IMPORT_JOB_TYPE,
};
use config::DaemonConfig;

fn init_logging(format: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("chunkwise=info"))
        .context("Failed to create env filter")?;

    match format {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().pretty())
            .init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration + logging
    let config = DaemonConfig::from_env()?;
    init_logging(&config.log_format)?;

    info!("Chunkwise v{} starting...", chunkwise_core::VERSION);

    if config.access_tokens.is_empty() && !config.allow_anonymous {
        warn!("No CHUNKWISE_ACCESS_TOKENS configured and anonymous access disabled: every request will be rejected");
    }

    // 2. Checkpoint database
    if let Some(parent) = config.db_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Cannot create {}", parent.display()))?;
    }
    let db_url = format!("sqlite://{}", config.db_path.display());
    info!(db_path = %config.db_path.display(), "Opening checkpoint store...");

    let pool = create_pool(&db_url)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 3. DI wiring
    let time_provider = Arc::new(SystemTimeProvider);
    let store = Arc::new(SqliteCheckpointStore::new(pool.clone(), time_provider.clone()));
    let log_store = Arc::new(FileLogStore::new(config.log_dir.clone()));
    let maintenance = Arc::new(SqliteMaintenance::new(pool.clone(), time_provider.clone()));

    let engine = Arc::new(BatchEngine::new(
        store,
        log_store.clone(),
        Arc::new(AllowlistScopeSwitcher::new(config.scopes.clone())),
        Arc::new(SystemResourceProbe::new(config.memory_limit_bytes)),
        time_provider,
        config.engine.clone(),
    ));

    let mut registry = JobRegistry::new();
    registry.register(JSON_IMPORT_JOB_TYPE, json_import_factory());
    info!(job_types = ?registry.job_types(), "Job types registered");

    let handler = RpcHandler::new(
        engine,
        Arc::new(registry),
        Arc::new(TokenAccessGate::new(
            config.access_tokens.clone(),
            config.allow_anonymous,
        )),
        log_store,
        maintenance.clone(),
    )
    .with_rate_limit(config.rate_limit_burst, config.rate_limit_rate)
    .with_maintenance_config(config.maintenance.clone());

    // 4. JSON-RPC server
    let rpc_config = RpcServerConfig {
        port: config.rpc_port,
        ..Default::default()
    };
    let (addr, rpc_handle) = RpcServer::new(rpc_config, handler)
        .start()
        .await
        .context("RPC server start failed")?;

    // 5. Maintenance scheduler
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let scheduler = MaintenanceScheduler::new(
        maintenance,
        config.maintenance.clone(),
        config.maintenance_interval,
    );
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    info!(addr = %addr, log_dir = %config.log_dir.display(), "Ready. Press Ctrl+C to shutdown");

    // 6. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .context("RPC server stop failed")?;
    rpc_handle.stopped().await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), scheduler_handle).await;
    pool.close().await;

    info!("Shutdown complete.");
    Ok(())
}
