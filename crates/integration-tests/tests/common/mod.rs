//! Shared wiring for the integration tests: real SQLite store, real log files.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chunkwise_core::application::{BatchEngine, EngineSettings};
use chunkwise_core::port::{NoopScopeSwitcher, ScopeSwitcher, SystemTimeProvider, TimeProvider};
use chunkwise_infra_sqlite::{create_pool, run_migrations, SqliteCheckpointStore};
use chunkwise_infra_system::{FileLogStore, SystemResourceProbe};
use sqlx::SqlitePool;
use tempfile::TempDir;

pub struct Env {
    pub dir: TempDir,
    pub db_url: String,
}

impl Env {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_url = format!("sqlite://{}", dir.path().join("checkpoints.db").display());
        Self { dir, db_url }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.dir.path().join("logs")
    }

    pub fn log_file(&self, slug: &str) -> PathBuf {
        self.log_dir().join(format!("batch_{}.log", slug))
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    pub async fn pool(&self) -> SqlitePool {
        let pool = create_pool(&self.db_url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    /// A fresh engine over the same database, as a new process would build it
    pub async fn engine(&self) -> (BatchEngine, SqlitePool) {
        self.engine_with_scopes(Arc::new(NoopScopeSwitcher)).await
    }

    pub async fn engine_with_scopes(
        &self,
        scopes: Arc<dyn ScopeSwitcher>,
    ) -> (BatchEngine, SqlitePool) {
        self.engine_with(scopes, Arc::new(SystemTimeProvider)).await
    }

    pub async fn engine_with(
        &self,
        scopes: Arc<dyn ScopeSwitcher>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> (BatchEngine, SqlitePool) {
        let pool = self.pool().await;
        let engine = BatchEngine::new(
            Arc::new(SqliteCheckpointStore::new(pool.clone(), Arc::clone(&time_provider))),
            Arc::new(FileLogStore::new(self.log_dir())),
            scopes,
            Arc::new(SystemResourceProbe::new(Some(512 * 1024 * 1024))),
            time_provider,
            EngineSettings::default(),
        );
        (engine, pool)
    }
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}
