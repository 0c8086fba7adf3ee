// SQLite Maintenance Implementation
use crate::error::map_sqlx_error;
use async_trait::async_trait;
use chunkwise_core::error::Result;
use chunkwise_core::port::{Maintenance, MaintenanceStats, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// SQLite maintenance implementation
pub struct SqliteMaintenance {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteMaintenance {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    async fn pragma(&self, name: &str) -> Result<i64> {
        let sql = format!("PRAGMA {}", name);
        let value: i64 = sqlx::query_scalar(&sql)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(value)
    }

    /// DB size in bytes (page_count * page_size)
    async fn db_size_bytes(&self) -> Result<i64> {
        Ok(self.pragma("page_count").await? * self.pragma("page_size").await?)
    }
}

fn bytes_to_mb(bytes: i64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[async_trait]
impl Maintenance for SqliteMaintenance {
    async fn vacuum(&self) -> Result<f64> {
        let size_before = self.db_size_bytes().await?;

        sqlx::query("VACUUM")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let size_after = self.db_size_bytes().await?;
        let reclaimed = bytes_to_mb((size_before - size_after).max(0));

        info!(
            size_before_mb = bytes_to_mb(size_before),
            size_after_mb = bytes_to_mb(size_after),
            reclaimed_mb = reclaimed,
            "VACUUM completed"
        );

        Ok(reclaimed)
    }

    async fn purge_expired_checkpoints(&self) -> Result<i64> {
        let now = self.time_provider.now_millis();

        let result =
            sqlx::query("DELETE FROM checkpoints WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        let deleted = result.rows_affected() as i64;
        info!(deleted_checkpoints = deleted, "Expired checkpoints purged");
        Ok(deleted)
    }

    async fn get_stats(&self) -> Result<MaintenanceStats> {
        let now = self.time_provider.now_millis();
        let db_size_bytes = self.db_size_bytes().await?;

        let checkpoint_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM checkpoints")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let expired_checkpoint_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM checkpoints WHERE expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let completed_job_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM job_progress WHERE completed_at IS NOT NULL")
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        let page_count = self.pragma("page_count").await?;
        let freelist_count = self.pragma("freelist_count").await?;
        let fragmentation_percent = if page_count > 0 {
            freelist_count as f64 / page_count as f64 * 100.0
        } else {
            0.0
        };

        Ok(MaintenanceStats {
            db_size_mb: bytes_to_mb(db_size_bytes),
            db_size_bytes,
            checkpoint_count,
            expired_checkpoint_count,
            completed_job_count,
            fragmentation_percent,
        })
    }
}
