// SQLite CheckpointStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use chunkwise_core::domain::{JobProgress, Queue};
use chunkwise_core::error::{AppError, Result};
use chunkwise_core::port::{CheckpointStore, TimeProvider, Ttl};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

type ProgressRow = (i64, i64, i64, i64, Option<i64>, i64);

pub struct SqliteCheckpointStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteCheckpointStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    fn progress_from_row(row: ProgressRow) -> JobProgress {
        let (started_at, invocations, processed_total, stalled_invocations, completed_at, updated_at) =
            row;
        JobProgress {
            started_at,
            invocations: invocations.max(0) as u64,
            processed_total: processed_total.max(0) as u64,
            stalled_invocations: u32::try_from(stalled_invocations.max(0)).unwrap_or(u32::MAX),
            completed_at,
            updated_at,
        }
    }
}

#[async_trait]
impl CheckpointStore for SqliteCheckpointStore {
    async fn get(&self, key: &str) -> Result<Option<Queue>> {
        let row: Option<(String, Option<i64>)> =
            sqlx::query_as("SELECT items, expires_at FROM checkpoints WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        let Some((items, expires_at)) = row else {
            return Ok(None);
        };

        let now = self.time_provider.now_millis();
        if matches!(expires_at, Some(t) if t <= now) {
            debug!(key, "Checkpoint expired");
            sqlx::query("DELETE FROM checkpoints WHERE key = ? AND expires_at <= ?")
                .bind(key)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
            return Ok(None);
        }

        let queue: Queue =
            serde_json::from_str(&items).map_err(|e| AppError::CorruptCheckpoint {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Some(queue))
    }

    async fn set(&self, key: &str, queue: &Queue, ttl: Ttl) -> Result<()> {
        let now = self.time_provider.now_millis();
        let items = serde_json::to_string(queue)?;

        sqlx::query(
            r#"
            INSERT INTO checkpoints (key, items, item_count, expires_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                items = excluded.items,
                item_count = excluded.item_count,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(items)
        .bind(queue.len() as i64)
        .bind(ttl.expires_at(now))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM checkpoints WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn get_progress(&self, key: &str) -> Result<Option<JobProgress>> {
        let row: Option<ProgressRow> = sqlx::query_as(
            r#"
            SELECT started_at, invocations, processed_total, stalled_invocations,
                   completed_at, updated_at
            FROM job_progress WHERE key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(Self::progress_from_row))
    }

    async fn set_progress(&self, key: &str, progress: &JobProgress) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO job_progress (
                key, started_at, invocations, processed_total,
                stalled_invocations, completed_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                started_at = excluded.started_at,
                invocations = excluded.invocations,
                processed_total = excluded.processed_total,
                stalled_invocations = excluded.stalled_invocations,
                completed_at = excluded.completed_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(progress.started_at)
        .bind(progress.invocations as i64)
        .bind(progress.processed_total as i64)
        .bind(progress.stalled_invocations as i64)
        .bind(progress.completed_at)
        .bind(progress.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete_progress(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM job_progress WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
