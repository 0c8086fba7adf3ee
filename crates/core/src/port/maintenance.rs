// Checkpoint store maintenance port
use crate::error::Result;
use async_trait::async_trait;

/// Store maintenance statistics
#[derive(Debug, Clone)]
pub struct MaintenanceStats {
    pub db_size_mb: f64,
    pub db_size_bytes: i64,
    pub checkpoint_count: i64,
    pub expired_checkpoint_count: i64,
    pub completed_job_count: i64,
    pub fragmentation_percent: f64,
}

/// Maintenance configuration
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Maximum DB size before forcing VACUUM (MB)
    pub max_db_size_mb: f64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            max_db_size_mb: 512.0,
        }
    }
}

#[async_trait]
pub trait Maintenance: Send + Sync {
    /// Run VACUUM. Returns space reclaimed in MB
    async fn vacuum(&self) -> Result<f64>;

    /// Delete checkpoints whose TTL has passed. Returns rows deleted
    async fn purge_expired_checkpoints(&self) -> Result<i64>;

    async fn get_stats(&self) -> Result<MaintenanceStats>;

    /// Purge expired checkpoints, VACUUM when the store has grown past the
    /// configured size. Completion markers are never touched.
    async fn run_full_maintenance(&self, config: &MaintenanceConfig) -> Result<MaintenanceStats> {
        let stats_before = self.get_stats().await?;

        let expired = self.purge_expired_checkpoints().await?;

        let reclaimed_mb = if stats_before.db_size_mb > config.max_db_size_mb {
            self.vacuum().await?
        } else {
            0.0
        };

        let stats_after = self.get_stats().await?;

        tracing::info!(
            expired_checkpoints = expired,
            completed_jobs = stats_after.completed_job_count,
            reclaimed_mb = reclaimed_mb,
            db_size_mb = stats_after.db_size_mb,
            "Maintenance completed"
        );

        Ok(stats_after)
    }
}
