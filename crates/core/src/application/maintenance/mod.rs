// Maintenance Service
// Periodic cleanup of the checkpoint store: expired checkpoints and VACUUM

use crate::application::shutdown::ShutdownToken;
use crate::error::Result;
use crate::port::{Maintenance, MaintenanceConfig, MaintenanceStats};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

/// Maintenance scheduler
///
/// Runs full maintenance in the background every `interval`
pub struct MaintenanceScheduler {
    maintenance: Arc<dyn Maintenance>,
    config: MaintenanceConfig,
    interval: Duration,
}

impl MaintenanceScheduler {
    pub fn new(
        maintenance: Arc<dyn Maintenance>,
        config: MaintenanceConfig,
        interval: Duration,
    ) -> Self {
        Self {
            maintenance,
            config,
            interval,
        }
    }

    /// Maintenance loop. The first run happens immediately.
    /// Returns when `shutdown` fires.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            max_db_size_mb = self.config.max_db_size_mb,
            "Maintenance scheduler started"
        );

        let mut tick = interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = shutdown.wait() => {
                    info!("Maintenance scheduler stopped");
                    return;
                }
            }

            match self.run_now().await {
                Ok(_) => {}
                Err(e) => error!(error = ?e, "Scheduled maintenance failed"),
            }
        }
    }

    /// Run maintenance immediately (manual trigger)
    pub async fn run_now(&self) -> Result<MaintenanceStats> {
        let stats = self.maintenance.run_full_maintenance(&self.config).await?;

        info!(
            db_size_mb = stats.db_size_mb,
            checkpoints = stats.checkpoint_count,
            completed_jobs = stats.completed_job_count,
            "Maintenance run finished"
        );

        Ok(stats)
    }
}
