// Daemon configuration, read from CHUNKWISE_* environment variables

use anyhow::{Context, Result};
use chunkwise_api_rpc::server::DEFAULT_RPC_PORT;
use chunkwise_core::application::engine::constants::{
    DEFAULT_MAINTENANCE_INTERVAL_HOURS, DEFAULT_RETRY_AFTER, DEFAULT_STALL_THRESHOLD,
};
use chunkwise_core::application::EngineSettings;
use chunkwise_core::port::MaintenanceConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "~/.chunkwise/checkpoints.db";
const DEFAULT_LOG_DIR: &str = "/tmp";
const DEFAULT_RATE_LIMIT_BURST: u32 = 200;
const DEFAULT_RATE_LIMIT_RATE: u32 = 100;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub db_path: PathBuf,
    pub rpc_port: u16,
    pub log_dir: PathBuf,
    pub log_format: String,
    pub access_tokens: Vec<String>,
    pub allow_anonymous: bool,
    pub scopes: Vec<String>,
    pub memory_limit_bytes: Option<u64>,
    pub engine: EngineSettings,
    pub rate_limit_burst: u32,
    pub rate_limit_rate: u32,
    pub maintenance: MaintenanceConfig,
    pub maintenance_interval: Duration,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let path = |key: &str, default: &str| -> PathBuf {
            let raw = var(key).unwrap_or_else(|| default.to_string());
            PathBuf::from(shellexpand::tilde(&raw).into_owned())
        };

        let list = |key: &str| -> Vec<String> {
            var(key)
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default()
        };

        let retry_after = parse::<u64>(&var, "CHUNKWISE_RETRY_AFTER_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_RETRY_AFTER);
        let maintenance_hours = parse::<u64>(&var, "CHUNKWISE_MAINTENANCE_INTERVAL_HOURS")?
            .unwrap_or(DEFAULT_MAINTENANCE_INTERVAL_HOURS);

        let maintenance_interval = maintenance_hours
            .checked_mul(3600)
            .map(Duration::from_secs)
            .context("CHUNKWISE_MAINTENANCE_INTERVAL_HOURS is too large")?;

        let mut maintenance = MaintenanceConfig::default();
        if let Some(mb) = parse::<f64>(&var, "CHUNKWISE_MAX_DB_SIZE_MB")? {
            maintenance.max_db_size_mb = mb;
        }

        let memory_limit_bytes = parse::<u64>(&var, "CHUNKWISE_MEMORY_LIMIT_MB")?
            .map(|mb| {
                mb.checked_mul(1024 * 1024)
                    .context("CHUNKWISE_MEMORY_LIMIT_MB is too large")
            })
            .transpose()?;

        Ok(Self {
            db_path: path("CHUNKWISE_DB_PATH", DEFAULT_DB_PATH),
            rpc_port: parse(&var, "CHUNKWISE_RPC_PORT")?.unwrap_or(DEFAULT_RPC_PORT),
            log_dir: path("CHUNKWISE_LOG_DIR", DEFAULT_LOG_DIR),
            log_format: var("CHUNKWISE_LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
            access_tokens: list("CHUNKWISE_ACCESS_TOKENS"),
            allow_anonymous: matches!(
                var("CHUNKWISE_ALLOW_ANONYMOUS").as_deref(),
                Some("1" | "true" | "yes")
            ),
            scopes: list("CHUNKWISE_SCOPES"),
            memory_limit_bytes,
            engine: EngineSettings {
                retry_after,
                stall_threshold: parse(&var, "CHUNKWISE_STALL_THRESHOLD")?
                    .unwrap_or(DEFAULT_STALL_THRESHOLD),
            },
            rate_limit_burst: parse(&var, "CHUNKWISE_RATE_LIMIT_BURST")?
                .unwrap_or(DEFAULT_RATE_LIMIT_BURST),
            rate_limit_rate: parse(&var, "CHUNKWISE_RATE_LIMIT_RATE")?
                .unwrap_or(DEFAULT_RATE_LIMIT_RATE),
            maintenance,
            maintenance_interval,
        })
    }
}

fn parse<T>(var: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{} has an invalid value: {:?}", key, raw))
        })
        .transpose()
}
