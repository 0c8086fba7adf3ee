// Engine constants (no magic values)
use std::time::Duration;

/// Delay the driver waits before re-invoking an incomplete job (1s)
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Consecutive zero-success invocations before a job is flagged as stalled
pub const DEFAULT_STALL_THRESHOLD: u32 = 3;

/// How often the maintenance scheduler runs (hours)
pub const DEFAULT_MAINTENANCE_INTERVAL_HOURS: u64 = 24;
