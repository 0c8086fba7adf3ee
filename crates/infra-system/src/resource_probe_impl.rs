// Resource probe implementation
// reason: sysinfo for cross-platform process memory readings
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use sysinfo::{Pid, System};
use tracing::debug;

use chunkwise_core::port::{MemoryUsage, ResourceProbe};

/// Reports this process's resident memory.
///
/// sysinfo only exposes current usage, so the peak is the highest
/// reading seen by this probe.
pub struct SystemResourceProbe {
    system: Mutex<System>,
    pid: Option<Pid>,
    peak_bytes: AtomicU64,
    limit_bytes: Option<u64>,
}

impl SystemResourceProbe {
    /// `limit_bytes` overrides the detected ceiling: the cgroup limit when
    /// running in a container, otherwise total system memory
    pub fn new(limit_bytes: Option<u64>) -> Self {
        let mut system = System::new();
        system.refresh_memory();
        let limit_bytes = limit_bytes
            .or_else(|| system.cgroup_limits().map(|l| l.total_memory))
            .or_else(|| Some(system.total_memory()).filter(|&total| total > 0));

        Self {
            system: Mutex::new(system),
            pid: sysinfo::get_current_pid().ok(),
            peak_bytes: AtomicU64::new(0),
            limit_bytes,
        }
    }

    fn current_bytes(&self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };
        let mut system = match self.system.lock() {
            Ok(system) => system,
            Err(poisoned) => poisoned.into_inner(),
        };
        system.refresh_process(pid);
        system.process(pid).map(|p| p.memory()).unwrap_or(0)
    }
}

impl Default for SystemResourceProbe {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl ResourceProbe for SystemResourceProbe {
    async fn memory_usage(&self) -> MemoryUsage {
        let current = self.current_bytes();
        let peak = self.peak_bytes.fetch_max(current, Ordering::Relaxed).max(current);

        debug!(current_bytes = current, peak_bytes = peak, "Memory sampled");

        MemoryUsage {
            peak_bytes: peak,
            limit_bytes: self.limit_bytes,
        }
    }
}
