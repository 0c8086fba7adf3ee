// Resource probe port
// Diagnostics only: reported with every continuation signal, never used for decisions.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Memory diagnostics of the running process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    /// Highest resident memory observed for this process
    pub peak_bytes: u64,
    /// Configured memory ceiling, if any
    pub limit_bytes: Option<u64>,
}

impl MemoryUsage {
    pub fn peak_mib(&self) -> f64 {
        self.peak_bytes as f64 / 1024.0 / 1024.0
    }

    pub fn limit_mib(&self) -> Option<f64> {
        self.limit_bytes.map(|b| b as f64 / 1024.0 / 1024.0)
    }
}

/// Resource probe port
#[async_trait]
pub trait ResourceProbe: Send + Sync {
    /// Current peak memory and ceiling
    async fn memory_usage(&self) -> MemoryUsage;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;

    /// Probe returning a fixed reading
    pub struct FixedResourceProbe {
        usage: MemoryUsage,
    }

    impl FixedResourceProbe {
        pub fn new(peak_bytes: u64, limit_bytes: Option<u64>) -> Self {
            Self {
                usage: MemoryUsage {
                    peak_bytes,
                    limit_bytes,
                },
            }
        }
    }

    impl Default for FixedResourceProbe {
        fn default() -> Self {
            Self::new(32 * 1024 * 1024, Some(256 * 1024 * 1024))
        }
    }

    #[async_trait]
    impl ResourceProbe for FixedResourceProbe {
        async fn memory_usage(&self) -> MemoryUsage {
            self.usage
        }
    }
}
