// Port Layer - Interfaces for external collaborators

pub mod access_gate;
pub mod checkpoint_store;
pub mod job_definition;
pub mod log_store;
pub mod maintenance;
pub mod resource_probe;
pub mod scope;
pub mod time_provider;

// Re-exports
pub use access_gate::{AccessGate, AllowAll, Credentials, DenyAll};
pub use checkpoint_store::{CheckpointStore, Ttl};
pub use job_definition::{FnJob, FnJobBuilder, JobDefinition};
pub use log_store::LogStore;
pub use maintenance::{Maintenance, MaintenanceConfig, MaintenanceStats};
pub use resource_probe::{MemoryUsage, ResourceProbe};
pub use scope::{NoopScopeSwitcher, ScopeSwitcher};
pub use time_provider::{SystemTimeProvider, TimeProvider};
