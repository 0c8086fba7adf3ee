// Application Layer - invocation lifecycle and the services around it

pub mod continuation;
pub mod engine;
pub mod log_sink;
pub mod maintenance;
pub mod registry;
pub mod shutdown;

// Re-exports
pub use continuation::ContinuationSignal;
pub use engine::{BatchEngine, EngineSettings, JobLocks};
pub use log_sink::LogSink;
pub use maintenance::MaintenanceScheduler;
pub use registry::{JobFactory, JobRegistry};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
