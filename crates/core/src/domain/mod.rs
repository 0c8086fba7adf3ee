// Domain Layer - Pure business logic and entities

pub mod error;
pub mod item;
pub mod job;
pub mod log_buffer;
pub mod progress;

// Re-exports
pub use error::DomainError;
pub use item::{Item, Queue};
pub use job::{slugify, Job, JobConfig, JobId, DEFAULT_BATCH_SIZE};
pub use log_buffer::LogBuffer;
pub use progress::{JobPhase, JobProgress, JobStatus};
