// Chunkwise Infrastructure - SQLite Adapter
// Implements: CheckpointStore, Maintenance

mod checkpoint_store;
mod connection;
mod error;
mod maintenance_impl;
mod migration;

pub use checkpoint_store::SqliteCheckpointStore;
pub use connection::create_pool;
pub use maintenance_impl::SqliteMaintenance;
pub use migration::run_migrations;

// sqlx::Error is mapped through error::map_sqlx_error: the orphan rule
// rules out `impl From<sqlx::Error> for AppError` in this crate.
