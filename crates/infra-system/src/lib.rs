// Chunkwise Infrastructure - System Adapters
// Implements: LogStore (files), ResourceProbe (sysinfo), ScopeSwitcher, file-backed job definitions

pub mod file_log_store;
pub mod json_import_job;
pub mod resource_probe_impl;
pub mod scope_switcher;

pub use file_log_store::FileLogStore;
pub use json_import_job::{json_import_factory, JsonImportJob, JSON_IMPORT_JOB_TYPE};
pub use resource_probe_impl::SystemResourceProbe;
pub use scope_switcher::AllowlistScopeSwitcher;
