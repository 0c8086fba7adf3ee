// Job Definition Port (capability contract supplied per job type)

use crate::domain::{Item, LogBuffer};
use crate::error::{AppError, Result};
use async_trait::async_trait;

/// What a concrete job type must provide.
///
/// The engine depends only on this interface.
#[async_trait]
pub trait JobDefinition: Send + Sync {
    /// Produce the full initial backlog.
    ///
    /// Called once per job lifetime, only when no checkpoint exists.
    async fn load_data(&self) -> Result<Vec<Item>>;

    /// Perform one unit of work.
    ///
    /// `Ok(true)` removes the item and counts toward the batch,
    /// `Ok(false)` leaves it queued for a later invocation.
    /// `Err` aborts the whole invocation.
    async fn process_item(&self, item: &Item, log: &mut LogBuffer) -> Result<bool>;
}

type LoadFn = Box<dyn Fn() -> Result<Vec<Item>> + Send + Sync>;
type ProcessFn = Box<dyn Fn(&Item, &mut LogBuffer) -> Result<bool> + Send + Sync>;

/// Job definition assembled from closures
pub struct FnJob {
    load: LoadFn,
    process: ProcessFn,
}

impl FnJob {
    pub fn builder(name: impl Into<String>) -> FnJobBuilder {
        FnJobBuilder {
            name: name.into(),
            load: None,
            process: None,
        }
    }
}

#[async_trait]
impl JobDefinition for FnJob {
    async fn load_data(&self) -> Result<Vec<Item>> {
        (self.load)()
    }

    async fn process_item(&self, item: &Item, log: &mut LogBuffer) -> Result<bool> {
        (self.process)(item, log)
    }
}

/// Builder that refuses to produce a job missing either capability
pub struct FnJobBuilder {
    name: String,
    load: Option<LoadFn>,
    process: Option<ProcessFn>,
}

impl FnJobBuilder {
    pub fn load_data<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<Vec<Item>> + Send + Sync + 'static,
    {
        self.load = Some(Box::new(f));
        self
    }

    pub fn process_item<F>(mut self, f: F) -> Self
    where
        F: Fn(&Item, &mut LogBuffer) -> Result<bool> + Send + Sync + 'static,
    {
        self.process = Some(Box::new(f));
        self
    }

    /// # Errors
    /// `NotImplemented` naming the missing capability
    pub fn build(self) -> Result<FnJob> {
        let load = self
            .load
            .ok_or_else(|| AppError::NotImplemented(format!("{}: load_data", self.name)))?;
        let process = self
            .process
            .ok_or_else(|| AppError::NotImplemented(format!("{}: process_item", self.name)))?;
        Ok(FnJob { load, process })
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Job with a fixed backlog where chosen items always fail
    pub struct ScriptedJob {
        items: Vec<Item>,
        failing: Mutex<Vec<Item>>,
        load_calls: AtomicUsize,
        processed: Mutex<Vec<Item>>,
    }

    impl ScriptedJob {
        pub fn new(items: Vec<Item>) -> Self {
            Self {
                items,
                failing: Mutex::new(Vec::new()),
                load_calls: AtomicUsize::new(0),
                processed: Mutex::new(Vec::new()),
            }
        }

        /// Backlog of `{"name": ..}` records
        pub fn named(names: &[&str]) -> Self {
            Self::new(
                names
                    .iter()
                    .map(|n| Item::new(serde_json::json!({ "name": n })))
                    .collect(),
            )
        }

        /// Make `process_item` return false for this item
        pub fn fail_on(&self, item: Item) {
            self.failing.lock().unwrap().push(item);
        }

        /// Stop failing everything
        pub fn heal(&self) {
            self.failing.lock().unwrap().clear();
        }

        pub fn load_calls(&self) -> usize {
            self.load_calls.load(Ordering::SeqCst)
        }

        /// Every item passed to `process_item`, in call order
        pub fn attempts(&self) -> Vec<Item> {
            self.processed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobDefinition for ScriptedJob {
        async fn load_data(&self) -> Result<Vec<Item>> {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.items.clone())
        }

        async fn process_item(&self, item: &Item, log: &mut LogBuffer) -> Result<bool> {
            self.processed.lock().unwrap().push(item.clone());
            let ok = !self.failing.lock().unwrap().contains(item);
            log.log(format!("Processing item: {}", item));
            Ok(ok)
        }
    }
}
