// Job Registry - resolves a job type name to its definition

use crate::error::{AppError, Result};
use crate::port::JobDefinition;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a job definition from caller-supplied parameters
pub type JobFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Arc<dyn JobDefinition>> + Send + Sync>;

#[derive(Default)]
pub struct JobRegistry {
    factories: BTreeMap<String, JobFactory>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `job_type`, replacing any previous one
    pub fn register(&mut self, job_type: impl Into<String>, factory: JobFactory) {
        self.factories.insert(job_type.into(), factory);
    }

    /// Register a parameterless definition
    pub fn register_definition(
        &mut self,
        job_type: impl Into<String>,
        definition: Arc<dyn JobDefinition>,
    ) {
        self.register(job_type, Arc::new(move |_| Ok(Arc::clone(&definition))));
    }

    /// # Errors
    /// `NotImplemented` for an unknown job type; factory errors pass through
    pub fn resolve(
        &self,
        job_type: &str,
        params: &serde_json::Value,
    ) -> Result<Arc<dyn JobDefinition>> {
        let factory = self.factories.get(job_type).ok_or_else(|| {
            AppError::NotImplemented(format!("No job definition registered for {:?}", job_type))
        })?;
        factory(params)
    }

    pub fn job_types(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}
