// JSON import job
// Backlog read from a JSON array file or a JSON-lines file; each record is
// accepted once every required field is present and non-null.
use async_trait::async_trait;
use chunkwise_core::application::JobFactory;
use chunkwise_core::domain::{Item, LogBuffer};
use chunkwise_core::error::{AppError, Result};
use chunkwise_core::port::JobDefinition;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Job type name the factory is registered under
pub const JSON_IMPORT_JOB_TYPE: &str = "json_import";

#[derive(Debug, Clone, Deserialize)]
struct JsonImportParams {
    path: String,
    #[serde(default)]
    required_fields: Vec<String>,
}

pub struct JsonImportJob {
    path: PathBuf,
    required_fields: Vec<String>,
}

impl JsonImportJob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required_fields: Vec::new(),
        }
    }

    pub fn with_required_fields(mut self, fields: Vec<String>) -> Self {
        self.required_fields = fields;
        self
    }

    /// Build from request params: `{"path": "~/users.json", "required_fields": ["email"]}`
    pub fn from_params(params: &serde_json::Value) -> Result<Self> {
        let params: JsonImportParams = serde_json::from_value(params.clone())
            .map_err(|e| AppError::Validation(format!("Invalid json_import params: {}", e)))?;

        let path = shellexpand::tilde(&params.path).into_owned();
        Ok(Self::new(path).with_required_fields(params.required_fields))
    }

    fn parse(&self, content: &str) -> Result<Vec<Item>> {
        let trimmed = content.trim_start();
        if trimmed.starts_with('[') {
            let values: Vec<serde_json::Value> = serde_json::from_str(trimmed)?;
            return Ok(values.into_iter().map(Item::new).collect());
        }

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).map(Item::new).map_err(|e| {
                    AppError::Validation(format!(
                        "{}:{}: invalid JSON record: {}",
                        self.path.display(),
                        n + 1,
                        e
                    ))
                })
            })
            .collect()
    }

    fn missing_field(&self, item: &Item) -> Option<&str> {
        self.required_fields
            .iter()
            .find(|field| {
                item.as_value()
                    .get(field.as_str())
                    .map_or(true, |v| v.is_null())
            })
            .map(String::as_str)
    }
}

#[async_trait]
impl JobDefinition for JsonImportJob {
    async fn load_data(&self) -> Result<Vec<Item>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AppError::Validation(format!("Cannot read {}: {}", self.path.display(), e))
        })?;
        let items = self.parse(&content)?;
        debug!(path = %self.path.display(), items = items.len(), "Import file loaded");
        Ok(items)
    }

    async fn process_item(&self, item: &Item, log: &mut LogBuffer) -> Result<bool> {
        log.log(format!("Processing item: {}", item));

        if let Some(field) = self.missing_field(item) {
            log.log(format!("Missing required field {:?}", field));
            return Ok(false);
        }
        Ok(true)
    }
}

/// Factory for the registry
pub fn json_import_factory() -> JobFactory {
    Arc::new(|params| Ok(Arc::new(JsonImportJob::from_params(params)?) as Arc<dyn JobDefinition>))
}
