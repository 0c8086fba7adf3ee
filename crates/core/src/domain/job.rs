// Job Domain Model

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Maximum successful items per invocation when the caller does not say
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Normalize a human identifier into a storage-safe slug.
///
/// Lowercases ASCII letters, keeps ASCII digits and `_`, and collapses every
/// other run of characters into a single `-`. Leading and trailing separators
/// are dropped, so `"  User Import!! "` becomes `"user-import"`.
///
/// Two identifiers that normalize identically share one checkpoint.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_separator = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Job ID (normalized slug of the human-assigned identifier)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Derive the job id from a human identifier
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        let slug = slugify(identifier);
        if slug.is_empty() {
            return Err(DomainError::InvalidIdentifier(identifier.to_string()));
        }
        Ok(Self(slug))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caller-supplied configuration for one invocation (unvalidated)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub identifier: Option<String>,

    /// Successful items per invocation (default: 10)
    #[serde(default)]
    pub batch_size: Option<i64>,

    /// Optional sub-scope (tenant) the job runs in
    #[serde(default)]
    pub scope: Option<String>,

    /// Discard any checkpoint or completion marker and load afresh
    #[serde(default)]
    pub restart: bool,
}

impl JobConfig {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: Some(identifier.into()),
            ..Default::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: i64) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    pub fn with_restart(mut self, restart: bool) -> Self {
        self.restart = restart;
        self
    }
}

/// Validated job, constructed at invocation start. Never persisted itself;
/// only its queue and progress are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub identifier: String,
    pub batch_size: usize,
    pub scope: Option<String>,
    pub restart: bool,
}

impl Job {
    /// Validate configuration and build the job
    ///
    /// # Errors
    /// - `MissingIdentifier` when no identifier (or a blank one) was given
    /// - `InvalidIdentifier` when the identifier normalizes to nothing
    /// - `InvalidBatchSize` for a batch size below 1
    /// - `InvalidScope` for a blank or non-normalizable scope
    pub fn new(config: JobConfig) -> Result<Self> {
        let identifier = config
            .identifier
            .filter(|s| !s.trim().is_empty())
            .ok_or(DomainError::MissingIdentifier)?;
        let id = JobId::from_identifier(&identifier)?;

        let batch_size = match config.batch_size {
            None => DEFAULT_BATCH_SIZE,
            Some(n) if n >= 1 => {
                usize::try_from(n).map_err(|_| DomainError::InvalidBatchSize(n))?
            }
            Some(n) => return Err(DomainError::InvalidBatchSize(n)),
        };

        let scope = match config.scope {
            None => None,
            Some(scope) => {
                let normalized = slugify(&scope);
                if normalized.is_empty() {
                    return Err(DomainError::InvalidScope(scope));
                }
                Some(normalized)
            }
        };

        Ok(Self {
            id,
            identifier,
            batch_size,
            scope,
            restart: config.restart,
        })
    }

    /// Storage prefix shared by every key of this job.
    /// Scoped jobs are namespaced as `{scope}:{slug}`.
    fn key_prefix(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{}:{}", scope, self.id),
            None => self.id.to_string(),
        }
    }

    /// Key of the remaining-queue checkpoint: `{slug}_data`
    pub fn checkpoint_key(&self) -> String {
        format!("{}_data", self.key_prefix())
    }

    /// Key of the progress / completion marker: `{slug}_progress`
    pub fn progress_key(&self) -> String {
        format!("{}_progress", self.key_prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("User Import"), "user-import");
        assert_eq!(slugify("  User   Import!! "), "user-import");
        assert_eq!(slugify("user-import"), "user-import");
        assert_eq!(slugify("Orders_2024 / Q1"), "orders_2024-q1");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn test_identifiers_that_normalize_identically_collide() {
        let a = Job::new(JobConfig::new("User Import")).unwrap();
        let b = Job::new(JobConfig::new("user--import")).unwrap();
        assert_eq!(a.checkpoint_key(), b.checkpoint_key());
    }

    #[test]
    fn test_key_layout() {
        let job = Job::new(JobConfig::new("User Import")).unwrap();
        assert_eq!(job.checkpoint_key(), "user-import_data");
        assert_eq!(job.progress_key(), "user-import_progress");

        let scoped = Job::new(JobConfig::new("User Import").with_scope("51")).unwrap();
        assert_eq!(scoped.checkpoint_key(), "51:user-import_data");
    }

    #[test]
    fn test_default_batch_size() {
        let job = Job::new(JobConfig::new("import")).unwrap();
        assert_eq!(job.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_rejects_non_positive_batch_size() {
        assert_eq!(
            Job::new(JobConfig::new("import").with_batch_size(0)).unwrap_err(),
            DomainError::InvalidBatchSize(0)
        );
        assert_eq!(
            Job::new(JobConfig::new("import").with_batch_size(-3)).unwrap_err(),
            DomainError::InvalidBatchSize(-3)
        );
    }

    #[test]
    fn test_rejects_missing_identifier() {
        assert_eq!(
            Job::new(JobConfig::default()).unwrap_err(),
            DomainError::MissingIdentifier
        );
        assert_eq!(
            Job::new(JobConfig::new("   ")).unwrap_err(),
            DomainError::MissingIdentifier
        );
        assert!(matches!(
            Job::new(JobConfig::new("!!!")).unwrap_err(),
            DomainError::InvalidIdentifier(_)
        ));
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: JobConfig =
            serde_json::from_value(serde_json::json!({"identifier": "User Import"})).unwrap();
        let job = Job::new(config).unwrap();
        assert_eq!(job.batch_size, 10);
        assert!(job.scope.is_none());
        assert!(!job.restart);
    }
}
