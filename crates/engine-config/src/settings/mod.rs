use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};
use tracing::info;

pub const DEFAULT_CHUNK_SIZE: usize = 50_000;
pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_MAX_TASKS_PER_WORKER: usize = 8;
pub const DEFAULT_CHUNK_TIMEOUT_SECS: u64 = 1500;
pub const DEFAULT_TARGET_SCHEMA: &str = "dbo";
pub const DEFAULT_LOG_CONNECTION: &str = "con_home";
pub const DEFAULT_LOG_TABLE: &str = "dq_etl";

/// Fixed pipeline policy. Every field has a default, so an empty settings
/// file (or none at all) yields the stock behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Rows per extracted chunk in parallel mode
    pub chunk_size: usize,
    /// Size of the load worker pool
    pub workers: usize,
    /// Tasks a worker handles before reopening its destination connection
    pub max_tasks_per_worker: usize,
    /// Upper bound on the wait for each chunk result
    pub chunk_timeout_secs: u64,
    /// Schema every destination table is qualified with
    pub target_schema: String,
    /// Logical connection holding the audit table
    pub log_connection: String,
    pub log_table: String,
    /// Refuse single-shot result sets larger than this
    pub single_shot_row_limit: Option<usize>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: DEFAULT_WORKERS,
            max_tasks_per_worker: DEFAULT_MAX_TASKS_PER_WORKER,
            chunk_timeout_secs: DEFAULT_CHUNK_TIMEOUT_SECS,
            target_schema: DEFAULT_TARGET_SCHEMA.to_string(),
            log_connection: DEFAULT_LOG_CONNECTION.to_string(),
            log_table: DEFAULT_LOG_TABLE.to_string(),
            single_shot_row_limit: None,
        }
    }
}

impl PipelineSettings {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let settings: PipelineSettings =
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        settings.validate()?;
        info!(path = %path.display(), ?settings, "Loaded pipeline settings");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(name: &'static str, value: u64) -> Result<(), ConfigError> {
            if value == 0 {
                return Err(ConfigError::InvalidSetting {
                    name,
                    reason: "must be greater than zero".to_string(),
                });
            }
            Ok(())
        }

        positive("chunk_size", self.chunk_size as u64)?;
        positive("workers", self.workers as u64)?;
        positive("max_tasks_per_worker", self.max_tasks_per_worker as u64)?;
        positive("chunk_timeout_secs", self.chunk_timeout_secs)?;

        if self.target_schema.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "target_schema",
                reason: "must not be empty".to_string(),
            });
        }
        if self.log_table.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                name: "log_table",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout_secs)
    }
}

#[derive(Debug, Default)]
pub struct PipelineSettingsBuilder {
    pub chunk_size: Option<usize>,
    pub workers: Option<usize>,
    pub max_tasks_per_worker: Option<usize>,
    pub chunk_timeout: Option<Duration>,
    pub target_schema: Option<String>,
    pub log_connection: Option<String>,
    pub log_table: Option<String>,
    pub single_shot_row_limit: Option<usize>,
}

impl PipelineSettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn max_tasks_per_worker(mut self, max_tasks: usize) -> Self {
        self.max_tasks_per_worker = Some(max_tasks);
        self
    }

    /// Sub-second timeouts round up to one second.
    pub fn chunk_timeout(mut self, timeout: Duration) -> Self {
        self.chunk_timeout = Some(timeout);
        self
    }

    pub fn target_schema(mut self, schema: impl Into<String>) -> Self {
        self.target_schema = Some(schema.into());
        self
    }

    pub fn log_connection(mut self, name: impl Into<String>) -> Self {
        self.log_connection = Some(name.into());
        self
    }

    pub fn log_table(mut self, table: impl Into<String>) -> Self {
        self.log_table = Some(table.into());
        self
    }

    pub fn single_shot_row_limit(mut self, limit: usize) -> Self {
        self.single_shot_row_limit = Some(limit);
        self
    }

    pub fn build(self) -> Result<PipelineSettings, ConfigError> {
        let defaults = PipelineSettings::default();
        let chunk_timeout_secs = self
            .chunk_timeout
            .map(|t| t.as_secs() + u64::from(t.subsec_nanos() > 0))
            .unwrap_or(defaults.chunk_timeout_secs);

        let settings = PipelineSettings {
            chunk_size: self.chunk_size.unwrap_or(defaults.chunk_size),
            workers: self.workers.unwrap_or(defaults.workers),
            max_tasks_per_worker: self
                .max_tasks_per_worker
                .unwrap_or(defaults.max_tasks_per_worker),
            chunk_timeout_secs,
            target_schema: self.target_schema.unwrap_or(defaults.target_schema),
            log_connection: self.log_connection.unwrap_or(defaults.log_connection),
            log_table: self.log_table.unwrap_or(defaults.log_table),
            single_shot_row_limit: self.single_shot_row_limit.or(defaults.single_shot_row_limit),
        };
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.chunk_size, 50_000);
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.max_tasks_per_worker, 8);
        assert_eq!(settings.chunk_timeout(), Duration::from_secs(1500));
        assert_eq!(settings.target_schema, "dbo");
        assert_eq!(settings.log_connection, "con_home");
        assert_eq!(settings.log_table, "dq_etl");
        assert!(settings.single_shot_row_limit.is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let settings = PipelineSettingsBuilder::new()
            .chunk_size(10)
            .workers(2)
            .chunk_timeout(Duration::from_millis(1500))
            .single_shot_row_limit(1_000)
            .build()
            .unwrap();

        assert_eq!(settings.chunk_size, 10);
        assert_eq!(settings.workers, 2);
        assert_eq!(settings.max_tasks_per_worker, 8);
        assert_eq!(settings.chunk_timeout_secs, 2);
        assert_eq!(settings.single_shot_row_limit, Some(1_000));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = PipelineSettingsBuilder::new().workers(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { name: "workers", .. }));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{ "chunk_size": 1000, "target_schema": "stage" }"#)
            .unwrap();

        let settings = PipelineSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.chunk_size, 1000);
        assert_eq!(settings.target_schema, "stage");
        assert_eq!(settings.workers, DEFAULT_WORKERS);
    }

    #[test]
    fn invalid_file_values_fail_validation() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{ "chunk_size": 0 }"#).unwrap();

        let err = PipelineSettings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { name: "chunk_size", .. }));
    }
}
