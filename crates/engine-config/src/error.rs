use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading connection or pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed configuration in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The logical connection name has no entry in the registry.
    #[error("Unknown connection: {0}")]
    UnknownConnection(String),

    #[error("Invalid setting '{name}': {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}
