use engine_config::error::ConfigError;
use engine_core::error::{LoadError, LogError, ResolveError};
use engine_runtime::error::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No connection file found (tried {0})")]
    MissingConfig(String),

    #[error("Connection error: {0}")]
    Connect(#[from] ResolveError),

    #[error("Pipeline failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Status lookup failed: {0}")]
    Status(#[from] LogError),

    #[error("Script failed: {0}")]
    Script(#[from] LoadError),

    #[error("Ping to '{name}' failed: {reason}")]
    Ping { name: String, reason: String },
}
