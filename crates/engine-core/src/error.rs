use connectors::{error::AdapterError, sql::base::error::DbError};
use engine_config::error::ConfigError;
use model::core::storage_type::StorageType;
use thiserror::Error;

/// Failure to turn a logical connection name into an open adapter.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to connect to '{name}': {source}")]
    Connect {
        name: String,
        #[source]
        source: AdapterError,
    },
}

/// A value that cannot be stored in its column's pinned storage type.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Column '{column}' cannot hold value as {storage}: {reason}")]
pub struct CoercionError {
    pub column: String,
    pub storage: StorageType,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Destination connection failed: {0}")]
    Connect(#[from] AdapterError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error(transparent)]
    Coercion(#[from] CoercionError),
}

#[derive(Error, Debug)]
pub enum LogError {
    #[error("Audit connection unavailable: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Audit write failed: {0}")]
    Database(#[from] DbError),
}
