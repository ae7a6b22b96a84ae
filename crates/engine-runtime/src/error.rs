use connectors::sql::base::error::DbError;
use engine_core::error::{LoadError, LogError, ResolveError};
use std::time::Duration;
use thiserror::Error;

/// Why a pipeline run failed. Returned after the run's error event has been
/// written (when logging is enabled).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A source or destination connection could not be opened.
    #[error("Connection error: {0}")]
    Connect(#[from] ResolveError),

    #[error("Pre-delete statement failed: {0}")]
    PreDelete(#[source] DbError),

    /// The source query failed or its cursor broke mid-stream.
    #[error("Extraction failed: {0}")]
    Extract(#[source] DbError),

    #[error("Chunk {chunk} failed to load: {source}")]
    ChunkLoad {
        chunk: usize,
        #[source]
        source: LoadError,
    },

    #[error("Chunk {chunk} did not finish within {timeout:?}")]
    ChunkTimeout { chunk: usize, timeout: Duration },

    /// The worker holding a chunk went away without answering.
    #[error("Worker lost while loading chunk {chunk}")]
    WorkerLost { chunk: usize },

    #[error("Post-load statement failed: {0}")]
    PostLoad(#[source] DbError),

    #[error("Single-shot result has {rows} rows, above the limit of {limit}")]
    SingleShotLimit { rows: usize, limit: usize },

    #[error("Run cancelled")]
    Cancelled,

    /// A lifecycle event on the success path could not be written.
    #[error("Audit logging failed: {0}")]
    Logging(#[from] LogError),
}
