use crate::execution::pipeline::ExecutionMode;
use engine_core::metrics::MetricsSnapshot;
use std::time::Duration;

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub table: String,
    pub mode: ExecutionMode,
    pub chunks: usize,
    pub rows_loaded: u64,
    pub elapsed: Duration,
    pub metrics: MetricsSnapshot,
}

impl RunSummary {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}
