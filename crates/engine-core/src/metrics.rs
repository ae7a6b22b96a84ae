use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    rows_loaded: AtomicU64,
    chunks_loaded: AtomicU64,
    chunk_failures: AtomicU64,
    connections_opened: AtomicU64,
}

/// Counters shared between the orchestrator and its load workers.
#[derive(Debug, Clone)]
pub struct LoadMetrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rows_loaded: u64,
    pub chunks_loaded: u64,
    pub chunk_failures: u64,
    pub connections_opened: u64,
}

impl LoadMetrics {
    pub fn new() -> Self {
        LoadMetrics {
            inner: Arc::new(InnerMetrics::default()),
        }
    }

    pub fn record_chunk(&self, rows: u64) {
        self.inner.rows_loaded.fetch_add(rows, Ordering::Relaxed);
        self.inner.chunks_loaded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.inner.chunk_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection(&self) {
        self.inner
            .connections_opened
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_loaded: self.inner.rows_loaded.load(Ordering::Relaxed),
            chunks_loaded: self.inner.chunks_loaded.load(Ordering::Relaxed),
            chunk_failures: self.inner.chunk_failures.load(Ordering::Relaxed),
            connections_opened: self.inner.connections_opened.load(Ordering::Relaxed),
        }
    }
}

impl Default for LoadMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = LoadMetrics::new();
        let worker = metrics.clone();
        worker.record_chunk(50_000);
        worker.record_chunk(20_000);
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rows_loaded, 70_000);
        assert_eq!(snapshot.chunks_loaded, 2);
        assert_eq!(snapshot.chunk_failures, 1);
    }
}
