use connectors::{adapter::ConnectionDescriptor, sql::base::adapter::SqlAdapter};
use engine_core::{connectors::loader::ChunkLoader, error::LoadError, metrics::LoadMetrics};
use model::records::batch::Batch;
use std::sync::Arc;
use tokio::{
    sync::{Mutex, mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub type ChunkResult = Result<u64, LoadError>;

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub workers: usize,
    /// Tasks a worker serves on one destination connection before reopening it
    pub max_tasks_per_worker: usize,
}

/// Unit of work handed to a load worker.
pub struct ChunkTask {
    pub index: usize,
    pub batch: Batch,
    reply: oneshot::Sender<ChunkResult>,
}

/// Pending result of one submitted chunk.
pub struct ChunkHandle {
    pub index: usize,
    pub receiver: oneshot::Receiver<ChunkResult>,
}

/// Fixed-size pool of isolated load workers. Workers share a bounded task
/// queue and nothing else; each opens its own destination connection and
/// appends to a table that must already exist.
pub struct WorkerPool {
    sender: Option<mpsc::Sender<ChunkTask>>,
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn spawn(
        config: PoolConfig,
        loader: ChunkLoader,
        descriptor: ConnectionDescriptor,
        table: String,
        cancel: CancellationToken,
        metrics: LoadMetrics,
    ) -> Self {
        let workers = config.workers.max(1);
        let (sender, receiver) = mpsc::channel::<ChunkTask>(workers);
        let queue = Arc::new(Mutex::new(receiver));

        info!(workers, max_tasks = config.max_tasks_per_worker, "Launching load workers");

        let handles = (0..workers)
            .map(|id| {
                let worker = LoadWorker {
                    id,
                    queue: Arc::clone(&queue),
                    loader: loader.clone(),
                    descriptor: descriptor.clone(),
                    table: table.clone(),
                    max_tasks: config.max_tasks_per_worker.max(1),
                    cancel: cancel.clone(),
                    metrics: metrics.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        Self {
            sender: Some(sender),
            handles,
            cancel,
        }
    }

    /// Queues a chunk. Waits only while the queue is full.
    pub async fn submit(&self, index: usize, batch: Batch) -> Result<ChunkHandle, Batch> {
        let Some(sender) = self.sender.as_ref() else {
            return Err(batch);
        };

        let rows = batch.row_count();
        let (reply, receiver) = oneshot::channel();
        sender
            .send(ChunkTask {
                index,
                batch,
                reply,
            })
            .await
            .map_err(|err| err.0.batch)?;

        debug!(chunk = index, rows, "Chunk submitted");
        Ok(ChunkHandle { index, receiver })
    }

    /// Stops accepting work, cancels the workers and aborts whatever is still
    /// running. Queued chunks are discarded.
    pub async fn shutdown(mut self) {
        self.sender.take();
        self.cancel.cancel();
        for handle in &self.handles {
            handle.abort();
        }
        for handle in self.handles.drain(..) {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    warn!(error = %err, "Load worker panicked");
                }
            }
        }
        debug!("Load workers stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.cancel.cancel();
        for handle in &self.handles {
            handle.abort();
        }
    }
}

struct LoadWorker {
    id: usize,
    queue: Arc<Mutex<mpsc::Receiver<ChunkTask>>>,
    loader: ChunkLoader,
    descriptor: ConnectionDescriptor,
    table: String,
    max_tasks: usize,
    cancel: CancellationToken,
    metrics: LoadMetrics,
}

impl LoadWorker {
    async fn run(self) {
        let mut connection: Option<Arc<dyn SqlAdapter>> = None;
        let mut served = 0usize;

        loop {
            let task = tokio::select! {
                _ = self.cancel.cancelled() => break,
                task = self.next_task() => match task {
                    Some(task) => task,
                    None => break,
                },
            };

            if served >= self.max_tasks {
                debug!(worker = self.id, served, "Recycling destination connection");
                connection = None;
                served = 0;
            }
            served += 1;

            let ChunkTask {
                index,
                batch,
                reply,
            } = task;

            let result = self.load(&mut connection, batch).await;
            match &result {
                Ok(rows) => self.metrics.record_chunk(*rows),
                Err(err) => {
                    warn!(worker = self.id, chunk = index, error = %err, "Chunk load failed");
                    self.metrics.record_failure();
                    connection = None;
                }
            }

            // The orchestrator may have stopped waiting.
            let _ = reply.send(result);
        }

        debug!(worker = self.id, "Load worker exiting");
    }

    async fn next_task(&self) -> Option<ChunkTask> {
        self.queue.lock().await.recv().await
    }

    async fn load(
        &self,
        connection: &mut Option<Arc<dyn SqlAdapter>>,
        batch: Batch,
    ) -> ChunkResult {
        let adapter = match connection {
            Some(adapter) => Arc::clone(adapter),
            None => {
                let adapter = self.loader.open(&self.descriptor).await?;
                self.metrics.record_connection();
                *connection = Some(Arc::clone(&adapter));
                adapter
            }
        };

        self.loader
            .append_with(adapter.as_ref(), batch, &self.table)
            .await
    }
}
