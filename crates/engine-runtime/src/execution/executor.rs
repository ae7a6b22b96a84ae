use crate::{
    error::PipelineError,
    execution::{
        pipeline::{ExecutionMode, Pipeline},
        summary::RunSummary,
        workers::{ChunkHandle, PoolConfig, WorkerPool},
    },
};
use connectors::{
    adapter::ConnectionDescriptor,
    sql::base::{adapter::SqlAdapter, error::DbError},
};
use engine_config::settings::PipelineSettings;
use engine_core::{
    connectors::{loader::ChunkLoader, resolver::ConnectionResolver},
    logging::RunLogger,
    metrics::LoadMetrics,
};
use futures::{Stream, StreamExt};
use model::{
    events::{LogCategory, LogStep},
    records::batch::Batch,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::oneshot::error::TryRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, error, info, info_span, warn};

/// Runs pipelines: hooks, extraction, chunked loads and lifecycle events.
pub struct Orchestrator {
    resolver: ConnectionResolver,
    logger: Arc<RunLogger>,
    settings: PipelineSettings,
    cancel: CancellationToken,
}

/// What the load phase produced.
struct LoadOutcome {
    chunks: usize,
    rows: u64,
}

impl Orchestrator {
    pub fn new(resolver: ConnectionResolver, settings: PipelineSettings) -> Self {
        let logger = RunLogger::new(
            resolver.clone(),
            settings.log_connection.clone(),
            settings.log_table.clone(),
        );
        Self {
            resolver,
            logger: Arc::new(logger),
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Shares a cancellation token with the caller (e.g. a signal handler).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn logger(&self) -> &RunLogger {
        &self.logger
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Runs one pipeline to completion. Any failure is recorded as a single
    /// error event (when logging is enabled) and returned; a failing audit
    /// write never replaces the original error.
    pub async fn run(&self, pipeline: &Pipeline) -> Result<RunSummary, PipelineError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!(
            "pipeline",
            run_id = %run_id,
            table = %pipeline.destination_table,
            mode = %pipeline.mode
        );

        async {
            let started = Instant::now();
            match self.execute(pipeline, &run_id, started).await {
                Ok(summary) => {
                    info!(
                        chunks = summary.chunks,
                        rows = summary.rows_loaded,
                        elapsed_secs = summary.elapsed_secs(),
                        "Pipeline completed"
                    );
                    Ok(summary)
                }
                Err(err) => {
                    error!(error = %err, "Pipeline failed");
                    if pipeline.logging {
                        self.logger
                            .log_guarded(
                                LogCategory::Error,
                                LogStep::Error,
                                &pipeline.destination_table,
                                0,
                                0.0,
                            )
                            .await;
                    }
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        pipeline: &Pipeline,
        run_id: &str,
        started: Instant,
    ) -> Result<RunSummary, PipelineError> {
        let table = pipeline.destination_table.as_str();

        if pipeline.logging {
            self.logger
                .log(LogCategory::Info, LogStep::Start, table, 0, 0.0)
                .await?;
        }

        let descriptor = self.resolver.descriptor(&pipeline.destination)?;
        let destination = if pipeline.has_hooks() {
            Some(
                self.resolver
                    .connect_or_report(&pipeline.destination, &self.logger)
                    .await?,
            )
        } else {
            None
        };

        if let (Some(sql), Some(destination)) = (&pipeline.pre_delete_sql, &destination) {
            info!("Running pre-delete statement");
            destination.exec(sql).await.map_err(PipelineError::PreDelete)?;
        }

        let source = self
            .resolver
            .connect_or_report(&pipeline.source, &self.logger)
            .await?;

        let metrics = LoadMetrics::new();
        let outcome = match pipeline.mode {
            ExecutionMode::SingleShot => {
                self.load_single_shot(pipeline, source.as_ref(), &descriptor, &metrics)
                    .await?
            }
            ExecutionMode::Parallel => {
                // Creates the table before the fan-out; reuses the hooks connection.
                let destination = match &destination {
                    Some(destination) => Arc::clone(destination),
                    None => {
                        self.resolver
                            .connect_or_report(&pipeline.destination, &self.logger)
                            .await?
                    }
                };
                self.load_parallel(
                    pipeline,
                    source.as_ref(),
                    destination.as_ref(),
                    &descriptor,
                    &metrics,
                )
                .await?
            }
        };
        drop(source);

        if let (Some(sql), Some(destination)) = (&pipeline.post_load_sql, &destination) {
            info!("Running post-load statement");
            destination.exec(sql).await.map_err(PipelineError::PostLoad)?;
        }

        let elapsed = started.elapsed();
        if pipeline.logging {
            self.logger
                .log(
                    LogCategory::Info,
                    LogStep::End,
                    table,
                    i64::try_from(outcome.rows).unwrap_or(i64::MAX),
                    elapsed.as_secs_f64(),
                )
                .await?;
        }

        Ok(RunSummary {
            run_id: run_id.to_string(),
            table: table.to_string(),
            mode: pipeline.mode,
            chunks: outcome.chunks,
            rows_loaded: outcome.rows,
            elapsed,
            metrics: metrics.snapshot(),
        })
    }

    async fn load_single_shot(
        &self,
        pipeline: &Pipeline,
        source: &dyn SqlAdapter,
        descriptor: &ConnectionDescriptor,
        metrics: &LoadMetrics,
    ) -> Result<LoadOutcome, PipelineError> {
        let batch = source
            .query_batch(&pipeline.source_query, Vec::new())
            .await
            .map_err(PipelineError::Extract)?;

        if let Some(limit) = self.settings.single_shot_row_limit {
            if batch.row_count() > limit {
                return Err(PipelineError::SingleShotLimit {
                    rows: batch.row_count(),
                    limit,
                });
            }
        }

        info!(rows = batch.row_count(), "Loading result in one pass");
        let loader = self.loader();
        let rows = loader
            .load(batch, &pipeline.destination_table, descriptor)
            .await
            .map_err(|source| {
                metrics.record_failure();
                PipelineError::ChunkLoad { chunk: 0, source }
            })?;
        metrics.record_chunk(rows);

        Ok(LoadOutcome { chunks: 1, rows })
    }

    async fn load_parallel(
        &self,
        pipeline: &Pipeline,
        source: &dyn SqlAdapter,
        destination: &dyn SqlAdapter,
        descriptor: &ConnectionDescriptor,
        metrics: &LoadMetrics,
    ) -> Result<LoadOutcome, PipelineError> {
        let timeout = self.settings.chunk_timeout();
        let mut stream = source
            .stream_batches(&pipeline.source_query, self.settings.chunk_size)
            .await
            .map_err(PipelineError::Extract)?;

        let first = match stream.next().await {
            Some(Ok(batch)) => batch,
            Some(Err(err)) => return Err(PipelineError::Extract(err)),
            None => {
                info!(chunks = 0, "Extraction finished");
                return Ok(LoadOutcome { chunks: 0, rows: 0 });
            }
        };

        // Workers only append; concurrent table creation races in the catalog.
        self.loader()
            .create_table(destination, &first, &pipeline.destination_table)
            .await
            .map_err(|source| PipelineError::ChunkLoad { chunk: 0, source })?;

        let pool = WorkerPool::spawn(
            PoolConfig {
                workers: self.settings.workers,
                max_tasks_per_worker: self.settings.max_tasks_per_worker,
            },
            self.loader(),
            descriptor.clone(),
            pipeline.destination_table.clone(),
            self.cancel.child_token(),
            metrics.clone(),
        );

        let chunks = futures::stream::iter([Ok(first)]).chain(stream);
        let handles = match self.submit_chunks(chunks, &pool, timeout).await {
            Ok(handles) => handles,
            Err(err) => {
                pool.shutdown().await;
                return Err(err);
            }
        };

        let chunks = handles.len();
        let collected = self.collect(handles, timeout).await;
        pool.shutdown().await;

        let rows = collected?;
        Ok(LoadOutcome { chunks, rows })
    }

    /// Hands every chunk of `chunks` to the pool, in order.
    async fn submit_chunks(
        &self,
        chunks: impl Stream<Item = Result<Batch, DbError>>,
        pool: &WorkerPool,
        timeout: Duration,
    ) -> Result<Vec<ChunkHandle>, PipelineError> {
        let mut chunks = std::pin::pin!(chunks);
        let mut handles = Vec::new();
        loop {
            if self.cancel.is_cancelled() {
                warn!(submitted = handles.len(), "Cancelled while extracting");
                return Err(PipelineError::Cancelled);
            }

            let batch = match chunks.next().await {
                Some(Ok(batch)) => batch,
                Some(Err(err)) => return Err(PipelineError::Extract(err)),
                None => break,
            };

            let chunk = handles.len();
            let handle = match tokio::time::timeout(timeout, pool.submit(chunk, batch)).await {
                Ok(Ok(handle)) => handle,
                Ok(Err(_)) => return Err(PipelineError::WorkerLost { chunk }),
                Err(_) => return Err(stalled_chunk(&mut handles, chunk, timeout)),
            };
            handles.push(handle);
        }

        info!(chunks = handles.len(), "Extraction finished");
        Ok(handles)
    }

    /// Waits on every chunk in submission order, each wait bounded by
    /// `timeout`. A failed chunk does not stop the wait for the others; the
    /// first failure is returned once they are done. A timeout ends the wait
    /// immediately.
    async fn collect(
        &self,
        handles: Vec<ChunkHandle>,
        timeout: Duration,
    ) -> Result<u64, PipelineError> {
        let mut rows = 0u64;
        let mut first_error = None;

        for handle in handles {
            let chunk = handle.index;
            let waited = tokio::select! {
                _ = self.cancel.cancelled() => return Err(PipelineError::Cancelled),
                waited = tokio::time::timeout(timeout, handle.receiver) => waited,
            };

            match waited {
                Ok(Ok(Ok(written))) => rows += written,
                Ok(Ok(Err(source))) => {
                    if first_error.is_none() {
                        first_error = Some(PipelineError::ChunkLoad { chunk, source });
                    }
                }
                Ok(Err(_)) => {
                    if first_error.is_none() {
                        first_error = Some(PipelineError::WorkerLost { chunk });
                    }
                }
                Err(_) => {
                    warn!(chunk, ?timeout, "Chunk timed out, abandoning pending work");
                    return Err(first_error.unwrap_or(PipelineError::ChunkTimeout { chunk, timeout }));
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(rows),
        }
    }

    fn loader(&self) -> ChunkLoader {
        ChunkLoader::new(self.resolver.connector(), self.settings.target_schema.clone())
    }
}

/// The queue stayed full for `timeout`, so some queued chunk is stuck. Blames
/// the oldest chunk still unanswered, or an earlier failure if one is
/// already known, instead of the chunk that could not be queued.
fn stalled_chunk(handles: &mut [ChunkHandle], queued: usize, timeout: Duration) -> PipelineError {
    let mut first_error = None;
    for handle in handles.iter_mut() {
        let chunk = handle.index;
        match handle.receiver.try_recv() {
            Ok(Ok(_)) => {}
            Ok(Err(source)) => {
                if first_error.is_none() {
                    first_error = Some(PipelineError::ChunkLoad { chunk, source });
                }
            }
            Err(TryRecvError::Closed) => {
                if first_error.is_none() {
                    first_error = Some(PipelineError::WorkerLost { chunk });
                }
            }
            Err(TryRecvError::Empty) => {
                warn!(chunk, ?timeout, "Chunk timed out, abandoning pending work");
                return first_error.unwrap_or(PipelineError::ChunkTimeout { chunk, timeout });
            }
        }
    }

    warn!(chunk = queued, ?timeout, "Timed out queueing chunk");
    first_error.unwrap_or(PipelineError::ChunkTimeout {
        chunk: queued,
        timeout,
    })
}
