//! Bounded-concurrency batch execution
//!
//! [`AsyncExecutor`] spawns one task per batch and holds a semaphore permit
//! for the whole driver call, so at most `parallelism` requests are in
//! flight. [`AsyncExecutor::submit`] waits for a permit, which pushes
//! backpressure into whoever feeds it.
//!
//! Failures are outcomes, not errors: a failed batch is counted and logged,
//! and every other batch still runs to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::batch::BatchStatement;
use crate::error::BatchExecutionError;
use crate::logging::RateLimitedLogger;
use crate::metrics::WriterMetrics;
use crate::session::{DriverError, Session};
use crate::throttle::Throttle;

/// Result of executing one batch
#[derive(Debug)]
pub enum BatchOutcome {
    Written { rows: usize, bytes: usize },
    Failed(BatchExecutionError),
}

/// Aggregate of every outcome of one executor
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    pub batches_written: u64,
    pub rows_written: u64,
    pub bytes_written: u64,
    pub batches_failed: u64,
    pub rows_failed: u64,
    /// First failure seen, kept for diagnostics
    pub first_failure: Option<BatchExecutionError>,
}

impl ExecutionReport {
    /// Every submitted batch was written
    pub fn is_success(&self) -> bool {
        self.batches_failed == 0
    }

    fn record(&mut self, outcome: BatchOutcome) {
        match outcome {
            BatchOutcome::Written { rows, bytes } => {
                self.batches_written += 1;
                self.rows_written += rows as u64;
                self.bytes_written += bytes as u64;
            }
            BatchOutcome::Failed(err) => {
                self.batches_failed += 1;
                self.rows_failed += err.rows as u64;
                self.first_failure.get_or_insert(err);
            }
        }
    }
}

/// Runs batches against a session with bounded parallelism
pub struct AsyncExecutor {
    session: Arc<dyn Session>,
    permits: Arc<Semaphore>,
    tasks: JoinSet<BatchOutcome>,
    report: ExecutionReport,
    metrics: Arc<WriterMetrics>,
    logger: Arc<RateLimitedLogger>,
    throttle: Option<Throttle>,
    request_timeout: Option<Duration>,
}

impl AsyncExecutor {
    pub fn new(
        session: Arc<dyn Session>,
        parallelism: usize,
        metrics: Arc<WriterMetrics>,
        logger: Arc<RateLimitedLogger>,
    ) -> Self {
        Self {
            session,
            permits: Arc::new(Semaphore::new(parallelism.max(1))),
            tasks: JoinSet::new(),
            report: ExecutionReport::default(),
            metrics,
            logger,
            throttle: None,
            request_timeout: None,
        }
    }

    /// Limit submitted payload bytes per second
    pub fn with_throttle(mut self, throttle: Option<Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// Fail executions that take longer than `timeout`
    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Start executing `batch`, waiting while `parallelism` batches are in
    /// flight
    pub async fn submit(&mut self, batch: BatchStatement) {
        self.reap();

        if let Some(throttle) = &self.throttle {
            throttle.acquire(batch.size_bytes()).await;
        }

        let rows = batch.len();
        let bytes = batch.size_bytes();

        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            // the semaphore is never closed; treat it like a lost connection
            let err = BatchExecutionError {
                rows,
                source: DriverError::Connection("executor shut down".into()),
            };
            self.fail(err);
            return;
        };

        let session = Arc::clone(&self.session);
        let metrics = Arc::clone(&self.metrics);
        let logger = Arc::clone(&self.logger);
        let timeout = self.request_timeout;

        self.tasks.spawn(async move {
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, session.execute(&batch))
                    .await
                    .unwrap_or(Err(DriverError::Timeout(limit))),
                None => session.execute(&batch).await,
            };
            drop(permit);

            match result {
                Ok(()) => {
                    metrics.record_batch_written(rows as u64, bytes as u64);
                    BatchOutcome::Written { rows, bytes }
                }
                Err(source) => {
                    metrics.record_batch_failed(rows as u64);
                    let err = BatchExecutionError { rows, source };
                    logger.error("batch execution failed", &err);
                    BatchOutcome::Failed(err)
                }
            }
        });
    }

    /// Wait for every submitted batch and return the aggregate
    pub async fn join_and_report(mut self) -> ExecutionReport {
        while let Some(joined) = self.tasks.join_next().await {
            self.absorb(joined);
        }
        self.report
    }

    /// Collect finished tasks without waiting
    fn reap(&mut self) {
        while let Some(joined) = self.tasks.try_join_next() {
            self.absorb(joined);
        }
    }

    fn absorb(&mut self, joined: Result<BatchOutcome, JoinError>) {
        match joined {
            Ok(outcome) => self.report.record(outcome),
            Err(join_err) => {
                // row count of a panicked task is unknown
                let err = BatchExecutionError {
                    rows: 0,
                    source: DriverError::Server(format!("execution task failed: {join_err}")),
                };
                self.fail(err);
            }
        }
    }

    fn fail(&mut self, err: BatchExecutionError) {
        self.metrics.record_batch_failed(err.rows as u64);
        self.logger.error("batch execution failed", &err);
        self.report.record(BatchOutcome::Failed(err));
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod executor_test;
