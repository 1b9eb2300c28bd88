//! Write orchestration
//!
//! A [`TableWriter`] is built once per table and shared by every task
//! writing to it. Each [`TableWriter::write`] call owns its own pipeline:
//!
//! ```text
//! records ─► RowBinder ─► BatchGrouper ─► AsyncExecutor ─► ExecutionReport
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use colwrite_config::{BatchGranularity, WriteOptions};
use tokio::sync::OnceCell;

use crate::batch::batch_key_fn;
use crate::binder::RowBinder;
use crate::error::{SchemaError, WriteError};
use crate::executor::AsyncExecutor;
use crate::extractor::RowExtractor;
use crate::grouper::BatchGrouper;
use crate::logging::RateLimitedLogger;
use crate::metrics::{MetricsSink, WriterMetrics};
use crate::routing::{RoutingKeyResolver, Topology};
use crate::schema::{ColumnSelector, SchemaProvider, TableTarget};
use crate::session::{PreparedStatement, Session};
use crate::template::StatementTemplate;
use crate::throttle::Throttle;

/// Summary of a successful write
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteResult {
    pub rows_written: u64,
    pub bytes_written: u64,
    pub batches_written: u64,
    pub elapsed: Duration,
}

impl WriteResult {
    pub fn rows_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.rows_written as f64 / secs
        } else {
            0.0
        }
    }
}

/// Writes records of type `R` to one table
pub struct TableWriter<R> {
    session: Arc<dyn Session>,
    target: TableTarget,
    template: StatementTemplate,
    partition_key_indexes: Vec<usize>,
    topology: Option<Arc<dyn Topology>>,
    options: WriteOptions,
    extractor: Arc<dyn RowExtractor<R>>,
    prepared: OnceCell<Arc<PreparedStatement>>,
    metrics_sink: Option<Arc<dyn MetricsSink>>,
    table: String,
}

impl<R> TableWriter<R> {
    /// Look up `keyspace.table` and build a writer for the selected columns
    pub async fn for_table(
        session: Arc<dyn Session>,
        schema: &dyn SchemaProvider,
        keyspace: &str,
        table: &str,
        selector: ColumnSelector,
        options: WriteOptions,
        extractor: Arc<dyn RowExtractor<R>>,
    ) -> Result<Self, WriteError> {
        let qualified = format!("{keyspace}.{table}");
        let table_schema = schema
            .table(keyspace, table)
            .await
            .map_err(|source| WriteError::SchemaLookup {
                table: qualified.clone(),
                source,
            })?
            .ok_or(WriteError::TableNotFound { table: qualified })?;

        let target = TableTarget::select(&table_schema, &selector)
            .map_err(|e| WriteError::preparation(table_schema.qualified_name(), e))?;
        Self::new(session, target, options, extractor)
    }

    /// Build a writer for an already resolved target
    pub fn new(
        session: Arc<dyn Session>,
        target: TableTarget,
        options: WriteOptions,
        extractor: Arc<dyn RowExtractor<R>>,
    ) -> Result<Self, WriteError> {
        options.validate()?;

        let table = target.qualified_name();
        let template = StatementTemplate::build(&target, &options)
            .map_err(|e| WriteError::preparation(&table, e))?;

        let partition_key_indexes = target
            .partition_key()
            .iter()
            .map(|name| {
                template.column_index(name).ok_or_else(|| {
                    WriteError::preparation(
                        &table,
                        SchemaError::MissingPrimaryKey {
                            table: table.clone(),
                            column: name.clone(),
                        },
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let topology = session.topology();
        if matches!(options.batch_granularity, BatchGranularity::ReplicaSet) && topology.is_none() {
            return Err(WriteError::TopologyUnavailable {
                granularity: options.batch_granularity,
            });
        }

        tracing::debug!(table = %table, cql = %template.cql(), "built statement template");

        Ok(Self {
            session,
            target,
            template,
            partition_key_indexes,
            topology,
            options,
            extractor,
            prepared: OnceCell::new(),
            metrics_sink: None,
            table,
        })
    }

    /// Report per-write counters to `sink`
    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.metrics_sink = Some(sink);
        self
    }

    pub fn target(&self) -> &TableTarget {
        &self.target
    }

    pub fn template(&self) -> &StatementTemplate {
        &self.template
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// `keyspace.table`
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Prepare the statement on first use; later calls reuse it
    async fn prepared(&self) -> Result<Arc<PreparedStatement>, WriteError> {
        let prepared = self
            .prepared
            .get_or_try_init(|| async {
                let id = self
                    .session
                    .prepare(self.template.cql())
                    .await
                    .map_err(|e| WriteError::preparation(&self.table, e))?;
                tracing::debug!(table = %self.table, "statement prepared");
                Ok::<_, WriteError>(Arc::new(PreparedStatement::new(
                    id,
                    self.template.clone(),
                    self.partition_key_indexes.clone(),
                )))
            })
            .await?;
        Ok(Arc::clone(prepared))
    }

    /// Write every record and wait until all batches have settled
    ///
    /// Records that cannot be bound are skipped and counted. Batch failures
    /// do not stop the write. If anything was skipped or failed the result
    /// is [`WriteError::WriteFailed`].
    pub async fn write<I>(&self, records: I) -> Result<WriteResult, WriteError>
    where
        I: IntoIterator<Item = R>,
    {
        let started = Instant::now();
        let prepared = self.prepared().await?;

        let metrics = Arc::new(WriterMetrics::new());
        let logger = Arc::new(RateLimitedLogger::for_table(&self.table));

        let resolver = RoutingKeyResolver::new(prepared.partition_key_indexes());
        let key_fn = batch_key_fn(
            self.options.batch_granularity,
            resolver,
            self.target.keyspace(),
            self.topology.clone(),
        )?;

        let binder = RowBinder::new(
            Arc::clone(&prepared),
            Arc::clone(&self.extractor),
            self.options.ignore_nulls,
        );
        let statements = records.into_iter().filter_map(|record| {
            binder
                .bind(&record)
                .inspect_err(|err| {
                    metrics.record_rejected();
                    logger.error("record rejected", err);
                })
                .ok()
        });

        let grouper = BatchGrouper::new(
            statements,
            key_fn,
            self.options.batch_limit(),
            self.options.batch_buffer_size,
            prepared.template().batch_type(),
            self.options.consistency_level,
        );

        let mut executor = AsyncExecutor::new(
            Arc::clone(&self.session),
            self.options.parallelism,
            Arc::clone(&metrics),
            Arc::clone(&logger),
        )
        .with_throttle(self.options.throughput_bytes_per_sec().and_then(Throttle::new))
        .with_request_timeout(Some(self.options.request_timeout));

        for batch in grouper {
            executor.submit(batch).await;
        }
        let report = executor.join_and_report().await;

        let snapshot = metrics.snapshot();
        let elapsed = started.elapsed();
        if let Some(sink) = &self.metrics_sink {
            sink.report(&self.table, &snapshot, elapsed);
        }

        if !report.is_success() || snapshot.records_rejected > 0 {
            tracing::error!(
                table = %self.table,
                failed_batches = report.batches_failed,
                failed_rows = report.rows_failed,
                rejected_records = snapshot.records_rejected,
                rows_written = report.rows_written,
                "write failed"
            );
            return Err(WriteError::WriteFailed {
                table: self.table.clone(),
                failed_batches: report.batches_failed,
                failed_rows: report.rows_failed,
                rejected_records: snapshot.records_rejected,
            });
        }

        let result = WriteResult {
            rows_written: report.rows_written,
            bytes_written: report.bytes_written,
            batches_written: report.batches_written,
            elapsed,
        };
        tracing::info!(
            table = %self.table,
            rows = result.rows_written,
            batches = result.batches_written,
            bytes = result.bytes_written,
            elapsed_ms = elapsed.as_millis() as u64,
            rows_per_sec = result.rows_per_sec() as u64,
            "write completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
#[path = "writer_test.rs"]
mod writer_test;
