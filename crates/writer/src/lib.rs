//! colwrite - Writer
//!
//! Bulk write path for partitioned column stores. Records are bound into one
//! prepared statement, grouped into batches by partition, replica set or
//! plain chunking, and executed with bounded concurrency.
//!
//! # Architecture
//!
//! ```text
//! [records] --> [RowBinder] --> [BatchGrouper] --> [AsyncExecutor] --> [Session]
//!                   |                 |                   |
//!              BindError       BatchKey buckets     ExecutionReport
//! ```
//!
//! | Stage | Module | Owns |
//! |-------|--------|------|
//! | Template | `template` | one statement per table writer |
//! | Binding | `binder` | one bound statement per record |
//! | Routing | `routing` | memoized partition routing keys |
//! | Grouping | `grouper` | open buckets, LRU eviction |
//! | Execution | `executor` | semaphore permits, task set |
//! | Orchestration | `writer` | one pipeline per `write` call |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use colwrite_config::WriteOptions;
//! use colwrite_writer::{ColumnSelector, MapExtractor, MemorySession, TableWriter};
//!
//! let session = Arc::new(MemorySession::new().with_table(schema));
//! let writer = TableWriter::for_table(
//!     session.clone(),
//!     session.as_ref(),
//!     "ks",
//!     "events",
//!     ColumnSelector::All,
//!     WriteOptions::default(),
//!     Arc::new(MapExtractor),
//! )
//! .await?;
//!
//! let result = writer.write(records).await?;
//! ```

// =============================================================================
// Pipeline stages
// =============================================================================

/// Statement templates (insert or counter update)
pub mod template;

/// Binding records into bound statements
pub mod binder;

/// Record to column mapping
pub mod extractor;

/// Routing keys and cluster topology
pub mod routing;

/// Batch statements and batch keys
pub mod batch;

/// Key-partitioned batch accumulation
pub mod grouper;

/// Bounded-concurrency execution
pub mod executor;

/// Per-table write orchestration
pub mod writer;

// =============================================================================
// Supporting modules
// =============================================================================

pub mod error;
pub mod logging;
pub mod memory;
pub mod metrics;
pub mod schema;
pub mod session;
pub mod throttle;
pub mod value;

pub use batch::{BatchKey, BatchStatement, BatchType};
pub use binder::{BoundStatement, RowBinder};
pub use error::{BatchExecutionError, BindError, PrepareError, SchemaError, WriteError};
pub use executor::{AsyncExecutor, BatchOutcome, ExecutionReport};
pub use extractor::{FnExtractor, MapExtractor, RowExtractor};
pub use grouper::BatchGrouper;
pub use memory::{MemorySession, RecordedBatch, RingTopology};
pub use metrics::{LogMetricsSink, MetricsSink, MetricsSnapshot, WriterMetrics};
pub use routing::{MAX_KEY_COMPONENT_LEN, ReplicaSet, RoutingKeyResolver, Topology, encode_routing_key};
pub use schema::{ColumnDef, ColumnRole, ColumnSelector, CqlType, SchemaProvider, TableSchema, TableTarget};
pub use session::{DriverError, PreparedStatement, Session};
pub use template::{StatementKind, StatementTemplate};
pub use value::{CqlValue, MaybeUnset};
pub use writer::{TableWriter, WriteResult};
