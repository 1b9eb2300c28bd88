//! Write job configuration
//!
//! Everything a bulk write needs besides the target table: consistency,
//! batching, concurrency, throughput ceiling and the optional TTL/timestamp
//! clauses.
//!
//! # Example
//!
//! ```toml
//! [write]
//! consistency_level = "local_quorum"
//! batch_granularity = "partition"
//! batch_size_rows = 50
//! batch_buffer_size = 1000
//! parallelism = 8
//! ttl_column = "ttl"
//! request_timeout = "10s"
//! ```

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::validation;

// =============================================================================
// Constants
// =============================================================================

/// Default number of batches in flight per write
pub const DEFAULT_PARALLELISM: usize = 5;

/// Default number of open batch buckets held by the grouper
pub const DEFAULT_BATCH_BUFFER_SIZE: usize = 1000;

/// Byte budget per batch when neither a row nor a byte limit is configured
pub const DEFAULT_BATCH_SIZE_BYTES: usize = 1024;

/// Hard cap on statements in one batch (the protocol encodes the count as u16)
pub const MAX_BATCH_STATEMENTS: usize = 65_535;

/// Default client-side deadline for one batch
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Enums
// =============================================================================

/// Replica acknowledgment policy for writes
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyLevel {
    Any,
    One,
    Two,
    Three,
    Quorum,
    All,
    #[default]
    LocalQuorum,
    EachQuorum,
    LocalOne,
}

impl ConsistencyLevel {
    /// Name as the database spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "ANY",
            Self::One => "ONE",
            Self::Two => "TWO",
            Self::Three => "THREE",
            Self::Quorum => "QUORUM",
            Self::All => "ALL",
            Self::LocalQuorum => "LOCAL_QUORUM",
            Self::EachQuorum => "EACH_QUORUM",
            Self::LocalOne => "LOCAL_ONE",
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope of the key statements are grouped by
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BatchGranularity {
    /// One bucket for everything (plain chunking)
    All,
    /// Statements owned by the same set of replicas
    ReplicaSet,
    /// Statements with identical partition keys (default)
    #[default]
    Partition,
}

impl BatchGranularity {
    /// Config spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::ReplicaSet => "replica_set",
            Self::Partition => "partition",
        }
    }
}

impl fmt::Display for BatchGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a TTL or write timestamp is supplied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteValue {
    /// Same literal for every row
    Static(i64),
    /// Read per row from the named synthetic column
    PerRow(String),
}

/// Size limits for one batch; whichever is reached first closes the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimit {
    /// Maximum statements
    pub max_rows: usize,
    /// Maximum estimated payload bytes
    pub max_bytes: usize,
}

impl BatchLimit {
    /// Limit by statement count only
    pub fn rows(max_rows: usize) -> Self {
        Self {
            max_rows: max_rows.min(MAX_BATCH_STATEMENTS),
            max_bytes: usize::MAX,
        }
    }

    /// Limit by payload size only
    pub fn bytes(max_bytes: usize) -> Self {
        Self {
            max_rows: MAX_BATCH_STATEMENTS,
            max_bytes,
        }
    }
}

impl Default for BatchLimit {
    fn default() -> Self {
        Self::bytes(DEFAULT_BATCH_SIZE_BYTES)
    }
}

// =============================================================================
// Write options
// =============================================================================

/// Options for one bulk write job
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Consistency level for every batch
    /// Default: local_quorum
    pub consistency_level: ConsistencyLevel,

    /// Maximum statements per batch
    pub batch_size_rows: Option<usize>,

    /// Maximum estimated bytes per batch
    /// Default: 1024 when `batch_size_rows` is also unset
    pub batch_size_bytes: Option<usize>,

    /// Maximum open batch buckets before the least recently used is flushed
    /// Default: 1000
    pub batch_buffer_size: usize,

    /// Maximum batches in flight
    /// Default: 5
    pub parallelism: usize,

    /// Batch grouping key
    /// Default: partition
    pub batch_granularity: BatchGranularity,

    /// Static TTL in seconds
    pub ttl: Option<i64>,

    /// Synthetic column supplying a per-row TTL
    pub ttl_column: Option<String>,

    /// Static write timestamp in microseconds
    pub timestamp: Option<i64>,

    /// Synthetic column supplying a per-row write timestamp
    pub timestamp_column: Option<String>,

    /// Add `IF NOT EXISTS` to inserts
    pub if_not_exists: bool,

    /// Send missing values as unset instead of null
    pub ignore_nulls: bool,

    /// Byte-rate ceiling per write invocation, in MiB/s
    pub throughput_mb_per_sec: Option<f64>,

    /// Client-side deadline for one batch
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            consistency_level: ConsistencyLevel::default(),
            batch_size_rows: None,
            batch_size_bytes: None,
            batch_buffer_size: DEFAULT_BATCH_BUFFER_SIZE,
            parallelism: DEFAULT_PARALLELISM,
            batch_granularity: BatchGranularity::default(),
            ttl: None,
            ttl_column: None,
            timestamp: None,
            timestamp_column: None,
            if_not_exists: false,
            ignore_nulls: false,
            throughput_mb_per_sec: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl WriteOptions {
    /// Check option ranges and mutually exclusive pairs
    pub fn validate(&self) -> Result<()> {
        validation::validate_write_options(self)
    }

    /// Resolved TTL, static form first
    pub fn ttl_value(&self) -> Option<WriteValue> {
        match (self.ttl, &self.ttl_column) {
            (Some(ttl), _) => Some(WriteValue::Static(ttl)),
            (None, Some(column)) => Some(WriteValue::PerRow(column.clone())),
            (None, None) => None,
        }
    }

    /// Resolved write timestamp, static form first
    pub fn timestamp_value(&self) -> Option<WriteValue> {
        match (self.timestamp, &self.timestamp_column) {
            (Some(ts), _) => Some(WriteValue::Static(ts)),
            (None, Some(column)) => Some(WriteValue::PerRow(column.clone())),
            (None, None) => None,
        }
    }

    /// Effective per-batch size limits
    pub fn batch_limit(&self) -> BatchLimit {
        match (self.batch_size_rows, self.batch_size_bytes) {
            (None, None) => BatchLimit::default(),
            (Some(rows), None) => BatchLimit::rows(rows),
            (None, Some(bytes)) => BatchLimit::bytes(bytes),
            (Some(rows), Some(bytes)) => BatchLimit {
                max_rows: rows.min(MAX_BATCH_STATEMENTS),
                max_bytes: bytes,
            },
        }
    }

    /// Throughput ceiling in bytes per second
    pub fn throughput_bytes_per_sec(&self) -> Option<f64> {
        self.throughput_mb_per_sec.map(|mb| mb * 1024.0 * 1024.0)
    }

    /// Set the consistency level
    pub fn with_consistency_level(mut self, level: ConsistencyLevel) -> Self {
        self.consistency_level = level;
        self
    }

    /// Limit batches by statement count
    pub fn with_batch_size_rows(mut self, rows: usize) -> Self {
        self.batch_size_rows = Some(rows);
        self
    }

    /// Limit batches by estimated bytes
    pub fn with_batch_size_bytes(mut self, bytes: usize) -> Self {
        self.batch_size_bytes = Some(bytes);
        self
    }

    /// Set the number of open buckets
    pub fn with_batch_buffer_size(mut self, size: usize) -> Self {
        self.batch_buffer_size = size;
        self
    }

    /// Set the maximum batches in flight
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Set the grouping key scope
    pub fn with_batch_granularity(mut self, granularity: BatchGranularity) -> Self {
        self.batch_granularity = granularity;
        self
    }

    /// Set the TTL, replacing either previous form
    pub fn with_ttl(mut self, ttl: WriteValue) -> Self {
        match ttl {
            WriteValue::Static(secs) => {
                self.ttl = Some(secs);
                self.ttl_column = None;
            }
            WriteValue::PerRow(column) => {
                self.ttl = None;
                self.ttl_column = Some(column);
            }
        }
        self
    }

    /// Set the write timestamp, replacing either previous form
    pub fn with_timestamp(mut self, timestamp: WriteValue) -> Self {
        match timestamp {
            WriteValue::Static(micros) => {
                self.timestamp = Some(micros);
                self.timestamp_column = None;
            }
            WriteValue::PerRow(column) => {
                self.timestamp = None;
                self.timestamp_column = Some(column);
            }
        }
        self
    }

    /// Toggle `IF NOT EXISTS`
    pub fn with_if_not_exists(mut self, enabled: bool) -> Self {
        self.if_not_exists = enabled;
        self
    }

    /// Toggle unset-instead-of-null
    pub fn with_ignore_nulls(mut self, enabled: bool) -> Self {
        self.ignore_nulls = enabled;
        self
    }

    /// Cap throughput in MiB/s
    pub fn with_throughput_mb_per_sec(mut self, mb: f64) -> Self {
        self.throughput_mb_per_sec = Some(mb);
        self
    }

    /// Set the per-batch deadline
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = WriteOptions::default();
        assert_eq!(options.consistency_level, ConsistencyLevel::LocalQuorum);
        assert_eq!(options.batch_granularity, BatchGranularity::Partition);
        assert_eq!(options.parallelism, 5);
        assert_eq!(options.batch_buffer_size, 1000);
        assert_eq!(options.request_timeout, Duration::from_secs(30));
        assert_eq!(options.batch_limit(), BatchLimit::bytes(1024));
        assert!(options.ttl_value().is_none());
        assert!(options.timestamp_value().is_none());
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
consistency_level = "each_quorum"
batch_granularity = "replica_set"
batch_size_rows = 50
batch_buffer_size = 16
parallelism = 8
ttl_column = "ttl"
timestamp = 1700000000000000
if_not_exists = true
throughput_mb_per_sec = 2.5
request_timeout = "750ms"
"#;
        let options: WriteOptions = toml::from_str(toml).unwrap();
        assert_eq!(options.consistency_level, ConsistencyLevel::EachQuorum);
        assert_eq!(options.batch_granularity, BatchGranularity::ReplicaSet);
        assert_eq!(options.batch_limit(), BatchLimit::rows(50));
        assert_eq!(options.batch_buffer_size, 16);
        assert_eq!(options.parallelism, 8);
        assert_eq!(options.ttl_value(), Some(WriteValue::PerRow("ttl".into())));
        assert_eq!(
            options.timestamp_value(),
            Some(WriteValue::Static(1_700_000_000_000_000))
        );
        assert!(options.if_not_exists);
        assert_eq!(options.throughput_bytes_per_sec(), Some(2.5 * 1024.0 * 1024.0));
        assert_eq!(options.request_timeout, Duration::from_millis(750));
    }

    #[test]
    fn test_batch_limit_combinations() {
        let both = WriteOptions::default()
            .with_batch_size_rows(10)
            .with_batch_size_bytes(4096);
        assert_eq!(
            both.batch_limit(),
            BatchLimit {
                max_rows: 10,
                max_bytes: 4096
            }
        );

        let huge = WriteOptions::default().with_batch_size_rows(1_000_000);
        assert_eq!(huge.batch_limit().max_rows, MAX_BATCH_STATEMENTS);
    }

    #[test]
    fn test_with_ttl_replaces_other_form() {
        let options = WriteOptions::default()
            .with_ttl(WriteValue::PerRow("ttl".into()))
            .with_ttl(WriteValue::Static(100));
        assert_eq!(options.ttl, Some(100));
        assert!(options.ttl_column.is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_consistency_display() {
        assert_eq!(ConsistencyLevel::LocalQuorum.to_string(), "LOCAL_QUORUM");
        assert_eq!(ConsistencyLevel::One.to_string(), "ONE");
        assert_eq!(BatchGranularity::ReplicaSet.to_string(), "replica_set");
    }
}
