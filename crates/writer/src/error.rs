//! Write path errors
//!
//! Fatal errors abort a write before any row is sent. Per-record and
//! per-batch errors are counted and only surface once, as
//! [`WriteError::WriteFailed`], after every submitted batch has settled.

use colwrite_config::{BatchGranularity, ConfigError};

use crate::schema::CqlType;
use crate::session::DriverError;

/// Structural mismatch between the requested write and the table
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("column '{column}' does not exist in {table}")]
    UnknownColumn { table: String, column: String },

    #[error("primary key column '{column}' of {table} is not selected")]
    MissingPrimaryKey { table: String, column: String },

    #[error("column '{column}' is selected more than once")]
    DuplicateColumn { column: String },

    #[error("{table} has no partition key")]
    NoPartitionKey { table: String },

    #[error("{option} cannot be used with counter table {table}")]
    CounterOption { table: String, option: &'static str },

    #[error("option column '{column}' shadows a column of {table}")]
    OptionColumnCollision { table: String, column: String },
}

/// Why a statement could not be prepared
#[derive(Debug, thiserror::Error)]
pub enum PrepareError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("driver rejected statement: {0}")]
    Driver(#[from] DriverError),
}

/// A record that cannot be bound; rejects that record only
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindError {
    #[error("record has no value for column '{column}'")]
    MissingColumn { column: String },

    #[error("column '{column}' expects {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: CqlType,
        actual: &'static str,
    },

    #[error("partition key column '{column}' is null")]
    NullPartitionKey { column: String },

    #[error("partition key column '{column}' is {len} bytes, limit is {limit}")]
    PartitionKeyTooLarge {
        column: String,
        len: usize,
        limit: usize,
    },
}

impl BindError {
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }
}

/// One batch the driver failed to write
#[derive(Debug, Clone, thiserror::Error)]
#[error("batch of {rows} rows failed: {source}")]
pub struct BatchExecutionError {
    /// Statements in the failed batch
    pub rows: usize,
    #[source]
    pub source: DriverError,
}

/// Errors returned by a write
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The schema provider does not know the table
    #[error("table {table} not found")]
    TableNotFound { table: String },

    /// The schema provider itself failed
    #[error("schema lookup for {table} failed: {source}")]
    SchemaLookup {
        table: String,
        #[source]
        source: DriverError,
    },

    /// The statement cannot be built or prepared; never retried
    #[error("failed to prepare statement for {table}: {source}")]
    StatementPreparation {
        table: String,
        #[source]
        source: PrepareError,
    },

    /// Write options failed validation
    #[error("invalid write options: {0}")]
    InvalidOptions(#[from] ConfigError),

    /// Replica-set batching without a topology
    #[error("{granularity} batching needs cluster topology, but the session has none")]
    TopologyUnavailable { granularity: BatchGranularity },

    /// At least one batch failed or one record was rejected
    #[error(
        "write to {table} failed: {failed_batches} batch(es) failed, {rejected_records} record(s) rejected"
    )]
    WriteFailed {
        table: String,
        failed_batches: u64,
        failed_rows: u64,
        rejected_records: u64,
    },
}

impl WriteError {
    pub(crate) fn preparation(table: impl Into<String>, source: impl Into<PrepareError>) -> Self {
        Self::StatementPreparation {
            table: table.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_write_failed_names_table() {
        let err = WriteError::WriteFailed {
            table: "ks.events".into(),
            failed_batches: 2,
            failed_rows: 100,
            rejected_records: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("ks.events"));
        assert!(msg.contains("2 batch(es) failed"));
        assert!(msg.contains("1 record(s) rejected"));
    }

    #[test]
    fn test_preparation_wraps_driver_error() {
        let err = WriteError::preparation("ks.t", DriverError::Invalid("unknown column x".into()));
        assert!(err.to_string().contains("unknown column x"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_batch_error_display() {
        let err = BatchExecutionError {
            rows: 50,
            source: DriverError::Timeout(Duration::from_secs(2)),
        };
        assert!(err.to_string().contains("50 rows"));
        assert!(err.to_string().contains("timed out"));
    }
}
