//! Write path metrics
//!
//! Atomic counters updated from concurrently completing batch executions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

// =============================================================================
// Metrics
// =============================================================================

/// Counters for one write invocation
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Statements in batches the cluster acknowledged
    pub rows_written: AtomicU64,

    /// Estimated payload bytes of acknowledged batches
    pub bytes_written: AtomicU64,

    /// Acknowledged batches
    pub batches_written: AtomicU64,

    /// Batches the driver failed
    pub batches_failed: AtomicU64,

    /// Statements in failed batches
    pub rows_failed: AtomicU64,

    /// Records that could not be bound
    pub records_rejected: AtomicU64,
}

impl WriterMetrics {
    pub const fn new() -> Self {
        Self {
            rows_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            batches_written: AtomicU64::new(0),
            batches_failed: AtomicU64::new(0),
            rows_failed: AtomicU64::new(0),
            records_rejected: AtomicU64::new(0),
        }
    }

    /// Record an acknowledged batch
    #[inline]
    pub fn record_batch_written(&self, rows: u64, bytes: u64) {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        self.rows_written.fetch_add(rows, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a failed batch
    #[inline]
    pub fn record_batch_failed(&self, rows: u64) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
        self.rows_failed.fetch_add(rows, Ordering::Relaxed);
    }

    /// Record a record that failed to bind
    #[inline]
    pub fn record_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rows_written: self.rows_written.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            batches_written: self.batches_written.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            rows_failed: self.rows_failed.load(Ordering::Relaxed),
            records_rejected: self.records_rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rows_written: u64,
    pub bytes_written: u64,
    pub batches_written: u64,
    pub batches_failed: u64,
    pub rows_failed: u64,
    pub records_rejected: u64,
}

impl MetricsSnapshot {
    /// Nothing failed and nothing was rejected
    pub fn is_clean(&self) -> bool {
        self.batches_failed == 0 && self.records_rejected == 0
    }
}

// =============================================================================
// Reporting
// =============================================================================

/// Receives the counters of each finished write
pub trait MetricsSink: Send + Sync {
    fn report(&self, table: &str, snapshot: &MetricsSnapshot, elapsed: Duration);
}

/// Reports finished writes as `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMetricsSink;

impl MetricsSink for LogMetricsSink {
    fn report(&self, table: &str, snapshot: &MetricsSnapshot, elapsed: Duration) {
        tracing::info!(
            target: "colwrite::metrics",
            table = %table,
            rows_written = snapshot.rows_written,
            bytes_written = snapshot.bytes_written,
            batches_written = snapshot.batches_written,
            batches_failed = snapshot.batches_failed,
            rows_failed = snapshot.rows_failed,
            records_rejected = snapshot.records_rejected,
            elapsed_ms = elapsed.as_millis() as u64,
            "write metrics"
        );
    }
}
