//! Rate-limited error logging
//!
//! A write with thousands of failing batches or malformed records would
//! otherwise log one line per failure. [`RateLimitedLogger`] logs at most
//! once per interval and reports how many errors it suppressed in between.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Default interval between error lines
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(10);

/// Logs errors of one write at most once per interval
pub struct RateLimitedLogger {
    /// `keyspace.table` attached to every line
    table: String,

    min_interval: Duration,

    last_log_time: Mutex<Option<Instant>>,

    /// Errors since the last line
    error_count: AtomicU64,

    total_errors: AtomicU64,
}

impl RateLimitedLogger {
    pub fn new(table: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            table: table.into(),
            min_interval,
            last_log_time: Mutex::new(None),
            error_count: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
        }
    }

    /// Logger with the default interval
    pub fn for_table(table: impl Into<String>) -> Self {
        Self::new(table, DEFAULT_LOG_INTERVAL)
    }

    /// Count an error and log it unless one was logged within the interval
    ///
    /// Returns true if this error produced a log line.
    pub fn error(&self, message: &str, error: &dyn std::fmt::Display) -> bool {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        self.total_errors.fetch_add(1, Ordering::Relaxed);

        let should_log = {
            let mut last_time = self.last_log_time.lock();
            let now = Instant::now();
            match *last_time {
                Some(last) if now.duration_since(last) < self.min_interval => false,
                _ => {
                    *last_time = Some(now);
                    true
                }
            }
        };

        if !should_log {
            return false;
        }

        let count = self.error_count.swap(0, Ordering::Relaxed);
        let total = self.total_errors.load(Ordering::Relaxed);
        if count > 1 {
            tracing::error!(
                table = %self.table,
                error = %error,
                suppressed_count = count - 1,
                total_errors = total,
                "{message} (rate-limited)"
            );
        } else {
            tracing::error!(
                table = %self.table,
                error = %error,
                total_errors = total,
                "{message}"
            );
        }
        true
    }

    /// Errors counted but not yet logged
    pub fn pending_error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    pub fn total_error_count(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }
}
