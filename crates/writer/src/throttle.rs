//! Byte-rate throttle
//!
//! Token bucket refilled at the configured byte rate, holding at most one
//! second of burst. A batch larger than the available tokens is let through
//! immediately and the deficit is paid by sleeping, so no batch is ever
//! refused.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Async byte-rate limiter
#[derive(Debug)]
pub struct Throttle {
    bytes_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl Throttle {
    /// Returns `None` for a non-positive or non-finite rate
    pub fn new(bytes_per_sec: f64) -> Option<Self> {
        if !bytes_per_sec.is_finite() || bytes_per_sec <= 0.0 {
            return None;
        }
        Some(Self {
            bytes_per_sec,
            bucket: Mutex::new(Bucket {
                tokens: bytes_per_sec,
                last_refill: Instant::now(),
            }),
        })
    }

    pub fn bytes_per_sec(&self) -> f64 {
        self.bytes_per_sec
    }

    /// Take `bytes` tokens, sleeping while the bucket is in deficit
    pub async fn acquire(&self, bytes: usize) {
        let wait = self.reserve(bytes);
        if !wait.is_zero() {
            tracing::trace!(bytes, wait_ms = wait.as_millis() as u64, "throttling");
            tokio::time::sleep(wait).await;
        }
    }

    fn reserve(&self, bytes: usize) -> Duration {
        let mut bucket = self.bucket.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.bytes_per_sec).min(self.bytes_per_sec);
        bucket.last_refill = now;

        bucket.tokens -= bytes as f64;
        if bucket.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-bucket.tokens / self.bytes_per_sec)
        }
    }
}
