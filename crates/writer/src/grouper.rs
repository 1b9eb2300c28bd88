//! Batch grouping
//!
//! [`BatchGrouper`] turns a stream of bound statements into a lazy stream of
//! batches. Statements are accumulated in buckets keyed by [`BatchKey`]; a
//! bucket is emitted when it reaches the batch limit, when it is the least
//! recently touched bucket and a new one is needed beyond the buffer depth,
//! or when input runs out.
//!
//! Within a bucket statements keep their input order. Across buckets there
//! is no ordering guarantee.

use std::collections::{BTreeMap, HashMap, VecDeque};

use colwrite_config::{BatchLimit, ConsistencyLevel, MAX_BATCH_STATEMENTS};

use crate::batch::{BatchKey, BatchKeyFn, BatchStatement, BatchType};
use crate::binder::BoundStatement;

struct Bucket {
    batch: BatchStatement,
    /// Clock value of the last append, also the key in the access index
    touched: u64,
}

/// Bounded, key-partitioned accumulator over an iterator of statements
pub struct BatchGrouper<I> {
    input: I,
    key_fn: BatchKeyFn,
    max_rows: usize,
    max_bytes: usize,
    depth: usize,
    batch_type: BatchType,
    consistency: ConsistencyLevel,
    buckets: HashMap<BatchKey, Bucket>,
    access_order: BTreeMap<u64, BatchKey>,
    clock: u64,
    ready: VecDeque<BatchStatement>,
    exhausted: bool,
}

impl<I> BatchGrouper<I>
where
    I: Iterator<Item = BoundStatement>,
{
    /// `depth` is the maximum number of open buckets
    pub fn new(
        input: I,
        key_fn: BatchKeyFn,
        limit: BatchLimit,
        depth: usize,
        batch_type: BatchType,
        consistency: ConsistencyLevel,
    ) -> Self {
        Self {
            input,
            key_fn,
            max_rows: limit.max_rows.clamp(1, MAX_BATCH_STATEMENTS),
            max_bytes: limit.max_bytes.max(1),
            depth: depth.max(1),
            batch_type,
            consistency,
            buckets: HashMap::new(),
            access_order: BTreeMap::new(),
            clock: 0,
            ready: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Number of buckets currently open
    pub fn open_buckets(&self) -> usize {
        self.buckets.len()
    }

    fn add(&mut self, statement: BoundStatement) {
        let key = (self.key_fn)(&statement);
        self.clock += 1;
        let now = self.clock;

        match self.buckets.get_mut(&key) {
            Some(bucket) => {
                self.access_order.remove(&bucket.touched);
                bucket.touched = now;
                if !bucket.batch.is_empty()
                    && bucket.batch.size_bytes().saturating_add(statement.size()) > self.max_bytes
                {
                    self.ready.push_back(bucket.batch.take());
                }
            }
            None => {
                if self.buckets.len() >= self.depth {
                    self.evict_least_recent();
                }
                self.buckets.insert(
                    key.clone(),
                    Bucket {
                        batch: BatchStatement::new(self.batch_type, self.consistency),
                        touched: now,
                    },
                );
            }
        }
        self.access_order.insert(now, key.clone());

        let Some(bucket) = self.buckets.get_mut(&key) else {
            return;
        };
        bucket.batch.push(statement);
        if bucket.batch.len() >= self.max_rows || bucket.batch.size_bytes() >= self.max_bytes {
            self.close(&key);
        }
    }

    fn close(&mut self, key: &BatchKey) {
        if let Some(bucket) = self.buckets.remove(key) {
            self.access_order.remove(&bucket.touched);
            self.ready.push_back(bucket.batch);
        }
    }

    fn evict_least_recent(&mut self) {
        if let Some((_, key)) = self.access_order.pop_first()
            && let Some(bucket) = self.buckets.remove(&key)
        {
            tracing::trace!(rows = bucket.batch.len(), "evicting least recently used bucket");
            self.ready.push_back(bucket.batch);
        }
    }

    fn flush_all(&mut self) {
        while let Some((_, key)) = self.access_order.pop_first() {
            if let Some(bucket) = self.buckets.remove(&key) {
                self.ready.push_back(bucket.batch);
            }
        }
    }
}

impl<I> Iterator for BatchGrouper<I>
where
    I: Iterator<Item = BoundStatement>,
{
    type Item = BatchStatement;

    fn next(&mut self) -> Option<BatchStatement> {
        loop {
            if let Some(batch) = self.ready.pop_front() {
                return Some(batch);
            }
            if self.exhausted {
                return None;
            }
            match self.input.next() {
                Some(statement) => self.add(statement),
                None => {
                    self.exhausted = true;
                    self.flush_all();
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "grouper_test.rs"]
mod grouper_test;
