//! In-memory session
//!
//! [`MemorySession`] stands in for a live cluster: it knows a set of table
//! schemas, accepts any statement for preparation, and records every batch
//! it executes. Latency and failures can be injected, and in-flight
//! executions are tracked so concurrency limits can be observed.

use std::collections::{HashMap, HashSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use colwrite_config::ConsistencyLevel;
use parking_lot::{Mutex, RwLock};

use crate::batch::{BatchStatement, BatchType};
use crate::routing::{ReplicaSet, Topology};
use crate::schema::{SchemaProvider, TableSchema};
use crate::session::{DriverError, Session};
use crate::value::{CqlValue, MaybeUnset};

/// A batch as the in-memory session received it
#[derive(Debug, Clone)]
pub struct RecordedBatch {
    pub cql: String,
    pub batch_type: BatchType,
    pub consistency: ConsistencyLevel,
    pub bytes: usize,
    /// Bound values of every statement, in batch order
    pub rows: Vec<Vec<MaybeUnset<CqlValue>>>,
}

impl RecordedBatch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Session and schema provider backed by process memory
#[derive(Default)]
pub struct MemorySession {
    tables: RwLock<HashMap<(String, String), TableSchema>>,
    prepared: Mutex<Vec<String>>,
    batches: Mutex<Vec<RecordedBatch>>,
    executions: AtomicU64,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    latency: Duration,
    failing_executions: Mutex<HashSet<u64>>,
    prepare_failure: Mutex<Option<DriverError>>,
    topology: Option<Arc<dyn Topology>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table
    pub fn with_table(self, schema: TableSchema) -> Self {
        self.add_table(schema);
        self
    }

    /// Delay every execution by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_topology(mut self, topology: Arc<dyn Topology>) -> Self {
        self.topology = Some(topology);
        self
    }

    pub fn add_table(&self, schema: TableSchema) {
        self.tables
            .write()
            .insert((schema.keyspace.clone(), schema.name.clone()), schema);
    }

    /// Fail the `ordinal`-th execution (1-based, in order of arrival)
    pub fn fail_execution(&self, ordinal: u64) {
        self.failing_executions.lock().insert(ordinal);
    }

    /// Fail every future `prepare` with `error`
    pub fn fail_prepare(&self, error: DriverError) {
        *self.prepare_failure.lock() = Some(error);
    }

    /// Statements prepared so far, in order
    pub fn prepared_statements(&self) -> Vec<String> {
        self.prepared.lock().clone()
    }

    /// Batches executed successfully, in completion order
    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.batches.lock().clone()
    }

    /// Rows across all recorded batches
    pub fn rows_written(&self) -> usize {
        self.batches.lock().iter().map(RecordedBatch::len).sum()
    }

    /// Executions attempted, including failed ones
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// Highest number of executions observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight count even when the execution is cancelled
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn prepare(&self, cql: &str) -> Result<Bytes, DriverError> {
        if let Some(err) = self.prepare_failure.lock().clone() {
            return Err(err);
        }
        let mut prepared = self.prepared.lock();
        prepared.push(cql.to_owned());
        Ok(Bytes::from(prepared.len().to_be_bytes().to_vec()))
    }

    async fn execute(&self, batch: &BatchStatement) -> Result<(), DriverError> {
        let ordinal = self.executions.fetch_add(1, Ordering::Relaxed) + 1;
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.failing_executions.lock().contains(&ordinal) {
            return Err(DriverError::WriteTimeout {
                consistency: batch.consistency(),
                received: 0,
                required: 1,
            });
        }

        let recorded = RecordedBatch {
            cql: batch
                .statements()
                .first()
                .map(|s| s.prepared().cql().to_owned())
                .unwrap_or_default(),
            batch_type: batch.batch_type(),
            consistency: batch.consistency(),
            bytes: batch.size_bytes(),
            rows: batch.statements().iter().map(|s| s.values().to_vec()).collect(),
        };
        self.batches.lock().push(recorded);
        Ok(())
    }

    fn topology(&self) -> Option<Arc<dyn Topology>> {
        self.topology.clone()
    }
}

#[async_trait]
impl SchemaProvider for MemorySession {
    async fn table(&self, keyspace: &str, table: &str) -> Result<Option<TableSchema>, DriverError> {
        Ok(self
            .tables
            .read()
            .get(&(keyspace.to_owned(), table.to_owned()))
            .cloned())
    }
}

/// Token ring with evenly spread nodes and a fixed replication factor
///
/// Each routing key hashes onto one node; its replicas are that node and the
/// next `replication_factor - 1` nodes around the ring.
#[derive(Debug, Clone)]
pub struct RingTopology {
    nodes: Vec<SocketAddr>,
    replication_factor: usize,
}

impl RingTopology {
    pub fn new(nodes: Vec<SocketAddr>, replication_factor: usize) -> Self {
        let replication_factor = replication_factor.clamp(1, nodes.len().max(1));
        Self {
            nodes,
            replication_factor,
        }
    }

    /// `count` nodes on consecutive ports of 127.0.0.1
    pub fn local(count: u16, replication_factor: usize) -> Self {
        let nodes = (0..count)
            .map(|i| SocketAddr::from(([127, 0, 0, 1], 9042 + i)))
            .collect();
        Self::new(nodes, replication_factor)
    }
}

impl Topology for RingTopology {
    fn replicas(&self, _keyspace: &str, routing_key: &[u8]) -> ReplicaSet {
        if self.nodes.is_empty() {
            return ReplicaSet::new();
        }
        let mut hasher = DefaultHasher::new();
        routing_key.hash(&mut hasher);
        let start = (hasher.finish() % self.nodes.len() as u64) as usize;
        (0..self.replication_factor)
            .map(|i| self.nodes[(start + i) % self.nodes.len()])
            .collect()
    }
}
