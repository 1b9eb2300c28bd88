//! Batch statements and batch keys

use std::sync::Arc;

use bytes::Bytes;
use colwrite_config::{BatchGranularity, ConsistencyLevel};

use crate::binder::BoundStatement;
use crate::error::WriteError;
use crate::routing::{ReplicaSet, RoutingKeyResolver, Topology};

/// Batch log mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchType {
    /// No batch log; statements are independent writes
    Unlogged,
    /// Required for counter updates
    Counter,
}

impl BatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unlogged => "UNLOGGED",
            Self::Counter => "COUNTER",
        }
    }
}

/// What statements in one batch have in common
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BatchKey {
    /// Everything shares one bucket
    All,
    /// Members of the owning replica set
    ReplicaSet(Arc<ReplicaSet>),
    /// Exact routing key
    Partition(Bytes),
}

/// Computes the batch key of a statement
pub type BatchKeyFn = Box<dyn Fn(&BoundStatement) -> BatchKey + Send + Sync>;

/// Key function for `granularity`
///
/// Replica-set batching needs `topology`; its absence is a configuration
/// error raised here rather than on the first statement.
pub fn batch_key_fn(
    granularity: BatchGranularity,
    resolver: RoutingKeyResolver,
    keyspace: &str,
    topology: Option<Arc<dyn Topology>>,
) -> Result<BatchKeyFn, WriteError> {
    match granularity {
        BatchGranularity::All => Ok(Box::new(|_: &BoundStatement| BatchKey::All)),
        BatchGranularity::Partition => Ok(Box::new(move |statement: &BoundStatement| {
            BatchKey::Partition(resolver.resolve(statement).clone())
        })),
        BatchGranularity::ReplicaSet => {
            let topology = topology.ok_or(WriteError::TopologyUnavailable { granularity })?;
            let keyspace = keyspace.to_owned();
            Ok(Box::new(move |statement: &BoundStatement| {
                let replicas = topology.replicas(&keyspace, resolver.resolve(statement));
                BatchKey::ReplicaSet(Arc::new(replicas))
            }))
        }
    }
}

/// Bound statements sent together in one request
#[derive(Debug)]
pub struct BatchStatement {
    batch_type: BatchType,
    consistency: ConsistencyLevel,
    statements: Vec<BoundStatement>,
    size: usize,
}

impl BatchStatement {
    pub fn new(batch_type: BatchType, consistency: ConsistencyLevel) -> Self {
        Self {
            batch_type,
            consistency,
            statements: Vec::new(),
            size: 0,
        }
    }

    pub(crate) fn push(&mut self, statement: BoundStatement) {
        self.size += statement.size();
        self.statements.push(statement);
    }

    /// Hand over the accumulated statements, leaving this batch empty
    pub(crate) fn take(&mut self) -> Self {
        let empty = Self::new(self.batch_type, self.consistency);
        std::mem::replace(self, empty)
    }

    pub fn batch_type(&self) -> BatchType {
        self.batch_type
    }

    pub fn consistency(&self) -> ConsistencyLevel {
        self.consistency
    }

    pub fn statements(&self) -> &[BoundStatement] {
        &self.statements
    }

    /// Number of statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Estimated payload bytes of all statements
    pub fn size_bytes(&self) -> usize {
        self.size
    }
}
