//! Database session boundary
//!
//! The writer never owns a connection. It prepares one statement and
//! executes batches through whatever implements [`Session`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use colwrite_config::ConsistencyLevel;

use crate::batch::BatchStatement;
use crate::routing::Topology;
use crate::template::StatementTemplate;

/// Errors reported by the driver for a single request
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriverError {
    /// No response within the deadline
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Coordinator knew too few live replicas to attempt the write
    #[error("not enough replicas for {consistency}: {alive} alive, {required} required")]
    Unavailable {
        consistency: ConsistencyLevel,
        required: u32,
        alive: u32,
    },

    /// Replicas did not acknowledge in time
    #[error("write timeout at {consistency}: {received}/{required} acknowledgments")]
    WriteTimeout {
        consistency: ConsistencyLevel,
        received: u32,
        required: u32,
    },

    /// Coordinator is shedding load
    #[error("coordinator overloaded")]
    Overloaded,

    /// Statement rejected as malformed or referring to unknown schema
    #[error("invalid query: {0}")]
    Invalid(String),

    /// Any other server-side error
    #[error("server error: {0}")]
    Server(String),

    /// Transport failure
    #[error("connection error: {0}")]
    Connection(String),
}

/// A statement the cluster has accepted for repeated execution
#[derive(Debug)]
pub struct PreparedStatement {
    id: Bytes,
    template: StatementTemplate,
    partition_key_indexes: Vec<usize>,
}

impl PreparedStatement {
    /// Pair the server-assigned id with the template it was prepared from
    ///
    /// `partition_key_indexes` are positions in the template's bind
    /// variables, in partition-key order.
    pub fn new(id: Bytes, template: StatementTemplate, partition_key_indexes: Vec<usize>) -> Self {
        Self {
            id,
            template,
            partition_key_indexes,
        }
    }

    pub fn id(&self) -> &Bytes {
        &self.id
    }

    pub fn template(&self) -> &StatementTemplate {
        &self.template
    }

    pub fn cql(&self) -> &str {
        self.template.cql()
    }

    pub fn partition_key_indexes(&self) -> &[usize] {
        &self.partition_key_indexes
    }
}

/// A live connection to the cluster
#[async_trait]
pub trait Session: Send + Sync {
    /// Prepare `cql` and return the server-assigned statement id
    async fn prepare(&self, cql: &str) -> Result<Bytes, DriverError>;

    /// Execute one batch at the batch's consistency level
    async fn execute(&self, batch: &BatchStatement) -> Result<(), DriverError>;

    /// Token-ring view used for replica-set batching, if the driver has one
    fn topology(&self) -> Option<Arc<dyn Topology>> {
        None
    }
}
