//! Partition routing keys and replica lookup
//!
//! The routing key is the partition key serialized the way the cluster
//! hashes it onto the token ring:
//!
//! ```text
//! single component:  <value bytes>
//! composite:         ( <u16 BE length> <value bytes> 0x00 )*
//! ```

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};

use crate::binder::BoundStatement;
use crate::value::CqlValue;

/// Largest partition-key component the cluster accepts
pub const MAX_KEY_COMPONENT_LEN: usize = u16::MAX as usize;

/// Nodes owning one token range, ordered so equal sets compare and hash equal
pub type ReplicaSet = BTreeSet<SocketAddr>;

/// Cluster token-ring view
pub trait Topology: Send + Sync {
    /// Replicas owning the partition with this routing key
    fn replicas(&self, keyspace: &str, routing_key: &[u8]) -> ReplicaSet;
}

/// Serialize partition-key components into a routing key
///
/// Components must be at most [`MAX_KEY_COMPONENT_LEN`] bytes;
/// [`RowBinder`](crate::binder::RowBinder) rejects records with larger ones.
pub fn encode_routing_key(components: &[&CqlValue]) -> Bytes {
    if let [single] = components {
        return single.to_bytes().unwrap_or_default();
    }

    let capacity = components.iter().map(|c| c.serialized_len() + 3).sum();
    let mut buf = BytesMut::with_capacity(capacity);
    for component in components {
        let len = u16::try_from(component.serialized_len()).unwrap_or(u16::MAX);
        buf.put_u16(len);
        component.write_to(&mut buf);
        buf.put_u8(0);
    }
    buf.freeze()
}

static NULL: CqlValue = CqlValue::Null;

/// Computes and memoizes routing keys of bound statements
#[derive(Debug, Clone)]
pub struct RoutingKeyResolver {
    partition_key_indexes: Arc<[usize]>,
}

impl RoutingKeyResolver {
    /// `partition_key_indexes` are bind-variable positions in partition-key order
    pub fn new(partition_key_indexes: &[usize]) -> Self {
        Self {
            partition_key_indexes: partition_key_indexes.into(),
        }
    }

    /// Routing key of `statement`, computed on first call
    ///
    /// Later calls return the very same buffer.
    pub fn resolve<'a>(&self, statement: &'a BoundStatement) -> &'a Bytes {
        statement.routing_key_cell().get_or_init(|| {
            let components: Vec<&CqlValue> = self
                .partition_key_indexes
                .iter()
                .map(|&i| statement.value_at(i).unwrap_or(&NULL))
                .collect();
            encode_routing_key(&components)
        })
    }
}
