//! Tests for batch grouping

use std::cell::Cell;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use colwrite_config::{BatchGranularity, BatchLimit, ConsistencyLevel, WriteOptions};

use super::*;
use crate::batch::batch_key_fn;
use crate::binder::RowBinder;
use crate::extractor::FnExtractor;
use crate::routing::{ReplicaSet, RoutingKeyResolver, Topology};
use crate::schema::{ColumnDef, ColumnSelector, CqlType, TableSchema, TableTarget};
use crate::session::PreparedStatement;
use crate::template::StatementTemplate;
use crate::value::CqlValue;

// =============================================================================
// Helpers
// =============================================================================

type Record = (i32, &'static str);

fn binder() -> RowBinder<Record> {
    let schema = TableSchema::new(
        "ks",
        "t",
        vec![
            ColumnDef::partition_key("id", CqlType::Int),
            ColumnDef::regular("payload", CqlType::Text),
        ],
    );
    let target = TableTarget::select(&schema, &ColumnSelector::All).unwrap();
    let template = StatementTemplate::build(&target, &WriteOptions::default()).unwrap();
    let prepared = Arc::new(PreparedStatement::new(Bytes::from_static(b"p"), template, vec![0]));
    let extractor = FnExtractor::new(|r: &Record, column: &str| match column {
        "id" => Some(Some(CqlValue::Int(r.0))),
        "payload" => Some(Some(CqlValue::from(r.1))),
        _ => None,
    });
    RowBinder::new(prepared, Arc::new(extractor), false)
}

fn statements(records: &[Record]) -> Vec<BoundStatement> {
    let binder = binder();
    records.iter().map(|r| binder.bind(r).unwrap()).collect()
}

fn key_fn(granularity: BatchGranularity, topology: Option<Arc<dyn Topology>>) -> BatchKeyFn {
    batch_key_fn(granularity, RoutingKeyResolver::new(&[0]), "ks", topology).unwrap()
}

fn grouper(
    records: &[Record],
    granularity: BatchGranularity,
    limit: BatchLimit,
    depth: usize,
) -> BatchGrouper<std::vec::IntoIter<BoundStatement>> {
    BatchGrouper::new(
        statements(records).into_iter(),
        key_fn(granularity, None),
        limit,
        depth,
        BatchType::Unlogged,
        ConsistencyLevel::LocalQuorum,
    )
}

fn ids(batch: &BatchStatement) -> Vec<i32> {
    batch
        .statements()
        .iter()
        .map(|s| match s.value_at(0) {
            Some(CqlValue::Int(id)) => *id,
            other => panic!("unexpected id {other:?}"),
        })
        .collect()
}

fn payloads(batch: &BatchStatement) -> Vec<String> {
    batch
        .statements()
        .iter()
        .map(|s| match s.value_at(1) {
            Some(CqlValue::Text(p)) => p.clone(),
            other => panic!("unexpected payload {other:?}"),
        })
        .collect()
}

/// Two replica sets; even ids on one, odd ids on the other
struct ParityTopology;

impl Topology for ParityTopology {
    fn replicas(&self, _keyspace: &str, routing_key: &[u8]) -> ReplicaSet {
        let last = routing_key.last().copied().unwrap_or(0);
        let nodes: [SocketAddr; 3] = [
            "10.0.0.1:9042".parse().unwrap(),
            "10.0.0.2:9042".parse().unwrap(),
            "10.0.0.3:9042".parse().unwrap(),
        ];
        if last % 2 == 0 {
            [nodes[0], nodes[1]].into_iter().collect()
        } else {
            [nodes[2], nodes[1]].into_iter().collect()
        }
    }
}

// =============================================================================
// Granularity
// =============================================================================

#[test]
fn test_all_chunks_in_input_order() {
    let records: Vec<Record> = (1..=7).map(|i| (i, "x")).collect();
    let batches: Vec<_> =
        grouper(&records, BatchGranularity::All, BatchLimit::rows(3), 10).collect();

    let sizes: Vec<_> = batches.iter().map(BatchStatement::len).collect();
    assert_eq!(sizes, [3, 3, 1]);
    assert_eq!(ids(&batches[0]), [1, 2, 3]);
    assert_eq!(ids(&batches[1]), [4, 5, 6]);
    assert_eq!(ids(&batches[2]), [7]);
}

#[test]
fn test_partition_co_location() {
    let records = [(1, "a"), (2, "b"), (1, "c"), (3, "d"), (2, "e"), (1, "f")];
    let batches: Vec<_> =
        grouper(&records, BatchGranularity::Partition, BatchLimit::rows(10), 10).collect();

    assert_eq!(batches.len(), 3);
    for batch in &batches {
        let ids = ids(batch);
        assert!(ids.iter().all(|id| *id == ids[0]), "mixed partitions: {ids:?}");
    }
    let first = batches.iter().find(|b| ids(b)[0] == 1).unwrap();
    assert_eq!(payloads(first), ["a", "c", "f"]);
}

#[test]
fn test_partition_keys_are_resolved_once() {
    let mut grouper = grouper(&[(1, "a")], BatchGranularity::Partition, BatchLimit::rows(10), 10);
    let batch = grouper.next().unwrap();
    let statement = &batch.statements()[0];
    let cached = statement.routing_key().unwrap();
    assert_eq!(cached.as_ref(), &[0, 0, 0, 1]);

    let resolver = RoutingKeyResolver::new(&[0]);
    assert!(std::ptr::eq(resolver.resolve(statement), cached));
}

#[test]
fn test_replica_set_groups_by_membership() {
    let topology: Arc<dyn Topology> = Arc::new(ParityTopology);
    let records = [(1, "a"), (2, "b"), (3, "c"), (4, "d"), (5, "e")];
    let batches: Vec<_> = BatchGrouper::new(
        statements(&records).into_iter(),
        key_fn(BatchGranularity::ReplicaSet, Some(topology)),
        BatchLimit::rows(10),
        10,
        BatchType::Unlogged,
        ConsistencyLevel::One,
    )
    .collect();

    assert_eq!(batches.len(), 2);
    let mut groups: Vec<_> = batches.iter().map(ids).collect();
    groups.sort();
    assert_eq!(groups, [vec![1, 3, 5], vec![2, 4]]);
}

#[test]
fn test_replica_set_key_is_the_member_set() {
    let topology: Arc<dyn Topology> = Arc::new(ParityTopology);
    let key_fn = key_fn(BatchGranularity::ReplicaSet, Some(topology));
    let bound = statements(&[(1, "a"), (3, "b"), (2, "c")]);

    let a: SocketAddr = "10.0.0.2:9042".parse().unwrap();
    let b: SocketAddr = "10.0.0.3:9042".parse().unwrap();
    let expected: ReplicaSet = [b, a].into_iter().collect();

    assert_eq!(key_fn(&bound[0]), BatchKey::ReplicaSet(Arc::new(expected)));
    assert_eq!(key_fn(&bound[0]), key_fn(&bound[1]));
    assert_ne!(key_fn(&bound[0]), key_fn(&bound[2]));
}

#[test]
fn test_replica_set_without_topology() {
    let result = batch_key_fn(
        BatchGranularity::ReplicaSet,
        RoutingKeyResolver::new(&[0]),
        "ks",
        None,
    );
    assert!(matches!(
        result,
        Err(crate::error::WriteError::TopologyUnavailable { .. })
    ));
}

// =============================================================================
// Limits and eviction
// =============================================================================

#[test]
fn test_eviction_at_buffer_depth() {
    let records = [(1, "a"), (2, "b"), (1, "c"), (3, "d")];
    let mut grouper =
        grouper(&records, BatchGranularity::Partition, BatchLimit::rows(10), 2);

    // partition 2 is least recently touched when 3 arrives
    let evicted = grouper.next().unwrap();
    assert_eq!(ids(&evicted), [2]);
    assert_eq!(grouper.open_buckets(), 2);

    let rest: Vec<_> = grouper.map(|b| ids(&b)).collect();
    assert_eq!(rest, [vec![1, 1], vec![3]]);
}

#[test]
fn test_byte_limit_splits_before_overflow() {
    // 4 bytes of id + 4 bytes of payload per statement
    let records: Vec<Record> = (1..=5).map(|i| (i, "abcd")).collect();
    let batches: Vec<_> =
        grouper(&records, BatchGranularity::All, BatchLimit::bytes(20), 10).collect();

    let sizes: Vec<_> = batches.iter().map(BatchStatement::len).collect();
    assert_eq!(sizes, [2, 2, 1]);
    assert!(batches.iter().all(|b| b.size_bytes() <= 20));
}

#[test]
fn test_oversized_statement_is_sent_alone() {
    let records = [(1, "a"), (2, "a very long payload that exceeds the limit"), (3, "b")];
    let batches: Vec<_> =
        grouper(&records, BatchGranularity::All, BatchLimit::bytes(12), 10).collect();

    let groups: Vec<_> = batches.iter().map(ids).collect();
    assert_eq!(groups, [vec![1], vec![2], vec![3]]);
}

#[test]
fn test_statement_cap() {
    let records: Vec<Record> = (0..MAX_BATCH_STATEMENTS as i32 + 1).map(|i| (i, "")).collect();
    let unlimited = BatchLimit {
        max_rows: usize::MAX,
        max_bytes: usize::MAX,
    };
    let sizes: Vec<_> = grouper(&records, BatchGranularity::All, unlimited, 1)
        .map(|b| b.len())
        .collect();
    assert_eq!(sizes, [MAX_BATCH_STATEMENTS, 1]);
}

#[test]
fn test_consumes_input_lazily() {
    let pulled = Cell::new(0);
    let input = statements(&[(1, "a"), (2, "b"), (3, "c"), (4, "d")])
        .into_iter()
        .inspect(|_| pulled.set(pulled.get() + 1));
    let mut grouper = BatchGrouper::new(
        input,
        key_fn(BatchGranularity::All, None),
        BatchLimit::rows(2),
        1,
        BatchType::Unlogged,
        ConsistencyLevel::One,
    );

    assert_eq!(pulled.get(), 0);
    assert_eq!(grouper.next().map(|b| b.len()), Some(2));
    assert_eq!(pulled.get(), 2);
    assert_eq!(grouper.next().map(|b| b.len()), Some(2));
    assert!(grouper.next().is_none());
}
