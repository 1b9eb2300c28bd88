//! Load generator for the write path
//!
//! Drives concurrent `TableWriter::write` calls against the in-memory session
//! with simulated request latency, and reports throughput.
//!
//! Usage:
//!   cargo run --release -p colwrite-bench --bin loadgen
//!   cargo run --release -p colwrite-bench --bin loadgen -- --config write.toml --records 5000000
//!
//! Default: 8 partitions, 1M records, 10k sensors, 1ms latency

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use colwrite_config::{Config, LogConfig, LogFormat};
use colwrite_writer::{
    ColumnDef, ColumnSelector, CqlType, CqlValue, FnExtractor, LogMetricsSink, MemorySession,
    RingTopology, Session, TableSchema, TableWriter,
};
use tokio::task::JoinSet;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};
use uuid::Uuid;

const KEYSPACE: &str = "bench";
const TABLE: &str = "readings";

/// Load generator configuration
#[derive(Parser, Debug)]
#[command(name = "loadgen", about = "colwrite write path load generator")]
struct Args {
    /// TOML config with [log] and [write] sections
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Total records to write
    #[arg(short, long, default_value = "1000000")]
    records: u64,

    /// Concurrent write calls sharing one table writer
    #[arg(short, long, default_value = "8")]
    partitions: u64,

    /// Distinct partition keys
    #[arg(short, long, default_value = "10000")]
    sensors: u64,

    /// Blob payload size per record
    #[arg(long, default_value = "64")]
    payload_bytes: usize,

    /// Simulated latency per batch in milliseconds
    #[arg(short, long, default_value = "1")]
    latency_ms: u64,

    /// Nodes in the simulated ring
    #[arg(long, default_value = "6")]
    nodes: u16,

    /// Replication factor of the simulated ring
    #[arg(long, default_value = "3")]
    replication_factor: usize,

    /// Override write.parallelism
    #[arg(long)]
    parallelism: Option<usize>,

    /// Override write.batch_size_rows
    #[arg(long)]
    batch_rows: Option<usize>,

    /// Override log.filter (any EnvFilter directive)
    #[arg(long)]
    log_filter: Option<String>,

    /// Override log.file; events go to stderr when neither is set
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// One generated row
struct Reading {
    sensor: Uuid,
    ts: i64,
    value: f64,
    payload: Vec<u8>,
}

fn readings_table() -> TableSchema {
    TableSchema::new(
        KEYSPACE,
        TABLE,
        vec![
            ColumnDef::partition_key("sensor", CqlType::Uuid),
            ColumnDef::clustering("ts", CqlType::Timestamp),
            ColumnDef::regular("value", CqlType::Double),
            ColumnDef::regular("payload", CqlType::Blob),
        ],
    )
}

fn reading_column(r: &Reading, column: &str) -> Option<Option<CqlValue>> {
    match column {
        "sensor" => Some(Some(CqlValue::Uuid(r.sensor))),
        "ts" => Some(Some(CqlValue::Timestamp(r.ts))),
        "value" => Some(Some(CqlValue::Double(r.value))),
        "payload" => Some(Some(CqlValue::from(r.payload.clone()))),
        _ => None,
    }
}

/// Records `start..end`, generated lazily
fn readings(start: u64, end: u64, sensors: u64, payload_bytes: usize) -> impl Iterator<Item = Reading> + Send {
    (start..end).map(move |i| Reading {
        sensor: Uuid::from_u128(u128::from(i % sensors.max(1))),
        ts: i as i64,
        value: i as f64 * 0.5,
        payload: vec![(i % 251) as u8; payload_bytes],
    })
}

/// Initialize the tracing subscriber from the [log] section
fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .with_context(|| format!("invalid log filter {:?}", config.filter))?;

    let writer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let layer = fmt::layer()
        .with_target(true)
        .with_ansi(config.use_ansi())
        .with_writer(writer);
    let layer = match config.format {
        LogFormat::Console => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    };

    tracing_subscriber::registry().with(layer).with(filter).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    let log = config
        .log
        .clone()
        .with_overrides(args.log_filter.clone(), args.log_file.clone());
    init_logging(&log)?;

    let mut options = config.write.clone();
    if let Some(parallelism) = args.parallelism {
        options = options.with_parallelism(parallelism);
    }
    if let Some(rows) = args.batch_rows {
        options = options.with_batch_size_rows(rows);
    }

    let session = Arc::new(
        MemorySession::new()
            .with_table(readings_table())
            .with_latency(Duration::from_millis(args.latency_ms))
            .with_topology(Arc::new(RingTopology::local(args.nodes, args.replication_factor))),
    );

    let writer = TableWriter::<Reading>::for_table(
        Arc::clone(&session) as Arc<dyn Session>,
        session.as_ref(),
        KEYSPACE,
        TABLE,
        ColumnSelector::All,
        options,
        Arc::new(FnExtractor::<Reading, _>::new(reading_column)),
    )
    .await
    .context("failed to build table writer")?
    .with_metrics_sink(Arc::new(LogMetricsSink));
    let writer = Arc::new(writer);

    tracing::info!(
        records = args.records,
        partitions = args.partitions,
        sensors = args.sensors,
        granularity = %writer.options().batch_granularity,
        parallelism = writer.options().parallelism,
        cql = %writer.template().cql(),
        "starting load"
    );

    let partitions = args.partitions.max(1);
    let per_partition = args.records.div_ceil(partitions);
    let started = Instant::now();

    let mut tasks = JoinSet::new();
    for p in 0..partitions {
        let start = p * per_partition;
        let end = ((p + 1) * per_partition).min(args.records);
        let records = readings(start, end, args.sensors, args.payload_bytes);
        let writer = Arc::clone(&writer);
        tasks.spawn(async move { writer.write(records).await });
    }

    let mut rows = 0;
    let mut bytes = 0;
    let mut batches = 0;
    let mut failures = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.context("write task panicked")? {
            Ok(result) => {
                rows += result.rows_written;
                bytes += result.bytes_written;
                batches += result.batches_written;
            }
            Err(e) => {
                tracing::error!(error = %e, "partition write failed");
                failures += 1;
            }
        }
    }

    let elapsed = started.elapsed();
    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    println!();
    println!("  rows       {rows}");
    println!("  batches    {batches}");
    println!("  bytes      {bytes}");
    println!("  elapsed    {:.2}s", secs);
    println!("  rows/s     {:.0}", rows as f64 / secs);
    println!("  MB/s       {:.2}", bytes as f64 / secs / 1_048_576.0);
    println!("  max flight {}", session.max_in_flight());
    println!();

    if failures > 0 {
        anyhow::bail!("{failures} partition write(s) failed");
    }
    Ok(())
}
