//! Configuration validation
//!
//! Checks that the log filter is set and that write options are usable
//! before any writer is built:
//! - Counts and sizes are positive and within protocol limits
//! - Static and per-row forms of TTL/timestamp are not both set
//! - Per-row option columns are named and distinct
//! - Conditional inserts are only batched per partition

use std::time::Duration;

use crate::Config;
use crate::logging::LogConfig;
use crate::error::{ConfigError, Result};
use crate::write::{BatchGranularity, MAX_BATCH_STATEMENTS, WriteOptions};

const SECTION: &str = "write";

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_log(&config.log)?;
    validate_write_options(&config.write)
}

fn validate_log(log: &LogConfig) -> Result<()> {
    if log.filter.trim().is_empty() {
        return Err(ConfigError::invalid_value(
            "log",
            "filter",
            "must not be empty",
        ));
    }
    Ok(())
}

/// Validate one set of write options
pub fn validate_write_options(options: &WriteOptions) -> Result<()> {
    validate_limits(options)?;
    validate_ttl(options)?;
    validate_timestamp(options)?;
    validate_option_columns(options)?;
    validate_throughput(options)?;
    validate_conditional(options)?;
    Ok(())
}

fn validate_limits(options: &WriteOptions) -> Result<()> {
    if options.parallelism == 0 {
        return Err(ConfigError::invalid_value(
            SECTION,
            "parallelism",
            "must be at least 1",
        ));
    }

    if options.batch_buffer_size == 0 {
        return Err(ConfigError::invalid_value(
            SECTION,
            "batch_buffer_size",
            "must be at least 1",
        ));
    }

    match options.batch_size_rows {
        Some(0) => {
            return Err(ConfigError::invalid_value(
                SECTION,
                "batch_size_rows",
                "must be at least 1",
            ));
        }
        Some(rows) if rows > MAX_BATCH_STATEMENTS => {
            return Err(ConfigError::invalid_value(
                SECTION,
                "batch_size_rows",
                format!("must not exceed {MAX_BATCH_STATEMENTS}"),
            ));
        }
        _ => {}
    }

    if options.batch_size_bytes == Some(0) {
        return Err(ConfigError::invalid_value(
            SECTION,
            "batch_size_bytes",
            "must be at least 1",
        ));
    }

    if options.request_timeout == Duration::ZERO {
        return Err(ConfigError::invalid_value(
            SECTION,
            "request_timeout",
            "must be greater than zero",
        ));
    }

    Ok(())
}

fn validate_ttl(options: &WriteOptions) -> Result<()> {
    if options.ttl.is_some() && options.ttl_column.is_some() {
        return Err(ConfigError::conflicting(SECTION, "ttl", "ttl_column"));
    }

    if let Some(ttl) = options.ttl
        && !(0..=i64::from(i32::MAX)).contains(&ttl)
    {
        return Err(ConfigError::invalid_value(
            SECTION,
            "ttl",
            format!("{ttl} is outside 0..={}", i32::MAX),
        ));
    }

    Ok(())
}

fn validate_timestamp(options: &WriteOptions) -> Result<()> {
    if options.timestamp.is_some() && options.timestamp_column.is_some() {
        return Err(ConfigError::conflicting(
            SECTION,
            "timestamp",
            "timestamp_column",
        ));
    }

    if let Some(ts) = options.timestamp
        && ts < 0
    {
        return Err(ConfigError::invalid_value(
            SECTION,
            "timestamp",
            "must not be negative",
        ));
    }

    Ok(())
}

fn validate_option_columns(options: &WriteOptions) -> Result<()> {
    if options.ttl_column.as_deref().is_some_and(str::is_empty) {
        return Err(ConfigError::invalid_value(
            SECTION,
            "ttl_column",
            "must not be empty",
        ));
    }

    if options.timestamp_column.as_deref().is_some_and(str::is_empty) {
        return Err(ConfigError::invalid_value(
            SECTION,
            "timestamp_column",
            "must not be empty",
        ));
    }

    if let (Some(ttl), Some(ts)) = (&options.ttl_column, &options.timestamp_column)
        && ttl == ts
    {
        return Err(ConfigError::conflicting(
            SECTION,
            "ttl_column",
            "timestamp_column",
        ));
    }

    Ok(())
}

fn validate_throughput(options: &WriteOptions) -> Result<()> {
    if let Some(mb) = options.throughput_mb_per_sec
        && !(mb.is_finite() && mb > 0.0)
    {
        return Err(ConfigError::invalid_value(
            SECTION,
            "throughput_mb_per_sec",
            "must be a positive number",
        ));
    }
    Ok(())
}

/// Conditional batches must not span partitions
fn validate_conditional(options: &WriteOptions) -> Result<()> {
    if options.if_not_exists && options.batch_granularity != BatchGranularity::Partition {
        return Err(ConfigError::conflicting(
            SECTION,
            "if_not_exists",
            "batch_granularity",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::write::WriteValue;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_write_options(&WriteOptions::default()).is_ok());
    }

    #[test]
    fn test_static_and_per_row_ttl_rejected() {
        let options = WriteOptions {
            ttl: Some(100),
            ttl_column: Some("ttl".into()),
            ..Default::default()
        };
        let err = validate_write_options(&options).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Conflicting {
                first: "ttl",
                second: "ttl_column",
                ..
            }
        ));
    }

    #[test]
    fn test_static_and_per_row_timestamp_rejected() {
        let options = WriteOptions {
            timestamp: Some(1),
            timestamp_column: Some("ts".into()),
            ..Default::default()
        };
        assert!(matches!(
            validate_write_options(&options),
            Err(ConfigError::Conflicting {
                first: "timestamp",
                ..
            })
        ));
    }

    #[test]
    fn test_ttl_and_timestamp_together_allowed() {
        let options = WriteOptions::default()
            .with_ttl(WriteValue::Static(100))
            .with_timestamp(WriteValue::PerRow("ts".into()));
        assert!(validate_write_options(&options).is_ok());
    }

    #[test]
    fn test_shared_option_column_rejected() {
        let options = WriteOptions::default()
            .with_ttl(WriteValue::PerRow("opt".into()))
            .with_timestamp(WriteValue::PerRow("opt".into()));
        assert!(validate_write_options(&options).is_err());
    }

    #[test]
    fn test_zero_limits_rejected() {
        for options in [
            WriteOptions::default().with_parallelism(0),
            WriteOptions::default().with_batch_buffer_size(0),
            WriteOptions::default().with_batch_size_rows(0),
            WriteOptions::default().with_batch_size_bytes(0),
            WriteOptions::default().with_request_timeout(Duration::ZERO),
        ] {
            assert!(validate_write_options(&options).is_err(), "{options:?}");
        }
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let options = WriteOptions::default().with_batch_size_rows(MAX_BATCH_STATEMENTS + 1);
        let err = validate_write_options(&options).unwrap_err();
        assert!(err.to_string().contains("batch_size_rows"));
    }

    #[test]
    fn test_bad_ttl_and_throughput_rejected() {
        assert!(validate_write_options(&WriteOptions::default().with_ttl(WriteValue::Static(-1))).is_err());
        assert!(
            validate_write_options(&WriteOptions::default().with_throughput_mb_per_sec(0.0)).is_err()
        );
        assert!(
            validate_write_options(&WriteOptions::default().with_throughput_mb_per_sec(f64::NAN))
                .is_err()
        );
    }

    #[test]
    fn test_if_not_exists_requires_partition_batches() {
        let conditional = WriteOptions::default().with_if_not_exists(true);
        assert!(validate_write_options(&conditional).is_ok());

        for granularity in [BatchGranularity::All, BatchGranularity::ReplicaSet] {
            let options = conditional.clone().with_batch_granularity(granularity);
            assert!(matches!(
                validate_write_options(&options),
                Err(ConfigError::Conflicting {
                    first: "if_not_exists",
                    second: "batch_granularity",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_empty_log_filter_rejected() {
        let config = Config {
            log: LogConfig {
                filter: " ".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("filter"), "{err}");
    }
}
