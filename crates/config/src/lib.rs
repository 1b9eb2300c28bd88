//! colwrite Configuration
//!
//! TOML-based configuration for the bulk write path with sensible defaults.
//! An empty file is a valid configuration.
//!
//! # Parsing
//!
//! ```
//! use colwrite_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[write]\nparallelism = 8").unwrap();
//! assert_eq!(config.write.parallelism, 8);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! filter = "info,colwrite::metrics=debug"
//! format = "json"
//!
//! [write]
//! consistency_level = "local_quorum"
//! batch_granularity = "partition"
//! batch_size_rows = 50
//! parallelism = 8
//! ttl = 86400
//! ```

mod error;
mod logging;
mod validation;
mod write;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logging::{DEFAULT_LOG_FILTER, LogConfig, LogFormat};
pub use write::{
    BatchGranularity, BatchLimit, ConsistencyLevel, DEFAULT_BATCH_BUFFER_SIZE,
    DEFAULT_BATCH_SIZE_BYTES, DEFAULT_PARALLELISM, DEFAULT_REQUEST_TIMEOUT, MAX_BATCH_STATEMENTS,
    WriteOptions, WriteValue,
};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Write job options
    pub write: WriteOptions,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, contains invalid TOML, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
