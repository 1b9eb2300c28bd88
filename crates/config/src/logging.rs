//! Logging configuration
//!
//! The `[log]` section drives the `tracing` subscriber of colwrite binaries.
//! Events go to stderr unless a file is named, so stdout stays free for run
//! summaries.

use std::path::PathBuf;

use serde::Deserialize;

/// Filter used when `[log]` does not name one
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Event rendering
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Console,
    /// One JSON object per event
    Json,
}

/// `[log]` section
///
/// ```toml
/// [log]
/// filter = "info,colwrite_writer=debug"
/// format = "json"
/// file = "/var/log/colwrite/loadgen.log"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `warn,colwrite::metrics=info`
    pub filter: String,

    pub format: LogFormat,

    /// Append events here instead of writing to stderr
    pub file: Option<PathBuf>,

    /// Color console output; never applied to files or JSON
    pub ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            format: LogFormat::default(),
            file: None,
            ansi: true,
        }
    }
}

impl LogConfig {
    /// Replace the filter and file with command-line values, when given
    pub fn with_overrides(mut self, filter: Option<String>, file: Option<PathBuf>) -> Self {
        if let Some(filter) = filter {
            self.filter = filter;
        }
        if file.is_some() {
            self.file = file;
        }
        self
    }

    /// Whether the subscriber should emit color escape codes
    pub fn use_ansi(&self) -> bool {
        self.ansi && self.file.is_none() && self.format == LogFormat::Console
    }
}
