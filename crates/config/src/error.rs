//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A single option holds a value outside its accepted range
    #[error("{section} option '{field}' is invalid: {message}")]
    InvalidValue {
        /// Config section (e.g., "write")
        section: &'static str,
        /// Option name
        field: &'static str,
        /// Error message
        message: String,
    },

    /// Two options were set that cannot be used together
    #[error("{section} options '{first}' and '{second}' are mutually exclusive")]
    Conflicting {
        /// Config section
        section: &'static str,
        /// First option name
        first: &'static str,
        /// Second option name
        second: &'static str,
    },
}

impl ConfigError {
    /// Create an InvalidValue error
    pub fn invalid_value(
        section: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            section,
            field,
            message: message.into(),
        }
    }

    /// Create a Conflicting error
    pub fn conflicting(section: &'static str, first: &'static str, second: &'static str) -> Self {
        Self::Conflicting {
            section,
            first,
            second,
        }
    }
}
