//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file '{}'", path.display())]
    Read {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The configuration file is not valid TOML for the expected schema.
    #[error("failed to parse configuration file '{}'", path.display())]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
    /// A field carried an invalid value.
    #[error("invalid value for '{field}': {reason}")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Human-readable reason for the failure.
        reason: &'static str,
    },
    /// An environment override could not be parsed.
    #[error("invalid environment override {key}='{value}': {reason}")]
    InvalidEnv {
        /// Environment variable name.
        key: String,
        /// Raw value found in the environment.
        value: String,
        /// Human-readable reason for the failure.
        reason: &'static str,
    },
    /// No platform configuration directory could be determined.
    #[error("no configuration directory available; set an explicit path")]
    ConfigDirUnavailable,
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
