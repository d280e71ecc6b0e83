// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading new bytes from the watched log file.
#[derive(Debug, Error)]
pub enum TailError {
    #[error("Permission denied reading log file: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TailError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

/// A single line could not be processed. Never fatal for the batch.
#[derive(Debug, Error)]
pub enum LineError {
    #[error("Line {index} is {len} bytes, over the {max} byte limit")]
    TooLong { index: usize, len: usize, max: usize },
}

/// Errors writing the JSON audit trail.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("IO error on audit file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Audit file {path} is not a JSON array: {message}")]
    Malformed { path: PathBuf, message: String },
}

/// Errors loading the monitor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {message}")]
    Toml { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("Unsupported LLM class: {0}")]
    UnsupportedLlmClass(String),
}
