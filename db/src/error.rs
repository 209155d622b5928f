//! Error types for configuration loading.
//!
//! Provides a unified error type covering file I/O and JSON/YAML parsing of
//! the registry, the schema catalogs, and the project configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading configuration sources.
#[derive(Debug, Error)]
pub enum LoadError {
    /// File I/O failure.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing failure.
    #[error("invalid JSON in '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Configuration file could not be written.
    #[error("I/O error: {0}")]
    Write(#[from] std::io::Error),

    /// The source file does not exist.
    #[error("source file not found: {0}")]
    MissingSource(PathBuf),
}

/// Convenience alias for results with [`LoadError`].
pub type Result<T> = std::result::Result<T, LoadError>;
