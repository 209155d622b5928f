//! Error types for DDL synthesis and execution.
//!
//! Provides a unified error type covering database access, identifier and
//! specification validation, table resolution, and action parsing.

use std::path::PathBuf;

use tablespec_core::ResolveError;
use thiserror::Error;

/// Errors that can occur while building or executing table statements.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite statement failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// The database file could not be opened.
    #[error("failed to open database '{path}': {source}")]
    ConnectionError {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// The directory for the database file could not be created.
    #[error("failed to create database directory '{path}': {source}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An action was requested before a connection was opened.
    #[error("no database connection")]
    NotConnected,

    /// A table, column, or seed key is not a plain SQL identifier.
    #[error(
        "invalid identifier '{0}': expected letters, digits and underscores, \
         not starting with a digit and not a reserved keyword"
    )]
    InvalidIdentifier(String),

    /// The table specification cannot be turned into DDL.
    #[error("invalid table specification for '{table}': {reason}")]
    InvalidSpec { table: String, reason: String },

    /// The table could not be resolved.
    #[error("resolution error: {0}")]
    ResolveError(#[from] ResolveError),

    /// The configured action is neither `create` nor `delete`.
    #[error("unknown action '{0}': expected 'create' or 'delete'")]
    UnknownAction(String),
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
