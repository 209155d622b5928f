//! SQLite backend for resolved table specifications.
//!
//! This crate turns a [`TableSpec`](tablespec_core::TableSpec) into
//! `CREATE TABLE IF NOT EXISTS` statements and seed inserts, and applies a
//! bulk create or delete action to a list of tables over one connection.
//!
//! # Architecture
//!
//! - **`ddl`**: statement synthesis (primary keys, column definitions,
//!   defaults, seed inserts, drops)
//! - **`convert`**: JSON seed values to bound SQLite parameters
//! - **`executor`**: connection lifecycle and per-table create/drop with
//!   success accounting
//!
//! # Quick start
//!
//! ```no_run
//! use tablespec_db::Workspace;
//! use tablespec_sqlite::{Action, ActionExecutor, ConnectionOptions};
//!
//! let workspace = Workspace::from_config_file("tablespec.yml").unwrap();
//! let registry = workspace.registry();
//! let action: Action = registry.action().unwrap_or("create").parse().unwrap();
//! let tables = registry.table_list(action.as_str());
//!
//! let mut executor = ActionExecutor::new();
//! executor
//!     .connect(workspace.database_file(), &ConnectionOptions::default())
//!     .unwrap();
//! let report = executor.execute(action, tables, &workspace.resolver()).unwrap();
//! println!("{}/{} tables", report.succeeded, report.requested);
//! ```
//!
//! # Identifiers
//!
//! Table and column names are emitted unquoted. They must contain only
//! alphanumeric characters and underscores, must not start with a digit, and
//! must not be a reserved SQLite keyword. Seed values are always bound as
//! parameters.

mod convert;
mod ddl;
mod error;
mod executor;

pub use ddl::{
    PrimaryKey, SeedStatement, build_create_statement, build_drop_statement, build_seed_insert,
    build_seed_inserts, column_definition, default_literal,
};
pub use error::{Result, SqliteError};
pub use executor::{
    Action, ActionExecutor, ActionReport, ConnectionOptions, ExecutorState, RunStatus,
    StatementPreview, TableOutcome, preview,
};
