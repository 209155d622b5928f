//! Loading of table registries, schema catalogs and project configuration.
//!
//! This crate reads the on-disk sources a run needs and produces an
//! immutable in-memory [`Workspace`]:
//!
//! - the table registry (`setup.json`): actions, database parameters and
//!   per-table entries;
//! - the data schema catalog: common columns and named variants;
//! - the helper schema catalog: self-contained tables with seed rows;
//! - the YAML [`ProjectConfig`] that names the three files.
//!
//! # Quick start
//!
//! ```no_run
//! use tablespec_db::Workspace;
//!
//! let workspace = Workspace::from_config_file("tablespec.yml").unwrap();
//! let registry = workspace.registry();
//! if let Some(action) = registry.action() {
//!     println!("{action}: {:?}", registry.table_list(action));
//! }
//! ```
//!
//! # Failure policy
//!
//! A missing or malformed JSON source never aborts loading. It is logged,
//! recorded as a [`LoadIssue`], and replaced by an empty source so the caller
//! can decide whether zero tables is acceptable.

mod config;
mod error;
mod loader;

pub use config::{DEFAULT_DATA_SCHEMAS_FILE, DEFAULT_REGISTRY_FILE, ProjectConfig};
pub use error::{LoadError, Result};
pub use loader::{
    LoadIssue, SourceKind, Workspace, load_data_schemas, load_helper_schemas, load_registry,
};
