//! Column model, schema catalogs and table specification resolution.
//!
//! This crate is the schema composition engine's front half:
//!
//! - [`ColumnDef`], [`ColumnType`], [`DefaultValue`]: declarative column
//!   definitions as written in the JSON catalogs.
//! - [`SchemaStore`]: the data catalog (common columns + named variants)
//!   and the helper catalog (self-contained tables with seed rows).
//! - [`TableRegistry`]: per-action table lists, per-table overrides and
//!   database parameters.
//! - [`SpecResolver`]: combines the two into a [`TableSpec`].
//!
//! Validation ([`validate_table_spec`]) catches duplicate or empty column
//! names before a specification reaches the DDL synthesizer.
//!
//! # Example
//!
//! ```
//! use tablespec_core::*;
//!
//! let data: DataSchemaDocument = serde_json::from_str(r#"{
//!     "schemas": {
//!         "common": {"columns": [{"name": "id_corte", "type": "INTEGER", "pk": true}]},
//!         "options": ["sales"],
//!         "sales": {"columns": [{"name": "amount", "type": "REAL"}]}
//!     }
//! }"#).unwrap();
//! let store = SchemaStore::new(&data, HelperSchemaDocument::default());
//!
//! let registry = TableRegistry::new(RegistryDocument {
//!     tables: vec![TableEntry::new("CANOTA", "sales")],
//!     ..RegistryDocument::default()
//! });
//!
//! let spec = SpecResolver::new(&store, &registry).resolve("CANOTA").unwrap();
//! assert_eq!(spec.table_columns.len(), 2);
//! assert!(validate_table_spec(&spec).is_empty());
//! ```

mod catalog;
mod resolve;
mod types;
mod validate;

pub use catalog::*;
pub use resolve::{ResolveError, SpecResolver, compose_columns};
pub use types::*;
pub use validate::{ValidationError, validate_table_spec};
