//! Table specification resolution.
//!
//! [`SpecResolver`] turns a table name into a [`TableSpec`] by combining the
//! [`TableRegistry`] entry with the [`SchemaStore`] catalogs:
//!
//! 1. Helper catalog first. Helper tables bypass the common/variant merge.
//! 2. Registry entry by name.
//! 3. Data-catalog variant named by the entry's `schema`.
//! 4. `variant ++ additional_columns`, minus anything in `skip_columns`.
//!
//! Resolution is pure: the same store and registry always produce the same
//! specification.

use thiserror::Error;
use tracing::{debug, error};

use crate::catalog::{SchemaStore, TableRegistry};
use crate::types::{ColumnDef, SchemaTag, TableSpec};

/// Why a table could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Neither catalog nor registry knows the table.
    #[error("table not found in registry: {0}")]
    UnknownTable(String),
    /// The registry entry names a variant the data catalog does not define.
    #[error("schema '{schema}' referenced by table '{table}' not found in data schemas")]
    UnknownSchema { table: String, schema: String },
}

/// Composes a final column list.
///
/// Concatenates `base` and `additional`, then removes every column whose name
/// exactly matches an entry of `skip`. Order is preserved; duplicate names
/// are kept as-is. Skip names that match nothing are ignored.
///
/// # Examples
///
/// ```
/// use tablespec_core::{ColumnDef, ColumnType, compose_columns};
///
/// let base = vec![
///     ColumnDef::new("id", ColumnType::Integer),
///     ColumnDef::new("legacy", ColumnType::Text),
/// ];
/// let extra = vec![ColumnDef::new("note", ColumnType::Text)];
/// let skip = vec!["legacy".to_string(), "not_there".to_string()];
///
/// let names: Vec<String> = compose_columns(&base, &extra, &skip)
///     .into_iter()
///     .map(|c| c.name)
///     .collect();
/// assert_eq!(names, vec!["id", "note"]);
/// ```
pub fn compose_columns(
    base: &[ColumnDef],
    additional: &[ColumnDef],
    skip: &[String],
) -> Vec<ColumnDef> {
    base.iter()
        .chain(additional)
        .filter(|col| !skip.iter().any(|s| *s == col.name))
        .cloned()
        .collect()
}

/// Resolves table names against a schema store and table registry.
///
/// Borrows both for its lifetime; they are loaded once per run and never
/// mutated afterwards.
#[derive(Debug, Clone, Copy)]
pub struct SpecResolver<'a> {
    store: &'a SchemaStore,
    registry: &'a TableRegistry,
}

impl<'a> SpecResolver<'a> {
    pub fn new(store: &'a SchemaStore, registry: &'a TableRegistry) -> Self {
        Self { store, registry }
    }

    /// The registry this resolver reads from.
    pub fn registry(&self) -> &'a TableRegistry {
        self.registry
    }

    /// Resolves one table.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownTable`] if the table is neither a
    /// helper table nor a registry entry, and [`ResolveError::UnknownSchema`]
    /// if its registry entry names a missing variant.
    pub fn resolve(&self, table: &str) -> Result<TableSpec, ResolveError> {
        if let Some(helper) = self.store.helper(table) {
            debug!(table, "Resolved from helper catalog");
            return Ok(TableSpec {
                name: table.to_string(),
                schema: SchemaTag::Helper,
                id_fields: Vec::new(),
                table_columns: helper.columns.clone(),
                additional_columns: Vec::new(),
                skip_columns: Vec::new(),
                values: helper.values.clone(),
            });
        }

        let entry = self
            .registry
            .table_entry(table)
            .ok_or_else(|| ResolveError::UnknownTable(table.to_string()))?;

        let Some(variant) = self.store.data_schema(&entry.schema) else {
            error!(table, schema = %entry.schema, "Schema type not found in data schemas");
            return Err(ResolveError::UnknownSchema {
                table: table.to_string(),
                schema: entry.schema.clone(),
            });
        };

        let table_columns =
            compose_columns(variant, &entry.additional_columns, &entry.skip_columns);
        debug!(table, schema = %entry.schema, columns = table_columns.len(), "Resolved from data catalog");

        Ok(TableSpec {
            name: entry.name.clone(),
            schema: SchemaTag::Variant(entry.schema.clone()),
            id_fields: entry.id_fields.clone(),
            table_columns,
            additional_columns: entry.additional_columns.clone(),
            skip_columns: entry.skip_columns.clone(),
            values: Vec::new(),
        })
    }

    /// Resolves every table in `tables`, keeping request order.
    pub fn resolve_all<S: AsRef<str>>(
        &self,
        tables: &[S],
    ) -> Vec<(String, Result<TableSpec, ResolveError>)> {
        tables
            .iter()
            .map(|t| {
                let name = t.as_ref();
                (name.to_string(), self.resolve(name))
            })
            .collect()
    }
}
