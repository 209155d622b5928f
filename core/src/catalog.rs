//! Schema catalogs and the table registry.
//!
//! The on-disk JSON shapes ([`DataSchemaDocument`], [`HelperSchemaDocument`],
//! [`RegistryDocument`]) are deserialized once and turned into the immutable
//! in-memory [`SchemaStore`] and [`TableRegistry`] that the resolver borrows.
//!
//! # Data catalog
//!
//! ```json
//! {
//!   "schemas": {
//!     "common":  { "columns": [ { "name": "id_corte", "type": "INTEGER", "pk": true } ] },
//!     "options": ["sales"],
//!     "sales":   { "columns": [ { "name": "amount", "type": "REAL" } ] }
//!   }
//! }
//! ```
//!
//! # Helper catalog
//!
//! ```json
//! { "schemas": { "tables": { "STATUS": { "columns": [...], "values": [ { "k": "x" } ] } } } }
//! ```
//!
//! # Registry
//!
//! ```json
//! {
//!   "actions": { "execute": "create", "create": ["CANOTA"], "delete": ["CANOTA"] },
//!   "db": { "name": "sales", "path": null },
//!   "tables": [ { "name": "CANOTA", "schema": "sales" } ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{ColumnDef, SeedRow, TableEntry};

/// Database name used when the registry does not name one.
pub const DEFAULT_DB_NAME: &str = "default_db";

/// A `{ "columns": [...] }` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSet {
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
}

/// Root of the data schema catalog file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSchemaDocument {
    #[serde(default)]
    pub schemas: DataSchemas,
}

/// The `schemas` object of the data catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSchemas {
    /// Columns prepended to every variant.
    #[serde(default)]
    pub common: ColumnSet,
    /// Which of the remaining entries are valid variants.
    #[serde(default)]
    pub options: Vec<String>,
    /// Every other entry, kept raw; only those named in `options` are read.
    #[serde(flatten)]
    pub variants: BTreeMap<String, Value>,
}

/// A self-contained helper table: its own columns plus optional seed rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelperTable {
    #[serde(default)]
    pub columns: Vec<ColumnDef>,
    #[serde(default)]
    pub values: Vec<SeedRow>,
}

/// Root of the helper schema catalog file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelperSchemaDocument {
    #[serde(default)]
    pub schemas: HelperSchemas,
}

/// The `schemas` object of the helper catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelperSchemas {
    #[serde(default)]
    pub tables: BTreeMap<String, HelperTable>,
}

/// In-memory view of both schema catalogs.
///
/// Data-catalog variants are stored already combined with the common
/// columns; helper tables are stored as written.
///
/// # Examples
///
/// ```
/// use tablespec_core::{DataSchemaDocument, HelperSchemaDocument, SchemaStore};
///
/// let data: DataSchemaDocument = serde_json::from_str(r#"{
///     "schemas": {
///         "common": {"columns": [{"name": "id_corte", "type": "INTEGER", "pk": true}]},
///         "options": ["sales"],
///         "sales": {"columns": [{"name": "amount", "type": "REAL"}]}
///     }
/// }"#).unwrap();
///
/// let store = SchemaStore::new(&data, HelperSchemaDocument::default());
/// let names: Vec<&str> = store.data_schema("sales").unwrap().iter().map(|c| c.name.as_str()).collect();
/// assert_eq!(names, vec!["id_corte", "amount"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaStore {
    data: BTreeMap<String, Vec<ColumnDef>>,
    helpers: BTreeMap<String, HelperTable>,
}

impl SchemaStore {
    /// Builds the store from parsed catalog documents.
    pub fn new(data: &DataSchemaDocument, helpers: HelperSchemaDocument) -> Self {
        Self {
            data: combine_data_schemas(data),
            helpers: helpers.schemas.tables,
        }
    }

    /// An empty store, used when no catalog could be loaded.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every data-catalog variant, combined with the common columns.
    pub fn data_schemas(&self) -> &BTreeMap<String, Vec<ColumnDef>> {
        &self.data
    }

    /// Every helper table.
    pub fn helper_schemas(&self) -> &BTreeMap<String, HelperTable> {
        &self.helpers
    }

    /// Looks up a combined variant column list.
    pub fn data_schema(&self, variant: &str) -> Option<&[ColumnDef]> {
        self.data.get(variant).map(Vec::as_slice)
    }

    /// Looks up a helper table.
    pub fn helper(&self, table: &str) -> Option<&HelperTable> {
        self.helpers.get(table)
    }

    /// Returns `true` if neither catalog has any entry.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty() && self.helpers.is_empty()
    }
}

/// Combines the common columns with each variant listed in `options`.
///
/// Options without a matching entry, or whose entry is not a valid column
/// set, are left out of the result. Entries not named in `options` are never
/// read.
pub fn combine_data_schemas(doc: &DataSchemaDocument) -> BTreeMap<String, Vec<ColumnDef>> {
    let schemas = &doc.schemas;
    let mut combined = BTreeMap::new();

    for option in &schemas.options {
        let Some(raw) = schemas.variants.get(option) else {
            warn!(variant = %option, "Schema option has no matching entry in data catalog");
            continue;
        };
        let variant = match ColumnSet::deserialize(raw) {
            Ok(variant) => variant,
            Err(err) => {
                warn!(variant = %option, error = %err, "Skipping malformed schema variant");
                continue;
            }
        };
        let mut columns = schemas.common.columns.clone();
        columns.extend(variant.columns);
        combined.insert(option.clone(), columns);
    }

    combined
}

/// Connection parameters from the registry's `db` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbParams {
    #[serde(default = "default_db_name")]
    pub name: String,
    /// Directory holding the database file; `None` means a default location.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_db_name() -> String {
    DEFAULT_DB_NAME.to_string()
}

impl Default for DbParams {
    fn default() -> Self {
        Self {
            name: default_db_name(),
            path: None,
        }
    }
}

impl DbParams {
    /// Path of the database file, `<path>/<name>.db`, using `default_dir`
    /// when no path is configured.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use tablespec_core::DbParams;
    ///
    /// let params = DbParams { name: "sales".into(), path: None };
    /// assert_eq!(params.database_file(Path::new("/srv")), Path::new("/srv/sales.db"));
    /// ```
    pub fn database_file(&self, default_dir: &Path) -> PathBuf {
        let dir = self.path.as_deref().unwrap_or(default_dir);
        dir.join(format!("{}.db", self.name))
    }
}

/// The registry's `actions` block: one list of tables per action, plus the
/// name of the action to execute.
///
/// Entries other than `execute` are kept raw, so keys that are not table
/// lists do not invalidate the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execute: Option<String>,
    #[serde(flatten)]
    pub lists: BTreeMap<String, Value>,
}

/// Root of the registry file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default)]
    pub actions: ActionTable,
    #[serde(default)]
    pub db: DbParams,
    #[serde(default)]
    pub tables: Vec<TableEntry>,
}

/// Read-only view of the table registry.
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    doc: RegistryDocument,
    lists: BTreeMap<String, Vec<String>>,
}

impl TableRegistry {
    pub fn new(doc: RegistryDocument) -> Self {
        let lists = doc
            .actions
            .lists
            .iter()
            .filter_map(|(action, raw)| match Vec::<String>::deserialize(raw) {
                Ok(tables) => Some((action.clone(), tables)),
                Err(_) => {
                    debug!(key = %action, "Ignoring non-list entry in actions");
                    None
                }
            })
            .collect();
        Self { doc, lists }
    }

    /// A registry with no actions, tables, or database settings.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The configured action for this run (`actions.execute`).
    pub fn action(&self) -> Option<&str> {
        self.doc.actions.execute.as_deref()
    }

    /// Tables bound to `action`; empty when the action is unknown or its
    /// entry is not a list of table names.
    pub fn table_list(&self, action: &str) -> &[String] {
        if let Some(tables) = self.lists.get(action) {
            return tables;
        }
        if self.doc.actions.lists.contains_key(action) {
            warn!(action, "Action entry is not a list of table names");
        }
        &[]
    }

    /// Database connection parameters.
    pub fn db_params(&self) -> &DbParams {
        &self.doc.db
    }

    /// Finds the registry entry for `name`.
    pub fn table_entry(&self, name: &str) -> Option<&TableEntry> {
        self.doc.tables.iter().find(|t| t.name == name)
    }

    /// All registry entries, in file order.
    pub fn tables(&self) -> &[TableEntry] {
        &self.doc.tables
    }
}
