//! Table specification validation.
//!
//! Catches problems in a resolved [`TableSpec`] that would otherwise turn into
//! invalid or surprising DDL: empty names, duplicate column names produced by
//! overlapping variant and additional column lists, and `autoincrement` flags
//! that cannot be honored.
//!
//! # Examples
//!
//! ```
//! use tablespec_core::*;
//!
//! let spec = TableSpec {
//!     name: "t".into(),
//!     schema: SchemaTag::Variant("v".into()),
//!     id_fields: vec![],
//!     table_columns: vec![
//!         ColumnDef::new("a", ColumnType::Text),
//!         ColumnDef::new("a", ColumnType::Integer),
//!     ],
//!     additional_columns: vec![],
//!     skip_columns: vec![],
//!     values: vec![],
//! };
//! let errors = validate_table_spec(&spec);
//! assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateColumn { .. })));
//! assert!(errors.iter().any(ValidationError::is_fatal));
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::types::{ColumnType, TableSpec};

/// Table specification validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Table name is empty or whitespace-only.
    #[error("table name cannot be empty")]
    EmptyTableName,
    /// The resolved column list is empty.
    #[error("table '{0}' has no columns")]
    NoColumns(String),
    /// A column has no name.
    #[error("column #{position} of table '{table}' has no name")]
    EmptyColumnName { table: String, position: usize },
    /// Two columns share a name.
    #[error("duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },
    /// `autoincrement` is set on a column that is not the table's only
    /// primary key or is not `INTEGER`. The flag is dropped from the DDL.
    #[error("autoincrement ignored on column '{column}' of table '{table}'")]
    IgnoredAutoincrement { table: String, column: String },
}

impl ValidationError {
    /// Whether the problem prevents a `CREATE TABLE` statement from being built.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::IgnoredAutoincrement { .. })
    }
}

/// Validates a resolved table specification.
///
/// Returns every problem found; an empty vector means the specification is
/// clean. Use [`ValidationError::is_fatal`] to separate hard errors from
/// warnings.
pub fn validate_table_spec(spec: &TableSpec) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let table = spec.name.as_str();

    if table.trim().is_empty() {
        errors.push(ValidationError::EmptyTableName);
    }
    if spec.table_columns.is_empty() {
        errors.push(ValidationError::NoColumns(table.to_string()));
    }

    let mut seen = HashSet::new();
    for (position, column) in spec.table_columns.iter().enumerate() {
        if column.name.trim().is_empty() {
            errors.push(ValidationError::EmptyColumnName {
                table: table.to_string(),
                position,
            });
            continue;
        }
        // SQLite column names are case-insensitive.
        if !seen.insert(column.name.to_ascii_lowercase()) {
            errors.push(ValidationError::DuplicateColumn {
                table: table.to_string(),
                column: column.name.clone(),
            });
        }
    }

    let single_pk = spec.primary_key_columns().count() == 1;
    for column in spec.table_columns.iter().filter(|c| c.autoincrement) {
        let honored = single_pk && column.pk && column.column_type == ColumnType::Integer;
        if !honored {
            errors.push(ValidationError::IgnoredAutoincrement {
                table: table.to_string(),
                column: column.name.clone(),
            });
        }
    }

    errors
}
