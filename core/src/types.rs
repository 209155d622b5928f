//! Column and table type definitions.
//!
//! This module defines the data model shared by every stage of the pipeline:
//! the column definitions read from the JSON catalogs, the per-table registry
//! entries, and the resolved [`TableSpec`] handed to the DDL synthesizer.
//! All types round-trip through JSON with [`serde`].

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Schema tag used for tables defined in the helper catalog.
pub const HELPER_SCHEMA_TAG: &str = "helper";

/// SQLite storage class of a column.
///
/// Parsed case-insensitively from the JSON `type` field. Anything missing or
/// unrecognized falls back to [`ColumnType::Text`].
///
/// # Examples
///
/// ```
/// use tablespec_core::ColumnType;
///
/// assert_eq!(ColumnType::from_name("integer"), ColumnType::Integer);
/// assert_eq!(ColumnType::from_name("VARCHAR"), ColumnType::Text);
/// assert_eq!(ColumnType::default(), ColumnType::Text);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColumnType {
    /// `TEXT` (the default).
    #[default]
    Text,
    /// `INTEGER`
    Integer,
    /// `REAL`
    Real,
    /// `BLOB`
    Blob,
    /// `NUMERIC`
    Numeric,
}

impl ColumnType {
    /// Maps a type name to a column type, defaulting to `TEXT`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "INTEGER" => Self::Integer,
            "REAL" => Self::Real,
            "BLOB" => Self::Blob,
            "NUMERIC" => Self::Numeric,
            _ => Self::Text,
        }
    }

    /// Returns the SQL keyword for this type.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
            Self::Numeric => "NUMERIC",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_sql())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(name) => Ok(Self::from_name(&name)),
            _ => Ok(Self::Text),
        }
    }
}

/// Default value attached to a column.
///
/// The JSON string `"CURRENT_TIMESTAMP"` is recognized as the SQL keyword;
/// every other string is a text literal. Integral numbers become
/// [`Integer`](DefaultValue::Integer), booleans become `1`/`0`.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    /// The `CURRENT_TIMESTAMP` keyword.
    CurrentTimestamp,
    /// A string literal.
    Text(String),
    /// An integer literal.
    Integer(i64),
    /// A floating-point literal.
    Real(f64),
}

impl DefaultValue {
    /// Converts a JSON value into a default, if it has a scalar shape.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if s == "CURRENT_TIMESTAMP" => Some(Self::CurrentTimestamp),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Bool(b) => Some(Self::Integer(i64::from(*b))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Self::Integer(i)),
                None => n.as_f64().map(Self::Real),
            },
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl Serialize for DefaultValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::CurrentTimestamp => serializer.serialize_str("CURRENT_TIMESTAMP"),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Real(f) => serializer.serialize_f64(*f),
        }
    }
}

impl<'de> Deserialize<'de> for DefaultValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value)
            .ok_or_else(|| D::Error::custom(format!("unsupported column default: {value}")))
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// A single column definition as written in a schema catalog.
///
/// Only `name` is expected in the JSON form; everything else defaults to a
/// nullable, non-key `TEXT` column.
///
/// # Examples
///
/// ```
/// use tablespec_core::{ColumnDef, ColumnType, DefaultValue};
///
/// let id = ColumnDef::new("id", ColumnType::Integer).primary_key().autoincrement();
/// assert!(id.pk && id.autoincrement);
///
/// let created = ColumnDef::new("created_at", ColumnType::Text)
///     .not_null()
///     .with_default(DefaultValue::CurrentTimestamp);
/// assert!(created.not_null);
///
/// let parsed: ColumnDef = serde_json::from_str(r#"{"name": "amount", "type": "real"}"#).unwrap();
/// assert_eq!(parsed, ColumnDef::new("amount", ColumnType::Real));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "is_false")]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub pk: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub autoincrement: bool,
}

impl ColumnDef {
    /// Creates a nullable, non-key column.
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            not_null: false,
            pk: false,
            default: None,
            autoincrement: false,
        }
    }

    /// Marks the column as part of the primary key.
    pub fn primary_key(mut self) -> Self {
        self.pk = true;
        self
    }

    /// Marks the column `NOT NULL`.
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Requests `AUTOINCREMENT` (honored only on a lone INTEGER primary key).
    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    /// Sets the column default.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// A seed row: column name to literal value, in declaration order.
pub type SeedRow = serde_json::Map<String, Value>;

/// Per-table entry from the table registry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableEntry {
    #[serde(default)]
    pub name: String,
    /// Name of the data-catalog variant this table is built from.
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub additional_columns: Vec<ColumnDef>,
    #[serde(default)]
    pub skip_columns: Vec<String>,
    #[serde(default)]
    pub id_fields: Vec<String>,
}

impl TableEntry {
    /// Creates an entry with no column overrides.
    pub fn new(name: &str, schema: &str) -> Self {
        Self {
            name: name.to_string(),
            schema: schema.to_string(),
            ..Self::default()
        }
    }

    /// Appends a column after the variant columns.
    pub fn with_additional_column(mut self, column: ColumnDef) -> Self {
        self.additional_columns.push(column);
        self
    }

    /// Excludes a column by exact name.
    pub fn with_skip_column(mut self, name: &str) -> Self {
        self.skip_columns.push(name.to_string());
        self
    }
}

/// Where a resolved table's columns came from.
///
/// Serialized as the variant name, or `"helper"` for helper tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum SchemaTag {
    /// Built from a data-catalog variant (common columns prepended).
    Variant(String),
    /// Taken verbatim from the helper catalog.
    Helper,
}

impl From<SchemaTag> for String {
    fn from(tag: SchemaTag) -> Self {
        match tag {
            SchemaTag::Variant(name) => name,
            SchemaTag::Helper => HELPER_SCHEMA_TAG.to_string(),
        }
    }
}

impl From<String> for SchemaTag {
    fn from(raw: String) -> Self {
        if raw == HELPER_SCHEMA_TAG {
            Self::Helper
        } else {
            Self::Variant(raw)
        }
    }
}

/// A fully resolved, ready-to-synthesize table description.
///
/// Produced fresh by the [`SpecResolver`](crate::SpecResolver) for every
/// request and owned by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub schema: SchemaTag,
    pub id_fields: Vec<String>,
    /// Final ordered column list used to build the `CREATE TABLE` statement.
    pub table_columns: Vec<ColumnDef>,
    pub additional_columns: Vec<ColumnDef>,
    pub skip_columns: Vec<String>,
    /// Seed rows (helper tables only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<SeedRow>,
}

impl TableSpec {
    /// Returns `true` if the table came from the helper catalog.
    pub fn is_helper(&self) -> bool {
        self.schema == SchemaTag::Helper
    }

    /// Columns flagged `pk`, in table order.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.table_columns.iter().filter(|c| c.pk)
    }
}
