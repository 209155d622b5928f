//! Conversion of JSON seed values into bound SQLite parameters.
//!
//! Seed rows are never interpolated into SQL text. Every value is converted
//! to a [`rusqlite::types::Value`] and bound positionally, so strings with
//! quotes, numbers, and nulls all take the same path.

use rusqlite::types::Value as SqlValue;
use serde_json::Value;

/// Converts a JSON literal into a bindable SQLite value.
///
/// Booleans become `1`/`0`; arrays and objects are stored as compact JSON
/// text.
pub(crate) fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map_or(SqlValue::Null, SqlValue::Real),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// Renders a bound value for display in dry-run output.
pub(crate) fn describe_sql_value(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => format!("{f:?}"),
        SqlValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        SqlValue::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
