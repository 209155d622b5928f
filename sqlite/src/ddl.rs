//! SQL generation for resolved table specifications.
//!
//! Turns a [`TableSpec`] into an idempotent `CREATE TABLE IF NOT EXISTS`
//! statement, positional-parameter `INSERT` statements for seed rows, and an
//! idempotent `DROP TABLE IF EXISTS` statement.
//!
//! # Primary keys
//!
//! The primary-key strategy is derived once per table as a [`PrimaryKey`]:
//!
//! - no `pk` columns: no key clause;
//! - one `pk` column: inline `PRIMARY KEY` on that column, plus
//!   `AUTOINCREMENT` when it is `INTEGER` and flagged `autoincrement`;
//! - several `pk` columns: a trailing `PRIMARY KEY (a, b, ...)` constraint in
//!   column order, never inline, never autoincrement.
//!
//! # Identifiers
//!
//! Table names, column names, and seed-row keys are emitted unquoted. They
//! must contain only alphanumeric characters and underscores, must not start
//! with a digit, and must not be a reserved SQLite keyword.

use rusqlite::types::Value as SqlValue;
use tablespec_core::{
    ColumnDef, ColumnType, DefaultValue, SeedRow, TableSpec, validate_table_spec,
};
use tracing::warn;

use crate::convert::{describe_sql_value, json_to_sql};
use crate::error::{Result, SqliteError};

const INDENT: &str = "    ";

/// SQLite keywords that cannot be used as a bare identifier.
///
/// Keywords SQLite accepts as identifiers (`KEY`, `ACTION`, `TEMP`, ...) are
/// not listed.
const RESERVED_KEYWORDS: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "AS", "AUTOINCREMENT", "BETWEEN", "CASE", "CHECK", "COLLATE",
    "COMMIT", "CONSTRAINT", "CREATE", "CROSS", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "DEFAULT", "DEFERRABLE", "DELETE", "DISTINCT", "DROP", "ELSE", "ESCAPE",
    "EXCEPT", "EXISTS", "FOREIGN", "FROM", "FULL", "GLOB", "GROUP", "HAVING", "IN", "INDEX",
    "INNER", "INSERT", "INTERSECT", "INTO", "IS", "ISNULL", "JOIN", "LEFT", "LIKE", "LIMIT",
    "NATURAL", "NOT", "NOTHING", "NOTNULL", "NULL", "ON", "OR", "ORDER", "OUTER", "PRIMARY",
    "REFERENCES", "REGEXP", "RETURNING", "RIGHT", "ROLLBACK", "SELECT", "SET", "TABLE", "THEN",
    "TO", "TRANSACTION", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "WHEN", "WHERE",
];

/// Validates that an identifier can be emitted unquoted: alphanumeric
/// characters and underscores only, no leading digit, not a reserved keyword.
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    let plain = name.chars().all(|c| c.is_alphanumeric() || c == '_');
    let leading_digit = name.chars().next().is_none_or(|c| c.is_ascii_digit());
    let reserved = RESERVED_KEYWORDS
        .iter()
        .any(|kw| kw.eq_ignore_ascii_case(name));
    if !plain || leading_digit || reserved {
        return Err(SqliteError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Primary-key strategy of a table.
///
/// # Examples
///
/// ```
/// use tablespec_core::{ColumnDef, ColumnType};
/// use tablespec_sqlite::PrimaryKey;
///
/// let cols = vec![
///     ColumnDef::new("a", ColumnType::Integer).primary_key(),
///     ColumnDef::new("b", ColumnType::Text).primary_key(),
/// ];
/// assert_eq!(
///     PrimaryKey::from_columns(&cols),
///     PrimaryKey::Composite(vec!["a".into(), "b".into()])
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryKey {
    /// No primary key.
    None,
    /// One key column, declared inline.
    Single { column: String, autoincrement: bool },
    /// Several key columns, declared as a trailing table constraint.
    Composite(Vec<String>),
}

impl PrimaryKey {
    /// Derives the key strategy from the `pk` flags, in column order.
    pub fn from_columns(columns: &[ColumnDef]) -> Self {
        let keys: Vec<&ColumnDef> = columns.iter().filter(|c| c.pk).collect();
        match keys.as_slice() {
            [] => Self::None,
            [only] => Self::Single {
                column: only.name.clone(),
                autoincrement: only.autoincrement && only.column_type == ColumnType::Integer,
            },
            many => Self::Composite(many.iter().map(|c| c.name.clone()).collect()),
        }
    }

    /// Inline key clause for `column`, if it carries one.
    fn inline_clause(&self, column: &str) -> Option<&'static str> {
        match self {
            Self::Single {
                column: key,
                autoincrement,
            } if key == column => Some(if *autoincrement {
                "PRIMARY KEY AUTOINCREMENT"
            } else {
                "PRIMARY KEY"
            }),
            _ => None,
        }
    }

    /// Trailing table constraint, for composite keys.
    fn table_constraint(&self) -> Option<String> {
        match self {
            Self::Composite(columns) => Some(format!("PRIMARY KEY ({})", columns.join(", "))),
            _ => None,
        }
    }
}

/// Renders a column default as a SQL literal.
///
/// `CURRENT_TIMESTAMP` is emitted as a keyword, text is single-quoted with
/// embedded quotes doubled, numbers are emitted bare.
pub fn default_literal(value: &DefaultValue) -> String {
    match value {
        DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
        DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
        DefaultValue::Integer(i) => i.to_string(),
        DefaultValue::Real(f) => format!("{f:?}"),
    }
}

/// Builds one column clause: `<name> <TYPE> [NOT NULL] [PRIMARY KEY [AUTOINCREMENT]] [DEFAULT <literal>]`.
pub fn column_definition(column: &ColumnDef, key: &PrimaryKey) -> String {
    let mut def = format!("{} {}", column.name, column.column_type.as_sql());

    if column.not_null {
        def.push_str(" NOT NULL");
    }
    if let Some(clause) = key.inline_clause(&column.name) {
        def.push(' ');
        def.push_str(clause);
    }
    if let Some(default) = &column.default {
        def.push_str(" DEFAULT ");
        def.push_str(&default_literal(default));
    }

    def
}

/// Builds the `CREATE TABLE IF NOT EXISTS` statement for a specification.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidSpec`] if the specification has fatal
/// validation errors (e.g. duplicate column names), or
/// [`SqliteError::InvalidIdentifier`] if a table or column name is not a
/// plain identifier.
///
/// # Examples
///
/// ```
/// use tablespec_core::{ColumnDef, ColumnType, SchemaTag, TableSpec};
/// use tablespec_sqlite::build_create_statement;
///
/// let spec = TableSpec {
///     name: "CANOTA".into(),
///     schema: SchemaTag::Variant("sales".into()),
///     id_fields: vec![],
///     table_columns: vec![
///         ColumnDef::new("id_corte", ColumnType::Integer).primary_key(),
///         ColumnDef::new("amount", ColumnType::Real),
///     ],
///     additional_columns: vec![],
///     skip_columns: vec![],
///     values: vec![],
/// };
/// assert_eq!(
///     build_create_statement(&spec).unwrap(),
///     "CREATE TABLE IF NOT EXISTS CANOTA (\n    id_corte INTEGER PRIMARY KEY,\n    amount REAL\n)"
/// );
/// ```
pub fn build_create_statement(spec: &TableSpec) -> Result<String> {
    let mut fatal = Vec::new();
    for problem in validate_table_spec(spec) {
        if problem.is_fatal() {
            fatal.push(problem.to_string());
        } else {
            warn!(table = %spec.name, "{problem}");
        }
    }
    if !fatal.is_empty() {
        return Err(SqliteError::InvalidSpec {
            table: spec.name.clone(),
            reason: fatal.join("; "),
        });
    }

    validate_identifier(&spec.name)?;
    for column in &spec.table_columns {
        validate_identifier(&column.name)?;
    }

    let key = PrimaryKey::from_columns(&spec.table_columns);
    let mut clauses: Vec<String> = spec
        .table_columns
        .iter()
        .map(|c| column_definition(c, &key))
        .collect();
    if let Some(constraint) = key.table_constraint() {
        clauses.push(constraint);
    }

    let body = clauses
        .iter()
        .map(|c| format!("{INDENT}{c}"))
        .collect::<Vec<_>>()
        .join(",\n");

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{body}\n)",
        spec.name
    ))
}

/// A seed-row `INSERT` with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl SeedStatement {
    /// SQL with the bound values appended as a comment, for dry-run output.
    pub fn describe(&self) -> String {
        if self.params.is_empty() {
            return self.sql.clone();
        }
        let values: Vec<String> = self.params.iter().map(describe_sql_value).collect();
        format!("{} /* ({}) */", self.sql, values.join(", "))
    }
}

/// Builds the `INSERT` for one seed row.
///
/// Columns come from the row's own keys, in the order they were written;
/// values are bound as `?1, ?2, ...`. A row with no keys inserts
/// `DEFAULT VALUES`.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidIdentifier`] if the table name or a row key
/// is not a plain identifier.
pub fn build_seed_insert(table: &str, row: &SeedRow) -> Result<SeedStatement> {
    validate_identifier(table)?;
    if row.is_empty() {
        return Ok(SeedStatement {
            sql: format!("INSERT INTO {table} DEFAULT VALUES"),
            params: Vec::new(),
        });
    }
    for key in row.keys() {
        validate_identifier(key)?;
    }
    let columns: Vec<&str> = row.keys().map(String::as_str).collect();
    let placeholders: Vec<String> = (1..=row.len()).map(|i| format!("?{i}")).collect();
    Ok(SeedStatement {
        sql: format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        ),
        params: row.values().map(json_to_sql).collect(),
    })
}

/// Builds one `INSERT` per seed row, in row order, keeping each row's own
/// result so one bad row does not hide the others.
pub fn build_seed_inserts(spec: &TableSpec) -> Vec<Result<SeedStatement>> {
    spec.values
        .iter()
        .map(|row| build_seed_insert(&spec.name, row))
        .collect()
}

/// Builds the `DROP TABLE IF EXISTS` statement for a table.
///
/// # Errors
///
/// Returns [`SqliteError::InvalidIdentifier`] if the name is not a plain
/// identifier.
pub fn build_drop_statement(table: &str) -> Result<String> {
    validate_identifier(table)?;
    Ok(format!("DROP TABLE IF EXISTS {table}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tablespec_core::SchemaTag;

    fn spec(name: &str, columns: Vec<ColumnDef>) -> TableSpec {
        TableSpec {
            name: name.into(),
            schema: SchemaTag::Variant("v".into()),
            id_fields: vec![],
            table_columns: columns,
            additional_columns: vec![],
            skip_columns: vec![],
            values: vec![],
        }
    }

    fn row(value: serde_json::Value) -> SeedRow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_valid_identifier() {
        assert!(validate_identifier("CANOTA").is_ok());
        assert!(validate_identifier("id_corte").is_ok());
        assert!(validate_identifier("t123").is_ok());
    }

    #[test]
    fn test_invalid_identifier() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("drop;--").is_err());
        assert!(validate_identifier("two words").is_err());
        assert!(validate_identifier("a-b").is_err());
    }

    #[test]
    fn test_reserved_and_digit_leading_identifiers_rejected() {
        for name in ["order", "GROUP", "Default", "select", "1col", "9"] {
            assert!(
                matches!(validate_identifier(name), Err(SqliteError::InvalidIdentifier(_))),
                "{name} accepted"
            );
        }
        // Non-reserved keywords are usable as bare names.
        assert!(validate_identifier("key").is_ok());
        assert!(validate_identifier("action").is_ok());
        assert!(validate_identifier("order_id").is_ok());
    }

    #[test]
    fn test_reserved_column_name_fails_before_execution() {
        let s = spec(
            "t",
            vec![
                ColumnDef::new("id", ColumnType::Integer).primary_key(),
                ColumnDef::new("order", ColumnType::Text),
            ],
        );
        assert!(matches!(
            build_create_statement(&s),
            Err(SqliteError::InvalidIdentifier(name)) if name == "order"
        ));
    }

    #[test]
    fn test_case_insensitive_duplicate_columns_rejected() {
        let s = spec(
            "t",
            vec![
                ColumnDef::new("ID", ColumnType::Integer),
                ColumnDef::new("id", ColumnType::Integer),
            ],
        );
        assert!(matches!(
            build_create_statement(&s),
            Err(SqliteError::InvalidSpec { .. })
        ));
    }

    #[test]
    fn test_primary_key_none() {
        let cols = vec![ColumnDef::new("a", ColumnType::Text)];
        assert_eq!(PrimaryKey::from_columns(&cols), PrimaryKey::None);
    }

    #[test]
    fn test_primary_key_single_autoincrement_requires_integer() {
        let int = vec![ColumnDef::new("id", ColumnType::Integer).primary_key().autoincrement()];
        assert_eq!(
            PrimaryKey::from_columns(&int),
            PrimaryKey::Single {
                column: "id".into(),
                autoincrement: true
            }
        );

        let text = vec![ColumnDef::new("id", ColumnType::Text).primary_key().autoincrement()];
        assert_eq!(
            PrimaryKey::from_columns(&text),
            PrimaryKey::Single {
                column: "id".into(),
                autoincrement: false
            }
        );
    }

    #[test]
    fn test_canota_example() {
        let s = spec(
            "CANOTA",
            vec![
                ColumnDef::new("id_corte", ColumnType::Integer).primary_key(),
                ColumnDef::new("amount", ColumnType::Real),
            ],
        );
        assert_eq!(
            build_create_statement(&s).unwrap(),
            "CREATE TABLE IF NOT EXISTS CANOTA (\n    id_corte INTEGER PRIMARY KEY,\n    amount REAL\n)"
        );
    }

    #[test]
    fn test_single_pk_has_one_inline_key_and_no_trailing_clause() {
        let s = spec(
            "t",
            vec![
                ColumnDef::new("a", ColumnType::Text),
                ColumnDef::new("id", ColumnType::Integer).primary_key().autoincrement(),
            ],
        );
        let sql = build_create_statement(&s).unwrap();
        assert_eq!(sql.matches("PRIMARY KEY").count(), 1);
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(!sql.contains("PRIMARY KEY ("));
    }

    #[test]
    fn test_composite_pk_trailing_clause_only() {
        let s = spec(
            "t",
            vec![
                ColumnDef::new("a", ColumnType::Integer).primary_key().autoincrement(),
                ColumnDef::new("x", ColumnType::Real),
                ColumnDef::new("b", ColumnType::Text).primary_key(),
            ],
        );
        let sql = build_create_statement(&s).unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS t (\n    a INTEGER,\n    x REAL,\n    b TEXT,\n    PRIMARY KEY (a, b)\n)"
        );
        assert!(!sql.contains("AUTOINCREMENT"));
    }

    #[test]
    fn test_no_pk_has_no_key_clause() {
        let s = spec("t", vec![ColumnDef::new("a", ColumnType::Blob)]);
        let sql = build_create_statement(&s).unwrap();
        assert!(!sql.contains("PRIMARY KEY"));
    }

    #[test]
    fn test_column_clause_order() {
        let col = ColumnDef::new("id", ColumnType::Integer)
            .not_null()
            .primary_key()
            .with_default(DefaultValue::Integer(0));
        let key = PrimaryKey::from_columns(std::slice::from_ref(&col));
        assert_eq!(
            column_definition(&col, &key),
            "id INTEGER NOT NULL PRIMARY KEY DEFAULT 0"
        );
    }

    #[test]
    fn test_default_literals() {
        assert_eq!(default_literal(&DefaultValue::CurrentTimestamp), "CURRENT_TIMESTAMP");
        assert_eq!(default_literal(&DefaultValue::Text("open".into())), "'open'");
        assert_eq!(default_literal(&DefaultValue::Text("it's".into())), "'it''s'");
        assert_eq!(default_literal(&DefaultValue::Integer(-3)), "-3");
        assert_eq!(default_literal(&DefaultValue::Real(1.0)), "1.0");
        assert_eq!(default_literal(&DefaultValue::Real(0.25)), "0.25");
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let s = spec(
            "t",
            vec![
                ColumnDef::new("a", ColumnType::Text),
                ColumnDef::new("a", ColumnType::Integer),
            ],
        );
        let err = build_create_statement(&s).unwrap_err();
        assert!(matches!(err, SqliteError::InvalidSpec { .. }));
    }

    #[test]
    fn test_unsafe_column_name_rejected() {
        let s = spec("t", vec![ColumnDef::new("a); DROP TABLE x; --", ColumnType::Text)]);
        assert!(matches!(
            build_create_statement(&s),
            Err(SqliteError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_seed_insert_uses_row_key_order() {
        let mut s = spec("STATUS", vec![ColumnDef::new("v", ColumnType::Integer)]);
        s.values = vec![row(json!({"k": "x", "v": 1}))];
        let inserts: Vec<SeedStatement> = build_seed_inserts(&s)
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].sql, "INSERT INTO STATUS (k, v) VALUES (?1, ?2)");
        assert_eq!(
            inserts[0].params,
            vec![SqlValue::Text("x".into()), SqlValue::Integer(1)]
        );
        assert_eq!(
            inserts[0].describe(),
            "INSERT INTO STATUS (k, v) VALUES (?1, ?2) /* ('x', 1) */"
        );
    }

    #[test]
    fn test_seed_values_are_never_interpolated() {
        let mut s = spec("t", vec![ColumnDef::new("k", ColumnType::Text)]);
        s.values = vec![row(json!({"k": "'); DROP TABLE t; --"}))];
        let inserts: Vec<SeedStatement> = build_seed_inserts(&s)
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();
        assert!(!inserts[0].sql.contains("DROP"));
    }

    #[test]
    fn test_seed_empty_row_inserts_defaults() {
        let mut s = spec("t", vec![ColumnDef::new("k", ColumnType::Text)]);
        s.values = vec![SeedRow::new()];
        let inserts: Vec<SeedStatement> = build_seed_inserts(&s)
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(inserts[0].sql, "INSERT INTO t DEFAULT VALUES");
    }

    #[test]
    fn test_seed_bad_key_rejects_only_that_row() {
        let mut s = spec("t", vec![ColumnDef::new("k", ColumnType::Text)]);
        s.values = vec![row(json!({"k": "x"})), row(json!({"k k": 1}))];
        let inserts = build_seed_inserts(&s);
        assert_eq!(inserts.len(), 2);
        assert!(inserts[0].is_ok());
        assert!(matches!(inserts[1], Err(SqliteError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_drop_statement() {
        assert_eq!(build_drop_statement("CANOTA").unwrap(), "DROP TABLE IF EXISTS CANOTA");
        assert!(build_drop_statement("x; DROP").is_err());
    }

    #[test]
    fn test_create_statement_executes_and_is_idempotent() {
        let s = spec(
            "t",
            vec![
                ColumnDef::new("a", ColumnType::Integer).primary_key(),
                ColumnDef::new("b", ColumnType::Text).primary_key(),
                ColumnDef::new("created", ColumnType::Text)
                    .not_null()
                    .with_default(DefaultValue::CurrentTimestamp),
                ColumnDef::new("note", ColumnType::Text).with_default(DefaultValue::Text("it's".into())),
            ],
        );
        let sql = build_create_statement(&s).unwrap();
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(&sql).unwrap();
        conn.execute_batch(&sql).unwrap();

        conn.execute("INSERT INTO t (a, b) VALUES (1, 'x')", []).unwrap();
        assert!(conn.execute("INSERT INTO t (a, b) VALUES (1, 'x')", []).is_err());
        let note: String = conn
            .query_row("SELECT note FROM t", [], |r| r.get(0))
            .unwrap();
        assert_eq!(note, "it's");
    }
}
