//! Bulk create/drop execution.
//!
//! [`ActionExecutor`] owns the SQLite connection for a run and applies one
//! [`Action`] to a list of tables. Tables are processed independently: a
//! table that fails to resolve or whose statement fails is recorded in the
//! [`ActionReport`] and the batch moves on.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> Connecting -> {Creating | Deleting} -> Done
//!   \________\_______________\______________-> Failed
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tablespec_core::{SchemaStore, SpecResolver, TableRegistry};
//! use tablespec_sqlite::{Action, ActionExecutor, ConnectionOptions};
//!
//! let store = SchemaStore::empty();
//! let registry = TableRegistry::empty();
//! let resolver = SpecResolver::new(&store, &registry);
//!
//! let mut executor = ActionExecutor::new();
//! executor.connect("data/sales.db", &ConnectionOptions::default()).unwrap();
//! let report = executor.execute(Action::Create, &["CANOTA"], &resolver).unwrap();
//! println!("Created {}/{} tables", report.succeeded, report.requested);
//! ```

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use rusqlite::{Connection, params_from_iter};
use tablespec_core::{SpecResolver, TableSpec};
use tracing::{debug, error, info, warn};

use crate::ddl::{build_create_statement, build_drop_statement, build_seed_inserts};
use crate::error::{Result, SqliteError};

/// Bulk action applied to a table list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Create every table (and seed helper tables).
    Create,
    /// Drop every table.
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = SqliteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "delete" => Ok(Self::Delete),
            _ => Err(SqliteError::UnknownAction(s.to_string())),
        }
    }
}

/// Where an executor is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    /// No connection yet.
    Idle,
    /// Connection is being opened, or is open and no action has started.
    Connecting,
    /// A create action is running.
    Creating,
    /// A delete action is running.
    Deleting,
    /// The last action finished (possibly with per-table failures).
    Done,
    /// An unrecoverable error occurred.
    Failed,
}

/// Settings applied when opening the database.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptions {
    /// How long SQLite waits on a locked database before giving up.
    pub busy_timeout: Option<Duration>,
}

/// What happened to a single table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableOutcome {
    /// The create statement succeeded.
    Created {
        table: String,
        /// The table was already present, so the create was a no-op and no
        /// seed rows were inserted.
        existed: bool,
        seeded_rows: usize,
        failed_rows: usize,
    },
    /// The drop statement succeeded.
    Dropped { table: String },
    /// Resolution or the table's statement failed.
    Failed { table: String, error: String },
}

impl TableOutcome {
    pub fn table(&self) -> &str {
        match self {
            Self::Created { table, .. } | Self::Dropped { table } | Self::Failed { table, .. } => {
                table
            }
        }
    }

    /// Whether the table counts toward the success total.
    ///
    /// Seed-row failures do not undo a successful create.
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for TableOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created {
                table,
                existed: true,
                ..
            } => write!(f, "{table}: already exists"),
            Self::Created {
                table,
                seeded_rows: 0,
                failed_rows: 0,
                ..
            } => write!(f, "{table}: created"),
            Self::Created {
                table,
                seeded_rows,
                failed_rows: 0,
                ..
            } => write!(f, "{table}: created, {seeded_rows} seed row(s)"),
            Self::Created {
                table,
                seeded_rows,
                failed_rows,
                ..
            } => write!(
                f,
                "{table}: created, {seeded_rows} seed row(s), {failed_rows} seed row(s) failed"
            ),
            Self::Dropped { table } => write!(f, "{table}: dropped"),
            Self::Failed { table, error } => write!(f, "{table}: failed ({error})"),
        }
    }
}

/// Aggregate status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every requested table succeeded (vacuously true for zero tables).
    Success,
    /// Some, but not all, tables succeeded.
    Partial,
    /// No table succeeded.
    Failure,
}

/// Result of [`ActionExecutor::execute`].
#[derive(Debug, Clone)]
pub struct ActionReport {
    pub action: Action,
    /// Number of tables requested.
    pub requested: usize,
    /// Number of tables that succeeded.
    pub succeeded: usize,
    /// Per-table outcomes, in request order.
    pub outcomes: Vec<TableOutcome>,
}

impl ActionReport {
    fn new(action: Action, outcomes: Vec<TableOutcome>) -> Self {
        Self {
            action,
            requested: outcomes.len(),
            succeeded: outcomes.iter().filter(|o| o.is_success()).count(),
            outcomes,
        }
    }

    /// `true` when every requested table succeeded.
    pub fn is_success(&self) -> bool {
        self.succeeded == self.requested
    }

    pub fn status(&self) -> RunStatus {
        if self.is_success() {
            RunStatus::Success
        } else if self.succeeded == 0 {
            RunStatus::Failure
        } else {
            RunStatus::Partial
        }
    }

    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &TableOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// SQL a run would execute for one table.
#[derive(Debug, Clone)]
pub struct StatementPreview {
    pub table: String,
    /// Statements in execution order, or why none could be built.
    pub statements: std::result::Result<Vec<String>, String>,
}

/// Renders the statements [`ActionExecutor::execute`] would run, without a
/// database.
pub fn preview<S: AsRef<str>>(
    action: Action,
    tables: &[S],
    resolver: &SpecResolver<'_>,
) -> Vec<StatementPreview> {
    tables
        .iter()
        .map(|t| {
            let table = t.as_ref();
            let statements = match action {
                Action::Create => resolver
                    .resolve(table)
                    .map_err(SqliteError::from)
                    .and_then(|spec| create_statements(&spec)),
                Action::Delete => build_drop_statement(table).map(|sql| vec![sql]),
            };
            StatementPreview {
                table: table.to_string(),
                statements: statements.map_err(|e| e.to_string()),
            }
        })
        .collect()
}

fn create_statements(spec: &TableSpec) -> Result<Vec<String>> {
    let mut statements = vec![build_create_statement(spec)?];
    for (index, insert) in build_seed_inserts(spec).into_iter().enumerate() {
        statements.push(match insert {
            Ok(insert) => insert.describe(),
            // Row keys are untrusted; keep them from closing the comment.
            Err(err) => format!(
                "/* seed row {index} skipped: {} */",
                err.to_string().replace("*/", "* /")
            ),
        });
    }
    Ok(statements)
}

/// Applies bulk actions to a SQLite database.
///
/// The connection is owned by the executor and closed when it is dropped,
/// on success and error paths alike.
#[derive(Debug)]
pub struct ActionExecutor {
    conn: Option<Connection>,
    state: ExecutorState,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionExecutor {
    /// Creates an executor with no connection.
    pub fn new() -> Self {
        Self {
            conn: None,
            state: ExecutorState::Idle,
        }
    }

    /// Wraps an already-open connection.
    pub fn with_connection(conn: Connection) -> Self {
        Self {
            conn: Some(conn),
            state: ExecutorState::Connecting,
        }
    }

    /// Opens (creating if needed) the database file at `path`.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::DirectoryError`] or
    /// [`SqliteError::ConnectionError`]; either leaves the executor in
    /// [`ExecutorState::Failed`].
    pub fn connect(&mut self, path: impl AsRef<Path>, options: &ConnectionOptions) -> Result<()> {
        let path = path.as_ref();
        self.state = ExecutorState::Connecting;

        match open_connection(path, options) {
            Ok(conn) => {
                info!(path = %path.display(), "Connected to database");
                self.conn = Some(conn);
                Ok(())
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "Error connecting to database");
                self.state = ExecutorState::Failed;
                Err(err)
            }
        }
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// The open connection, if any.
    pub fn connection(&self) -> Option<&Connection> {
        self.conn.as_ref()
    }

    /// Applies `action` to every table in `tables`.
    ///
    /// Per-table failures are recorded in the report; they never abort the
    /// batch.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::NotConnected`] if no connection is open.
    pub fn execute<S: AsRef<str>>(
        &mut self,
        action: Action,
        tables: &[S],
        resolver: &SpecResolver<'_>,
    ) -> Result<ActionReport> {
        if self.conn.is_none() {
            self.state = ExecutorState::Failed;
            return Err(SqliteError::NotConnected);
        }

        self.state = match action {
            Action::Create => ExecutorState::Creating,
            Action::Delete => ExecutorState::Deleting,
        };
        info!(action = %action, tables = tables.len(), "Executing action");
        if tables.is_empty() {
            warn!(action = %action, "No tables configured for action");
        }

        let outcomes = tables
            .iter()
            .map(|t| {
                let table = t.as_ref();
                let outcome = match action {
                    Action::Create => self.create_resolved(table, resolver),
                    Action::Delete => self.drop_table(table),
                };
                match &outcome {
                    TableOutcome::Failed { table, error } => {
                        error!(table = %table, error = %error, "Table action failed")
                    }
                    other => info!("{other}"),
                }
                outcome
            })
            .collect();

        let report = ActionReport::new(action, outcomes);
        info!(
            action = %action,
            succeeded = report.succeeded,
            requested = report.requested,
            "Action finished"
        );
        self.state = ExecutorState::Done;
        Ok(report)
    }

    fn create_resolved(&self, table: &str, resolver: &SpecResolver<'_>) -> TableOutcome {
        match resolver.resolve(table) {
            Ok(spec) => self.create_table(&spec),
            Err(err) => TableOutcome::Failed {
                table: table.to_string(),
                error: err.to_string(),
            },
        }
    }

    /// Creates one table and, if it did not exist before, inserts its seed
    /// rows.
    ///
    /// Seed rows are built and inserted one by one after the table exists; a
    /// row that cannot be built or inserted is logged and counted, and the
    /// table is kept.
    pub fn create_table(&self, spec: &TableSpec) -> TableOutcome {
        let failed = |error: SqliteError| TableOutcome::Failed {
            table: spec.name.clone(),
            error: error.to_string(),
        };
        let Some(conn) = self.conn.as_ref() else {
            return failed(SqliteError::NotConnected);
        };

        let sql = match build_create_statement(spec) {
            Ok(sql) => sql,
            Err(err) => return failed(err),
        };
        let existed = match table_exists_on(conn, &spec.name) {
            Ok(existed) => existed,
            Err(err) => return failed(err),
        };

        debug!(table = %spec.name, %sql, "Creating table");
        if let Err(err) = conn.execute_batch(&sql) {
            return failed(err.into());
        }

        let mut seeded_rows = 0;
        let mut failed_rows = 0;
        if !existed {
            for (index, insert) in build_seed_inserts(spec).into_iter().enumerate() {
                let insert = match insert {
                    Ok(insert) => insert,
                    Err(err) => {
                        warn!(table = %spec.name, row = index, error = %err, "Seed row skipped");
                        failed_rows += 1;
                        continue;
                    }
                };
                match conn.execute(&insert.sql, params_from_iter(insert.params.iter())) {
                    Ok(_) => seeded_rows += 1,
                    Err(err) => {
                        warn!(table = %spec.name, sql = %insert.sql, error = %err, "Seed row failed");
                        failed_rows += 1;
                    }
                }
            }
        } else if !spec.values.is_empty() {
            debug!(table = %spec.name, "Table already existed, skipping seed rows");
        }

        TableOutcome::Created {
            table: spec.name.clone(),
            existed,
            seeded_rows,
            failed_rows,
        }
    }

    /// Drops one table; dropping a missing table succeeds.
    pub fn drop_table(&self, table: &str) -> TableOutcome {
        let result = self
            .conn
            .as_ref()
            .ok_or(SqliteError::NotConnected)
            .and_then(|conn| {
                let sql = build_drop_statement(table)?;
                debug!(table, %sql, "Dropping table");
                conn.execute_batch(&sql)?;
                Ok(())
            });

        match result {
            Ok(()) => TableOutcome::Dropped {
                table: table.to_string(),
            },
            Err(err) => TableOutcome::Failed {
                table: table.to_string(),
                error: err.to_string(),
            },
        }
    }

    /// Checks whether a table exists.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError::NotConnected`] without a connection.
    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let conn = self.conn.as_ref().ok_or(SqliteError::NotConnected)?;
        table_exists_on(conn, table)
    }

    /// Closes the connection explicitly, surfacing any close error.
    pub fn close(mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, err)| SqliteError::DatabaseError(err))?;
            info!("Database connection closed");
        }
        Ok(())
    }
}

fn open_connection(path: &Path, options: &ConnectionOptions) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| SqliteError::DirectoryError {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let conn = Connection::open(path).map_err(|source| SqliteError::ConnectionError {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(timeout) = options.busy_timeout {
        conn.busy_timeout(timeout)?;
    }
    Ok(conn)
}

fn table_exists_on(conn: &Connection, table: &str) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1")?;
    let count: i64 = stmt.query_row([table], |row| row.get(0))?;
    Ok(count > 0)
}
