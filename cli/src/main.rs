use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand};
use tablespec_core::TableRegistry;
use tablespec_db::Workspace;
use tablespec_sqlite::{Action, ActionExecutor, ConnectionOptions, preview};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_FILE: &str = "tablespec.yml";

#[derive(Debug, Parser)]
#[command(name = "tablespec")]
#[command(about = "Create and drop SQLite tables from JSON table specifications")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Execute the configured (or overridden) action against the database.
    Run(RunArgs),
    /// Print resolved table specifications as JSON.
    Specs(SpecsArgs),
    /// Print the statements `run` would execute, without touching the database.
    Sql(SqlArgs),
    /// Report which tables of the current action exist in the database.
    Status(StatusArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Project configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Action to execute instead of the registry's `actions.execute`.
    #[arg(long)]
    action: Option<String>,
    /// Database file path instead of the registry's `db` block.
    #[arg(long)]
    db: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct SpecsArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Tables to resolve (default: the current action's table list).
    tables: Vec<String>,
}

#[derive(Debug, Args)]
struct SqlArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Action to render instead of the registry's `actions.execute`.
    #[arg(long)]
    action: Option<String>,
    /// Tables to render (default: the action's table list).
    tables: Vec<String>,
}

#[derive(Debug, Args)]
struct StatusArgs {
    #[command(flatten)]
    config: ConfigArgs,
    /// Database file path instead of the registry's `db` block.
    #[arg(long)]
    db: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Run(args) => run_action(args),
        Command::Specs(args) => run_specs(args),
        Command::Sql(args) => run_sql(args),
        Command::Status(args) => run_status(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_level(verbose))),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

fn run_action(args: RunArgs) -> Result<(), String> {
    let workspace = load_workspace(&args.config.config)?;
    let registry = workspace.registry();
    let action = select_action(args.action.as_deref(), registry)?;
    let tables = registry.table_list(action.as_str());
    let db_path = args.db.unwrap_or_else(|| workspace.database_file());

    let mut executor = ActionExecutor::new();
    executor
        .connect(
            &db_path,
            &ConnectionOptions {
                busy_timeout: workspace.busy_timeout(),
            },
        )
        .map_err(|e| e.to_string())?;
    let report = executor
        .execute(action, tables, &workspace.resolver())
        .map_err(|e| format!("{action} failed: {e}"))?;

    for outcome in &report.outcomes {
        println!("  {outcome}");
    }
    println!(
        "{} {}/{} tables",
        summary_verb(action),
        report.succeeded,
        report.requested
    );

    executor
        .close()
        .map_err(|e| format!("Failed to close database '{}': {e}", db_path.display()))?;

    if report.is_success() {
        Ok(())
    } else {
        Err(format!(
            "{} of {} tables failed",
            report.requested - report.succeeded,
            report.requested
        ))
    }
}

fn run_specs(args: SpecsArgs) -> Result<(), String> {
    let workspace = load_workspace(&args.config.config)?;
    let tables = select_tables(&args.tables, None, workspace.registry())?;

    let mut specs = Vec::new();
    let mut failures = 0;
    for (table, resolved) in workspace.resolver().resolve_all(&tables) {
        match resolved {
            Ok(spec) => specs.push(spec),
            Err(err) => {
                eprintln!("warning: {table}: {err}");
                failures += 1;
            }
        }
    }

    let json = serde_json::to_string_pretty(&specs)
        .map_err(|e| format!("Failed to serialize specifications: {e}"))?;
    println!("{json}");

    if failures == 0 {
        Ok(())
    } else {
        Err(format!("{failures} of {} tables could not be resolved", tables.len()))
    }
}

fn run_sql(args: SqlArgs) -> Result<(), String> {
    let workspace = load_workspace(&args.config.config)?;
    let registry = workspace.registry();
    let action = select_action(args.action.as_deref(), registry)?;
    let tables = select_tables(&args.tables, Some(action), registry)?;

    let mut failures = 0;
    for item in preview(action, &tables, &workspace.resolver()) {
        match item.statements {
            Ok(statements) => {
                println!("-- {}", item.table);
                for statement in statements {
                    println!("{statement};");
                }
            }
            Err(err) => {
                println!("-- {}: {err}", item.table);
                failures += 1;
            }
        }
        println!();
    }

    if failures == 0 {
        Ok(())
    } else {
        Err(format!("{failures} of {} tables could not be rendered", tables.len()))
    }
}

fn run_status(args: StatusArgs) -> Result<(), String> {
    let workspace = load_workspace(&args.config.config)?;
    let registry = workspace.registry();
    let db_path = args.db.unwrap_or_else(|| workspace.database_file());
    let action = registry.action().unwrap_or("none");
    let tables = registry
        .action()
        .map(|a| registry.table_list(a))
        .unwrap_or_default();

    println!("Database: {}", db_path.display());
    println!("Action: {action}");

    if !db_path.exists() {
        println!("  Database file does not exist");
        println!("0/{} tables present", tables.len());
        return Ok(());
    }

    let conn = rusqlite::Connection::open(&db_path)
        .map_err(|e| format!("Failed to open database '{}': {e}", db_path.display()))?;
    let executor = ActionExecutor::with_connection(conn);

    let mut present = 0;
    for table in tables {
        let exists = executor
            .table_exists(table)
            .map_err(|e| format!("Failed to inspect '{table}': {e}"))?;
        if exists {
            present += 1;
        }
        println!("  {table}: {}", if exists { "present" } else { "missing" });
    }
    println!("{present}/{} tables present", tables.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Loads the workspace and reports unavailable sources as warnings.
fn load_workspace(config: &Path) -> Result<Workspace, String> {
    let workspace = Workspace::from_config_file(config)
        .map_err(|e| format!("Failed to load '{}': {e}", config.display()))?;
    for issue in workspace.issues() {
        eprintln!("warning: {issue}");
    }
    debug!(config = %config.display(), "Workspace loaded");
    Ok(workspace)
}

/// Picks the action: the explicit override, else the registry's
/// `actions.execute`.
fn select_action(requested: Option<&str>, registry: &TableRegistry) -> Result<Action, String> {
    let name = requested.or_else(|| registry.action()).ok_or_else(|| {
        "no action configured: set actions.execute in the registry or pass --action".to_string()
    })?;
    name.parse::<Action>().map_err(|e| e.to_string())
}

/// Tables named on the command line, else the action's table list.
fn select_tables(
    requested: &[String],
    action: Option<Action>,
    registry: &TableRegistry,
) -> Result<Vec<String>, String> {
    if !requested.is_empty() {
        return Ok(requested.to_vec());
    }
    let action = match action {
        Some(action) => action,
        None => select_action(None, registry)?,
    };
    Ok(registry.table_list(action.as_str()).to_vec())
}

fn default_log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn summary_verb(action: Action) -> &'static str {
    match action {
        Action::Create => "Created",
        Action::Delete => "Deleted",
    }
}
