//! Loading of the registry and schema catalogs from disk.
//!
//! Two layers are provided:
//!
//! - Strict loaders ([`load_registry`], [`load_data_schemas`],
//!   [`load_helper_schemas`]) that return a [`LoadError`] on any failure.
//! - [`Workspace::load`], which loads each source independently and turns a
//!   missing or malformed source into an empty one, recording a
//!   [`LoadIssue`] instead of failing the run.
//!
//! Everything is read once; the resulting [`Workspace`] is immutable.
//!
//! ```no_run
//! use tablespec_db::Workspace;
//!
//! let workspace = Workspace::from_config_file("tablespec.yml").unwrap();
//! for issue in workspace.issues() {
//!     eprintln!("warning: {issue}");
//! }
//! let resolver = workspace.resolver();
//! let spec = resolver.resolve("CANOTA");
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tablespec_core::{
    DataSchemaDocument, DbParams, HelperSchemaDocument, RegistryDocument, SchemaStore, SpecResolver,
    TableRegistry,
};
use tracing::{debug, warn};

use crate::config::ProjectConfig;
use crate::error::{LoadError, Result};

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(LoadError::MissingSource(path.to_path_buf()));
    }
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(std::io::BufReader::new(file)).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads the table registry (`setup.json`).
///
/// # Errors
///
/// Returns [`LoadError::MissingSource`] if the file does not exist,
/// [`LoadError::Io`] if it cannot be read, or [`LoadError::Json`] if it is
/// not a valid registry document.
pub fn load_registry(path: impl AsRef<Path>) -> Result<RegistryDocument> {
    read_json(path.as_ref())
}

/// Reads the data schema catalog.
///
/// # Errors
///
/// Same failure modes as [`load_registry`].
pub fn load_data_schemas(path: impl AsRef<Path>) -> Result<DataSchemaDocument> {
    read_json(path.as_ref())
}

/// Reads the helper schema catalog.
///
/// # Errors
///
/// Same failure modes as [`load_registry`].
pub fn load_helper_schemas(path: impl AsRef<Path>) -> Result<HelperSchemaDocument> {
    read_json(path.as_ref())
}

/// Which configuration source a [`LoadIssue`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Registry,
    DataSchemas,
    HelperSchemas,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry => f.write_str("registry"),
            Self::DataSchemas => f.write_str("data schemas"),
            Self::HelperSchemas => f.write_str("helper schemas"),
        }
    }
}

/// A source that could not be loaded and was replaced by an empty one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadIssue {
    pub source: SourceKind,
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for LoadIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unavailable ({})", self.source, self.message)
    }
}

/// Everything a run needs, loaded once from disk.
///
/// Holds the [`TableRegistry`] and [`SchemaStore`] and hands out
/// [`SpecResolver`]s borrowing them.
#[derive(Debug, Clone)]
pub struct Workspace {
    registry: TableRegistry,
    store: SchemaStore,
    registry_dir: PathBuf,
    busy_timeout: Option<Duration>,
    issues: Vec<LoadIssue>,
}

impl Workspace {
    /// Loads every source named by `config`, leniently.
    ///
    /// Paths in `config` are used as given; call
    /// [`ProjectConfig::resolve_paths`] first if they are relative to a
    /// configuration file.
    pub fn load(config: &ProjectConfig) -> Self {
        let mut issues = Vec::new();

        let registry = lenient(SourceKind::Registry, &config.registry, &mut issues, |p| {
            load_registry(p)
        })
        .map(TableRegistry::new)
        .unwrap_or_else(TableRegistry::empty);

        let data = lenient(
            SourceKind::DataSchemas,
            &config.data_schemas,
            &mut issues,
            |p| load_data_schemas(p),
        )
        .unwrap_or_default();

        let helpers = match &config.helper_schemas {
            Some(path) => lenient(SourceKind::HelperSchemas, path, &mut issues, |p| {
                load_helper_schemas(p)
            })
            .unwrap_or_default(),
            None => HelperSchemaDocument::default(),
        };

        let store = SchemaStore::new(&data, helpers);
        debug!(
            variants = store.data_schemas().len(),
            helpers = store.helper_schemas().len(),
            tables = registry.tables().len(),
            "Loaded workspace"
        );

        let registry_dir = config
            .registry
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            registry,
            store,
            registry_dir,
            busy_timeout: config.busy_timeout(),
            issues,
        }
    }

    /// Loads the project configuration at `path` (defaults if it does not
    /// exist), resolves its paths against the file's directory, then loads
    /// the workspace.
    ///
    /// # Errors
    ///
    /// Only a configuration file that exists but cannot be read or parsed is
    /// an error; the JSON sources are loaded leniently.
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = ProjectConfig::load_or_default(path)?;
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Ok(Self::load(&config.resolve_paths(base)))
    }

    /// Builds a workspace from already-parsed documents.
    pub fn from_parts(registry: TableRegistry, store: SchemaStore, registry_dir: PathBuf) -> Self {
        Self {
            registry,
            store,
            registry_dir,
            busy_timeout: None,
            issues: Vec::new(),
        }
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    pub fn store(&self) -> &SchemaStore {
        &self.store
    }

    /// A resolver over this workspace's catalogs.
    pub fn resolver(&self) -> SpecResolver<'_> {
        SpecResolver::new(&self.store, &self.registry)
    }

    /// Sources that failed to load.
    pub fn issues(&self) -> &[LoadIssue] {
        &self.issues
    }

    /// Database file path.
    ///
    /// Without a `db.path` the file lives next to the registry; a relative
    /// `db.path` is taken relative to the registry's directory.
    pub fn database_file(&self) -> PathBuf {
        let params = self.registry.db_params();
        match &params.path {
            Some(dir) if dir.is_relative() => DbParams {
                name: params.name.clone(),
                path: Some(self.registry_dir.join(dir)),
            }
            .database_file(&self.registry_dir),
            _ => params.database_file(&self.registry_dir),
        }
    }

    pub fn busy_timeout(&self) -> Option<Duration> {
        self.busy_timeout
    }
}

fn lenient<T>(
    source: SourceKind,
    path: &Path,
    issues: &mut Vec<LoadIssue>,
    load: impl FnOnce(&Path) -> Result<T>,
) -> Option<T> {
    match load(path) {
        Ok(doc) => Some(doc),
        Err(err) => {
            warn!(source = %source, path = %path.display(), error = %err, "Failed to load configuration source");
            issues.push(LoadIssue {
                source,
                path: path.to_path_buf(),
                message: err.to_string(),
            });
            None
        }
    }
}
