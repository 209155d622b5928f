//! Project configuration.
//!
//! Names the three JSON sources a run reads and a few connection settings.
//! Stored as YAML, typically `tablespec.yml` next to the JSON files.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! registry: setup.json
//! data_schemas: data_tables_schemas.json
//! helper_schemas: helper_tables_schemas.json
//! busy_timeout_ms: 5000
//! ```
//!
//! Relative paths are resolved against the directory holding the
//! configuration file (see [`ProjectConfig::resolve_paths`]).

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LoadError, Result};

/// Default registry file name.
pub const DEFAULT_REGISTRY_FILE: &str = "setup.json";
/// Default data schema catalog file name.
pub const DEFAULT_DATA_SCHEMAS_FILE: &str = "data_tables_schemas.json";

fn default_version() -> String {
    "1.0".to_string()
}

fn default_registry() -> PathBuf {
    PathBuf::from(DEFAULT_REGISTRY_FILE)
}

fn default_data_schemas() -> PathBuf {
    PathBuf::from(DEFAULT_DATA_SCHEMAS_FILE)
}

/// Top-level project configuration.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tablespec_db::ProjectConfig;
///
/// let config: ProjectConfig = serde_yaml::from_str("registry: conf/setup.json").unwrap();
/// let resolved = config.resolve_paths(Path::new("/srv/app"));
/// assert_eq!(resolved.registry, Path::new("/srv/app/conf/setup.json"));
/// assert_eq!(resolved.data_schemas, Path::new("/srv/app/data_tables_schemas.json"));
/// assert!(resolved.helper_schemas.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Configuration format version (e.g., `"1.0"`).
    #[serde(default = "default_version")]
    pub version: String,
    /// Table registry (actions, database parameters, per-table entries).
    #[serde(default = "default_registry")]
    pub registry: PathBuf,
    /// Data schema catalog (common columns and variants).
    #[serde(default = "default_data_schemas")]
    pub data_schemas: PathBuf,
    /// Helper schema catalog; helper tables are disabled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_schemas: Option<PathBuf>,
    /// SQLite busy timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub busy_timeout_ms: Option<u64>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            registry: default_registry(),
            data_schemas: default_data_schemas(),
            helper_schemas: None,
            busy_timeout_ms: None,
        }
    }
}

impl ProjectConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] if the file cannot be read, or
    /// [`LoadError::Yaml`] if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_yaml::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Loads configuration, falling back to defaults if the file is missing.
    ///
    /// A file that exists but cannot be parsed is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "No project config found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        serde_yaml::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Returns a copy with every relative path joined onto `base`.
    pub fn resolve_paths(&self, base: &Path) -> Self {
        let join = |p: &Path| {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };
        Self {
            version: self.version.clone(),
            registry: join(&self.registry),
            data_schemas: join(&self.data_schemas),
            helper_schemas: self.helper_schemas.as_deref().map(join),
            busy_timeout_ms: self.busy_timeout_ms,
        }
    }

    /// Busy timeout as a [`Duration`].
    pub fn busy_timeout(&self) -> Option<Duration> {
        self.busy_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
version: "1.0"
registry: conf/setup.json
data_schemas: /etc/tablespec/data.json
helper_schemas: helpers.json
busy_timeout_ms: 2500
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config: ProjectConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.registry, PathBuf::from("conf/setup.json"));
        assert_eq!(config.helper_schemas, Some(PathBuf::from("helpers.json")));
        assert_eq!(config.busy_timeout(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_deserialize_minimal_uses_defaults() {
        let config: ProjectConfig = serde_yaml::from_str("version: \"1.0\"").unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.registry, PathBuf::from(DEFAULT_REGISTRY_FILE));
        assert_eq!(config.data_schemas, PathBuf::from(DEFAULT_DATA_SCHEMAS_FILE));
        assert!(config.busy_timeout().is_none());
    }

    #[test]
    fn test_resolve_paths_keeps_absolute() {
        let config: ProjectConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        let resolved = config.resolve_paths(Path::new("/work"));
        assert_eq!(resolved.registry, PathBuf::from("/work/conf/setup.json"));
        assert_eq!(resolved.data_schemas, PathBuf::from("/etc/tablespec/data.json"));
        assert_eq!(resolved.helper_schemas, Some(PathBuf::from("/work/helpers.json")));
        assert_eq!(resolved.busy_timeout_ms, Some(2500));
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tablespec.yml");

        let original: ProjectConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        original.save(&path).unwrap();

        let loaded = ProjectConfig::load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load_or_default(dir.path().join("absent.yml")).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ProjectConfig::load(dir.path().join("absent.yml")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_load_malformed_yaml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yml");
        std::fs::write(&path, "registry: [unterminated").unwrap();
        assert!(matches!(
            ProjectConfig::load_or_default(&path),
            Err(LoadError::Yaml(_))
        ));
    }
}
