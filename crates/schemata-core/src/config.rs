//! Configuration types and parsing for schemata.yml

use crate::error::{CoreError, CoreResult};
use crate::serde_helpers::default_true;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable consulted when no `--target` flag is given.
pub const TARGET_ENV_VAR: &str = "SCHEMATA_TARGET";

/// Main project configuration from schemata.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Schema source roots, relative to the project directory
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Metadata table holding per-table versions
    #[serde(default)]
    pub metadata: MetadataConfig,

    /// Version assumed for tables that declare no steps
    #[serde(default = "default_version")]
    pub default_version: Version,

    /// Directory layout inside each source root
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Default per-row version column for row migrations
    #[serde(default = "default_row_version_column")]
    pub row_version_column: String,

    /// Run each step inside a database transaction. Scripts that issue their
    /// own `BEGIN`/`COMMIT` are detected and run without the wrapper.
    #[serde(default = "default_true")]
    pub transactional: bool,

    /// Advisory lock taken around a full sweep
    #[serde(default)]
    pub lock: LockConfig,

    /// Named target configurations (e.g., dev, staging, prod)
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path (DuckDB file, or `:memory:`)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Names of the metadata table and its columns.
///
/// The engine only reads this table; creation and update scripts write it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataConfig {
    /// Metadata table name
    #[serde(default = "default_metadata_table")]
    pub table: String,

    /// Column holding the table name
    #[serde(default = "default_name_column")]
    pub name_column: String,

    /// Column holding the table version
    #[serde(default = "default_version_column")]
    pub version_column: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            table: default_metadata_table(),
            name_column: default_name_column(),
            version_column: default_version_column(),
        }
    }
}

/// Directory layout of a schema source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    /// Directory with initial creation scripts (`<table>.<ext>`)
    #[serde(default = "default_sql_dir")]
    pub sql_dir: String,

    /// Directory with one sub-directory per table
    #[serde(default = "default_tables_dir")]
    pub tables_dir: String,

    /// Definition file name inside each table directory
    #[serde(default = "default_schema_file")]
    pub schema_file: String,

    /// Extension of convention-named scripts
    #[serde(default = "default_script_extension")]
    pub script_extension: String,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sql_dir: default_sql_dir(),
            tables_dir: default_tables_dir(),
            schema_file: default_schema_file(),
            script_extension: default_script_extension(),
        }
    }
}

/// Advisory lock settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    /// Take the lock around `update` and `update-rows` sweeps
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Table the lock row lives in
    #[serde(default = "default_lock_table")]
    pub table: String,

    /// Lock name; sweeps sharing a name exclude each other
    #[serde(default = "default_lock_name")]
    pub name: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            table: default_lock_table(),
            name: default_lock_name(),
        }
    }
}

fn default_sources() -> Vec<String> {
    vec!["db".to_string()]
}

fn default_db_path() -> String {
    "schemata.duckdb".to_string()
}

fn default_version() -> Version {
    Version::Known("1.0".to_string())
}

fn default_row_version_column() -> String {
    "row_version".to_string()
}

fn default_metadata_table() -> String {
    "schemata_versions".to_string()
}

fn default_name_column() -> String {
    "name".to_string()
}

fn default_version_column() -> String {
    "version".to_string()
}

fn default_sql_dir() -> String {
    "sql".to_string()
}

fn default_tables_dir() -> String {
    "tables".to_string()
}

fn default_schema_file() -> String {
    "schema.json".to_string()
}

fn default_script_extension() -> String {
    "sql".to_string()
}

fn default_lock_table() -> String {
    "schemata_lock".to_string()
}

fn default_lock_name() -> String {
    "schemata".to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: format!("{}: {e}", path.display()),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for schemata.yml or schemata.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("schemata.yml");
        let yaml_path = dir.join("schemata.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.sources.iter().all(|s| s.trim().is_empty()) {
            return Err(CoreError::ConfigInvalid {
                message: "At least one schema source must be configured".to_string(),
            });
        }

        if self.default_version.is_missing() {
            return Err(CoreError::ConfigInvalid {
                message: "default_version must be a real version".to_string(),
            });
        }

        let identifiers = [
            ("metadata.table", &self.metadata.table),
            ("metadata.name_column", &self.metadata.name_column),
            ("metadata.version_column", &self.metadata.version_column),
            ("row_version_column", &self.row_version_column),
            ("lock.table", &self.lock.table),
        ];
        for (field, value) in identifiers {
            if !is_sql_identifier(value) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("{field} '{value}' is not a valid SQL identifier"),
                });
            }
        }

        let layout = [
            ("layout.sql_dir", &self.layout.sql_dir),
            ("layout.tables_dir", &self.layout.tables_dir),
            ("layout.schema_file", &self.layout.schema_file),
            ("layout.script_extension", &self.layout.script_extension),
        ];
        for (field, value) in layout {
            if value.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: format!("{field} cannot be empty"),
                });
            }
        }

        Ok(())
    }

    /// Get absolute source roots relative to a project root, skipping blanks
    pub fn sources_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.sources
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                let path = Path::new(s);
                if path.is_absolute() {
                    path.to_path_buf()
                } else {
                    root.join(path)
                }
            })
            .collect()
    }

    /// Get the list of available target names
    pub fn available_targets(&self) -> Vec<&str> {
        self.targets.keys().map(|s| s.as_str()).collect()
    }

    /// Get database configuration, optionally applying target overrides
    ///
    /// If target is specified and exists, uses target's database config.
    /// Otherwise, uses the base database config.
    pub fn get_database_config(&self, target: Option<&str>) -> CoreResult<DatabaseConfig> {
        match target {
            Some(name) => {
                let target_config =
                    self.targets
                        .get(name)
                        .ok_or_else(|| CoreError::ConfigInvalid {
                            message: format!(
                                "Target '{}' not found. Available targets: {}",
                                name,
                                self.available_targets().join(", ")
                            ),
                        })?;

                Ok(target_config
                    .database
                    .clone()
                    .unwrap_or_else(|| self.database.clone()))
            }
            None => Ok(self.database.clone()),
        }
    }

    /// Resolve target from CLI flag or SCHEMATA_TARGET environment variable
    ///
    /// Priority: CLI flag > SCHEMATA_TARGET env var > None
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        cli_target
            .map(String::from)
            .or_else(|| std::env::var(TARGET_ENV_VAR).ok())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Whether `value` is a plain (optionally schema-qualified) SQL identifier.
///
/// Table and column names from the config are interpolated into SQL, so only
/// `[A-Za-z_][A-Za-z0-9_]*` segments joined by dots are accepted.
pub fn is_sql_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.split('.').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
