//! Schema source roots.
//!
//! A source root is laid out as:
//!
//! ```text
//! <root>/<sql_dir>/<table>.sql                 initial creation script
//! <root>/<tables_dir>/<table>/<schema_file>    version history
//! <root>/<tables_dir>/<table>/<from>-<to>.sql  update scripts
//! ```

use crate::error::{EngineError, EngineResult};
use schemata_core::{CoreError, LayoutConfig, TableName};
use std::path::{Path, PathBuf};

/// One registered source root.
#[derive(Debug, Clone)]
pub struct SchemaSource {
    root: PathBuf,
}

impl SchemaSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory with one sub-directory per table
    pub fn tables_dir(&self, layout: &LayoutConfig) -> PathBuf {
        self.root.join(&layout.tables_dir)
    }

    /// Directory holding a table's definition and update scripts
    pub fn table_dir(&self, layout: &LayoutConfig, table: &str) -> PathBuf {
        self.tables_dir(layout).join(table)
    }

    /// Path of a table's definition file
    pub fn definition_path(&self, layout: &LayoutConfig, table: &str) -> PathBuf {
        self.table_dir(layout, table).join(&layout.schema_file)
    }

    /// Path of a table's initial creation script
    pub fn creation_script(&self, layout: &LayoutConfig, table: &str) -> PathBuf {
        self.root
            .join(&layout.sql_dir)
            .join(format!("{table}.{}", layout.script_extension))
    }

    /// Verify the root has the expected sub-layout.
    pub fn check(&self, layout: &LayoutConfig) -> EngineResult<()> {
        if !self.root.is_dir() {
            return Err(self.invalid("not a directory".to_string()));
        }
        if !self.tables_dir(layout).is_dir() {
            return Err(self.invalid(format!("missing '{}' directory", layout.tables_dir)));
        }
        Ok(())
    }

    /// Whether this source carries a definition for `table`.
    pub fn defines(&self, layout: &LayoutConfig, table: &str) -> bool {
        self.definition_path(layout, table).is_file()
    }

    /// Every table defined in this source, sorted by name.
    pub fn table_names(&self, layout: &LayoutConfig) -> EngineResult<Vec<TableName>> {
        self.check(layout)?;
        let dir = self.tables_dir(layout);
        let entries = std::fs::read_dir(&dir).map_err(|e| CoreError::IoWithPath {
            path: dir.display().to_string(),
            source: e,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoreError::IoWithPath {
                path: dir.display().to_string(),
                source: e,
            })?;
            let path = entry.path();
            if !path.join(&layout.schema_file).is_file() {
                continue;
            }
            let Some(name) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(TableName::try_new)
            else {
                log::warn!("Skipping table directory with unusable name: {}", path.display());
                continue;
            };
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn invalid(&self, reason: String) -> EngineError {
        EngineError::InvalidSource {
            path: self.root.display().to_string(),
            reason,
        }
    }
}

#[cfg(test)]
#[path = "source_test.rs"]
mod tests;
