//! Versioned tables and their update state machine.
//!
//! A [`TableSchema`] pairs an immutable definition (steps, row steps,
//! relationships) with the run state of one sweep. The state lives in a
//! `RefCell` because updates recurse through the registry: updating `orders`
//! may update `users` first, which may in turn forward-chain to its successor.
//! Borrows of the state are never held across calls into the registry.

mod replace;
mod rows;
mod step;

use crate::error::{EngineError, EngineResult};
use crate::registry::SchemaRegistry;
use crate::source::SchemaSource;
use schemata_core::config::is_sql_identifier;
use schemata_core::{CoreError, RowStepDef, StepDef, TableDefinition, TableName, Version};
use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};

/// Observable state of a table within a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// At its latest version, nothing attempted
    UpToDate,
    /// Older than its latest version, nothing attempted yet
    NeedsUpdate,
    /// Update in progress
    Running,
    /// Update attempted and succeeded
    UpdateOk,
    /// Update attempted and failed
    UpdateFailed,
}

impl fmt::Display for TableState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TableState::UpToDate => "up-to-date",
            TableState::NeedsUpdate => "needs-update",
            TableState::Running => "running",
            TableState::UpdateOk => "updated",
            TableState::UpdateFailed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
struct RunState {
    current: Version,
    initial: Version,
    exists: bool,
    needs_update: bool,
    update_attempted: bool,
    update_succeeded: bool,
    changed: bool,
    active: bool,
    errors: Vec<String>,
    rows_attempted: bool,
    rows_succeeded: bool,
    rows_active: bool,
    updated_rows: Vec<String>,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            current: Version::Missing,
            initial: Version::Missing,
            exists: false,
            needs_update: false,
            update_attempted: false,
            update_succeeded: false,
            changed: false,
            active: false,
            errors: Vec::new(),
            rows_attempted: false,
            rows_succeeded: false,
            rows_active: false,
            updated_rows: Vec::new(),
        }
    }
}

/// A table with a version history, as loaded from one schema source.
#[derive(Debug)]
pub struct TableSchema {
    name: TableName,
    source: SchemaSource,
    table_dir: PathBuf,
    definition: TableDefinition,
    steps: Vec<StepDef>,
    row_steps: Vec<RowStepDef>,
    latest: Version,
    vercolumn: String,
    state: RefCell<RunState>,
}

impl TableSchema {
    /// Load the definition of `name` from `source` and read its current version.
    pub(crate) fn load(
        registry: &SchemaRegistry,
        source: &SchemaSource,
        name: TableName,
    ) -> EngineResult<Self> {
        if !is_sql_identifier(&name) {
            return Err(CoreError::DefinitionInvalid {
                table: name.to_string(),
                reason: "table name is not a valid SQL identifier".to_string(),
            }
            .into());
        }

        let options = registry.options();
        let layout = &options.layout;
        let definition = TableDefinition::load(&source.definition_path(layout, &name))?;
        definition.validate(&name)?;

        let mut steps = definition.sorted_steps();
        if steps.is_empty() {
            steps.push(StepDef::bare(options.default_version.clone()));
        }
        let latest = steps
            .last()
            .map(|s| s.version.clone())
            .unwrap_or_else(|| options.default_version.clone());

        let vercolumn = definition
            .vercolumn
            .clone()
            .unwrap_or_else(|| options.row_version_column.clone());
        if !is_sql_identifier(&vercolumn) {
            return Err(CoreError::DefinitionInvalid {
                table: name.to_string(),
                reason: format!("vercolumn '{vercolumn}' is not a valid SQL identifier"),
            }
            .into());
        }

        let table = Self {
            table_dir: source.table_dir(layout, &name),
            row_steps: definition.sorted_row_steps(),
            source: source.clone(),
            name,
            definition,
            steps,
            latest,
            vercolumn,
            state: RefCell::new(RunState::default()),
        };
        table.refresh(registry)?;
        {
            let mut state = table.state.borrow_mut();
            state.initial = state.current.clone();
        }
        log::debug!(
            "Loaded table '{}' (current {}, latest {})",
            table.name,
            table.current(),
            table.latest
        );
        Ok(table)
    }

    pub fn name(&self) -> &TableName {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.definition.description.as_deref()
    }

    /// Source root this table was loaded from
    pub fn source_root(&self) -> &Path {
        self.source.root()
    }

    /// Directory holding the definition and update scripts
    pub fn table_dir(&self) -> &Path {
        &self.table_dir
    }

    /// Structural steps in ascending version order
    pub fn steps(&self) -> &[StepDef] {
        &self.steps
    }

    /// Row steps in ascending version order
    pub fn row_steps(&self) -> &[RowStepDef] {
        &self.row_steps
    }

    pub fn tags(&self) -> &[String] {
        &self.definition.tags
    }

    /// Column holding each row's version
    pub fn vercolumn(&self) -> &str {
        &self.vercolumn
    }

    pub fn replaces(&self) -> Option<&TableName> {
        self.definition.replaces.as_ref()
    }

    pub fn replaced_by(&self) -> Option<&TableName> {
        self.definition.replaced_by.as_ref()
    }

    /// Tables that must be defined and ordered first
    pub fn hard_dependencies(&self) -> &[TableName] {
        self.definition.hard_dependencies()
    }

    /// Tables ordered first when defined: requirements, the replaced table and `wants`
    pub fn soft_dependencies(&self) -> Vec<TableName> {
        self.definition.soft_dependencies()
    }

    /// Highest configured version
    pub fn latest(&self) -> &Version {
        &self.latest
    }

    /// Version as of the last refresh
    pub fn current(&self) -> Version {
        self.state.borrow().current.clone()
    }

    /// Version when the table was loaded
    pub fn initial(&self) -> Version {
        self.state.borrow().initial.clone()
    }

    /// Physical existence as of the last refresh
    pub fn exists(&self) -> bool {
        self.state.borrow().exists
    }

    pub fn needs_update(&self) -> bool {
        self.state.borrow().needs_update
    }

    /// Whether an update ran and advanced the table
    pub fn changed(&self) -> bool {
        self.state.borrow().changed
    }

    /// Errors recorded by failed update attempts
    pub fn errors(&self) -> Vec<String> {
        self.state.borrow().errors.clone()
    }

    /// Row identifiers updated by row migrations so far
    pub fn updated_rows(&self) -> Vec<String> {
        self.state.borrow().updated_rows.clone()
    }

    pub fn state(&self) -> TableState {
        let state = self.state.borrow();
        if state.active {
            TableState::Running
        } else if state.update_attempted {
            if state.update_succeeded {
                TableState::UpdateOk
            } else {
                TableState::UpdateFailed
            }
        } else if state.needs_update {
            TableState::NeedsUpdate
        } else {
            TableState::UpToDate
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state.borrow().active
    }

    /// Re-read the current version and recompute `needs_update`.
    ///
    /// Physical existence is checked first: a dropped table is missing even if
    /// a stale metadata row remains.
    pub fn refresh(&self, registry: &SchemaRegistry) -> EngineResult<()> {
        let exists = registry.table_exists(&self.name)?;
        let current = if exists {
            let metadata = &registry.options().metadata;
            match registry.db().query_version(metadata, &self.name)? {
                Some(raw) => Version::parse(&raw)?,
                None => {
                    return Err(EngineError::MetadataMissing {
                        table: self.name.to_string(),
                        metadata_table: metadata.table.clone(),
                    })
                }
            }
        } else {
            Version::Missing
        };

        if current.is_newer(&self.latest) {
            return Err(EngineError::VersionAhead {
                table: self.name.to_string(),
                current: current.to_string(),
                latest: self.latest.to_string(),
            });
        }

        let mut state = self.state.borrow_mut();
        state.needs_update = current.is_older(&self.latest);
        state.current = current;
        state.exists = exists;
        Ok(())
    }

    /// Bring the table to its latest version.
    ///
    /// Returns whether anything was applied. A second call within the same run
    /// returns the outcome of the first without running anything.
    pub fn update(&self, registry: &SchemaRegistry) -> EngineResult<bool> {
        {
            let state = self.state.borrow();
            if state.update_attempted {
                if state.active || state.update_succeeded {
                    return Ok(state.changed);
                }
                return Err(EngineError::PreviousFailure {
                    table: self.name.to_string(),
                });
            }
        }

        self.refresh(registry)?;
        if !self.needs_update() {
            return Ok(false);
        }

        let before = {
            let mut state = self.state.borrow_mut();
            state.update_attempted = true;
            state.active = true;
            state.current.clone()
        };
        log::info!(
            "Updating table '{}' from {} to {}",
            self.name,
            before,
            self.latest
        );

        let result = self.run_update(registry);

        let mut state = self.state.borrow_mut();
        state.active = false;
        match result {
            Ok(()) => {
                state.update_succeeded = true;
                state.changed = state.current != before;
                Ok(state.changed)
            }
            Err(e) => {
                log::error!("Update of table '{}' failed: {e}", self.name);
                state.errors.push(e.to_string());
                Err(e)
            }
        }
    }

    fn run_update(&self, registry: &SchemaRegistry) -> EngineResult<()> {
        if let Some(old) = self.replacement_target(registry)? {
            self.replace(registry, &old)?;
        } else {
            self.apply_steps(registry)?;
        }
        self.chain_successor(registry)
    }

    /// Trigger the successor table when it does not exist yet.
    fn chain_successor(&self, registry: &SchemaRegistry) -> EngineResult<()> {
        let Some(successor) = self.replaced_by() else {
            return Ok(());
        };
        if registry.table_exists(successor)? {
            return Ok(());
        }
        let next = registry
            .get_table(successor)?
            .ok_or_else(|| EngineError::MissingDependency {
                table: self.name.to_string(),
                dependency: successor.to_string(),
            })?;
        log::info!("Table '{}' is replaced by '{}'", self.name, successor);
        next.update(registry)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
