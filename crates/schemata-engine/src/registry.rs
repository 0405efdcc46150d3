//! Schema registry: table discovery, dependency ordering and sweeps.

use crate::error::{EngineError, EngineResult};
use crate::hooks::HookRegistry;
use crate::lock::MigrationLock;
use crate::options::RegistryOptions;
use crate::source::SchemaSource;
use crate::table::TableSchema;
use schemata_core::{TableDag, TableName, Version};
use schemata_db::Database;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;

/// How a tag filter combines several tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagMatch {
    /// Keep tables carrying at least one of the tags
    #[default]
    Any,
    /// Keep tables carrying every tag
    All,
}

/// Filter applied to the ordered table list.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Tags to filter by; empty keeps every table
    pub tags: Vec<String>,
    pub tag_match: TagMatch,
    /// Table names to keep; empty keeps every table
    pub tables: Vec<String>,
}

impl ListOptions {
    fn matches(&self, table: &TableSchema) -> bool {
        if !self.tables.is_empty() && !self.tables.iter().any(|t| t == table.name().as_str()) {
            return false;
        }
        if self.tags.is_empty() {
            return true;
        }
        let has = |tag: &String| table.tags().contains(tag);
        match self.tag_match {
            TagMatch::Any => self.tags.iter().any(has),
            TagMatch::All => self.tags.iter().all(has),
        }
    }
}

/// A table changed by a structural sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct TableReport {
    pub name: TableName,
    pub from: Version,
    pub to: Version,
}

/// A table whose rows were changed by a row sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct RowReport {
    pub name: TableName,
    pub ids: Vec<String>,
}

/// Registry of versioned tables bound to one database connection.
///
/// Tables are loaded on first reference and cached for the registry's
/// lifetime, so each table is updated at most once per sweep.
pub struct SchemaRegistry {
    db: Rc<dyn Database>,
    options: RegistryOptions,
    hooks: HookRegistry,
    sources: Vec<SchemaSource>,
    tables: RefCell<HashMap<TableName, Rc<TableSchema>>>,
}

impl SchemaRegistry {
    /// Create a registry; the metadata table must already exist.
    pub fn new(
        db: Rc<dyn Database>,
        options: RegistryOptions,
        hooks: HookRegistry,
    ) -> EngineResult<Self> {
        if !db.relation_exists(&options.metadata.table)? {
            return Err(EngineError::MetadataTableMissing {
                table: options.metadata.table.clone(),
            });
        }
        log::debug!(
            "Schema registry on {} (metadata table '{}')",
            db.db_type(),
            options.metadata.table
        );
        Ok(Self {
            db,
            options,
            hooks,
            sources: Vec::new(),
            tables: RefCell::new(HashMap::new()),
        })
    }

    /// Register a source root. Blank paths are ignored; the layout is checked
    /// when a table is first looked up.
    pub fn add_source(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if path.to_string_lossy().trim().is_empty() {
            return;
        }
        log::debug!("Adding schema source {}", path.display());
        self.sources.push(SchemaSource::new(path));
    }

    pub fn sources(&self) -> &[SchemaSource] {
        &self.sources
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Shared database handle
    pub fn db(&self) -> &dyn Database {
        &*self.db
    }

    /// Whether the table physically exists in the database.
    pub fn table_exists(&self, name: &str) -> EngineResult<bool> {
        Ok(self.db.relation_exists(name)?)
    }

    /// Look up a table, loading it from the first source that defines it.
    ///
    /// `Ok(None)` means no source defines the table; it may be managed by hand.
    pub fn get_table(&self, name: &str) -> EngineResult<Option<Rc<TableSchema>>> {
        let Some(name) = TableName::try_new(name) else {
            return Ok(None);
        };
        if let Some(table) = self.tables.borrow().get(&name).cloned() {
            return Ok(Some(table));
        }

        let layout = &self.options.layout;
        for source in &self.sources {
            source.check(layout)?;
            if !source.defines(layout, &name) {
                continue;
            }
            let table = Rc::new(TableSchema::load(self, source, name.clone())?);
            self.tables.borrow_mut().insert(name, table.clone());
            return Ok(Some(table));
        }
        Ok(None)
    }

    /// Every defined table, dependencies first, then filtered by `options`.
    pub fn list_tables(&self, options: &ListOptions) -> EngineResult<Vec<Rc<TableSchema>>> {
        let tables = self.discover()?;
        self.check_cycles(&tables)?;

        let mut seen = HashSet::new();
        let mut ordered = Vec::with_capacity(tables.len());
        for table in &tables {
            self.visit(table, &mut seen, &mut ordered)?;
        }

        Ok(ordered
            .into_iter()
            .filter(|table| options.matches(table))
            .collect())
    }

    /// Update every listed table, returning the tables that changed.
    pub fn update_all_tables(&self, options: &ListOptions) -> EngineResult<Vec<TableReport>> {
        let _lock = self.lock()?;
        let tables = self.list_tables(options)?;
        for table in &tables {
            table.update(self)?;
        }
        Ok(tables
            .iter()
            .filter(|table| table.changed())
            .map(|table| TableReport {
                name: table.name().clone(),
                from: table.initial(),
                to: table.current(),
            })
            .collect())
    }

    /// Run row migrations of every listed table, returning tables with updated rows.
    pub fn update_all_rows(&self, options: &ListOptions) -> EngineResult<Vec<RowReport>> {
        let _lock = self.lock()?;
        let tables = self.list_tables(options)?;
        let mut reports = Vec::new();
        for table in &tables {
            let ids = table.update_rows(self)?;
            if !ids.is_empty() {
                reports.push(RowReport {
                    name: table.name().clone(),
                    ids,
                });
            }
        }
        Ok(reports)
    }

    /// Force-release the advisory lock. Returns whether a lock was removed.
    pub fn force_unlock(&self) -> EngineResult<bool> {
        MigrationLock::force_release(&*self.db, &self.options.lock)
    }

    fn lock(&self) -> EngineResult<Option<MigrationLock>> {
        if !self.options.lock.enabled {
            return Ok(None);
        }
        MigrationLock::acquire(self.db.clone(), &self.options.lock).map(Some)
    }

    /// Load every table of every source; sources in registration order, names
    /// sorted within a source, first definition wins.
    fn discover(&self) -> EngineResult<Vec<Rc<TableSchema>>> {
        let mut seen = HashSet::new();
        let mut tables = Vec::new();
        for source in &self.sources {
            for name in source.table_names(&self.options.layout)? {
                if !seen.insert(name.clone()) {
                    continue;
                }
                if let Some(table) = self.get_table(&name)? {
                    tables.push(table);
                }
            }
        }
        Ok(tables)
    }

    /// Reject cycles among hard dependencies and defined soft dependencies.
    fn check_cycles(&self, tables: &[Rc<TableSchema>]) -> EngineResult<()> {
        let graph: HashMap<TableName, Vec<TableName>> = tables
            .iter()
            .map(|table| {
                let mut deps = table.hard_dependencies().to_vec();
                deps.extend(table.soft_dependencies());
                (table.name().clone(), deps)
            })
            .collect();
        TableDag::build(&graph)?;
        Ok(())
    }

    fn visit(
        &self,
        table: &Rc<TableSchema>,
        seen: &mut HashSet<TableName>,
        ordered: &mut Vec<Rc<TableSchema>>,
    ) -> EngineResult<()> {
        if !seen.insert(table.name().clone()) {
            return Ok(());
        }

        for dependency in table.hard_dependencies() {
            match self.get_table(dependency)? {
                Some(dep) => self.visit(&dep, seen, ordered)?,
                None => {
                    return Err(EngineError::MissingDependency {
                        table: table.name().to_string(),
                        dependency: dependency.to_string(),
                    })
                }
            }
        }
        for dependency in table.soft_dependencies() {
            match self.get_table(&dependency)? {
                Some(dep) => self.visit(&dep, seen, ordered)?,
                None => log::warn!(
                    "Table '{}' orders after '{}', which has no definition; skipping",
                    table.name(),
                    dependency
                ),
            }
        }

        ordered.push(table.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
