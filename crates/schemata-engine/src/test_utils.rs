//! Fixture helpers shared by the engine's unit and integration tests.
//!
//! A fixture is a source root on disk plus an in-memory DuckDB that already
//! has the default metadata table.

use crate::hooks::HookRegistry;
use crate::options::RegistryOptions;
use crate::registry::SchemaRegistry;
use schemata_db::{Database, DuckDbBackend};
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// DDL of the default metadata table
pub const METADATA_DDL: &str = "CREATE TABLE schemata_versions (name VARCHAR, version VARCHAR)";

/// In-memory database with the metadata table in place.
pub fn metadata_db() -> Rc<DuckDbBackend> {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(METADATA_DDL).unwrap();
    Rc::new(db)
}

/// SQL that records `version` for `table` in the metadata table.
pub fn record_version(table: &str, version: &str) -> String {
    format!(
        "DELETE FROM schemata_versions WHERE name = '{table}';\n\
         INSERT INTO schemata_versions VALUES ('{table}', '{version}');\n"
    )
}

/// Write `<root>/tables/<table>/schema.json`.
pub fn write_definition(root: &Path, table: &str, definition: serde_json::Value) {
    let dir = root.join("tables").join(table);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("schema.json"),
        serde_json::to_string_pretty(&definition).unwrap(),
    )
    .unwrap();
}

/// Write the initial creation script `<root>/sql/<table>.sql`.
pub fn write_creation_script(root: &Path, table: &str, sql: &str) {
    let dir = root.join("sql");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(format!("{table}.sql")), sql).unwrap();
}

/// Write a script into the table directory, e.g. `1.0-1.1.sql`.
pub fn write_table_script(root: &Path, table: &str, file: &str, sql: &str) {
    let dir = root.join("tables").join(table);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), sql).unwrap();
}

/// Registry over a single source root with default options.
pub fn registry(db: Rc<DuckDbBackend>, root: &Path, hooks: HookRegistry) -> SchemaRegistry {
    registry_with(db, root, hooks, RegistryOptions::default())
}

pub fn registry_with(
    db: Rc<DuckDbBackend>,
    root: &Path,
    hooks: HookRegistry,
    options: RegistryOptions,
) -> SchemaRegistry {
    let mut registry = SchemaRegistry::new(db, options, hooks).unwrap();
    registry.add_source(root);
    registry
}

/// Current version recorded in the metadata table.
pub fn recorded_version(db: &DuckDbBackend, table: &str) -> Option<String> {
    db.query_version(&Default::default(), table).unwrap()
}
