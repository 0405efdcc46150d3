//! Database trait definition

use crate::error::DbResult;
use schemata_core::MetadataConfig;
use std::path::Path;

/// A fetched row: column name to JSON value.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Database capability consumed by the migration engine.
///
/// All calls are synchronous and share one connection; migration sweeps are
/// single-threaded.
pub trait Database {
    /// Execute one or more SQL statements
    fn execute_batch(&self, sql: &str) -> DbResult<()>;

    /// Execute a script file, returning a diagnostic description of the run
    fn source(&self, path: &Path) -> DbResult<String>;

    /// Check if a table or view exists
    fn relation_exists(&self, name: &str) -> DbResult<bool>;

    /// Read the version recorded for `table` in the metadata table
    ///
    /// Returns `None` when no row (or a NULL version) is recorded.
    fn query_version(&self, metadata: &MetadataConfig, table: &str) -> DbResult<Option<String>>;

    /// Run a query and return every row as a JSON object
    fn query_rows(&self, sql: &str) -> DbResult<Vec<Row>>;

    /// Begin a transaction
    fn begin(&self) -> DbResult<()>;

    /// Commit the current transaction
    fn commit(&self) -> DbResult<()>;

    /// Roll back the current transaction
    fn rollback(&self) -> DbResult<()>;

    /// Try to take the named advisory lock; `false` if another holder has it
    fn try_acquire_lock(&self, lock_table: &str, name: &str, holder: &str) -> DbResult<bool>;

    /// Release the named lock, only if held by `holder` when one is given
    fn release_lock(&self, lock_table: &str, name: &str, holder: Option<&str>) -> DbResult<bool>;

    /// Current holder of the named lock, if any
    fn lock_holder(&self, lock_table: &str, name: &str) -> DbResult<Option<String>>;

    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
