//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::traits::{Database, Row};
use duckdb::types::Value;
use duckdb::{params, Connection};
use schemata_core::MetadataConfig;
use std::path::Path;

/// DuckDB database backend
///
/// Single-threaded: one connection is shared by every table in a sweep.
pub struct DuckDbBackend {
    conn: Connection,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self { conn })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    /// Borrow the underlying DuckDB connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Split a possibly schema-qualified name into `(schema, table)`.
fn split_qualified(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => ("main", name),
    }
}

/// Convert a DuckDB value into its JSON representation.
fn value_to_json(value: Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Null => Json::Null,
        Value::Boolean(b) => Json::Bool(b),
        Value::TinyInt(n) => Json::from(n),
        Value::SmallInt(n) => Json::from(n),
        Value::Int(n) => Json::from(n),
        Value::BigInt(n) => Json::from(n),
        Value::HugeInt(n) => match i64::try_from(n) {
            Ok(small) => Json::from(small),
            Err(_) => Json::String(n.to_string()),
        },
        Value::UTinyInt(n) => Json::from(n),
        Value::USmallInt(n) => Json::from(n),
        Value::UInt(n) => Json::from(n),
        Value::UBigInt(n) => Json::from(n),
        Value::Float(f) => serde_json::Number::from_f64(f64::from(f))
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Double(f) => serde_json::Number::from_f64(f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        Value::Text(s) => Json::String(s),
        Value::Enum(s) => Json::String(s),
        Value::Decimal(d) => Json::String(d.to_string()),
        other => Json::String(format!("{other:?}")),
    }
}

impl Database for DuckDbBackend {
    fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn source(&self, path: &Path) -> DbResult<String> {
        let sql = std::fs::read_to_string(path).map_err(|e| DbError::ScriptRead {
            path: path.display().to_string(),
            source: e,
        })?;
        if sql.trim().is_empty() {
            return Ok(format!("{}: empty script", path.display()));
        }
        self.conn
            .execute_batch(&sql)
            .map_err(|e| DbError::ScriptError {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(format!("{}: executed {} bytes", path.display(), sql.len()))
    }

    fn relation_exists(&self, name: &str) -> DbResult<bool> {
        let (schema, table) = split_qualified(name);
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE lower(table_schema) = lower(?) AND lower(table_name) = lower(?)",
            params![schema, table],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn query_version(&self, metadata: &MetadataConfig, table: &str) -> DbResult<Option<String>> {
        let sql = format!(
            "SELECT CAST({version} AS VARCHAR) FROM {meta} WHERE {name} = ? LIMIT 1",
            version = metadata.version_column,
            meta = metadata.table,
            name = metadata.name_column,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![table])?;
        match rows.next()? {
            Some(row) => Ok(row.get::<_, Option<String>>(0)?),
            None => Ok(None),
        }
    }

    fn query_rows(&self, sql: &str) -> DbResult<Vec<Row>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let columns: Vec<String> = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Row::new();
            for (idx, column) in columns.iter().enumerate() {
                let value: Value = row.get(idx)?;
                record.insert(column.clone(), value_to_json(value));
            }
            out.push(record);
        }
        Ok(out)
    }

    fn begin(&self) -> DbResult<()> {
        self.conn
            .execute_batch("BEGIN TRANSACTION")
            .map_err(|e| DbError::TransactionError(format!("BEGIN failed: {e}")))
    }

    fn commit(&self) -> DbResult<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| DbError::TransactionError(format!("COMMIT failed: {e}")))
    }

    fn rollback(&self) -> DbResult<()> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| DbError::TransactionError(format!("ROLLBACK failed: {e}")))
    }

    fn try_acquire_lock(&self, lock_table: &str, name: &str, holder: &str) -> DbResult<bool> {
        self.conn
            .execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {lock_table} (
                     name        VARCHAR PRIMARY KEY,
                     holder      VARCHAR NOT NULL,
                     acquired_at TIMESTAMP DEFAULT CAST(now() AS TIMESTAMP)
                 );"
            ))
            .map_err(|e| DbError::LockError(format!("failed to create {lock_table}: {e}")))?;

        let inserted = self
            .conn
            .execute(
                &format!("INSERT INTO {lock_table} (name, holder) VALUES (?, ?) ON CONFLICT DO NOTHING"),
                params![name, holder],
            )
            .map_err(|e| DbError::LockError(format!("failed to acquire '{name}': {e}")))?;
        Ok(inserted == 1)
    }

    fn release_lock(&self, lock_table: &str, name: &str, holder: Option<&str>) -> DbResult<bool> {
        if !self.relation_exists(lock_table)? {
            return Ok(false);
        }
        let deleted = match holder {
            Some(holder) => self.conn.execute(
                &format!("DELETE FROM {lock_table} WHERE name = ? AND holder = ?"),
                params![name, holder],
            ),
            None => self.conn.execute(
                &format!("DELETE FROM {lock_table} WHERE name = ?"),
                params![name],
            ),
        }
        .map_err(|e| DbError::LockError(format!("failed to release '{name}': {e}")))?;
        Ok(deleted > 0)
    }

    fn lock_holder(&self, lock_table: &str, name: &str) -> DbResult<Option<String>> {
        if !self.relation_exists(lock_table)? {
            return Ok(None);
        }
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT holder FROM {lock_table} WHERE name = ?"))?;
        let mut rows = stmt.query(params![name])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
