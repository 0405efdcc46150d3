//! Transaction helper shared by the engine.

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use std::path::Path;

const TRANSACTION_KEYWORDS: &[&str] = &["BEGIN", "COMMIT", "ROLLBACK", "ABORT", "START", "END"];

/// Run `body` within a `BEGIN` / `COMMIT` transaction, rolling back on error.
pub fn with_transaction<T, E, F>(db: &dyn Database, body: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<DbError>,
{
    db.begin()?;

    let result = body();

    match &result {
        Ok(_) => {
            if let Err(commit_err) = db.commit() {
                let _ = db.rollback();
                return Err(DbError::TransactionError(format!("COMMIT failed: {commit_err}")).into());
            }
        }
        Err(_) => {
            if let Err(rollback_err) = db.rollback() {
                log::warn!("ROLLBACK failed: {rollback_err}");
            }
        }
    }
    result
}

/// Whether `sql` opens or closes transactions itself.
///
/// Looks at the first keyword of every statement, ignoring `--` comments.
/// Such a script cannot run inside [`with_transaction`].
pub fn manages_transaction(sql: &str) -> bool {
    let code: String = sql
        .lines()
        .map(|line| line.split("--").next().unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n");
    code.split(';').any(|statement| {
        statement
            .split_whitespace()
            .next()
            .map(|word| {
                TRANSACTION_KEYWORDS
                    .iter()
                    .any(|kw| word.eq_ignore_ascii_case(kw))
            })
            .unwrap_or(false)
    })
}

/// [`manages_transaction`] for a script file.
pub fn script_manages_transaction(path: &Path) -> DbResult<bool> {
    let sql = std::fs::read_to_string(path).map_err(|e| DbError::ScriptRead {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(manages_transaction(&sql))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DuckDbBackend;

    #[test]
    fn test_commit_on_success() {
        let db = DuckDbBackend::in_memory().unwrap();
        let result: Result<(), DbError> = with_transaction(&db, || {
            db.execute_batch("CREATE TABLE kept (id INTEGER)")
        });
        assert!(result.is_ok());
        assert!(db.relation_exists("kept").unwrap());
    }

    #[test]
    fn test_rollback_on_error() {
        let db = DuckDbBackend::in_memory().unwrap();
        let result: Result<(), DbError> = with_transaction(&db, || {
            db.execute_batch("CREATE TABLE discarded (id INTEGER)")?;
            Err(DbError::ExecutionError("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(!db.relation_exists("discarded").unwrap());
    }

    #[test]
    fn test_manages_transaction() {
        assert!(manages_transaction("BEGIN;\nCREATE TABLE t (id INT);\nCOMMIT;"));
        assert!(manages_transaction("create table t (id int);\n  commit"));
        assert!(manages_transaction("START TRANSACTION; SELECT 1;"));
        assert!(!manages_transaction("CREATE TABLE t (id INT);\n-- BEGIN later\n"));
        assert!(!manages_transaction("INSERT INTO log VALUES ('begin');"));
        assert!(!manages_transaction(""));
    }
}
