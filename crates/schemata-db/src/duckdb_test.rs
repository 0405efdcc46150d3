use super::*;
use std::fs;

fn metadata() -> MetadataConfig {
    MetadataConfig::default()
}

fn with_metadata_table() -> DuckDbBackend {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE schemata_versions (name VARCHAR, version VARCHAR)")
        .unwrap();
    db
}

#[test]
fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
}

#[test]
fn test_new_memory_path() {
    let db = DuckDbBackend::new(":memory:").unwrap();
    assert!(!db.relation_exists("anything").unwrap());
}

#[test]
fn test_execute_batch() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE t1 (id INT); CREATE TABLE t2 (id INT); INSERT INTO t1 VALUES (1);",
    )
    .unwrap();

    assert!(db.relation_exists("t1").unwrap());
    assert!(db.relation_exists("t2").unwrap());
}

#[test]
fn test_relation_not_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(!db.relation_exists("nonexistent").unwrap());
}

#[test]
fn test_relation_exists_case_insensitive_and_qualified() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE SCHEMA staging; CREATE TABLE staging.Users (id INT)")
        .unwrap();
    assert!(db.relation_exists("staging.users").unwrap());
    assert!(!db.relation_exists("users").unwrap());
}

#[test]
fn test_query_version_missing_row() {
    let db = with_metadata_table();
    assert_eq!(db.query_version(&metadata(), "users").unwrap(), None);
}

#[test]
fn test_query_version_recorded() {
    let db = with_metadata_table();
    db.execute_batch("INSERT INTO schemata_versions VALUES ('users', '1.1')")
        .unwrap();
    assert_eq!(
        db.query_version(&metadata(), "users").unwrap(),
        Some("1.1".to_string())
    );
}

#[test]
fn test_query_version_null() {
    let db = with_metadata_table();
    db.execute_batch("INSERT INTO schemata_versions VALUES ('users', NULL)")
        .unwrap();
    assert_eq!(db.query_version(&metadata(), "users").unwrap(), None);
}

#[test]
fn test_query_version_without_metadata_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(db.query_version(&metadata(), "users").is_err());
}

#[test]
fn test_query_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE people (id INTEGER, name VARCHAR, row_version VARCHAR);
         INSERT INTO people VALUES (1, 'ada', '1.0'), (2, 'bob', NULL);",
    )
    .unwrap();

    let rows = db
        .query_rows("SELECT id, name, row_version FROM people ORDER BY id")
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], serde_json::json!(1));
    assert_eq!(rows[0]["name"], serde_json::json!("ada"));
    assert_eq!(rows[1]["row_version"], serde_json::Value::Null);
}

#[test]
fn test_query_rows_missing_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.query_rows("SELECT * FROM ghost").unwrap_err();
    assert!(matches!(err, DbError::TableNotFound(_)), "got {err:?}");
}

#[test]
fn test_source_script() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("users.sql");
    fs::write(&script, "CREATE TABLE users (id INTEGER);").unwrap();

    let db = DuckDbBackend::in_memory().unwrap();
    let description = db.source(&script).unwrap();
    assert!(description.contains("users.sql"));
    assert!(db.relation_exists("users").unwrap());
}

#[test]
fn test_source_missing_script() {
    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.source(Path::new("/nonexistent/script.sql")).unwrap_err();
    assert!(matches!(err, DbError::ScriptRead { .. }));
}

#[test]
fn test_source_failing_script() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("bad.sql");
    fs::write(&script, "CREATE TABLE (;").unwrap();

    let db = DuckDbBackend::in_memory().unwrap();
    let err = db.source(&script).unwrap_err();
    assert!(matches!(err, DbError::ScriptError { .. }));
    assert!(err.to_string().contains("bad.sql"));
}

#[test]
fn test_transaction_rollback() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.begin().unwrap();
    db.execute_batch("CREATE TABLE temp_t (id INT)").unwrap();
    db.rollback().unwrap();
    assert!(!db.relation_exists("temp_t").unwrap());
}

#[test]
fn test_lock_acquire_and_contend() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(db.try_acquire_lock("schemata_lock", "main", "first").unwrap());
    assert!(!db.try_acquire_lock("schemata_lock", "main", "second").unwrap());
    assert_eq!(
        db.lock_holder("schemata_lock", "main").unwrap(),
        Some("first".to_string())
    );

    // A different lock name is independent
    assert!(db.try_acquire_lock("schemata_lock", "other", "second").unwrap());
}

#[test]
fn test_lock_release_requires_matching_holder() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.try_acquire_lock("schemata_lock", "main", "first").unwrap();

    assert!(!db.release_lock("schemata_lock", "main", Some("second")).unwrap());
    assert!(db.release_lock("schemata_lock", "main", Some("first")).unwrap());
    assert_eq!(db.lock_holder("schemata_lock", "main").unwrap(), None);
    assert!(db.try_acquire_lock("schemata_lock", "main", "second").unwrap());
}

#[test]
fn test_lock_force_release() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.try_acquire_lock("schemata_lock", "main", "stale").unwrap();
    assert!(db.release_lock("schemata_lock", "main", None).unwrap());
}

#[test]
fn test_lock_release_without_table() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(!db.release_lock("schemata_lock", "main", None).unwrap());
    assert_eq!(db.lock_holder("schemata_lock", "main").unwrap(), None);
}

#[test]
fn test_split_qualified() {
    assert_eq!(split_qualified("users"), ("main", "users"));
    assert_eq!(split_qualified("staging.users"), ("staging", "users"));
}
