use super::*;
use crate::hooks::HookRegistry;
use crate::test_utils::*;
use schemata_db::Database;
use serde_json::json;

fn users_at_1_0(db: &schemata_db::DuckDbBackend) {
    db.execute_batch(&format!(
        "CREATE TABLE users (id INTEGER);\n{}",
        record_version("users", "1.0")
    ))
    .unwrap();
}

#[test]
fn test_state_display() {
    assert_eq!(TableState::UpToDate.to_string(), "up-to-date");
    assert_eq!(TableState::NeedsUpdate.to_string(), "needs-update");
    assert_eq!(TableState::UpdateFailed.to_string(), "failed");
}

#[test]
fn test_no_steps_gets_implicit_creation_step() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(dir.path(), "events", json!({}));
    let registry = registry(metadata_db(), dir.path(), HookRegistry::new());

    let table = registry.get_table("events").unwrap().unwrap();
    assert_eq!(table.steps().len(), 1);
    assert_eq!(table.latest().as_str(), Some("1.0"));
    assert!(table.current().is_missing());
    assert_eq!(table.state(), TableState::NeedsUpdate);
    assert_eq!(table.vercolumn(), "row_version");
}

#[test]
fn test_steps_sorted_and_latest() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(
        dir.path(),
        "users",
        json!({"table_versions": ["1.10", "1.2", 1]}),
    );
    let registry = registry(metadata_db(), dir.path(), HookRegistry::new());

    let table = registry.get_table("users").unwrap().unwrap();
    let versions: Vec<String> = table.steps().iter().map(|s| s.version.to_string()).collect();
    assert_eq!(versions, vec!["1.0", "1.2", "1.10"]);
    assert_eq!(table.latest().as_str(), Some("1.10"));
}

#[test]
fn test_existing_table_without_metadata_row() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(dir.path(), "users", json!({"table_versions": ["1.0"]}));
    let db = metadata_db();
    db.execute_batch("CREATE TABLE users (id INTEGER)").unwrap();
    let registry = registry(db, dir.path(), HookRegistry::new());

    let err = registry.get_table("users").unwrap_err();
    assert!(matches!(err, EngineError::MetadataMissing { .. }), "got {err:?}");
}

#[test]
fn test_dropped_table_with_stale_metadata_is_missing() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(dir.path(), "users", json!({"table_versions": ["1.0"]}));
    let db = metadata_db();
    db.execute_batch(&record_version("users", "1.0")).unwrap();
    let registry = registry(db, dir.path(), HookRegistry::new());

    let table = registry.get_table("users").unwrap().unwrap();
    assert!(table.current().is_missing());
    assert!(!table.exists());
    assert!(table.needs_update());
}

#[test]
fn test_version_ahead_of_definition() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(dir.path(), "users", json!({"table_versions": ["1.0"]}));
    let db = metadata_db();
    db.execute_batch(&format!(
        "CREATE TABLE users (id INTEGER);\n{}",
        record_version("users", "2.0")
    ))
    .unwrap();
    let registry = registry(db, dir.path(), HookRegistry::new());

    let err = registry.get_table("users").unwrap_err();
    assert!(matches!(err, EngineError::VersionAhead { .. }), "got {err:?}");
}

#[test]
fn test_invalid_vercolumn_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(dir.path(), "users", json!({"vercolumn": "row version"}));
    let registry = registry(metadata_db(), dir.path(), HookRegistry::new());
    assert!(registry.get_table("users").is_err());
}

#[test]
fn test_table_name_must_be_identifier() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(dir.path(), "users; DROP TABLE x", json!({}));
    write_definition(dir.path(), "order-items", json!({}));
    let registry = registry(metadata_db(), dir.path(), HookRegistry::new());

    let err = registry.get_table("users; DROP TABLE x").unwrap_err();
    assert!(err.to_string().contains("not a valid SQL identifier"), "got {err}");
    assert!(registry.get_table("order-items").is_err());
}

#[test]
fn test_update_applies_default_named_script() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(dir.path(), "users", json!({"table_versions": ["1.0", "1.1"]}));
    write_table_script(
        dir.path(),
        "users",
        "1.0-1.1.sql",
        &format!(
            "ALTER TABLE users ADD COLUMN email VARCHAR;\n{}",
            record_version("users", "1.1")
        ),
    );
    let db = metadata_db();
    users_at_1_0(&db);
    let registry = registry(db.clone(), dir.path(), HookRegistry::new());

    let users = registry.get_table("users").unwrap().unwrap();
    assert!(users.needs_update());
    assert!(users.update(&registry).unwrap());
    assert_eq!(users.current().as_str(), Some("1.1"));
    assert!(!users.needs_update());
    assert_eq!(users.state(), TableState::UpdateOk);
    assert_eq!(users.initial().as_str(), Some("1.0"));
    assert_eq!(recorded_version(&db, "users").as_deref(), Some("1.1"));
}

#[test]
fn test_update_up_to_date_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(dir.path(), "users", json!({"table_versions": ["1.0"]}));
    let db = metadata_db();
    users_at_1_0(&db);
    let registry = registry(db, dir.path(), HookRegistry::new());

    let users = registry.get_table("users").unwrap().unwrap();
    assert!(!users.update(&registry).unwrap());
    assert_eq!(users.state(), TableState::UpToDate);
    assert!(!users.changed());
}

#[test]
fn test_failed_update_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(dir.path(), "users", json!({"table_versions": ["1.0", "1.1"]}));
    write_table_script(dir.path(), "users", "1.0-1.1.sql", "ALTER TABLE nowhere ADD x INT;");
    let db = metadata_db();
    users_at_1_0(&db);
    let registry = registry(db, dir.path(), HookRegistry::new());

    let users = registry.get_table("users").unwrap().unwrap();
    assert!(users.update(&registry).is_err());
    assert_eq!(users.state(), TableState::UpdateFailed);
    assert_eq!(users.errors().len(), 1);

    let err = users.update(&registry).unwrap_err();
    assert!(matches!(err, EngineError::PreviousFailure { .. }));
    assert_eq!(users.current().as_str(), Some("1.0"));
}

#[test]
fn test_step_that_does_not_record_version() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(dir.path(), "users", json!({"table_versions": ["1.0", "1.1"]}));
    write_table_script(
        dir.path(),
        "users",
        "1.0-1.1.sql",
        "ALTER TABLE users ADD COLUMN email VARCHAR;",
    );
    let db = metadata_db();
    users_at_1_0(&db);
    let registry = registry(db, dir.path(), HookRegistry::new());

    let users = registry.get_table("users").unwrap().unwrap();
    let err = users.update(&registry).unwrap_err();
    assert!(
        matches!(err, EngineError::VersionNotRecorded { ref step, .. } if step == "1.1"),
        "got {err:?}"
    );
}
