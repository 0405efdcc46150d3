//! End-to-end tests for the `schemata` binary
//!
//! Each test builds a throwaway project (config, schema source, DuckDB file
//! with the metadata table) and drives the CLI against it.

use schemata_db::{Database, DuckDbBackend};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Path to the compiled schemata binary
fn schemata_bin() -> String {
    env!("CARGO_BIN_EXE_schemata").to_string()
}

/// Run a `schemata` command in `project` and return (stdout, stderr, exit code).
fn run_schemata(project: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(schemata_bin())
        .arg("-p")
        .arg(project)
        .args(args)
        .env_remove("SCHEMATA_TARGET")
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute schemata with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

const CONFIG: &str = r#"
name: test_project
sources:
  - db
database:
  path: app.duckdb
targets:
  ci:
    database:
      path: ci.duckdb
"#;

/// Open the project database, run `sql`, and close it again.
fn with_db(project: &Path, file: &str, sql: &str) {
    let db = DuckDbBackend::from_path(&project.join(file)).unwrap();
    db.execute_batch(sql).unwrap();
}

fn query_version(project: &Path, file: &str, table: &str) -> Option<String> {
    let db = DuckDbBackend::from_path(&project.join(file)).unwrap();
    let rows = db
        .query_rows(&format!(
            "SELECT version FROM schemata_versions WHERE name = '{table}'"
        ))
        .unwrap();
    rows.first()
        .and_then(|row| row["version"].as_str().map(String::from))
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Project with a `users` table at versions 1.0 and 1.1 and an `orders`
/// table that needs users 1.1.
fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(&root.join("schemata.yml"), CONFIG);

    write(
        &root.join("db/tables/users/schema.json"),
        r#"{"description": "Registered users", "tags": ["core"], "table_versions": ["1.0", "1.1"]}"#,
    );
    write(
        &root.join("db/sql/users.sql"),
        "CREATE TABLE users (id INTEGER, name VARCHAR);\n\
         INSERT INTO schemata_versions VALUES ('users', '1.0');\n",
    );
    write(
        &root.join("db/tables/users/1.0-1.1.sql"),
        "ALTER TABLE users ADD COLUMN email VARCHAR;\n\
         UPDATE schemata_versions SET version = '1.1' WHERE name = 'users';\n",
    );

    write(
        &root.join("db/tables/orders/schema.json"),
        r#"{"tags": ["billing"], "table_versions": [{"version": "1.0", "requires": {"users": "1.1"}}]}"#,
    );
    write(
        &root.join("db/sql/orders.sql"),
        "CREATE TABLE orders (id INTEGER, user_id INTEGER);\n\
         INSERT INTO schemata_versions VALUES ('orders', '1.0');\n",
    );

    for file in ["app.duckdb", "ci.duckdb"] {
        with_db(
            root,
            file,
            "CREATE TABLE schemata_versions (name VARCHAR, version VARCHAR)",
        );
    }
    dir
}

// ── Status ──────────────────────────────────────────────────────────────

#[test]
fn test_status_lists_tables_in_dependency_order() {
    let dir = project();
    let (stdout, stderr, code) = run_schemata(dir.path(), &["status"]);
    assert_eq!(code, 0, "stderr: {stderr}");

    let users = stdout.find("users").expect("users listed");
    let orders = stdout.find("orders").expect("orders listed");
    assert!(users < orders, "users must come before orders:\n{stdout}");
    assert!(stdout.contains("needs-update"));
    assert!(stdout.contains("2 tables, 2 need updating"), "got:\n{stdout}");
}

#[test]
fn test_status_json_with_tag_filter() {
    let dir = project();
    let (stdout, stderr, code) =
        run_schemata(dir.path(), &["status", "--tags", "billing", "-o", "json"]);
    assert_eq!(code, 0, "stderr: {stderr}");

    let report: Value = serde_json::from_str(&stdout).unwrap();
    assert!(report["generated_at"].is_string());
    let tables = report["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0]["name"], "orders");
    assert!(tables[0]["current"].is_null());
    assert_eq!(tables[0]["latest"], "1.0");
    assert_eq!(tables[0]["depends_on"][0], "users");
}

#[test]
fn test_missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_schemata(dir.path(), &["status"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Failed to load project configuration"), "got: {stderr}");
}

#[test]
fn test_missing_metadata_table_fails() {
    let dir = project();
    with_db(dir.path(), "app.duckdb", "DROP TABLE schemata_versions");
    let (_, stderr, code) = run_schemata(dir.path(), &["status"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("schemata_versions"), "got: {stderr}");
}

// ── Update ──────────────────────────────────────────────────────────────

#[test]
fn test_update_brings_everything_up_to_date() {
    let dir = project();
    let (stdout, stderr, code) = run_schemata(dir.path(), &["update"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("Updated 2 tables"), "got:\n{stdout}");
    assert_eq!(
        query_version(dir.path(), "app.duckdb", "users").as_deref(),
        Some("1.1")
    );
    assert_eq!(
        query_version(dir.path(), "app.duckdb", "orders").as_deref(),
        Some("1.0")
    );

    let (stdout, _, code) = run_schemata(dir.path(), &["update"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("All tables are up to date."), "got:\n{stdout}");

    let (stdout, _, _) = run_schemata(dir.path(), &["status"]);
    assert!(stdout.contains("2 tables, 0 need updating"), "got:\n{stdout}");
}

#[test]
fn test_update_named_table_json() {
    let dir = project();
    let (stdout, stderr, code) =
        run_schemata(dir.path(), &["update", "--tables", "users", "-o", "json"]);
    assert_eq!(code, 0, "stderr: {stderr}");

    let report: Value = serde_json::from_str(&stdout).unwrap();
    let updated = report["updated"].as_array().unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0]["name"], "users");
    assert!(updated[0]["from"].is_null());
    assert_eq!(updated[0]["to"], "1.1");
    assert_eq!(query_version(dir.path(), "app.duckdb", "orders"), None);
}

#[test]
fn test_update_uses_target_database() {
    let dir = project();
    let (_, stderr, code) = run_schemata(dir.path(), &["update", "-t", "ci"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert_eq!(
        query_version(dir.path(), "ci.duckdb", "users").as_deref(),
        Some("1.1")
    );
    assert_eq!(query_version(dir.path(), "app.duckdb", "users"), None);
}

#[test]
fn test_update_unknown_target_fails() {
    let dir = project();
    let (_, stderr, code) = run_schemata(dir.path(), &["update", "-t", "prod"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Target 'prod' not found"), "got: {stderr}");
}

#[test]
fn test_failed_step_exits_non_zero() {
    let dir = project();
    write(
        &dir.path().join("db/tables/users/1.0-1.1.sql"),
        "ALTER TABLE nowhere ADD COLUMN email VARCHAR;\n",
    );
    let (_, stderr, code) = run_schemata(dir.path(), &["update"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("users"), "got: {stderr}");
    assert_eq!(
        query_version(dir.path(), "app.duckdb", "users").as_deref(),
        Some("1.0")
    );
}

// ── Lock ────────────────────────────────────────────────────────────────

#[test]
fn test_held_lock_blocks_update_until_unlocked() {
    let dir = project();
    {
        let db = DuckDbBackend::from_path(&dir.path().join("app.duckdb")).unwrap();
        assert!(db
            .try_acquire_lock("schemata_lock", "schemata", "crashed-run")
            .unwrap());
    }

    let (_, stderr, code) = run_schemata(dir.path(), &["update"]);
    assert_eq!(code, 2);
    assert!(stderr.contains("crashed-run"), "got: {stderr}");

    let (stdout, stderr, code) = run_schemata(dir.path(), &["unlock"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("Released lock 'schemata' held by crashed-run"));

    let (stdout, _, code) = run_schemata(dir.path(), &["unlock"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("is not held"));

    let (_, stderr, code) = run_schemata(dir.path(), &["update"]);
    assert_eq!(code, 0, "stderr: {stderr}");
}

// ── Update rows ─────────────────────────────────────────────────────────

#[test]
fn test_update_rows_without_row_steps() {
    let dir = project();
    let (stdout, stderr, code) = run_schemata(dir.path(), &["update-rows"]);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("No rows needed updating."), "got:\n{stdout}");
}

#[test]
fn test_update_rows_unknown_hook_fails() {
    let dir = project();
    write(
        &dir.path().join("db/tables/people/schema.json"),
        r#"{"row_versions": [{"version": "2", "run": ["people.rs", "normalize"]}]}"#,
    );
    write(
        &dir.path().join("db/sql/people.sql"),
        "CREATE TABLE people (id INTEGER, row_version VARCHAR);\n\
         INSERT INTO people VALUES (1, NULL);\n\
         INSERT INTO schemata_versions VALUES ('people', '1.0');\n",
    );

    let (_, stderr, code) = run_schemata(dir.path(), &["update-rows", "--tables", "people"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("people::normalize"), "got: {stderr}");
}
