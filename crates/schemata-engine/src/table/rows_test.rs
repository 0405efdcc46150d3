use super::*;
use crate::hooks::HookRegistry;
use crate::test_utils::*;
use serde_json::json;

#[test]
fn test_row_version_values() {
    assert!(row_version(&Value::Null).unwrap().is_missing());
    assert_eq!(row_version(&json!("1.1")).unwrap().as_str(), Some("1.1"));
    assert_eq!(row_version(&json!(2)).unwrap().as_str(), Some("2.0"));
    assert_eq!(row_version(&json!(1.5)).unwrap().as_str(), Some("1.5"));
    assert!(row_version(&json!(true)).is_err());
    assert!(row_version(&json!("")).is_err());
}

#[test]
fn test_outdated_rows_filters_by_version() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(
        dir.path(),
        "people",
        json!({"row_versions": [{"version": "2", "run": "noop"}]}),
    );
    let registry = registry(metadata_db(), dir.path(), HookRegistry::new());
    let people = registry.get_table("people").unwrap().unwrap();
    let step = people.row_steps()[0].clone();

    let rows: Vec<Row> = vec![
        json!({"id": 1, "row_version": "1.0"}),
        json!({"id": 2, "row_version": "2.0"}),
        json!({"id": 3, "row_version": null}),
        json!({"id": 4, "row_version": "2.1"}),
    ]
    .into_iter()
    .map(|v| v.as_object().unwrap().clone())
    .collect();

    let outdated = people.outdated_rows(&step, rows).unwrap();
    let ids: Vec<i64> = outdated.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn test_outdated_rows_requires_version_column() {
    let dir = tempfile::tempdir().unwrap();
    write_definition(
        dir.path(),
        "people",
        json!({"vercolumn": "rv", "row_versions": [{"version": "2", "run": "noop"}]}),
    );
    let registry = registry(metadata_db(), dir.path(), HookRegistry::new());
    let people = registry.get_table("people").unwrap().unwrap();
    let step = people.row_steps()[0].clone();

    let rows = vec![json!({"id": 1, "row_version": "1.0"})
        .as_object()
        .unwrap()
        .clone()];
    let err = people.outdated_rows(&step, rows).unwrap_err();
    assert!(matches!(err, EngineError::RowContract { .. }));
    assert!(err.to_string().contains("'rv'"));
}
