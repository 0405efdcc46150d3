use super::*;

fn t(name: &str) -> TableName {
    TableName::try_new(name).unwrap()
}

fn deps(edges: &[(&str, Vec<&str>)]) -> HashMap<TableName, Vec<TableName>> {
    edges
        .iter()
        .map(|(name, deps)| (t(name), deps.iter().map(|d| t(d)).collect()))
        .collect()
}

#[test]
fn test_build_dag() {
    let dag = TableDag::build(&deps(&[
        ("users", vec![]),
        ("orders", vec!["users", "products"]),
        ("products", vec![]),
    ]))
    .unwrap();
    let order = dag.topological_order().unwrap();

    let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert!(pos("orders") > pos("users"));
    assert!(pos("orders") > pos("products"));
}

#[test]
fn test_circular_dependency() {
    let result = TableDag::build(&deps(&[("a", vec!["b"]), ("b", vec!["c"]), ("c", vec!["a"])]));
    match result {
        Err(CoreError::CircularDependency { cycle }) => {
            let names: Vec<&str> = cycle.split(" -> ").collect();
            assert_eq!(names.first(), names.last());
            assert_eq!(names.len(), 4);
        }
        other => panic!("expected circular dependency, got {other:?}"),
    }
}

#[test]
fn test_self_cycle_via_two_nodes() {
    let result = TableDag::build(&deps(&[("a", vec!["b"]), ("b", vec!["a"])]));
    assert!(matches!(result, Err(CoreError::CircularDependency { .. })));
}

#[test]
fn test_undefined_dependency_ignored() {
    let dag = TableDag::build(&deps(&[("orders", vec!["ghost"])])).unwrap();
    assert!(!dag.contains("ghost"));
    assert!(dag.dependencies("orders").is_empty());
}

#[test]
fn test_dependencies_and_dependents() {
    let dag = TableDag::build(&deps(&[
        ("users", vec![]),
        ("orders", vec!["users"]),
        ("invoices", vec!["users", "orders"]),
    ]))
    .unwrap();

    assert_eq!(dag.dependencies("invoices"), vec![t("orders"), t("users")]);
    assert_eq!(dag.dependents("users"), vec![t("invoices"), t("orders")]);
    assert!(dag.dependents("invoices").is_empty());
    assert_eq!(dag.len(), 3);
}

#[test]
fn test_duplicate_edges_collapsed() {
    let mut dag = TableDag::new();
    dag.add_dependency(&t("orders"), &t("users"));
    dag.add_dependency(&t("orders"), &t("users"));
    assert_eq!(dag.dependencies("orders"), vec![t("users")]);
}

#[test]
fn test_empty_dag() {
    let dag = TableDag::new();
    assert!(dag.is_empty());
    assert!(dag.topological_order().unwrap().is_empty());
}
