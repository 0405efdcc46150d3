//! Table dependency graph and cycle detection

use crate::error::{CoreError, CoreResult};
use crate::table_name::TableName;
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};

/// A directed acyclic graph of table dependencies.
///
/// Edges run from a dependency to its dependent, so a topological order lists
/// every table after the tables it needs.
#[derive(Debug, Default)]
pub struct TableDag {
    graph: DiGraph<TableName, ()>,
    node_map: HashMap<TableName, NodeIndex>,
}

impl TableDag {
    /// Create a new empty DAG
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table to the DAG, returning its node
    pub fn add_table(&mut self, name: &TableName) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.clone());
        self.node_map.insert(name.clone(), idx);
        idx
    }

    /// Record that `table` depends on `dependency`
    pub fn add_dependency(&mut self, table: &TableName, dependency: &TableName) {
        let table_idx = self.add_table(table);
        let dep_idx = self.add_table(dependency);
        if !self.graph.contains_edge(dep_idx, table_idx) {
            self.graph.add_edge(dep_idx, table_idx, ());
        }
    }

    /// Build the DAG from a map of table name -> dependencies.
    ///
    /// Dependencies that are not themselves keys of the map are ignored; the
    /// registry reports undefined hard dependencies on its own.
    pub fn build(dependencies: &HashMap<TableName, Vec<TableName>>) -> CoreResult<Self> {
        let mut dag = Self::new();

        let mut names: Vec<&TableName> = dependencies.keys().collect();
        names.sort();
        for name in &names {
            dag.add_table(name);
        }

        for name in names {
            for dep in &dependencies[name] {
                if dependencies.contains_key(dep) {
                    dag.add_dependency(name, dep);
                }
            }
        }

        dag.validate()?;
        Ok(dag)
    }

    /// Validate the DAG has no cycles
    pub fn validate(&self) -> CoreResult<()> {
        self.topological_order().map(|_| ())
    }

    /// Tables in dependency order (dependencies first)
    pub fn topological_order(&self) -> CoreResult<Vec<TableName>> {
        match toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .into_iter()
                .map(|idx| self.graph[idx].clone())
                .collect()),
            Err(cycle) => Err(CoreError::CircularDependency {
                cycle: self.find_cycle_path(cycle.node_id()),
            }),
        }
    }

    /// Describe a cycle through the strongly connected component containing `start`.
    fn find_cycle_path(&self, start: NodeIndex) -> String {
        let component: HashSet<NodeIndex> = tarjan_scc(&self.graph)
            .into_iter()
            .find(|scc| scc.contains(&start))
            .map(|scc| scc.into_iter().collect())
            .unwrap_or_default();

        let mut path = vec![start];
        let mut current = start;
        loop {
            let next = self
                .graph
                .edges(current)
                .map(|e| e.target())
                .filter(|t| component.contains(t))
                .min_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
            let Some(next) = next else {
                break;
            };
            if let Some(pos) = path.iter().position(|&n| n == next) {
                path.drain(..pos);
                path.push(next);
                break;
            }
            path.push(next);
            current = next;
        }

        path.iter()
            .map(|&idx| self.graph[idx].as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    /// Direct dependencies of a table
    pub fn dependencies(&self, table: &str) -> Vec<TableName> {
        self.neighbors(table, petgraph::Direction::Incoming)
    }

    /// Direct dependents of a table
    pub fn dependents(&self, table: &str) -> Vec<TableName> {
        self.neighbors(table, petgraph::Direction::Outgoing)
    }

    fn neighbors(&self, table: &str, direction: petgraph::Direction) -> Vec<TableName> {
        let Some(&idx) = self.node_map.get(table) else {
            return Vec::new();
        };
        let mut names: Vec<TableName> = self
            .graph
            .neighbors_directed(idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        names.sort();
        names
    }

    /// Check if a table exists in the DAG
    pub fn contains(&self, table: &str) -> bool {
        self.node_map.contains_key(table)
    }

    /// Number of tables in the DAG
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Whether the DAG has no tables
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
