//! Row-level data migrations.
//!
//! Each row carries its own version in the table's row-version column. A row
//! step fetches candidate rows, keeps those whose version is older than the
//! step (a NULL version counts as missing), and hands them to its transform,
//! which reports the identifiers it updated.

use super::TableSchema;
use crate::error::{EngineError, EngineResult};
use crate::hooks::RowContext;
use crate::registry::SchemaRegistry;
use schemata_core::{RowStepDef, Version};
use schemata_db::{with_transaction, Row};
use serde_json::Value;

impl TableSchema {
    /// Run the table's row migrations, returning every row identifier updated.
    ///
    /// Runs at most once per sweep; later calls return the same identifiers.
    pub fn update_rows(&self, registry: &SchemaRegistry) -> EngineResult<Vec<String>> {
        {
            let state = self.state.borrow();
            if state.rows_attempted {
                if state.rows_active || state.rows_succeeded {
                    return Ok(state.updated_rows.clone());
                }
                return Err(EngineError::PreviousFailure {
                    table: self.name.to_string(),
                });
            }
        }
        {
            let mut state = self.state.borrow_mut();
            state.rows_attempted = true;
            state.rows_active = true;
        }

        let result = self.run_row_steps(registry);

        let mut state = self.state.borrow_mut();
        state.rows_active = false;
        match result {
            Ok(()) => {
                state.rows_succeeded = true;
                Ok(state.updated_rows.clone())
            }
            Err(e) => {
                log::error!("Row migration of table '{}' failed: {e}", self.name);
                state.errors.push(e.to_string());
                Err(e)
            }
        }
    }

    fn run_row_steps(&self, registry: &SchemaRegistry) -> EngineResult<()> {
        if self.row_steps.is_empty() {
            return Ok(());
        }

        self.update(registry)?;
        if self.current().is_missing() {
            log::debug!("Table '{}' does not exist; no rows to migrate", self.name);
            return Ok(());
        }

        for step in &self.row_steps {
            for name in &step.requires {
                let dependency =
                    registry
                        .get_table(name)?
                        .ok_or_else(|| EngineError::MissingDependency {
                            table: self.name.to_string(),
                            dependency: name.to_string(),
                        })?;
                if dependency.state.borrow().rows_active {
                    return Err(EngineError::CircularDependency {
                        table: self.name.to_string(),
                        dependency: name.to_string(),
                    });
                }
                dependency.update(registry)?;
                dependency.update_rows(registry)?;
            }

            let ids = self.run_row_step(registry, step)?;
            if !ids.is_empty() {
                log::info!(
                    "Row migration {} updated {} row(s) of '{}'",
                    step.version,
                    ids.len(),
                    self.name
                );
            }
            let mut state = self.state.borrow_mut();
            for id in ids {
                if !state.updated_rows.contains(&id) {
                    state.updated_rows.push(id);
                }
            }
        }
        Ok(())
    }

    fn run_row_step(&self, registry: &SchemaRegistry, step: &RowStepDef) -> EngineResult<Vec<String>> {
        let db = registry.db();
        let ctx = RowContext {
            table: &self.name,
            version: &step.version,
            column: &self.vercolumn,
            table_dir: &self.table_dir,
            db,
        };

        let body = || -> EngineResult<Vec<String>> {
            let rows = match &step.fetch {
                Some(hook) => registry.hooks().fetch_rows(hook, &ctx)?,
                None => db.query_rows(&format!("SELECT * FROM {}", self.name))?,
            };
            let outdated = self.outdated_rows(step, rows)?;
            if outdated.is_empty() {
                log::debug!(
                    "No rows of '{}' older than {}",
                    self.name,
                    step.version
                );
                return Ok(Vec::new());
            }
            registry.hooks().apply_rows(&step.run, &ctx, &outdated)
        };

        if registry.options().transactional {
            with_transaction(db, body)
        } else {
            body()
        }
    }

    /// Rows whose version is older than the step, enforcing the row-version column.
    fn outdated_rows(&self, step: &RowStepDef, rows: Vec<Row>) -> EngineResult<Vec<Row>> {
        let contract = |reason: String| EngineError::RowContract {
            table: self.name.to_string(),
            step: step.version.to_string(),
            reason,
        };

        let mut outdated = Vec::new();
        for row in rows {
            let value = row.get(&self.vercolumn).ok_or_else(|| {
                contract(format!("fetched row has no '{}' column", self.vercolumn))
            })?;
            let version = row_version(value).map_err(contract)?;
            if version.is_older(&step.version) {
                outdated.push(row);
            }
        }
        Ok(outdated)
    }
}

fn row_version(value: &Value) -> Result<Version, String> {
    let parsed = match value {
        Value::Null => return Ok(Version::Missing),
        Value::String(s) => Version::parse(s),
        Value::Number(n) => match (n.as_u64(), n.as_f64()) {
            (Some(whole), _) => Version::parse(&whole.to_string()),
            (None, Some(float)) => Version::from_f64(float),
            (None, None) => return Err(format!("unsupported row version {n}")),
        },
        other => return Err(format!("unsupported row version {other}")),
    };
    parsed.map_err(|e| e.to_string())
}

#[cfg(test)]
#[path = "rows_test.rs"]
mod tests;
