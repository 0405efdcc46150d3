//! Structural step application.

use super::TableSchema;
use crate::error::{EngineError, EngineResult};
use crate::hooks::HookContext;
use crate::registry::SchemaRegistry;
use schemata_core::{Requirement, ScriptSpec, StepDef, Version};
use schemata_db::{script_manages_transaction, with_transaction};
use std::path::{Path, PathBuf};

impl TableSchema {
    /// Apply every step newer than the current version, in ascending order.
    pub(super) fn apply_steps(&self, registry: &SchemaRegistry) -> EngineResult<()> {
        for step in &self.steps {
            if !step.version.is_newer(&self.current()) {
                continue;
            }
            self.resolve_requirements(registry, step)?;

            // Requirements may have run other tables' hooks; re-check.
            let current = self.current();
            if !step.version.is_newer(&current) {
                continue;
            }

            let script = self.step_script(registry, step, &current)?;
            log::info!(
                "Applying step {} -> {} to table '{}'",
                current,
                step.version,
                self.name
            );
            self.run_step(registry, step, &current, script)?;

            self.refresh(registry)?;
            let recorded = self.current();
            if recorded.is_older(&step.version) {
                return Err(EngineError::VersionNotRecorded {
                    table: self.name.to_string(),
                    step: step.version.to_string(),
                    recorded: recorded.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Update every table a step requires, on demand.
    fn resolve_requirements(&self, registry: &SchemaRegistry, step: &StepDef) -> EngineResult<()> {
        for (name, requirement) in &step.requires {
            let dependency =
                registry
                    .get_table(name)?
                    .ok_or_else(|| EngineError::MissingDependency {
                        table: self.name.to_string(),
                        dependency: name.to_string(),
                    })?;
            if requirement.is_satisfied_by(&dependency.current()) {
                continue;
            }
            if dependency.is_active() {
                return Err(EngineError::CircularDependency {
                    table: self.name.to_string(),
                    dependency: name.to_string(),
                });
            }

            log::debug!(
                "Step {} of '{}' requires '{}'; updating it first",
                step.version,
                self.name,
                name
            );
            dependency.update(registry)?;

            let actual = dependency.current();
            if !requirement.is_satisfied_by(&actual) {
                return Err(EngineError::UnsatisfiedDependency {
                    table: self.name.to_string(),
                    dependency: name.to_string(),
                    required: describe(requirement),
                    actual: actual.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Script a step runs, if any.
    ///
    /// An explicit `sql_file` must exist. Convention-named scripts are optional:
    /// the initial creation script when the table is missing, otherwise
    /// `<from>-<to>.<ext>` in the table directory.
    pub(super) fn step_script(
        &self,
        registry: &SchemaRegistry,
        step: &StepDef,
        current: &Version,
    ) -> EngineResult<Option<PathBuf>> {
        let layout = &registry.options().layout;
        let path = match (&step.sql_file, current.as_str()) {
            (ScriptSpec::Skip, _) => return Ok(None),
            (ScriptSpec::Path(relative), _) => {
                let path = self.table_dir.join(relative);
                if !path.is_file() {
                    return Err(EngineError::ScriptNotFound {
                        table: self.name.to_string(),
                        path: path.display().to_string(),
                    });
                }
                return Ok(Some(path));
            }
            (ScriptSpec::Default, None) => self.source.creation_script(layout, &self.name),
            (ScriptSpec::Default, Some(from)) => self.table_dir.join(format!(
                "{from}-{}.{}",
                step.version,
                layout.script_extension
            )),
        };

        if path.is_file() {
            Ok(Some(path))
        } else {
            log::debug!(
                "No script at {} for step {} of '{}'",
                path.display(),
                step.version,
                self.name
            );
            Ok(None)
        }
    }

    /// Pre-hook, script and post-hook of one step, in one transaction when enabled.
    fn run_step(
        &self,
        registry: &SchemaRegistry,
        step: &StepDef,
        current: &Version,
        script: Option<PathBuf>,
    ) -> EngineResult<()> {
        let db = registry.db();
        let ctx = HookContext {
            table: &self.name,
            current,
            target: &step.version,
            replaced: None,
            table_dir: &self.table_dir,
            db,
        };

        let body = || -> EngineResult<()> {
            if let Some(hook) = &step.pre_run {
                registry.hooks().run_table_hook(hook, &ctx)?;
            }
            if let Some(path) = &script {
                let output = db.source(path)?;
                log::debug!("{output}");
            }
            if let Some(hook) = &step.post_run {
                registry.hooks().run_table_hook(hook, &ctx)?;
            }
            Ok(())
        };

        if self.wraps_in_transaction(registry, script.as_deref())? {
            with_transaction(db, body)
        } else {
            body()
        }
    }

    /// Whether a step running `script` gets a surrounding transaction.
    ///
    /// Scripts with their own `BEGIN`/`COMMIT` run unwrapped.
    pub(super) fn wraps_in_transaction(
        &self,
        registry: &SchemaRegistry,
        script: Option<&Path>,
    ) -> EngineResult<bool> {
        if !registry.options().transactional {
            return Ok(false);
        }
        match script {
            Some(path) if script_manages_transaction(path)? => {
                log::debug!(
                    "{} manages its own transaction; running '{}' unwrapped",
                    path.display(),
                    self.name
                );
                Ok(false)
            }
            _ => Ok(true),
        }
    }
}

fn describe(requirement: &Requirement) -> String {
    match requirement {
        Requirement::Exists => "any version".to_string(),
        Requirement::AtLeast(version) => format!("{version} or newer"),
    }
}

#[cfg(test)]
#[path = "step_test.rs"]
mod tests;
