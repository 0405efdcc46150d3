//! Replacement of an older, differently named table.

use super::TableSchema;
use crate::error::{EngineError, EngineResult};
use crate::hooks::HookContext;
use crate::registry::SchemaRegistry;
use schemata_core::ScriptSpec;
use schemata_db::with_transaction;
use std::path::PathBuf;
use std::rc::Rc;

impl TableSchema {
    /// The table to replace, when this table is missing and the old one exists.
    pub(super) fn replacement_target(
        &self,
        registry: &SchemaRegistry,
    ) -> EngineResult<Option<Rc<TableSchema>>> {
        let Some(old_name) = self.replaces() else {
            return Ok(None);
        };
        if !self.current().is_missing() || !registry.table_exists(old_name)? {
            return Ok(None);
        }
        let old = registry
            .get_table(old_name)?
            .ok_or_else(|| EngineError::MissingDependency {
                table: self.name.to_string(),
                dependency: old_name.to_string(),
            })?;
        Ok(Some(old))
    }

    /// Migrate `old` to its latest version, run the replacement, then catch up
    /// with any remaining steps.
    pub(super) fn replace(&self, registry: &SchemaRegistry, old: &TableSchema) -> EngineResult<()> {
        old.update(registry)?;

        let script = self.replacement_script(registry, old)?;
        let current = self.current();
        log::info!("Replacing table '{}' with '{}'", old.name, self.name);

        let db = registry.db();
        let ctx = HookContext {
            table: &self.name,
            current: &current,
            target: &self.latest,
            replaced: Some(&old.name),
            table_dir: &self.table_dir,
            db,
        };
        let body = || -> EngineResult<()> {
            if let Some(hook) = &self.definition.replacement_pre_run {
                registry.hooks().run_table_hook(hook, &ctx)?;
            }
            if let Some(path) = &script {
                let output = db.source(path)?;
                log::debug!("{output}");
            }
            if let Some(hook) = &self.definition.replacement_post_run {
                registry.hooks().run_table_hook(hook, &ctx)?;
            }
            Ok(())
        };
        if self.wraps_in_transaction(registry, script.as_deref())? {
            with_transaction(db, body)?;
        } else {
            body()?;
        }

        old.refresh(registry)?;
        if old.exists() {
            return Err(EngineError::ReplacementIncomplete {
                table: self.name.to_string(),
                old: old.name.to_string(),
            });
        }
        self.refresh(registry)?;

        if self.needs_update() {
            self.apply_steps(registry)?;
        }
        Ok(())
    }

    /// `replacement_sql`, or `replace_<old>.<ext>` in the table directory.
    fn replacement_script(
        &self,
        registry: &SchemaRegistry,
        old: &TableSchema,
    ) -> EngineResult<Option<PathBuf>> {
        let extension = &registry.options().layout.script_extension;
        match &self.definition.replacement_sql {
            ScriptSpec::Skip => Ok(None),
            ScriptSpec::Path(relative) => {
                let path = self.table_dir.join(relative);
                if path.is_file() {
                    Ok(Some(path))
                } else {
                    Err(EngineError::ScriptNotFound {
                        table: self.name.to_string(),
                        path: path.display().to_string(),
                    })
                }
            }
            ScriptSpec::Default => {
                let path = self
                    .table_dir
                    .join(format!("replace_{}.{extension}", old.name));
                if path.is_file() {
                    Ok(Some(path))
                } else {
                    log::debug!("No replacement script at {}", path.display());
                    Ok(None)
                }
            }
        }
    }
}
