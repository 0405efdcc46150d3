//! Hook registry.
//!
//! Definitions name their pre/post hooks and row transforms; the application
//! registers a closure for each name before the sweep starts. A `[file,
//! function]` reference in a definition resolves to the key
//! `"<file stem>::<function>"`.

use crate::error::{EngineError, EngineResult};
use schemata_core::{HookSpec, TableName, Version};
use schemata_db::{Database, Row};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Error returned by a hook.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by hooks.
pub type HookResult<T> = Result<T, HookError>;

/// Pre/post hook around a structural step or a replacement.
pub type TableHookFn = Box<dyn Fn(&HookContext<'_>, &Value) -> HookResult<()>>;

/// Fetches candidate rows for a row migration.
pub type RowFetchFn = Box<dyn Fn(&RowContext<'_>, &Value) -> HookResult<Vec<Row>>>;

/// Transforms outdated rows, returning the identifiers it updated.
pub type RowApplyFn = Box<dyn Fn(&RowContext<'_>, &[Row], &Value) -> HookResult<Vec<String>>>;

/// Name of the built-in SQL hook.
pub const EXECUTE_SQL: &str = "execute_sql";

/// What a table hook sees.
pub struct HookContext<'a> {
    /// Table being migrated
    pub table: &'a TableName,
    /// Version before the step
    pub current: &'a Version,
    /// Version the step moves to
    pub target: &'a Version,
    /// Table being replaced, for replacement hooks
    pub replaced: Option<&'a TableName>,
    /// Directory holding the table definition
    pub table_dir: &'a Path,
    /// Shared database handle
    pub db: &'a dyn Database,
}

/// What row hooks see.
pub struct RowContext<'a> {
    pub table: &'a TableName,
    /// Row version the step migrates to
    pub version: &'a Version,
    /// Column holding each row's version
    pub column: &'a str,
    pub table_dir: &'a Path,
    pub db: &'a dyn Database,
}

/// Named hook functions available to table definitions.
#[derive(Default)]
pub struct HookRegistry {
    table_hooks: HashMap<String, TableHookFn>,
    fetch_hooks: HashMap<String, RowFetchFn>,
    apply_hooks: HashMap<String, RowApplyFn>,
}

impl HookRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `execute_sql` table hook.
    pub fn with_builtins() -> Self {
        let mut hooks = Self::new();
        hooks.register_table_hook(EXECUTE_SQL, execute_sql);
        hooks
    }

    /// Register a pre/post hook, replacing any hook with the same name.
    pub fn register_table_hook<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn(&HookContext<'_>, &Value) -> HookResult<()> + 'static,
    {
        self.table_hooks.insert(name.into(), Box::new(hook));
        self
    }

    /// Register a row fetch hook.
    pub fn register_row_fetch<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn(&RowContext<'_>, &Value) -> HookResult<Vec<Row>> + 'static,
    {
        self.fetch_hooks.insert(name.into(), Box::new(hook));
        self
    }

    /// Register a row transform hook.
    pub fn register_row_apply<F>(&mut self, name: impl Into<String>, hook: F) -> &mut Self
    where
        F: Fn(&RowContext<'_>, &[Row], &Value) -> HookResult<Vec<String>> + 'static,
    {
        self.apply_hooks.insert(name.into(), Box::new(hook));
        self
    }

    /// Whether any kind of hook is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.table_hooks.contains_key(name)
            || self.fetch_hooks.contains_key(name)
            || self.apply_hooks.contains_key(name)
    }

    pub(crate) fn run_table_hook(&self, spec: &HookSpec, ctx: &HookContext<'_>) -> EngineResult<()> {
        let hook = self
            .table_hooks
            .get(spec.name.as_str())
            .ok_or_else(|| unknown(ctx.table, "table", spec))?;
        log::debug!("Running hook '{}' for table '{}'", spec.name, ctx.table);
        hook(ctx, &spec.params).map_err(|source| hook_failed(ctx.table, spec, source))
    }

    pub(crate) fn fetch_rows(&self, spec: &HookSpec, ctx: &RowContext<'_>) -> EngineResult<Vec<Row>> {
        let hook = self
            .fetch_hooks
            .get(spec.name.as_str())
            .ok_or_else(|| unknown(ctx.table, "row fetch", spec))?;
        hook(ctx, &spec.params).map_err(|source| hook_failed(ctx.table, spec, source))
    }

    pub(crate) fn apply_rows(
        &self,
        spec: &HookSpec,
        ctx: &RowContext<'_>,
        rows: &[Row],
    ) -> EngineResult<Vec<String>> {
        let hook = self
            .apply_hooks
            .get(spec.name.as_str())
            .ok_or_else(|| unknown(ctx.table, "row transform", spec))?;
        log::debug!(
            "Running row transform '{}' on {} row(s) of '{}'",
            spec.name,
            rows.len(),
            ctx.table
        );
        hook(ctx, rows, &spec.params).map_err(|source| hook_failed(ctx.table, spec, source))
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("table_hooks", &sorted_keys(&self.table_hooks))
            .field("fetch_hooks", &sorted_keys(&self.fetch_hooks))
            .field("apply_hooks", &sorted_keys(&self.apply_hooks))
            .finish()
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut names: Vec<&str> = map.keys().map(String::as_str).collect();
    names.sort_unstable();
    names
}

fn unknown(table: &TableName, kind: &'static str, spec: &HookSpec) -> EngineError {
    EngineError::UnknownHook {
        table: table.to_string(),
        kind,
        hook: spec.name.to_string(),
    }
}

fn hook_failed(table: &TableName, spec: &HookSpec, source: HookError) -> EngineError {
    EngineError::Hook {
        table: table.to_string(),
        hook: spec.name.to_string(),
        source,
    }
}

/// Built-in hook: run `params.sql` inline, or the script at `params.file`
/// (relative to the table directory).
fn execute_sql(ctx: &HookContext<'_>, params: &Value) -> HookResult<()> {
    if let Some(sql) = params.get("sql").and_then(Value::as_str) {
        ctx.db.execute_batch(sql)?;
        return Ok(());
    }
    if let Some(file) = params.get("file").and_then(Value::as_str) {
        let output = ctx.db.source(&ctx.table_dir.join(file))?;
        log::debug!("{output}");
        return Ok(());
    }
    Err(format!("{EXECUTE_SQL} needs a 'sql' or 'file' parameter").into())
}

#[cfg(test)]
#[path = "hooks_test.rs"]
mod tests;
