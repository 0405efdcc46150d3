//! Runtime context for CLI commands

use anyhow::{Context, Result};
use schemata_core::Config;
use schemata_db::{Database, DuckDbBackend};
use schemata_engine::{HookRegistry, RegistryOptions, SchemaRegistry};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::cli::GlobalArgs;

/// Runtime context containing the loaded config and database connection
pub struct RuntimeContext {
    /// The loaded configuration
    pub config: Config,

    /// Project root; relative sources and database paths resolve against it
    pub root: PathBuf,

    /// Database connection
    pub db: Rc<dyn Database>,

    /// Verbose output enabled
    pub verbose: bool,
}

impl RuntimeContext {
    /// Create a new runtime context from global arguments
    pub fn new(args: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&args.project_dir);

        // Load config from custom path or project directory
        let config = if let Some(config_path) = &args.config {
            Config::load(Path::new(config_path)).context("Failed to load configuration file")?
        } else {
            Config::load_from_dir(&root).context("Failed to load project configuration")?
        };

        let target = Config::resolve_target(args.target.as_deref());
        let db_config = config
            .get_database_config(target.as_deref())
            .context("Failed to get database configuration")?;
        let db_path = resolve_db_path(&root, &db_config.path);
        let db: Rc<dyn Database> =
            Rc::new(DuckDbBackend::new(&db_path).context("Failed to connect to database")?);

        let ctx = Self {
            config,
            root,
            db,
            verbose: args.verbose,
        };
        ctx.verbose(&format!(
            "Project '{}' (target: {}, database: {})",
            ctx.config.name,
            target.as_deref().unwrap_or("default"),
            db_path
        ));
        Ok(ctx)
    }

    /// Build a schema registry over the configured sources
    pub fn registry(&self) -> Result<SchemaRegistry> {
        let mut registry = SchemaRegistry::new(
            self.db.clone(),
            RegistryOptions::from_config(&self.config),
            HookRegistry::with_builtins(),
        )
        .context("Failed to open schema registry")?;

        for source in self.config.sources_absolute(&self.root) {
            self.verbose(&format!("Schema source: {}", source.display()));
            registry.add_source(source);
        }
        Ok(registry)
    }

    /// Print verbose output if enabled
    pub fn verbose(&self, msg: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", msg);
        }
    }
}

/// Resolve a configured DuckDB path against the project root.
fn resolve_db_path(root: &Path, path: &str) -> String {
    if path == ":memory:" || Path::new(path).is_absolute() {
        path.to_string()
    } else {
        root.join(path).display().to_string()
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
