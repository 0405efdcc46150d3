//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Schemata - versioned table and row migrations for DuckDB
#[derive(Parser, Debug)]
#[command(name = "schemata")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override target (database connection)
    #[arg(short, long, global = true)]
    pub target: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show every table with its current and latest version
    Status(StatusArgs),

    /// Bring tables up to their latest structural version
    Update(UpdateArgs),

    /// Run row migrations on outdated rows
    ///
    /// This binary registers only the built-in `execute_sql` hook. Row steps
    /// name a `run` transform, so tables with `row_versions` need a program
    /// that registers their hooks with `HookRegistry` and drives
    /// `SchemaRegistry::update_all_rows` itself.
    UpdateRows(UpdateArgs),

    /// Force-release a stale migration lock
    Unlock,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only show tables carrying these tags (comma-separated)
    #[arg(long)]
    pub tags: Option<String>,

    /// Require every listed tag instead of any of them
    #[arg(long)]
    pub all_tags: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Arguments shared by the update and update-rows commands
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Table names to update (comma-separated, default: all)
    #[arg(long)]
    pub tables: Option<String>,

    /// Only update tables carrying these tags (comma-separated)
    #[arg(long)]
    pub tags: Option<String>,

    /// Require every listed tag instead of any of them
    #[arg(long)]
    pub all_tags: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
