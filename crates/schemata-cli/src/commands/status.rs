//! Status command implementation

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::{GlobalArgs, OutputFormat, StatusArgs};
use crate::commands::common::{generated_at, json_version, list_options, print_table};
use crate::context::RuntimeContext;

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let registry = ctx.registry()?;

    let options = list_options(None, args.tags.as_deref(), args.all_tags);
    let tables = registry
        .list_tables(&options)
        .context("Failed to list tables")?;
    ctx.verbose(&format!("Found {} tables", tables.len()));

    let statuses: Vec<TableStatus> = tables
        .iter()
        .map(|table| TableStatus {
            name: table.name().to_string(),
            current: json_version(&table.current()),
            latest: json_version(table.latest()),
            state: table.state().to_string(),
            tags: table.tags().to_vec(),
            depends_on: table
                .hard_dependencies()
                .iter()
                .cloned()
                .chain(table.soft_dependencies())
                .map(|d| d.to_string())
                .collect(),
        })
        .collect();

    match args.output {
        OutputFormat::Table => print_status_table(&statuses),
        OutputFormat::Json => {
            let report = StatusReport {
                generated_at: generated_at(),
                tables: statuses,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct StatusReport {
    generated_at: String,
    tables: Vec<TableStatus>,
}

/// Table information for display
#[derive(Debug, Serialize)]
struct TableStatus {
    name: String,
    current: Option<String>,
    latest: Option<String>,
    state: String,
    tags: Vec<String>,
    depends_on: Vec<String>,
}

fn print_status_table(statuses: &[TableStatus]) {
    if statuses.is_empty() {
        println!("No tables found.");
        return;
    }

    let rows: Vec<Vec<String>> = statuses
        .iter()
        .map(|s| {
            vec![
                s.name.clone(),
                s.current.clone().unwrap_or_else(|| "-".to_string()),
                s.latest.clone().unwrap_or_else(|| "-".to_string()),
                s.state.clone(),
                if s.tags.is_empty() {
                    "-".to_string()
                } else {
                    s.tags.join(",")
                },
            ]
        })
        .collect();
    print_table(&["NAME", "CURRENT", "LATEST", "STATE", "TAGS"], &rows);

    let pending = statuses
        .iter()
        .filter(|s| s.state == "needs-update")
        .count();
    println!();
    println!("{} tables, {} need updating", statuses.len(), pending);
}
