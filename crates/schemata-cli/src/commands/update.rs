//! Update command implementation

use anyhow::Result;
use schemata_engine::{EngineError, ListOptions, SchemaRegistry, TableState};
use serde::Serialize;

use crate::cli::{GlobalArgs, OutputFormat, UpdateArgs};
use crate::commands::common::{
    display_version, generated_at, json_version, list_options, print_table, ExitCode,
};
use crate::context::RuntimeContext;

/// Execute the update command
pub(crate) fn execute(args: &UpdateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let registry = ctx.registry()?;
    let options = list_options(args.tables.as_deref(), args.tags.as_deref(), args.all_tags);

    let reports = match registry.update_all_tables(&options) {
        Ok(reports) => reports,
        Err(err) => return Err(report_failure(&registry, &options, &err)),
    };
    ctx.verbose(&format!("{} tables changed", reports.len()));

    match args.output {
        OutputFormat::Table => {
            if reports.is_empty() {
                println!("All tables are up to date.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = reports
                .iter()
                .map(|r| {
                    vec![
                        r.name.to_string(),
                        display_version(&r.from),
                        display_version(&r.to),
                    ]
                })
                .collect();
            print_table(&["NAME", "FROM", "TO"], &rows);
            println!();
            println!("Updated {} tables", reports.len());
        }
        OutputFormat::Json => {
            let report = UpdateReport {
                generated_at: generated_at(),
                updated: reports
                    .iter()
                    .map(|r| UpdatedTable {
                        name: r.name.to_string(),
                        from: json_version(&r.from),
                        to: json_version(&r.to),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct UpdateReport {
    generated_at: String,
    updated: Vec<UpdatedTable>,
}

#[derive(Debug, Serialize)]
struct UpdatedTable {
    name: String,
    from: Option<String>,
    to: Option<String>,
}

/// Print a failed sweep and pick the exit code: 2 when another run holds the
/// lock, 1 otherwise.
pub(crate) fn report_failure(
    registry: &SchemaRegistry,
    options: &ListOptions,
    err: &EngineError,
) -> anyhow::Error {
    eprintln!("Error: {err}");

    if let EngineError::LockHeld { .. } = err {
        return ExitCode(2).into();
    }

    if let Ok(tables) = registry.list_tables(options) {
        for table in tables
            .iter()
            .filter(|t| t.state() == TableState::UpdateFailed)
        {
            for message in table.errors() {
                eprintln!("  {}: {}", table.name(), message);
            }
        }
    }
    ExitCode(1).into()
}
