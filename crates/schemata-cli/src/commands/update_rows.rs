//! Update-rows command implementation

use anyhow::Result;
use serde::Serialize;

use crate::cli::{GlobalArgs, OutputFormat, UpdateArgs};
use crate::commands::common::{generated_at, list_options, print_table};
use crate::commands::update::report_failure;
use crate::context::RuntimeContext;

/// Execute the update-rows command
pub(crate) fn execute(args: &UpdateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let registry = ctx.registry()?;
    let options = list_options(args.tables.as_deref(), args.tags.as_deref(), args.all_tags);

    let reports = match registry.update_all_rows(&options) {
        Ok(reports) => reports,
        Err(err) => return Err(report_failure(&registry, &options, &err)),
    };

    match args.output {
        OutputFormat::Table => {
            if reports.is_empty() {
                println!("No rows needed updating.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = reports
                .iter()
                .map(|r| vec![r.name.to_string(), r.ids.len().to_string()])
                .collect();
            print_table(&["NAME", "ROWS"], &rows);
            for report in &reports {
                ctx.verbose(&format!("{}: {}", report.name, report.ids.join(", ")));
            }
        }
        OutputFormat::Json => {
            let report = RowUpdateReport {
                generated_at: generated_at(),
                updated: reports
                    .iter()
                    .map(|r| UpdatedRows {
                        name: r.name.to_string(),
                        ids: r.ids.clone(),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct RowUpdateReport {
    generated_at: String,
    updated: Vec<UpdatedRows>,
}

#[derive(Debug, Serialize)]
struct UpdatedRows {
    name: String,
    ids: Vec<String>,
}
