//! Shared utilities for CLI commands

use schemata_core::Version;
use schemata_engine::{ListOptions, TagMatch};
use std::fmt;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that RAII destructors run and the migration lock is released.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; main.rs exits without printing it.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Split a comma-separated argument into trimmed, non-empty values.
pub(crate) fn parse_csv(arg: Option<&str>) -> Vec<String> {
    arg.map(|value| {
        value
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Build registry list options from the shared filter flags.
pub(crate) fn list_options(tables: Option<&str>, tags: Option<&str>, all_tags: bool) -> ListOptions {
    ListOptions {
        tags: parse_csv(tags),
        tag_match: if all_tags { TagMatch::All } else { TagMatch::Any },
        tables: parse_csv(tables),
    }
}

/// Version as shown to users; a missing version becomes `-`.
pub(crate) fn display_version(version: &Version) -> String {
    version.as_str().unwrap_or("-").to_string()
}

/// Version for JSON output; a missing version becomes `null`.
pub(crate) fn json_version(version: &Version) -> Option<String> {
    version.as_str().map(String::from)
}

/// Current time for JSON report headers.
pub(crate) fn generated_at() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ---------------------------------------------------------------------------
// Table-printing utilities
// ---------------------------------------------------------------------------

/// Calculate column widths for a table given headers and row data.
///
/// For each column, returns the maximum width across the header and all
/// row values so that data aligns when printed with left-padding.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }
    widths
}

/// Print a formatted table to stdout.
///
/// Prints a left-aligned header row, a separator line of dashes, and each
/// data row. Columns are separated by two spaces.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);

    let header_parts: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{:<width$}", h, width = w))
        .collect();
    println!("{}", header_parts.join("  ").trim_end());

    let sep_parts: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep_parts.join("  "));

    for row in rows {
        let row_parts: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", row_parts.join("  ").trim_end());
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
