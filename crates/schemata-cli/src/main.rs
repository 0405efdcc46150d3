//! Schemata CLI - apply versioned table and row migrations

use clap::Parser;

mod cli;
mod commands;
mod context;

use cli::Cli;
use commands::common::ExitCode;
use commands::{status, unlock, update, update_rows};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = match &cli.command {
        cli::Commands::Status(args) => status::execute(args, &cli.global),
        cli::Commands::Update(args) => update::execute(args, &cli.global),
        cli::Commands::UpdateRows(args) => update_rows::execute(args, &cli.global),
        cli::Commands::Unlock => unlock::execute(&cli.global),
    };

    if let Err(err) = result {
        if let Some(code) = err.downcast_ref::<ExitCode>() {
            std::process::exit(code.0);
        }
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

/// Install env_logger; `--verbose` lowers the default filter, `RUST_LOG` wins.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}
