// mediaforge-cli/src/main.rs
//
// Entry point: parses arguments, initializes logging, and dispatches to the
// subcommand handlers. All failures surface here as a red error line and a
// non-zero exit code.

mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Cli, Commands};
use console::style;
use std::process;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Transcode(args) => commands::transcode::run(args),
        Commands::Probe(args) => commands::probe::run(args),
    };

    if let Err(err) = result {
        eprintln!("{} {err}", style("Error:").red().bold());
        process::exit(1);
    }
}
