//! Weft CLI - dependency resolution for Python monorepos

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use weft::resolver::{GraphError, RegistrationError};
use weft::util::diagnostic::emit;

mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::Session;

fn main() {
    // Parse CLI
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli, color) {
        report(&e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli, color: bool) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("weft=debug")
    } else {
        EnvFilter::new("weft=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let session = Session::new(cli.root, color);

    // Execute command
    match cli.command {
        Commands::Check(args) => commands::check::execute(args, &session),
        Commands::Deps(args) => commands::deps::execute(args, &session),
        Commands::Describe(args) => commands::describe::execute(args, &session),
        Commands::Targets(args) => commands::targets::execute(args, &session),
        Commands::ImportMap(args) => commands::import_map::execute(args, &session),
    }
}

/// Print pass errors as diagnostics, anything else as a plain chain.
fn report(err: &anyhow::Error, color: bool) {
    if let Some(e) = err.downcast_ref::<RegistrationError>() {
        emit(&e.to_diagnostic(), color);
    } else if let Some(e) = err.downcast_ref::<GraphError>() {
        emit(&e.to_diagnostic(), color);
    } else {
        eprintln!("error: {:#}", err);
    }
}
