//! epibuild CLI - declarative download, sync, and build of EPICS module trees

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("epibuild=debug")
    } else {
        EnvFilter::new("epibuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    match &cli.command {
        Commands::Parse(args) => commands::parse::execute(&cli, args),
        Commands::Download(args) => commands::download::execute(&cli, args),
        Commands::Sync(args) => commands::sync::execute(&cli, args),
        Commands::Patch(args) => commands::patch::execute(&cli, args),
        Commands::Build(args) => commands::build::execute(&cli, args),
        Commands::Inspect(args) => commands::inspect::execute(&cli, args),
        Commands::Requirements(args) => commands::requirements::execute(&cli, args),
        Commands::ReleaseSite(args) => commands::release_site::execute(&cli, args),
        Commands::Please(args) => commands::please::execute(&cli, args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
