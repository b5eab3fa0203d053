//! CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cuprobe_cli::{Cli, Commands, bootstrap, handlers};

/// `RUST_LOG` wins; otherwise warnings only, or debug with `-v`.
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables before anything reads them
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let discovery = bootstrap(&cli)?;

    match &cli.command {
        Commands::Status => {
            if !handlers::status::execute(&discovery)? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Paths { json } => handlers::paths::execute(&discovery, *json)?,
        Commands::Compiler => handlers::compiler::execute(&discovery)?,
        Commands::Library { name } => handlers::library::execute(&discovery, name)?,
        Commands::Versions => handlers::versions::execute(&discovery)?,
    }

    Ok(ExitCode::SUCCESS)
}
