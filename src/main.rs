// src/main.rs

use anyhow::Result;
use clap::Parser;
use find_prereqs::cli::Cli;
use find_prereqs::commands;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing subscriber for logging; stdout is reserved for the report
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level())),
        )
        .init();

    commands::run(&cli)
}
