use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use habit_app::app::{run, AppConfig};
use habit_app::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries command output, logs go to stderr.
    let filter = EnvFilter::try_from_env("HABIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::from_env()?;
    run(cli.command, cli.json, config)
}
