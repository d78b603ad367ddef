use anyhow::Result;
use clap::Parser;
use gas_wrangler::cli::{Cli, Command};
use gas_wrangler::config::CONFIG;
use gas_wrangler::{run_load, run_normalize};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let summary = match cli.command {
        Command::Load { input, database } => run_load(&input, database.as_deref(), &CONFIG)?,
        Command::Normalize { input } => run_normalize(&input, &CONFIG)?,
    };
    log::info!(
        "done: {} messages, {} skipped lines, {} spans",
        summary.messages,
        summary.skipped_lines,
        summary.spans
    );
    Ok(())
}
