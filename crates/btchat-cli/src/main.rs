//! Operator CLI for the BTChat ledger
//!
//! Drives a journal-backed ledger from the command line for smoke tests and
//! inspection.

use anyhow::Result;
use btchat_cli::Cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose when set
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let output = btchat_cli::run(cli)?;
    println!("{output}");
    Ok(())
}
