//! Lendloop CLI - run leverage loops against a simulated lending market.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::{run_loop, run_markets};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "lendloop_core=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Loop(args) => {
            run_loop(&args, cli.format)?;
        }
        Commands::Markets(args) => {
            run_markets(&args, cli.format)?;
        }
    }

    Ok(())
}
