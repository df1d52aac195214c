//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Lendloop CLI - run leverage loops against a simulated lending market
#[derive(Parser, Debug)]
#[command(name = "lendloop")]
#[command(about = "CLI tool for running leverage loops against a simulated lending market", long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Log market activity to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Seed a deposit and loop borrow + redeposit toward a target LTV
    #[command(name = "loop")]
    Loop(LoopArgs),
    /// List the markets of a scenario
    #[command(name = "markets")]
    Markets(MarketsArgs),
}

#[derive(Parser, Debug)]
pub struct LoopArgs {
    /// Scenario file (JSON)
    #[arg(long, env = "LENDLOOP_SCENARIO")]
    pub scenario: PathBuf,

    /// Market symbol to loop (e.g., DAI)
    #[arg(long)]
    pub asset: String,

    /// Initial deposit in human-readable units (e.g., "2000" or "100.5")
    #[arg(long)]
    pub deposit: String,

    /// Target loan-to-value in basis points
    #[arg(long, default_value = "5000")]
    pub target_ltv_bps: u64,

    /// Maximum number of borrow + redeposit steps
    #[arg(long, default_value = "10")]
    pub max_iterations: u32,

    /// Account to loop for (default: first account in the scenario)
    #[arg(long)]
    pub account: Option<String>,
}

#[derive(Parser, Debug)]
pub struct MarketsArgs {
    /// Scenario file (JSON)
    #[arg(long, env = "LENDLOOP_SCENARIO")]
    pub scenario: PathBuf,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}
