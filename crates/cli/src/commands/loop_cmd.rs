//! Loop command implementation.

use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use lendloop_core::{parse_units, LeverageRequest};

use crate::cli::{LoopArgs, OutputFormat};
use crate::commands::load_scenario;
use crate::output::{format_loop_json, format_loop_summary, format_steps_table};

/// Execute the loop command.
pub fn run_loop(args: &LoopArgs, format: OutputFormat) -> Result<()> {
    let config = load_scenario(&args.scenario)?;

    let account = match &args.account {
        Some(account) => account
            .parse::<Address>()
            .with_context(|| format!("Invalid account address: {}", account))?,
        None => match config.accounts.first() {
            Some(account) => account.address,
            None => bail!("Scenario has no accounts; pass --account"),
        },
    };

    let mut scenario = config.build().context("Failed to build scenario")?;
    let asset = scenario.asset(&args.asset)?;
    let decimals = scenario.market.pool(asset)?.decimals;
    let deposit = parse_units(&args.deposit, decimals)
        .with_context(|| format!("Invalid deposit amount: {}", args.deposit))?;

    tracing::debug!(%account, %asset, %deposit, "running leverage loop");
    let request = LeverageRequest::new(asset, deposit, args.target_ltv_bps, args.max_iterations);
    let leverager = scenario.leverager;
    let report = leverager
        .loop_asset(&mut scenario.market, account, &request, scenario.timestamp)
        .with_context(|| format!("Leverage loop on {} failed", args.asset))?;

    match format {
        OutputFormat::Json => {
            let json = format_loop_json(&report, &args.asset, decimals);
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            println!("{}", format_loop_summary(&report, &args.asset, decimals));
            if !report.steps.is_empty() {
                println!("{}", format_steps_table(&report.steps, decimals));
            }
        }
    }

    Ok(())
}
