//! Markets command implementation.

use anyhow::{Context, Result};

use crate::cli::{MarketsArgs, OutputFormat};
use crate::commands::load_scenario;
use crate::output::{format_markets_json, format_markets_table, MarketRowData};

/// Execute the markets command.
pub fn run_markets(args: &MarketsArgs, format: OutputFormat) -> Result<()> {
    let config = load_scenario(&args.scenario)?;
    let scenario = config.build().context("Failed to build scenario")?;

    let mut rows = Vec::with_capacity(scenario.assets.len());
    for (symbol, asset) in &scenario.assets {
        let pool = scenario.market.pool(*asset)?;
        let listing = scenario.market.controller.listing(*asset)?;
        let price = scenario.market.controller.price_of(*asset)?;
        rows.push(MarketRowData {
            symbol: symbol.clone(),
            pool,
            listing,
            price,
        });
    }

    match format {
        OutputFormat::Json => {
            let json = format_markets_json(&rows);
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("No markets listed.");
            } else {
                println!("{}", format_markets_table(&rows));
            }
        }
    }

    Ok(())
}
