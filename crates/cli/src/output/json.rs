//! JSON output with human-readable amounts.

use lendloop_core::{format_units, math::wad_to_bps, LoopReport};
use serde_json::{json, Value};

use super::table::MarketRowData;

pub fn format_loop_json(report: &LoopReport, symbol: &str, decimals: u8) -> Value {
    let steps: Vec<Value> = report
        .steps
        .iter()
        .map(|step| {
            json!({
                "iteration": step.iteration,
                "amount": format_units(step.amount, decimals),
                "shares_minted": format_units(step.shares_minted, decimals),
                "supply_value": format_units(step.supply_value, 18),
                "borrow_value": format_units(step.borrow_value, 18),
            })
        })
        .collect();

    json!({
        "account": report.account.to_string(),
        "asset": report.asset.to_string(),
        "symbol": symbol,
        "seeded": format_units(report.seeded, decimals),
        "iterations": report.iterations,
        "termination": report.termination.to_string(),
        "total_borrowed": format_units(report.total_borrowed, decimals),
        "total_redeposited": format_units(report.total_redeposited, decimals),
        "final_supply": format_units(report.final_supply, decimals),
        "final_borrow": format_units(report.final_borrow, decimals),
        "final_ltv_bps": report.final_ltv_bps(),
        "steps": steps,
    })
}

pub fn format_markets_json(markets: &[MarketRowData<'_>]) -> Value {
    let markets: Vec<Value> = markets
        .iter()
        .map(|m| {
            json!({
                "symbol": m.symbol,
                "asset": m.pool.asset.to_string(),
                "pool": m.pool.address.to_string(),
                "share_symbol": m.pool.symbol,
                "decimals": m.pool.decimals,
                "price": format_units(m.price, 18),
                "collateral_factor_bps": wad_to_bps(m.listing.collateral_factor),
                "reserve_factor_bps": wad_to_bps(m.pool.reserve_factor),
                "cash": format_units(m.pool.cash, m.pool.decimals),
                "total_borrows": format_units(m.pool.total_borrows, m.pool.decimals),
                "total_reserves": format_units(m.pool.total_reserves, m.pool.decimals),
                "utilization_bps": wad_to_bps(m.pool.utilization()),
                "borrow_apy": m.pool.borrow_apy(),
                "supply_apy": m.pool.supply_apy(),
                "mint_paused": m.listing.mint_paused,
                "borrow_paused": m.listing.borrow_paused,
            })
        })
        .collect();

    Value::Array(markets)
}
