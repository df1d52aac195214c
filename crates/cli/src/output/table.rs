//! Table output formatting for markets and loop steps.

use alloy_primitives::U256;
use lendloop_core::{format_units, math::wad_to_bps, LoopStep, MarketListing, Pool};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// A listed market with everything the output needs.
pub struct MarketRowData<'a> {
    pub symbol: String,
    pub pool: &'a Pool,
    pub listing: &'a MarketListing,
    /// WAD per whole token
    pub price: U256,
}

#[derive(Tabled)]
struct MarketRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Asset")]
    asset: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "CF")]
    collateral_factor: String,
    #[tabled(rename = "Cash")]
    cash: String,
    #[tabled(rename = "Borrows")]
    borrows: String,
    #[tabled(rename = "Utilization")]
    utilization: String,
    #[tabled(rename = "Borrow APY")]
    borrow_apy: String,
    #[tabled(rename = "Supply APY")]
    supply_apy: String,
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    iteration: u32,
    #[tabled(rename = "Borrowed")]
    amount: String,
    #[tabled(rename = "Shares Minted")]
    shares: String,
    #[tabled(rename = "Supply Value")]
    supply_value: String,
    #[tabled(rename = "Borrow Value")]
    borrow_value: String,
}

pub(crate) fn truncate_address(addr: &str) -> String {
    if addr.len() > 10 {
        format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
    } else {
        addr.to_string()
    }
}

pub(crate) fn format_bps(bps: u64) -> String {
    format!("{:.2}%", bps as f64 / 100.0)
}

pub(crate) fn format_apy(apy: f64) -> String {
    format!("{:.2}%", apy * 100.0)
}

/// WAD-scaled USD value
pub(crate) fn format_usd(value: U256) -> String {
    format!("${}", format_units(value, 18))
}

pub fn format_markets_table(markets: &[MarketRowData<'_>]) -> String {
    let rows: Vec<MarketRow> = markets
        .iter()
        .map(|m| MarketRow {
            symbol: m.symbol.clone(),
            asset: truncate_address(&m.pool.asset.to_string()),
            price: format_usd(m.price),
            collateral_factor: format_bps(wad_to_bps(m.listing.collateral_factor)),
            cash: format_units(m.pool.cash, m.pool.decimals),
            borrows: format_units(m.pool.total_borrows, m.pool.decimals),
            utilization: format_bps(wad_to_bps(m.pool.utilization())),
            borrow_apy: format_apy(m.pool.borrow_apy()),
            supply_apy: format_apy(m.pool.supply_apy()),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::left()));

    table.to_string()
}

pub fn format_steps_table(steps: &[LoopStep], decimals: u8) -> String {
    let rows: Vec<StepRow> = steps
        .iter()
        .map(|s| StepRow {
            iteration: s.iteration,
            amount: format_units(s.amount, decimals),
            shares: format_units(s.shares_minted, decimals),
            supply_value: format_usd(s.supply_value),
            borrow_value: format_usd(s.borrow_value),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::new(1..)).with(Alignment::left()));

    table.to_string()
}
