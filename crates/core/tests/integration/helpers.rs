//! Shared setup for the integration tests.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use lendloop_core::math::pow10;
use lendloop_core::{
    AccountConfig, LendingMarket, MarketConfig, RateModelConfig, Scenario, ScenarioConfig,
};

pub fn alice() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn bob() -> Address {
    Address::repeat_byte(0xb0)
}

/// `amount` whole tokens in raw units
pub fn units(amount: u64, decimals: u8) -> U256 {
    U256::from(amount) * pow10(decimals)
}

pub fn market_config(symbol: &str, decimals: u8, price: &str, collateral_factor_bps: u64) -> MarketConfig {
    MarketConfig {
        symbol: symbol.to_string(),
        name: None,
        address: None,
        decimals,
        price: price.to_string(),
        collateral_factor_bps,
        reserve_factor_bps: 0,
        rate_model: RateModelConfig::default(),
        liquidity: None,
        borrow_cap: None,
    }
}

pub fn account_config(address: Address, balances: &[(&str, &str)]) -> AccountConfig {
    AccountConfig {
        address,
        balances: balances
            .iter()
            .map(|(symbol, amount)| ((*symbol).to_string(), (*amount).to_string()))
            .collect::<BTreeMap<_, _>>(),
        approve_leverager: true,
    }
}

pub fn scenario_config(markets: Vec<MarketConfig>, accounts: Vec<AccountConfig>) -> ScenarioConfig {
    ScenarioConfig {
        timestamp: 0,
        close_factor_bps: 5000,
        strict_repay: false,
        markets,
        accounts,
        leverager: Default::default(),
    }
}

/// One zero-rate DAI market (price 1.0, CF 90%) and Alice holding 10 000 DAI
pub fn dai_scenario() -> Scenario {
    scenario_config(
        vec![market_config("DAI", 18, "1", 9000)],
        vec![account_config(alice(), &[("DAI", "10000")])],
    )
    .build()
    .unwrap()
}

/// Sum of every supplier's claim on `asset`'s pool, in underlying
pub fn total_claims(market: &LendingMarket, asset: Address) -> U256 {
    let pool = market.pool(asset).unwrap();
    let rate = pool.exchange_rate_stored();
    pool.positions()
        .map(|(_, position)| position.supply_underlying(rate, lendloop_core::RoundingDirection::Down))
        .fold(U256::ZERO, |acc, claim| acc + claim)
}
