//! Deterministic random operation sequences.
//!
//! After every operation each pool must conserve value and hold exactly its
//! recorded cash, and every account that just borrowed must be solvent.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use lendloop_core::math::pow10;
use lendloop_core::{LeverageRequest, Scenario, WAD};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use super::helpers::{account_config, market_config, scenario_config, total_claims};

const SYMBOLS: [&str; 2] = ["DAI", "USDC"];

fn users() -> Vec<Address> {
    (1..=4u8).map(|i| Address::repeat_byte(0x20 + i)).collect()
}

fn fuzz_scenario() -> Scenario {
    let mut dai = market_config("DAI", 18, "1", 8500);
    dai.reserve_factor_bps = 1000;
    dai.rate_model.base_bps = 200;
    dai.rate_model.multiplier_bps = 1500;
    dai.rate_model.jump_multiplier_bps = 20_000;
    dai.rate_model.kink_bps = 8000;
    dai.liquidity = Some("20000".to_string());

    let mut usdc = market_config("USDC", 6, "1", 8000);
    usdc.reserve_factor_bps = 500;
    usdc.rate_model.base_bps = 100;
    usdc.rate_model.multiplier_bps = 800;
    usdc.rate_model.kink_bps = 9000;
    usdc.liquidity = Some("20000".to_string());

    let accounts = users()
        .into_iter()
        .map(|user| account_config(user, &[("DAI", "50000"), ("USDC", "50000")]))
        .collect();

    scenario_config(vec![dai, usdc], accounts).build().unwrap()
}

fn assert_solvent(scenario: &Scenario, account: Address, step: usize) {
    let liquidity = scenario.market.account_liquidity(account).unwrap();
    assert!(
        liquidity.is_solvent(),
        "account {account} undercollateralized after step {step}: {liquidity:?}"
    );
}

fn check_pools(scenario: &Scenario, indexes: &mut BTreeMap<Address, U256>, step: usize) {
    for asset in scenario.assets.values() {
        let pool = scenario.market.pool(*asset).unwrap();
        let token = scenario.market.token(*asset).unwrap();

        assert_eq!(
            token.balance_of(pool.address),
            pool.cash,
            "cash mismatch at step {step}"
        );

        let claims = total_claims(&scenario.market, *asset);
        let owed = pool.total_underlying();
        let accounts = U256::from(pool.positions().count());
        assert!(claims <= owed, "claims exceed pool at step {step}");
        assert!(
            owed - claims <= accounts + pool.total_supply_shares / WAD + U256::from(1),
            "conservation violated at step {step}: owed {owed}, claimed {claims}"
        );

        let previous = indexes.insert(*asset, pool.borrow_index).unwrap_or(WAD);
        assert!(pool.borrow_index >= previous, "borrow index decreased at step {step}");
    }
}

#[test]
fn deterministic_fuzz_market_operations() {
    let seed = [0x5eu8; 16];
    let mut rng = XorShiftRng::from_seed(seed);
    let mut scenario = fuzz_scenario();
    let users = users();
    let mut timestamp = 0u64;
    let mut indexes = BTreeMap::new();

    for step in 0..800 {
        let user = users[rng.gen_range(0..users.len())];
        let symbol = SYMBOLS[rng.gen_range(0..SYMBOLS.len())];
        let asset = scenario.asset(symbol).unwrap();
        let decimals = scenario.market.token(asset).unwrap().decimals;
        let amount = U256::from(rng.gen_range(1..5_000u64)) * pow10(decimals) / U256::from(10);

        match rng.gen_range(0..7u8) {
            0 => {
                let _ = scenario.market.deposit(user, asset, amount, timestamp);
            }
            1 => {
                let shares = scenario.market.balance_of(user, asset).unwrap();
                let fraction = U256::from(rng.gen_range(1..=100u64));
                let withdrawn = scenario
                    .market
                    .withdraw(user, asset, shares * fraction / U256::from(100), timestamp);
                let entered = scenario.market.controller.assets_in(user).contains(&asset);
                if withdrawn.is_ok() && entered {
                    assert_solvent(&scenario, user, step);
                }
            }
            2 => {
                if scenario.market.borrow(user, asset, amount, timestamp).is_ok() {
                    assert_solvent(&scenario, user, step);
                }
            }
            3 => {
                let amount = if rng.gen_bool(0.3) { U256::MAX } else { amount };
                let _ = scenario.market.repay(user, asset, amount, timestamp);
            }
            4 => {
                timestamp += rng.gen_range(0..7_200u64);
                for asset in scenario.assets.values() {
                    scenario.market.accrue_interest(*asset, timestamp).unwrap();
                }
            }
            5 => {
                let request = LeverageRequest::new(
                    asset,
                    amount / U256::from(4),
                    rng.gen_range(0..=9_000u64),
                    rng.gen_range(0..5u32),
                );
                let leverager = scenario.leverager;
                if let Ok(report) = leverager.loop_asset(&mut scenario.market, user, &request, timestamp) {
                    assert_eq!(
                        report.final_borrow,
                        scenario.market.borrow_balance_stored(user, asset).unwrap()
                    );
                    if report.iterations > 0 {
                        assert_solvent(&scenario, user, step);
                    }
                }
            }
            _ => {
                let _ = scenario.market.withdraw_underlying(user, asset, amount / U256::from(2), timestamp);
            }
        }

        check_pools(&scenario, &mut indexes, step);
    }
}
