//! Multi-asset market tests.

use alloy_primitives::U256;
use lendloop_core::{LendingError, WAD};

use super::helpers::{account_config, alice, bob, market_config, scenario_config, total_claims, units};

/// USDC (6 decimals), WETH (18 decimals) and DAI (18 decimals), all funded
fn three_market_scenario() -> lendloop_core::Scenario {
    let mut dai = market_config("DAI", 18, "1", 9000);
    dai.liquidity = Some("100000".to_string());
    dai.reserve_factor_bps = 1000;
    dai.rate_model.base_bps = 200;
    dai.rate_model.multiplier_bps = 1000;
    dai.rate_model.jump_multiplier_bps = 30_000;
    dai.rate_model.kink_bps = 8000;

    scenario_config(
        vec![
            market_config("USDC", 6, "1", 8000),
            market_config("WETH", 18, "2000", 7500),
            dai,
        ],
        vec![
            account_config(alice(), &[("USDC", "1000"), ("WETH", "1")]),
            account_config(bob(), &[("DAI", "5000")]),
        ],
    )
    .build()
    .unwrap()
}

#[test]
fn test_six_and_eighteen_decimals_back_one_borrow() {
    let mut scenario = three_market_scenario();
    let usdc = scenario.asset("USDC").unwrap();
    let weth = scenario.asset("WETH").unwrap();
    let dai = scenario.asset("DAI").unwrap();

    scenario.market.deposit(alice(), usdc, units(1000, 6), 0).unwrap();
    scenario.market.deposit(alice(), weth, units(1, 18), 0).unwrap();

    let liquidity = scenario.market.account_liquidity(alice()).unwrap();
    // 1000 * 0.8 + 2000 * 0.75
    assert_eq!(liquidity.collateral_value, units(2300, 18));
    assert_eq!(liquidity.borrow_value, U256::ZERO);

    // more than either market supports alone
    scenario.market.borrow(alice(), dai, units(2000, 18), 0).unwrap();
    let liquidity = scenario.market.account_liquidity(alice()).unwrap();
    assert_eq!(liquidity.borrow_value, units(2000, 18));
    assert_eq!(liquidity.liquidity(), units(300, 18));

    let result = scenario.market.borrow(alice(), dai, units(301, 18), 0);
    assert!(matches!(result, Err(LendingError::BorrowNotAuthorized { .. })));
    scenario.market.borrow(alice(), dai, units(300, 18), 0).unwrap();
}

#[test]
fn test_price_drop_blocks_withdrawal() {
    let mut scenario = three_market_scenario();
    let usdc = scenario.asset("USDC").unwrap();
    let weth = scenario.asset("WETH").unwrap();
    let dai = scenario.asset("DAI").unwrap();

    scenario.market.deposit(alice(), usdc, units(1000, 6), 0).unwrap();
    scenario.market.deposit(alice(), weth, units(1, 18), 0).unwrap();
    scenario.market.borrow(alice(), dai, units(1500, 18), 0).unwrap();

    scenario.market.set_price(weth, WAD * U256::from(1000)).unwrap();
    let liquidity = scenario.market.account_liquidity(alice()).unwrap();
    // 800 + 750 still covers 1500
    assert!(liquidity.is_solvent());

    let result = scenario.market.withdraw_underlying(alice(), usdc, units(100, 6), 0);
    assert!(matches!(
        result,
        Err(LendingError::UndercollateralizedAfterWithdraw { .. })
    ));
}

#[test]
fn test_interest_reaches_suppliers_and_reserves() {
    let mut scenario = three_market_scenario();
    let usdc = scenario.asset("USDC").unwrap();
    let dai = scenario.asset("DAI").unwrap();

    scenario.market.deposit(alice(), usdc, units(1000, 6), 0).unwrap();
    scenario.market.borrow(alice(), dai, units(500, 18), 0).unwrap();
    scenario.market.deposit(bob(), dai, units(5000, 18), 100).unwrap();

    let rate_before = scenario.market.pool(dai).unwrap().exchange_rate_stored();
    scenario.market.accrue_interest(dai, 31_536_000).unwrap();
    let pool = scenario.market.pool(dai).unwrap();

    assert!(pool.exchange_rate_stored() > rate_before);
    assert!(pool.total_reserves > U256::ZERO);
    assert!(pool.borrow_apy() > pool.supply_apy());

    let claims = total_claims(&scenario.market, dai);
    let owed = pool.total_underlying();
    assert!(claims <= owed);
    assert!(owed - claims <= U256::from(3) + pool.total_supply_shares / WAD);
}

#[test]
fn test_full_repay_then_exit() {
    let mut scenario = three_market_scenario();
    let usdc = scenario.asset("USDC").unwrap();
    let dai = scenario.asset("DAI").unwrap();

    scenario.market.deposit(alice(), usdc, units(1000, 6), 0).unwrap();
    scenario.market.borrow(alice(), dai, units(100, 18), 0).unwrap();

    let result = scenario.market.exit_market(alice(), usdc);
    assert!(matches!(result, Err(LendingError::ExitMarketRejected { .. })));

    // interest accrued over a day, repaid in full with MAX
    scenario.market.mint(dai, alice(), units(10, 18)).unwrap();
    let repaid = scenario.market.repay(alice(), dai, U256::MAX, 86_400).unwrap();
    assert!(repaid > units(100, 18));
    assert_eq!(scenario.market.borrow_balance_stored(alice(), dai).unwrap(), U256::ZERO);

    scenario.market.exit_market(alice(), dai).unwrap();
    scenario.market.exit_market(alice(), usdc).unwrap();
    assert!(scenario.market.controller.assets_in(alice()).is_empty());

    let shares = scenario.market.balance_of(alice(), usdc).unwrap();
    scenario.market.withdraw(alice(), usdc, shares, 86_400).unwrap();
    let snapshot = scenario.market.account_snapshot(alice(), usdc).unwrap();
    assert_eq!(snapshot.supply_shares, U256::ZERO);
    assert_eq!(snapshot.borrow_balance, U256::ZERO);
}

#[test]
fn test_strict_repay() {
    let mut config = scenario_config(
        vec![market_config("DAI", 18, "1", 9000)],
        vec![account_config(alice(), &[("DAI", "1000")])],
    );
    config.strict_repay = true;
    let mut scenario = config.build().unwrap();
    let dai = scenario.asset("DAI").unwrap();

    scenario.market.deposit(alice(), dai, units(1000, 18), 0).unwrap();
    scenario.market.borrow(alice(), dai, units(100, 18), 0).unwrap();

    let result = scenario.market.repay(alice(), dai, units(101, 18), 0);
    assert!(matches!(result, Err(LendingError::RepayExceedsDebt { .. })));
    assert_eq!(scenario.market.repay(alice(), dai, U256::MAX, 0).unwrap(), units(100, 18));
}

#[test]
fn test_max_close_amount_and_reserves() {
    let mut scenario = three_market_scenario();
    let usdc = scenario.asset("USDC").unwrap();
    let dai = scenario.asset("DAI").unwrap();

    scenario.market.deposit(alice(), usdc, units(1000, 6), 0).unwrap();
    scenario.market.borrow(alice(), dai, units(400, 18), 0).unwrap();
    assert_eq!(scenario.market.max_close_amount(alice(), dai).unwrap(), units(200, 18));

    scenario.market.accrue_interest(dai, 31_536_000).unwrap();
    let reserves = scenario.market.pool(dai).unwrap().total_reserves;
    scenario
        .market
        .reduce_reserves(dai, bob(), reserves, 31_536_000)
        .unwrap();
    assert_eq!(scenario.market.pool(dai).unwrap().total_reserves, U256::ZERO);
    assert_eq!(
        scenario.market.token(dai).unwrap().balance_of(bob()),
        units(5000, 18) + reserves
    );
}
