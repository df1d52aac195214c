//! Integration tests for the loop and markets commands.

use predicates::prelude::*;

use super::helpers::{fixture_path, json_output, lendloop_cmd};

const BOB: &str = "0xb0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0";

#[test]
fn test_loop_table_output() {
    lendloop_cmd()
        .args([
            "loop",
            "--scenario",
            &fixture_path("scenario"),
            "--asset",
            "DAI",
            "--deposit",
            "2000",
            "--target-ltv-bps",
            "5000",
            "--max-iterations",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Leverage loop: DAI"))
        .stdout(predicate::str::contains("iterations exhausted"))
        .stdout(predicate::str::contains("Supplied:    3500 DAI"))
        .stdout(predicate::str::contains("Borrowed:    1500 DAI"))
        .stdout(predicate::str::contains("Borrow Value"));
}

#[test]
fn test_loop_json_output() {
    let json = json_output(lendloop_cmd().args([
        "loop",
        "--scenario",
        &fixture_path("scenario"),
        "--asset",
        "DAI",
        "--deposit",
        "2000",
        "--target-ltv-bps",
        "5000",
        "--max-iterations",
        "2",
        "--format",
        "json",
    ]));

    assert_eq!(json["symbol"], "DAI");
    assert_eq!(json["seeded"], "2000");
    assert_eq!(json["iterations"], 2);
    assert_eq!(json["termination"], "iterations exhausted");
    assert_eq!(json["total_borrowed"], "1500");
    assert_eq!(json["final_supply"], "3500");
    assert_eq!(json["final_borrow"], "1500");
    assert_eq!(json["final_ltv_bps"], 4285);

    let steps = json["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0]["amount"], "1000");
    assert_eq!(steps[0]["supply_value"], "3000");
    assert_eq!(steps[1]["amount"], "500");
    assert_eq!(steps[1]["borrow_value"], "1500");
}

#[test]
fn test_loop_zero_target_reaches_immediately() {
    let json = json_output(lendloop_cmd().args([
        "loop",
        "--scenario",
        &fixture_path("scenario"),
        "--asset",
        "DAI",
        "--deposit",
        "100",
        "--target-ltv-bps",
        "0",
        "--format",
        "json",
    ]));

    assert_eq!(json["termination"], "target reached");
    assert_eq!(json["iterations"], 0);
    assert_eq!(json["final_supply"], "100");
    assert_eq!(json["final_borrow"], "0");
    assert!(json["steps"].as_array().unwrap().is_empty());
}

#[test]
fn test_loop_six_decimal_asset_for_second_account() {
    let json = json_output(lendloop_cmd().args([
        "loop",
        "--scenario",
        &fixture_path("scenario"),
        "--asset",
        "USDC",
        "--deposit",
        "500",
        "--target-ltv-bps",
        "5000",
        "--max-iterations",
        "3",
        "--account",
        BOB,
        "--format",
        "json",
    ]));

    assert_eq!(json["iterations"], 3);
    assert_eq!(json["total_borrowed"], "437.5");
    assert_eq!(json["final_supply"], "937.5");
    assert_eq!(json["final_borrow"], "437.5");

    let steps = json["steps"].as_array().unwrap();
    assert_eq!(steps[2]["amount"], "62.5");
}

#[test]
fn test_loop_insufficient_balance_fails() {
    lendloop_cmd()
        .args([
            "loop",
            "--scenario",
            &fixture_path("scenario"),
            "--asset",
            "DAI",
            "--deposit",
            "100",
            "--account",
            BOB,
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Leverage loop on DAI failed"))
        .stderr(predicate::str::contains("Insufficient balance"));
}

#[test]
fn test_loop_scenario_from_env() {
    lendloop_cmd()
        .env("LENDLOOP_SCENARIO", fixture_path("scenario"))
        .args(["loop", "--asset", "DAI", "--deposit", "10", "--max-iterations", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Leverage loop: DAI"));
}

#[test]
fn test_markets_table_output() {
    lendloop_cmd()
        .args(["markets", "--scenario", &fixture_path("scenario")])
        .assert()
        .success()
        .stdout(predicate::str::contains("DAI"))
        .stdout(predicate::str::contains("USDC"))
        .stdout(predicate::str::contains("90.00%"))
        .stdout(predicate::str::contains("80.00%"))
        .stdout(predicate::str::contains("Borrow APY"));
}

#[test]
fn test_markets_json_output() {
    let json = json_output(lendloop_cmd().args([
        "markets",
        "--scenario",
        &fixture_path("scenario"),
        "--format",
        "json",
    ]));

    let markets = json.as_array().unwrap();
    assert_eq!(markets.len(), 2);

    assert_eq!(markets[0]["symbol"], "DAI");
    assert_eq!(markets[0]["decimals"], 18);
    assert_eq!(markets[0]["price"], "1");
    assert_eq!(markets[0]["collateral_factor_bps"], 9000);
    assert_eq!(markets[0]["cash"], "0");

    assert_eq!(markets[1]["symbol"], "USDC");
    assert_eq!(markets[1]["reserve_factor_bps"], 1000);
    assert_eq!(markets[1]["cash"], "50000");
    assert_eq!(markets[1]["utilization_bps"], 0);
    assert_eq!(markets[1]["mint_paused"], false);
}
