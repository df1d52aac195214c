//! CLI argument validation tests.
//!
//! These tests verify that the CLI properly validates arguments and reports
//! helpful errors for bad scenarios and inputs.

use predicates::prelude::*;

use super::helpers::{fixture_path, lendloop_cmd};

#[test]
fn test_help_output() {
    lendloop_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("lendloop"))
        .stdout(predicate::str::contains("loop"))
        .stdout(predicate::str::contains("markets"));
}

#[test]
fn test_loop_help_output() {
    lendloop_cmd()
        .args(["loop", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--scenario"))
        .stdout(predicate::str::contains("--target-ltv-bps"))
        .stdout(predicate::str::contains("--max-iterations"))
        .stdout(predicate::str::contains("--account"));
}

#[test]
fn test_loop_missing_asset() {
    lendloop_cmd()
        .args(["loop", "--scenario", &fixture_path("scenario"), "--deposit", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--asset"));
}

#[test]
fn test_markets_missing_scenario() {
    lendloop_cmd()
        .arg("markets")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--scenario"));
}

#[test]
fn test_invalid_format() {
    lendloop_cmd()
        .args(["markets", "--scenario", &fixture_path("scenario"), "--format", "xml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_unknown_subcommand() {
    lendloop_cmd()
        .arg("liquidate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_scenario_file_not_found() {
    lendloop_cmd()
        .args(["markets", "--scenario", "/nonexistent/scenario.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read scenario file"));
}

#[test]
fn test_scenario_file_malformed() {
    lendloop_cmd()
        .args(["markets", "--scenario", &fixture_path("malformed")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid scenario file"));
}

#[test]
fn test_unknown_asset_symbol() {
    lendloop_cmd()
        .args([
            "loop",
            "--scenario",
            &fixture_path("scenario"),
            "--asset",
            "WBTC",
            "--deposit",
            "1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown market symbol"));
}

#[test]
fn test_invalid_deposit_amount() {
    lendloop_cmd()
        .args([
            "loop",
            "--scenario",
            &fixture_path("scenario"),
            "--asset",
            "DAI",
            "--deposit",
            "lots",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid deposit amount"));
}

#[test]
fn test_invalid_account_address() {
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
            "not-an-address",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid account address"));
}

#[test]
fn test_target_ltv_out_of_range() {
    lendloop_cmd()
        .args([
            "loop",
            "--scenario",
            &fixture_path("scenario"),
            "--asset",
            "DAI",
            "--deposit",
            "100",
            "--target-ltv-bps",
            "12000",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Leverage loop on DAI failed"));
}
