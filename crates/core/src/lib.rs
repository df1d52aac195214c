//! Lending Market and Leverage Loop Engine
//!
//! This crate models a collateralized lending market and a leverage engine
//! built on it. Suppliers deposit an asset into a pool and receive
//! interest-bearing supply shares; borrowers take out listed assets against
//! their supplied collateral up to each asset's collateral factor.
//!
//! # Overview
//!
//! The engine lets you:
//! - List assets as pools with a jump-rate interest model
//! - Deposit, withdraw, borrow and repay with lazy interest accrual
//! - Check account liquidity across assets with different decimals
//! - Lever a position in one call with [`Leverager::loop_asset`]
//! - Build a whole market from a JSON [`ScenarioConfig`]
//!
//! All state lives in a [`LendingMarket`] passed by reference. Every mutating
//! call takes the current timestamp in seconds.
//!
//! # Example
//!
//! ```rust
//! use lendloop_core::{LeverageRequest, LoopTermination, ScenarioConfig};
//! use alloy_primitives::{Address, U256};
//!
//! let json = r#"{
//!     "markets": [
//!         { "symbol": "DAI", "decimals": 18, "price": "1", "collateral_factor_bps": 9000 }
//!     ],
//!     "accounts": [
//!         { "address": "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1", "balances": { "DAI": "2000" } }
//!     ]
//! }"#;
//!
//! let mut scenario = ScenarioConfig::from_json(json).unwrap().build().unwrap();
//! let dai = scenario.asset("DAI").unwrap();
//! let alice = Address::repeat_byte(0xa1);
//!
//! let deposit = U256::from(2000) * lendloop_core::math::pow10(18);
//! let request = LeverageRequest::new(dai, deposit, 5000, 2);
//! let report = scenario
//!     .leverager
//!     .loop_asset(&mut scenario.market, alice, &request, scenario.timestamp)
//!     .unwrap();
//!
//! assert_eq!(report.total_borrowed, U256::from(1500) * lendloop_core::math::pow10(18));
//! assert_eq!(report.termination, LoopTermination::IterationsExhausted);
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod irm;
pub mod lending;
pub mod leverager;
pub mod math;
pub mod oracle;
pub mod pool;
pub mod position;
pub mod token;

// Re-export commonly used types
pub use error::LendingError;

// Math exports
pub use math::{format_units, parse_units, RoundingDirection, BPS_SCALE, SECONDS_PER_YEAR, WAD};

// Market exports
pub use controller::{AccountLiquidity, Controller, HypotheticalAction, MarketListing, MarketValues};
pub use lending::{LendingMarket, ListingRequest, MarketCheckpoint};
pub use pool::{Pool, PoolConfig};
pub use position::{AccountPosition, AccountSnapshot};
pub use token::Token;

// Pricing and rate exports
pub use irm::{utilization_rate, InterestRates, JumpRateModel, MAX_BORROW_RATE_PER_SECOND};
pub use oracle::{FixedPriceOracle, PriceOracle, PRICE_PRECISION};

// Leverage exports
pub use leverager::{
    IterationResult, LeverageRequest, Leverager, LoopReport, LoopStep, LoopTermination,
    DEFAULT_DUST_THRESHOLD,
};

// Configuration exports
pub use config::{
    AccountConfig, LeveragerConfig, MarketConfig, RateModelConfig, Scenario, ScenarioConfig,
    DEFAULT_LEVERAGER, LIQUIDITY_PROVIDER,
};
