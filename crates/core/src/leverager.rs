//! Single-asset leverage loop.
//!
//! The [`Leverager`] seeds a deposit for the caller, then borrows against it
//! and redeposits the borrowed amount until the target debt ratio is met or
//! the iteration cap is reached.
//!
//! # Loop
//!
//! ```text
//! seed:   pull initial_deposit from caller, deposit for caller
//! repeat up to max_iterations:
//!     target = min(supply_value * target_ltv_bps / 10_000,
//!                  supply_value * collateral_factor)
//!     step   = target - borrow_value         (stop if <= 0)
//!     amount = step / price                  (stop if below dust)
//!     borrow amount for caller               (stop if rejected)
//!     redeposit amount for caller
//! ```
//!
//! Each step closes the remaining gap by a factor of `target_ltv`, so the
//! gap left after `n` iterations is at most `target_ltv^n` of the first one.
//!
//! The leverager acts through two grants from the caller: a token allowance
//! for the seed deposit and a borrow delegation for the loop. Borrowed funds
//! pass through the leverager's own account and go straight back into the
//! caller's supply.
//!
//! # Example
//!
//! ```rust
//! use alloy_primitives::{Address, U256};
//! use lendloop_core::{
//!     Controller, FixedPriceOracle, LendingMarket, LeverageRequest, Leverager, ListingRequest,
//!     LoopTermination, PoolConfig, Token, WAD,
//! };
//!
//! let dai = Address::repeat_byte(0xd1);
//! let alice = Address::repeat_byte(0xa1);
//! let leverager = Leverager::new(Address::repeat_byte(0x1e));
//!
//! let mut controller = Controller::new();
//! controller.set_price_oracle(Box::new(FixedPriceOracle::new().with_price(dai, WAD)));
//! let mut market = LendingMarket::new(controller);
//! market
//!     .list_market(
//!         ListingRequest {
//!             token: Token::new(dai, "DAI", 18),
//!             pool_address: Address::repeat_byte(0x50),
//!             pool_config: PoolConfig::default(),
//!             collateral_factor: WAD * U256::from(9) / U256::from(10),
//!         },
//!         0,
//!     )
//!     .unwrap();
//!
//! market.mint(dai, alice, U256::from(2000)).unwrap();
//! market.approve(dai, alice, leverager.address, U256::MAX).unwrap();
//! market.approve_delegate(dai, alice, leverager.address, U256::MAX).unwrap();
//!
//! let request = LeverageRequest::new(dai, U256::from(2000), 5000, 2);
//! let report = leverager.loop_asset(&mut market, alice, &request, 0).unwrap();
//!
//! assert_eq!(report.total_borrowed, U256::from(1500));
//! assert_eq!(report.final_supply, U256::from(3500));
//! assert_eq!(report.termination, LoopTermination::IterationsExhausted);
//! ```

use alloy_primitives::{Address, U256};
use serde::Serialize;

use crate::error::LendingError;
use crate::lending::LendingMarket;
use crate::math::{min, mul_div_down, value_to_amount, w_mul_down, RoundingDirection, BPS_SCALE};

/// Smallest borrow the loop will still execute, in raw asset units
pub const DEFAULT_DUST_THRESHOLD: U256 = U256::from_limbs([1, 0, 0, 0]);

/// What the caller asks the loop to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeverageRequest {
    pub asset: Address,
    /// Principal pulled from the caller before looping; zero levers the existing position
    pub initial_deposit: U256,
    /// Desired borrow / supply ratio in basis points (at most 10 000)
    pub target_ltv_bps: u64,
    pub max_iterations: u32,
}

impl LeverageRequest {
    pub fn new(asset: Address, initial_deposit: U256, target_ltv_bps: u64, max_iterations: u32) -> Self {
        Self {
            asset,
            initial_deposit,
            target_ltv_bps,
            max_iterations,
        }
    }
}

/// Why the loop stopped. Every variant is a successful outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopTermination {
    /// Borrows already match the target ratio
    TargetReached,
    /// The next borrow would be smaller than the dust threshold
    BelowDust,
    /// The controller refused the next borrow
    BorrowRejected,
    /// `max_iterations` steps were executed
    IterationsExhausted,
}

impl std::fmt::Display for LoopTermination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::TargetReached => "target reached",
            Self::BelowDust => "below dust",
            Self::BorrowRejected => "borrow rejected",
            Self::IterationsExhausted => "iterations exhausted",
        };
        f.write_str(label)
    }
}

/// One executed borrow + redeposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoopStep {
    /// 1-based iteration number
    pub iteration: u32,
    /// Amount borrowed and redeposited
    pub amount: U256,
    /// Supply shares minted by the redeposit
    pub shares_minted: U256,
    /// Supply value after the step
    pub supply_value: U256,
    /// Borrow value after the step
    pub borrow_value: U256,
}

/// Outcome of a single loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationResult {
    Executed(LoopStep),
    TargetReached,
    BelowDust { amount: U256 },
    Rejected { shortfall: U256 },
}

/// What a finished loop did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopReport {
    pub account: Address,
    pub asset: Address,
    /// Amount seeded from the caller's wallet
    pub seeded: U256,
    /// Number of executed steps
    pub iterations: u32,
    pub total_borrowed: U256,
    pub total_redeposited: U256,
    pub termination: LoopTermination,
    pub steps: Vec<LoopStep>,
    /// Caller's supply (underlying) after the loop
    pub final_supply: U256,
    /// Caller's debt after the loop
    pub final_borrow: U256,
}

impl LoopReport {
    /// Borrow over supply in basis points
    pub fn final_ltv_bps(&self) -> u64 {
        if self.final_supply.is_zero() {
            return 0;
        }
        mul_div_down(self.final_borrow, U256::from(BPS_SCALE), self.final_supply).saturating_to()
    }
}

/// Runs leverage loops on behalf of callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leverager {
    /// Account the leverager acts from
    pub address: Address,
    /// Borrows below this amount end the loop
    pub dust_threshold: U256,
    /// Restore the market to its pre-loop state when an error propagates
    pub atomic: bool,
}

impl Leverager {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            dust_threshold: DEFAULT_DUST_THRESHOLD,
            atomic: true,
        }
    }

    pub fn with_dust_threshold(mut self, dust_threshold: U256) -> Self {
        self.dust_threshold = dust_threshold;
        self
    }

    pub fn with_atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    /// Levers `caller`'s position in `request.asset`.
    ///
    /// Reaching the target, hitting dust, a controller rejection and running
    /// out of iterations all return `Ok` with the progress made. Any other
    /// error propagates; in atomic mode the market is first restored to its
    /// state before the call.
    ///
    /// # Errors
    ///
    /// - [`LendingError::InvalidRange`] if `target_ltv_bps > 10_000`
    /// - [`LendingError::MarketNotListed`] if the asset has no market
    /// - [`LendingError::MintPaused`] if deposits into the market are paused
    /// - [`LendingError::InvalidAmount`] if the initial deposit is too small to mint a share
    /// - [`LendingError::InsufficientAllowance`] / [`LendingError::InsufficientBalance`] on seeding
    /// - [`LendingError::InsufficientDelegation`] if the caller has not delegated borrowing power
    pub fn loop_asset(
        &self,
        market: &mut LendingMarket,
        caller: Address,
        request: &LeverageRequest,
        timestamp: u64,
    ) -> Result<LoopReport, LendingError> {
        let checkpoint = self.atomic.then(|| market.checkpoint());

        match self.run(market, caller, request, timestamp) {
            Ok(report) => Ok(report),
            Err(err) => {
                if let Some(checkpoint) = checkpoint {
                    market.restore(checkpoint);
                    tracing::warn!(%caller, asset = %request.asset, error = %err, "leverage loop rolled back");
                }
                Err(err)
            }
        }
    }

    fn run(
        &self,
        market: &mut LendingMarket,
        caller: Address,
        request: &LeverageRequest,
        timestamp: u64,
    ) -> Result<LoopReport, LendingError> {
        if request.target_ltv_bps > BPS_SCALE {
            return Err(LendingError::InvalidRange {
                name: "target ltv bps",
                value: U256::from(request.target_ltv_bps),
                min: U256::ZERO,
                max: U256::from(BPS_SCALE),
            });
        }
        let asset = request.asset;
        market.controller.authorize_mint(asset)?;
        market.accrue_interest(asset, timestamp)?;

        if !request.initial_deposit.is_zero() {
            if market.pool(asset)?.preview_deposit(request.initial_deposit).is_zero() {
                return Err(LendingError::InvalidAmount);
            }
            market
                .token_mut(asset)?
                .transfer_from(self.address, caller, self.address, request.initial_deposit)?;
            self.redeposit(market, caller, asset, request.initial_deposit, timestamp)?;
        }

        let mut steps = Vec::new();
        let mut termination = LoopTermination::IterationsExhausted;
        for iteration in 1..=request.max_iterations {
            match self.iterate(market, caller, request, iteration, timestamp)? {
                IterationResult::Executed(step) => steps.push(step),
                IterationResult::TargetReached => {
                    termination = LoopTermination::TargetReached;
                    break;
                }
                IterationResult::BelowDust { amount } => {
                    tracing::debug!(%caller, %asset, %amount, "next step below dust");
                    termination = LoopTermination::BelowDust;
                    break;
                }
                IterationResult::Rejected { shortfall } => {
                    tracing::warn!(%caller, %asset, iteration, %shortfall, "borrow rejected, stopping loop");
                    termination = LoopTermination::BorrowRejected;
                    break;
                }
            }
        }

        let total_borrowed = steps.iter().fold(U256::ZERO, |acc, step| acc + step.amount);
        let report = LoopReport {
            account: caller,
            asset,
            seeded: request.initial_deposit,
            iterations: steps.len() as u32,
            total_borrowed,
            total_redeposited: total_borrowed,
            termination,
            steps,
            final_supply: market.balance_of_underlying(caller, asset)?,
            final_borrow: market.borrow_balance_stored(caller, asset)?,
        };

        tracing::info!(
            %caller,
            %asset,
            iterations = report.iterations,
            total_borrowed = %report.total_borrowed,
            %termination,
            "leverage loop finished"
        );
        Ok(report)
    }

    /// One borrow + redeposit step, or the reason no step is taken
    fn iterate(
        &self,
        market: &mut LendingMarket,
        caller: Address,
        request: &LeverageRequest,
        iteration: u32,
        timestamp: u64,
    ) -> Result<IterationResult, LendingError> {
        let asset = request.asset;
        market.accrue_interest(asset, timestamp)?;
        let values = market.market_values(caller, asset)?;

        let requested = mul_div_down(
            values.supply_value,
            U256::from(request.target_ltv_bps),
            U256::from(BPS_SCALE),
        );
        let target = min(requested, w_mul_down(values.supply_value, values.collateral_factor));
        if target <= values.borrow_value {
            return Ok(IterationResult::TargetReached);
        }

        let pool = market.pool(asset)?;
        let amount = value_to_amount(target - values.borrow_value, values.price, pool.decimals, RoundingDirection::Down);
        // a step must mint at least one share when redeposited
        if amount.is_zero() || amount < self.dust_threshold || pool.preview_deposit(amount).is_zero() {
            return Ok(IterationResult::BelowDust { amount });
        }

        match market.borrow_behalf(self.address, caller, asset, amount, timestamp) {
            Ok(()) => {}
            Err(LendingError::BorrowNotAuthorized { shortfall, .. }) => {
                return Ok(IterationResult::Rejected { shortfall });
            }
            Err(err) => return Err(err),
        }
        let shares_minted = self.redeposit(market, caller, asset, amount, timestamp)?;

        let after = market.market_values(caller, asset)?;
        tracing::debug!(%caller, %asset, iteration, %amount, "leverage step");
        Ok(IterationResult::Executed(LoopStep {
            iteration,
            amount,
            shares_minted,
            supply_value: after.supply_value,
            borrow_value: after.borrow_value,
        }))
    }

    /// Deposits tokens the leverager holds for `caller`. On failure they go
    /// back to `caller` so nothing stays with the leverager.
    fn redeposit(
        &self,
        market: &mut LendingMarket,
        caller: Address,
        asset: Address,
        amount: U256,
        timestamp: u64,
    ) -> Result<U256, LendingError> {
        match market.deposit_behalf(self.address, caller, asset, amount, timestamp) {
            Ok(shares) => Ok(shares),
            Err(err) => {
                market.token_mut(asset)?.transfer(self.address, caller, amount)?;
                Err(err)
            }
        }
    }
}
