//! Jump Rate Interest Rate Model (IRM) implementation.
//!
//! Every pool prices its loans with a [`JumpRateModel`]: a piecewise linear
//! function of utilization with a steeper slope above a "kink".
//!
//! # How the IRM Works
//!
//! ```text
//! utilization = borrows / (cash + borrows - reserves)
//!
//! If utilization <= kink:
//!     borrow_rate = base + utilization * multiplier
//! If utilization > kink:
//!     borrow_rate = base + kink * multiplier + (utilization - kink) * jump_multiplier
//!
//! supply_rate = borrow_rate * utilization * (1 - reserve_factor)
//! ```
//!
//! Rates are WAD-scaled per second. Because every slope is non-negative the
//! borrow rate is monotonic non-decreasing in utilization.
//!
//! # Parameters
//!
//! | Parameter | Description |
//! |-----------|-------------|
//! | `base_rate_per_second` | Rate charged at zero utilization |
//! | `multiplier_per_second` | Slope below the kink |
//! | `jump_multiplier_per_second` | Slope above the kink |
//! | `kink` | Utilization where the jump slope takes over (WAD) |
//!
//! An all-zero model is a valid configuration: it charges nothing and pools
//! using it skip interest accrual entirely.
//!
//! # Example
//!
//! ```rust
//! use lendloop_core::irm::JumpRateModel;
//! use lendloop_core::WAD;
//! use alloy_primitives::U256;
//!
//! // 2% base, 10% at the 80% kink, 300% jump slope (all yearly)
//! let model = JumpRateModel::from_yearly(
//!     WAD * U256::from(2) / U256::from(100),
//!     WAD * U256::from(10) / U256::from(100),
//!     WAD * U256::from(3),
//!     WAD * U256::from(8) / U256::from(10),
//! );
//!
//! let idle = model.borrow_rate(U256::from(1000), U256::ZERO, U256::ZERO);
//! let busy = model.borrow_rate(U256::from(100), U256::from(900), U256::ZERO);
//! assert!(busy > idle);
//! ```

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::math::{bps_to_wad, mul_div_down, w_div_down, w_mul_down, zero_floor_sub, SECONDS_PER_YEAR, WAD};

/// Hard ceiling on the per-second borrow rate (0.0005% per second)
pub const MAX_BORROW_RATE_PER_SECOND: U256 = U256::from_limbs([5_000_000_000_000, 0, 0, 0]);

/// Borrow/supply rates at a given pool state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterestRates {
    /// Utilization the rates were computed at (WAD)
    pub utilization: U256,
    /// Borrow rate (WAD per second)
    pub borrow_rate: U256,
    /// Supply rate (WAD per second)
    pub supply_rate: U256,
}

/// Piecewise-linear borrow rate curve with a kink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JumpRateModel {
    pub base_rate_per_second: U256,
    pub multiplier_per_second: U256,
    pub jump_multiplier_per_second: U256,
    pub kink: U256,
}

impl JumpRateModel {
    /// The zero-rate model: no interest is ever charged
    pub fn zero() -> Self {
        Self::default()
    }

    /// Builds a model from yearly WAD rates.
    ///
    /// `multiplier_per_year` is the rate added by the time utilization reaches
    /// the kink, so the per-second slope is `multiplier / (year * kink)`.
    pub fn from_yearly(
        base_rate_per_year: U256,
        multiplier_per_year: U256,
        jump_multiplier_per_year: U256,
        kink: U256,
    ) -> Self {
        let year = U256::from(SECONDS_PER_YEAR);
        let multiplier_per_second = if kink.is_zero() {
            multiplier_per_year / year
        } else {
            mul_div_down(multiplier_per_year, WAD, year * kink)
        };
        Self {
            base_rate_per_second: base_rate_per_year / year,
            multiplier_per_second,
            jump_multiplier_per_second: jump_multiplier_per_year / year,
            kink,
        }
    }

    /// Same as [`JumpRateModel::from_yearly`] with every parameter in basis points
    pub fn from_yearly_bps(base_bps: u64, multiplier_bps: u64, jump_multiplier_bps: u64, kink_bps: u64) -> Self {
        Self::from_yearly(
            bps_to_wad(base_bps),
            bps_to_wad(multiplier_bps),
            bps_to_wad(jump_multiplier_bps),
            bps_to_wad(kink_bps),
        )
    }

    /// Whether this model can never produce a non-zero rate
    pub fn is_zero(&self) -> bool {
        self.base_rate_per_second.is_zero()
            && self.multiplier_per_second.is_zero()
            && self.jump_multiplier_per_second.is_zero()
    }

    /// Borrow rate (WAD per second) at the given pool balances
    pub fn borrow_rate(&self, cash: U256, borrows: U256, reserves: U256) -> U256 {
        let utilization = utilization_rate(cash, borrows, reserves);
        if utilization <= self.kink {
            return w_mul_down(utilization, self.multiplier_per_second) + self.base_rate_per_second;
        }

        let normal_rate = w_mul_down(self.kink, self.multiplier_per_second) + self.base_rate_per_second;
        let excess = utilization - self.kink;
        w_mul_down(excess, self.jump_multiplier_per_second) + normal_rate
    }

    /// Supply rate (WAD per second): the share of borrow interest that reaches suppliers
    pub fn supply_rate(&self, cash: U256, borrows: U256, reserves: U256, reserve_factor: U256) -> U256 {
        self.rates(cash, borrows, reserves, reserve_factor).supply_rate
    }

    /// Utilization, borrow rate and supply rate in one pass
    pub fn rates(&self, cash: U256, borrows: U256, reserves: U256, reserve_factor: U256) -> InterestRates {
        let utilization = utilization_rate(cash, borrows, reserves);
        let borrow_rate = self.borrow_rate(cash, borrows, reserves);
        let rate_to_pool = w_mul_down(borrow_rate, zero_floor_sub(WAD, reserve_factor));
        InterestRates {
            utilization,
            borrow_rate,
            supply_rate: w_mul_down(utilization, rate_to_pool),
        }
    }
}

/// Utilization rate (WAD): `borrows / (cash + borrows - reserves)`.
///
/// Zero when nothing is borrowed or when reserves swallow the whole pool.
pub fn utilization_rate(cash: U256, borrows: U256, reserves: U256) -> U256 {
    if borrows.is_zero() {
        return U256::ZERO;
    }
    let total = zero_floor_sub(cash + borrows, reserves);
    if total.is_zero() {
        return U256::ZERO;
    }
    w_div_down(borrows, total)
}
