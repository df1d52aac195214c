//! Per-account positions inside a pool.
//!
//! A position is created on the account's first interaction with a pool and
//! is never removed: a fully withdrawn and repaid position stays in the pool
//! with zeroed fields.

use alloy_primitives::U256;
use serde::Serialize;

use crate::math::{mul_div, mul_div_down, RoundingDirection, WAD};

/// An account's supply shares and borrow snapshot in one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountPosition {
    /// Supply shares held (the pool's interest-bearing claim token)
    pub supply_shares: U256,
    /// Debt at the last interaction, including interest folded in so far
    pub borrow_principal: U256,
    /// Pool borrow index when `borrow_principal` was last written
    pub borrow_index_snapshot: U256,
}

impl Default for AccountPosition {
    fn default() -> Self {
        Self::empty()
    }
}

impl AccountPosition {
    /// A position with no supply and no debt
    pub fn empty() -> Self {
        Self {
            supply_shares: U256::ZERO,
            borrow_principal: U256::ZERO,
            borrow_index_snapshot: WAD,
        }
    }

    /// Debt at `borrow_index`: `principal * borrow_index / snapshot`
    pub fn borrow_balance(&self, borrow_index: U256) -> U256 {
        if self.borrow_principal.is_zero() {
            return U256::ZERO;
        }
        mul_div_down(self.borrow_principal, borrow_index, self.borrow_index_snapshot)
    }

    /// Underlying value of the supply shares at `exchange_rate`
    pub fn supply_underlying(&self, exchange_rate: U256, rounding: RoundingDirection) -> U256 {
        mul_div(self.supply_shares, exchange_rate, WAD, rounding)
    }

    /// Rewrites the debt as `balance` owed at `borrow_index`
    pub fn set_borrow(&mut self, balance: U256, borrow_index: U256) {
        self.borrow_principal = balance;
        self.borrow_index_snapshot = borrow_index;
    }

    pub fn is_empty(&self) -> bool {
        self.supply_shares.is_zero() && self.borrow_principal.is_zero()
    }
}

/// Point-in-time view of an account in one pool, at stored (not accrued) state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountSnapshot {
    pub supply_shares: U256,
    pub supply_underlying: U256,
    pub borrow_balance: U256,
    pub exchange_rate: U256,
}
