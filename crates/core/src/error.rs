//! Error types for the lending engine.

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Errors surfaced by pools, the controller and the leverager.
///
/// Pool and controller errors are returned to the direct caller unchanged.
/// The leverager absorbs [`LendingError::BorrowNotAuthorized`] as a normal
/// loop termination and propagates everything else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LendingError {
    /// Zero amount passed to an operation that moves funds
    #[error("Invalid amount: operations require a non-zero amount")]
    InvalidAmount,

    /// A human-readable number could not be parsed
    #[error("Invalid number: {input:?}")]
    InvalidNumber { input: String },

    /// Account does not hold enough of the underlying token
    #[error("Insufficient balance for {account} in token {asset}: needs {needed}, has {available}")]
    InsufficientBalance {
        account: Address,
        asset: Address,
        needed: U256,
        available: U256,
    },

    /// Spender has not been approved for enough of the owner's tokens
    #[error("Insufficient allowance from {owner} to {spender} in token {asset}: needs {needed}, has {available}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        asset: Address,
        needed: U256,
        available: U256,
    },

    /// Delegatee has not been granted enough borrowing power by the borrower
    #[error("Insufficient borrow delegation from {borrower} to {delegatee} in market {asset}: needs {needed}, has {available}")]
    InsufficientDelegation {
        borrower: Address,
        delegatee: Address,
        asset: Address,
        needed: U256,
        available: U256,
    },

    /// Account tried to redeem more supply shares than it holds
    #[error("Insufficient shares for {account} in market {asset}: needs {needed}, has {available}")]
    InsufficientShares {
        account: Address,
        asset: Address,
        needed: U256,
        available: U256,
    },

    /// Pool does not hold enough cash to pay out
    #[error("Insufficient liquidity in market {asset}: requested {requested}, cash {cash}")]
    InsufficientLiquidity {
        asset: Address,
        requested: U256,
        cash: U256,
    },

    /// Collateral check rejected a new borrow
    #[error("Borrow not authorized for {account} in market {asset}: shortfall {shortfall}")]
    BorrowNotAuthorized {
        account: Address,
        asset: Address,
        shortfall: U256,
    },

    /// Withdrawal would leave the account's borrows uncovered
    #[error("Withdrawal would leave {account} undercollateralized in market {asset}: shortfall {shortfall}")]
    UndercollateralizedAfterWithdraw {
        account: Address,
        asset: Address,
        shortfall: U256,
    },

    /// Repay amount exceeds the outstanding debt (strict mode only)
    #[error("Repay of {requested} exceeds debt {owed} for {account} in market {asset}")]
    RepayExceedsDebt {
        account: Address,
        asset: Address,
        owed: U256,
        requested: U256,
    },

    /// A WAD fraction above 1.0 was supplied as a factor
    #[error("Invalid factor {value}: must not exceed 1.0 (1e18)")]
    InvalidFactor { value: U256 },

    /// A configuration value fell outside its allowed range
    #[error("Invalid {name}: {value} is outside [{min}, {max}]")]
    InvalidRange {
        name: &'static str,
        value: U256,
        min: U256,
        max: U256,
    },

    /// Asset has no listed market
    #[error("Market {asset} is not listed")]
    MarketNotListed { asset: Address },

    /// Asset already has a listed market
    #[error("Market {asset} is already listed")]
    MarketAlreadyListed { asset: Address },

    /// No token ledger is registered for the asset
    #[error("Unknown token {asset}")]
    UnknownToken { asset: Address },

    /// Oracle has no usable price for the asset
    #[error("Price unavailable for asset {asset}")]
    PriceUnavailable { asset: Address },

    /// The controller has no price oracle configured
    #[error("Price oracle not set")]
    OracleNotSet,

    /// Deposits are paused for the market
    #[error("Deposits are paused in market {asset}")]
    MintPaused { asset: Address },

    /// Borrows are paused for the market
    #[error("Borrows are paused in market {asset}")]
    BorrowPaused { asset: Address },

    /// Borrow would push total borrows over the market cap
    #[error("Borrow cap {cap} exceeded in market {asset}")]
    BorrowCapExceeded { asset: Address, cap: U256 },

    /// Account cannot leave a market it still borrows from or relies on
    #[error("Account {account} cannot exit market {asset}")]
    ExitMarketRejected { account: Address, asset: Address },

    /// Interest accrual was attempted with a timestamp before the last update
    #[error("Invalid interest accrual: timestamp {timestamp} is before last update {last_update}")]
    InvalidInterestAccrual { timestamp: u64, last_update: u64 },

    /// Rate model returned a rate above the hard ceiling
    #[error("Borrow rate {rate} per second exceeds the maximum {max}")]
    BorrowRateTooHigh { rate: U256, max: U256 },

    /// Reserve reduction larger than the reserves held
    #[error("Cannot reduce reserves by {requested} in market {asset}: reserves {reserves}")]
    InsufficientReserves {
        asset: Address,
        requested: U256,
        reserves: U256,
    },

    /// A scenario referred to a market symbol it never defined
    #[error("Unknown market symbol {symbol:?}")]
    UnknownSymbol { symbol: String },
}
