//! Pool state and operations for a single listed asset.
//!
//! This module implements the [`Pool`] struct: the per-asset accounting of
//! cash, borrows, reserves and supply shares, plus lazy interest accrual.
//!
//! # Overview
//!
//! A pool is a lending market for one asset:
//! - **Supply side**: Accounts deposit the asset and receive supply shares
//! - **Borrow side**: Accounts borrow cash and owe it back with interest
//! - **Share-based supply**: Shares convert to underlying through the exchange rate
//! - **Index-based debt**: Debt grows with the cumulative borrow index
//!
//! # Key Operations
//!
//! - [`Pool::accrue_interest`] - Bring borrows, reserves and the borrow index up to date
//! - [`Pool::deposit`] / [`Pool::withdraw`] - Supplier operations
//! - [`Pool::borrow`] / [`Pool::repay`] - Borrower operations
//! - [`Pool::borrow_balance_stored`] / [`Pool::balance_of`] - Snapshot queries
//!
//! Pools do not check collateral. [`crate::LendingMarket`] asks the
//! [`crate::Controller`] before it lets a borrow or withdrawal reach the pool.
//!
//! # Example
//!
//! ```rust
//! use lendloop_core::{Pool, PoolConfig, Token};
//! use alloy_primitives::{Address, U256};
//!
//! let asset = Address::repeat_byte(0xd1);
//! let alice = Address::repeat_byte(0xa1);
//! let mut token = Token::new(asset, "DAI", 18);
//! token.mint(alice, U256::from(2_000));
//!
//! let mut pool = Pool::new(asset, Address::repeat_byte(0x50), 18, PoolConfig::default(), 0).unwrap();
//! let shares = pool.deposit(&mut token, alice, alice, U256::from(2_000), 0).unwrap();
//!
//! // The first deposit mints shares 1:1
//! assert_eq!(shares, U256::from(2_000));
//! assert_eq!(pool.cash, U256::from(2_000));
//! ```

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

use crate::error::LendingError;
use crate::irm::{InterestRates, JumpRateModel, MAX_BORROW_RATE_PER_SECOND};
use crate::math::{
    mul_div, mul_div_down, rate_to_apy, w_mul_down, zero_floor_sub, RoundingDirection, WAD,
};
use crate::position::{AccountPosition, AccountSnapshot};
use crate::token::Token;

/// Prefix of every supply share token name
pub const SHARE_NAME_PREFIX: &str = "Lendloop";

/// Prefix of every supply share token symbol
pub const SHARE_SYMBOL_PREFIX: &str = "l";

/// Construction-time settings of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub interest_rate_model: JumpRateModel,
    /// Share of borrow interest kept as reserves (WAD, at most 1.0)
    pub reserve_factor: U256,
    /// Reject repayments larger than the outstanding debt instead of clamping
    pub strict_repay: bool,
    /// Exchange rate used while the pool has no supply shares
    pub initial_exchange_rate: U256,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            interest_rate_model: JumpRateModel::zero(),
            reserve_factor: U256::ZERO,
            strict_repay: false,
            initial_exchange_rate: WAD,
        }
    }
}

/// Lending pool for one asset.
#[derive(Debug, Clone)]
pub struct Pool {
    /// The underlying asset
    pub asset: Address,

    /// Account that holds the pool's cash in the asset's token ledger
    pub address: Address,

    /// Decimals of the underlying asset, also the decimals of supply shares
    pub decimals: u8,

    /// Name of the supply share token ("Lendloop Dai Stablecoin")
    pub name: String,

    /// Symbol of the supply share token ("lDAI")
    pub symbol: String,

    /// Underlying held by the pool and available to borrow or withdraw
    pub cash: U256,

    /// Outstanding debt of all borrowers, including accrued interest
    pub total_borrows: U256,

    /// Part of accrued interest set aside for the protocol
    pub total_reserves: U256,

    /// Supply shares outstanding
    pub total_supply_shares: U256,

    /// Cumulative borrow interest multiplier (WAD, starts at 1.0)
    pub borrow_index: U256,

    /// Timestamp (seconds) of the last accrual
    pub last_accrual_timestamp: u64,

    /// Share of interest routed to reserves (WAD)
    pub reserve_factor: U256,

    pub interest_rate_model: JumpRateModel,

    /// Exchange rate used while `total_supply_shares` is zero
    pub initial_exchange_rate: U256,

    /// Whether overpaying a debt is an error rather than clamped
    pub strict_repay: bool,

    positions: BTreeMap<Address, AccountPosition>,
    borrow_allowances: BTreeMap<(Address, Address), U256>,
}

impl Pool {
    /// Creates an empty pool at `timestamp`.
    ///
    /// # Errors
    ///
    /// - [`LendingError::InvalidFactor`] if the reserve factor exceeds 1.0
    /// - [`LendingError::InvalidRange`] if the initial exchange rate is zero
    pub fn new(
        asset: Address,
        address: Address,
        decimals: u8,
        config: PoolConfig,
        timestamp: u64,
    ) -> Result<Self, LendingError> {
        if config.reserve_factor > WAD {
            return Err(LendingError::InvalidFactor {
                value: config.reserve_factor,
            });
        }
        if config.initial_exchange_rate.is_zero() {
            return Err(LendingError::InvalidRange {
                name: "initial exchange rate",
                value: config.initial_exchange_rate,
                min: U256::from(1),
                max: U256::MAX,
            });
        }

        Ok(Self {
            asset,
            address,
            decimals,
            name: String::new(),
            symbol: String::new(),
            cash: U256::ZERO,
            total_borrows: U256::ZERO,
            total_reserves: U256::ZERO,
            total_supply_shares: U256::ZERO,
            borrow_index: WAD,
            last_accrual_timestamp: timestamp,
            reserve_factor: config.reserve_factor,
            interest_rate_model: config.interest_rate_model,
            initial_exchange_rate: config.initial_exchange_rate,
            strict_repay: config.strict_repay,
            positions: BTreeMap::new(),
            borrow_allowances: BTreeMap::new(),
        })
    }

    /// Names the pool's supply shares after `token`, its underlying.
    pub fn with_token_metadata(mut self, token: &Token) -> Self {
        self.name = format!("{} {}", SHARE_NAME_PREFIX, token.name);
        self.symbol = format!("{}{}", SHARE_SYMBOL_PREFIX, token.symbol);
        self
    }

    // ==================== Queries ====================

    /// The underlying asset
    pub fn underlying(&self) -> Address {
        self.asset
    }

    /// The account's position (empty if it never interacted with the pool)
    pub fn position(&self, account: Address) -> AccountPosition {
        self.positions.get(&account).copied().unwrap_or_default()
    }

    /// Every account that has interacted with the pool
    pub fn positions(&self) -> impl Iterator<Item = (&Address, &AccountPosition)> {
        self.positions.iter()
    }

    /// Underlying owed to suppliers: `cash + total_borrows - total_reserves`
    pub fn total_underlying(&self) -> U256 {
        zero_floor_sub(self.cash + self.total_borrows, self.total_reserves)
    }

    /// Underlying per supply share (WAD), at stored state
    pub fn exchange_rate_stored(&self) -> U256 {
        if self.total_supply_shares.is_zero() {
            return self.initial_exchange_rate;
        }
        mul_div_down(self.total_underlying(), WAD, self.total_supply_shares)
    }

    /// Supply shares held by `account`
    pub fn balance_of(&self, account: Address) -> U256 {
        self.position(account).supply_shares
    }

    /// Underlying value of `account`'s supply shares, at stored state
    pub fn balance_of_underlying(&self, account: Address) -> U256 {
        self.position(account)
            .supply_underlying(self.exchange_rate_stored(), RoundingDirection::Down)
    }

    /// Debt of `account` at the stored borrow index (no accrual)
    pub fn borrow_balance_stored(&self, account: Address) -> U256 {
        self.position(account).borrow_balance(self.borrow_index)
    }

    pub fn account_snapshot(&self, account: Address) -> AccountSnapshot {
        let position = self.position(account);
        let exchange_rate = self.exchange_rate_stored();
        AccountSnapshot {
            supply_shares: position.supply_shares,
            supply_underlying: position.supply_underlying(exchange_rate, RoundingDirection::Down),
            borrow_balance: position.borrow_balance(self.borrow_index),
            exchange_rate,
        }
    }

    /// Utilization, borrow rate and supply rate at stored state
    pub fn rates(&self) -> InterestRates {
        self.interest_rate_model.rates(
            self.cash,
            self.total_borrows,
            self.total_reserves,
            self.reserve_factor,
        )
    }

    pub fn utilization(&self) -> U256 {
        self.rates().utilization
    }

    /// Borrow APY implied by the current borrow rate
    pub fn borrow_apy(&self) -> f64 {
        rate_to_apy(self.rates().borrow_rate)
    }

    /// Supply APY implied by the current supply rate
    pub fn supply_apy(&self) -> f64 {
        rate_to_apy(self.rates().supply_rate)
    }

    /// Shares that must be burned to withdraw `amount` underlying (rounded up)
    pub fn shares_for_underlying(&self, amount: U256) -> U256 {
        mul_div(amount, WAD, self.exchange_rate_stored(), RoundingDirection::Up)
    }

    /// Borrowing power `borrower` has delegated to `delegatee`
    pub fn borrow_allowance(&self, borrower: Address, delegatee: Address) -> U256 {
        self.borrow_allowances
            .get(&(borrower, delegatee))
            .copied()
            .unwrap_or_default()
    }

    // ==================== Interest ====================

    /// Accrues interest up to `timestamp`.
    ///
    /// # How Interest Accrual Works
    ///
    /// 1. Calculate elapsed time since `last_accrual_timestamp`
    /// 2. Ask the rate model for the borrow rate at current utilization
    /// 3. `factor = rate * elapsed` (simple interest over the period)
    /// 4. `interest = total_borrows * factor`, added to `total_borrows`
    /// 5. `interest * reserve_factor` is added to `total_reserves`
    /// 6. `borrow_index *= 1 + factor`
    ///
    /// Idempotent: a second call with the same timestamp changes nothing. A
    /// zero-rate model only moves the timestamp.
    ///
    /// # Returns
    ///
    /// The interest accrued over the period.
    ///
    /// # Errors
    ///
    /// - [`LendingError::InvalidInterestAccrual`] if `timestamp` is before the last accrual
    /// - [`LendingError::BorrowRateTooHigh`] if the model exceeds [`MAX_BORROW_RATE_PER_SECOND`]
    pub fn accrue_interest(&mut self, timestamp: u64) -> Result<U256, LendingError> {
        if timestamp < self.last_accrual_timestamp {
            return Err(LendingError::InvalidInterestAccrual {
                timestamp,
                last_update: self.last_accrual_timestamp,
            });
        }
        let elapsed = timestamp - self.last_accrual_timestamp;
        if elapsed == 0 {
            return Ok(U256::ZERO);
        }
        if self.interest_rate_model.is_zero() {
            self.last_accrual_timestamp = timestamp;
            return Ok(U256::ZERO);
        }

        let borrow_rate =
            self.interest_rate_model
                .borrow_rate(self.cash, self.total_borrows, self.total_reserves);
        if borrow_rate > MAX_BORROW_RATE_PER_SECOND {
            return Err(LendingError::BorrowRateTooHigh {
                rate: borrow_rate,
                max: MAX_BORROW_RATE_PER_SECOND,
            });
        }

        let AccruedInterest {
            interest,
            reserves_added,
            index_added,
        } = get_accrued_interest(
            borrow_rate,
            self.total_borrows,
            self.borrow_index,
            self.reserve_factor,
            elapsed,
        );

        self.total_borrows += interest;
        self.total_reserves += reserves_added;
        self.borrow_index += index_added;
        self.last_accrual_timestamp = timestamp;

        tracing::debug!(
            asset = %self.asset,
            elapsed,
            %borrow_rate,
            %interest,
            borrow_index = %self.borrow_index,
            "interest accrued"
        );
        Ok(interest)
    }

    // ==================== Supplier Operations ====================

    /// Deposits `amount` of the underlying from `payer` and credits the
    /// minted shares to `account`.
    ///
    /// Shares are minted at the pre-deposit exchange rate, rounded down:
    /// ```text
    /// shares = amount / exchange_rate
    /// ```
    ///
    /// # Returns
    ///
    /// The number of shares minted.
    ///
    /// # Errors
    ///
    /// - [`LendingError::InvalidAmount`] if `amount` is zero or too small to mint a share
    /// - [`LendingError::InsufficientBalance`] if `payer` cannot fund the transfer
    pub fn deposit(
        &mut self,
        token: &mut Token,
        payer: Address,
        account: Address,
        amount: U256,
        timestamp: u64,
    ) -> Result<U256, LendingError> {
        self.accrue_interest(timestamp)?;
        if amount.is_zero() {
            return Err(LendingError::InvalidAmount);
        }

        let shares = self.preview_deposit(amount);
        if shares.is_zero() {
            return Err(LendingError::InvalidAmount);
        }

        token.transfer(payer, self.address, amount)?;

        self.cash += amount;
        self.total_supply_shares += shares;
        self.positions.entry(account).or_default().supply_shares += shares;

        tracing::debug!(asset = %self.asset, %account, %amount, %shares, "deposit");
        Ok(shares)
    }

    /// Shares a deposit of `amount` would mint at stored state, rounded down
    pub fn preview_deposit(&self, amount: U256) -> U256 {
        mul_div_down(amount, WAD, self.exchange_rate_stored())
    }

    /// Underlying paid out for burning `shares` of `account`, at stored state.
    ///
    /// Validates the withdrawal without performing it.
    ///
    /// # Errors
    ///
    /// - [`LendingError::InvalidAmount`] if `shares` is zero or worth nothing
    /// - [`LendingError::InsufficientShares`] if `account` holds fewer shares
    /// - [`LendingError::InsufficientLiquidity`] if the pool lacks the cash
    pub fn preview_withdraw(&self, account: Address, shares: U256) -> Result<U256, LendingError> {
        if shares.is_zero() {
            return Err(LendingError::InvalidAmount);
        }
        let held = self.balance_of(account);
        if shares > held {
            return Err(LendingError::InsufficientShares {
                account,
                asset: self.asset,
                needed: shares,
                available: held,
            });
        }

        let amount = mul_div_down(shares, self.exchange_rate_stored(), WAD);
        if amount.is_zero() {
            return Err(LendingError::InvalidAmount);
        }
        if amount > self.cash {
            return Err(LendingError::InsufficientLiquidity {
                asset: self.asset,
                requested: amount,
                cash: self.cash,
            });
        }
        Ok(amount)
    }

    /// Burns `shares` of `account` and pays the underlying out to it.
    ///
    /// The solvency check belongs to the controller; callers must run it
    /// before calling this.
    ///
    /// # Returns
    ///
    /// The underlying amount paid out.
    pub fn withdraw(
        &mut self,
        token: &mut Token,
        account: Address,
        shares: U256,
        timestamp: u64,
    ) -> Result<U256, LendingError> {
        self.accrue_interest(timestamp)?;
        let amount = self.preview_withdraw(account, shares)?;

        token.transfer(self.address, account, amount)?;

        self.cash -= amount;
        self.total_supply_shares -= shares;
        self.positions.entry(account).or_default().supply_shares -= shares;

        tracing::debug!(asset = %self.asset, %account, %amount, %shares, "withdraw");
        Ok(amount)
    }

    // ==================== Borrower Operations ====================

    /// Lends `amount` of cash to `borrower`, paying it out to `receiver`.
    ///
    /// Interest accrued on the existing debt is folded into the principal
    /// before the new amount is added, and the snapshot moves to the current
    /// borrow index.
    ///
    /// This only updates pool state. Collateral checks happen in
    /// [`crate::Controller::authorize_borrow`], which [`crate::LendingMarket`]
    /// runs before calling this.
    ///
    /// # Errors
    ///
    /// - [`LendingError::InvalidAmount`] if `amount` is zero
    /// - [`LendingError::InsufficientLiquidity`] if `amount > cash`
    pub fn borrow(
        &mut self,
        token: &mut Token,
        borrower: Address,
        receiver: Address,
        amount: U256,
        timestamp: u64,
    ) -> Result<(), LendingError> {
        self.accrue_interest(timestamp)?;
        self.check_borrowable(amount)?;

        token.transfer(self.address, receiver, amount)?;

        let balance = self.borrow_balance_stored(borrower) + amount;
        let borrow_index = self.borrow_index;
        self.positions
            .entry(borrower)
            .or_default()
            .set_borrow(balance, borrow_index);
        self.total_borrows += amount;
        self.cash -= amount;

        tracing::debug!(asset = %self.asset, %borrower, %amount, %balance, "borrow");
        Ok(())
    }

    /// Checks that `amount` can be lent out of current cash
    pub fn check_borrowable(&self, amount: U256) -> Result<(), LendingError> {
        if amount.is_zero() {
            return Err(LendingError::InvalidAmount);
        }
        if amount > self.cash {
            return Err(LendingError::InsufficientLiquidity {
                asset: self.asset,
                requested: amount,
                cash: self.cash,
            });
        }
        Ok(())
    }

    /// Repays up to `amount` of `borrower`'s debt with `payer`'s tokens.
    ///
    /// `U256::MAX` repays the whole debt. A larger amount than owed is clamped
    /// to the debt, so only what is owed leaves the payer; with
    /// `strict_repay` it is rejected instead.
    ///
    /// # Returns
    ///
    /// The amount actually repaid.
    ///
    /// # Errors
    ///
    /// - [`LendingError::InvalidAmount`] if `amount` is zero
    /// - [`LendingError::RepayExceedsDebt`] on overpayment in strict mode
    /// - [`LendingError::InsufficientBalance`] if `payer` cannot fund the transfer
    pub fn repay(
        &mut self,
        token: &mut Token,
        payer: Address,
        borrower: Address,
        amount: U256,
        timestamp: u64,
    ) -> Result<U256, LendingError> {
        self.accrue_interest(timestamp)?;
        if amount.is_zero() {
            return Err(LendingError::InvalidAmount);
        }

        let owed = self.borrow_balance_stored(borrower);
        let repay_amount = if amount == U256::MAX {
            owed
        } else if amount > owed {
            if self.strict_repay {
                return Err(LendingError::RepayExceedsDebt {
                    account: borrower,
                    asset: self.asset,
                    owed,
                    requested: amount,
                });
            }
            owed
        } else {
            amount
        };
        if repay_amount.is_zero() {
            return Ok(U256::ZERO);
        }

        token.transfer(payer, self.address, repay_amount)?;

        let borrow_index = self.borrow_index;
        self.positions
            .entry(borrower)
            .or_default()
            .set_borrow(owed - repay_amount, borrow_index);
        self.total_borrows = zero_floor_sub(self.total_borrows, repay_amount);
        self.cash += repay_amount;

        tracing::debug!(asset = %self.asset, %borrower, %payer, amount = %repay_amount, "repay");
        Ok(repay_amount)
    }

    /// Lets `delegatee` borrow up to `amount` on `borrower`'s account
    pub fn approve_delegate(&mut self, borrower: Address, delegatee: Address, amount: U256) {
        self.borrow_allowances.insert((borrower, delegatee), amount);
    }

    /// Checks that `delegatee` may borrow `amount` for `borrower`
    pub fn check_delegation(
        &self,
        borrower: Address,
        delegatee: Address,
        amount: U256,
    ) -> Result<(), LendingError> {
        if borrower == delegatee {
            return Ok(());
        }
        let available = self.borrow_allowance(borrower, delegatee);
        if available < amount {
            return Err(LendingError::InsufficientDelegation {
                borrower,
                delegatee,
                asset: self.asset,
                needed: amount,
                available,
            });
        }
        Ok(())
    }

    /// Consumes `amount` of delegated borrowing power
    pub fn spend_delegation(
        &mut self,
        borrower: Address,
        delegatee: Address,
        amount: U256,
    ) -> Result<(), LendingError> {
        self.check_delegation(borrower, delegatee, amount)?;
        if borrower == delegatee {
            return Ok(());
        }
        let available = self.borrow_allowance(borrower, delegatee);
        if available != U256::MAX {
            self.borrow_allowances
                .insert((borrower, delegatee), available - amount);
        }
        Ok(())
    }

    // ==================== Administration ====================

    /// Changes the reserve factor after accruing at the old one
    pub fn set_reserve_factor(&mut self, reserve_factor: U256, timestamp: u64) -> Result<(), LendingError> {
        if reserve_factor > WAD {
            return Err(LendingError::InvalidFactor {
                value: reserve_factor,
            });
        }
        self.accrue_interest(timestamp)?;
        self.reserve_factor = reserve_factor;
        Ok(())
    }

    /// Swaps the rate model after accruing at the old one
    pub fn set_interest_rate_model(
        &mut self,
        interest_rate_model: JumpRateModel,
        timestamp: u64,
    ) -> Result<(), LendingError> {
        self.accrue_interest(timestamp)?;
        self.interest_rate_model = interest_rate_model;
        Ok(())
    }

    /// Pays `amount` of reserves out of the pool to `to`
    ///
    /// # Errors
    ///
    /// - [`LendingError::InsufficientReserves`] if `amount > total_reserves`
    /// - [`LendingError::InsufficientLiquidity`] if `amount > cash`
    pub fn reduce_reserves(
        &mut self,
        token: &mut Token,
        to: Address,
        amount: U256,
        timestamp: u64,
    ) -> Result<(), LendingError> {
        self.accrue_interest(timestamp)?;
        if amount > self.total_reserves {
            return Err(LendingError::InsufficientReserves {
                asset: self.asset,
                requested: amount,
                reserves: self.total_reserves,
            });
        }
        if amount > self.cash {
            return Err(LendingError::InsufficientLiquidity {
                asset: self.asset,
                requested: amount,
                cash: self.cash,
            });
        }

        token.transfer(self.address, to, amount)?;
        self.total_reserves -= amount;
        self.cash -= amount;

        tracing::info!(asset = %self.asset, %to, %amount, "reserves reduced");
        Ok(())
    }
}

/// Result of an accrual calculation
struct AccruedInterest {
    /// Interest added to total borrows
    interest: U256,
    /// Part of the interest set aside as reserves
    reserves_added: U256,
    /// Growth of the borrow index
    index_added: U256,
}

/// Simple interest over `elapsed` seconds at `borrow_rate`
fn get_accrued_interest(
    borrow_rate: U256,
    total_borrows: U256,
    borrow_index: U256,
    reserve_factor: U256,
    elapsed: u64,
) -> AccruedInterest {
    let factor = borrow_rate * U256::from(elapsed);
    let interest = w_mul_down(total_borrows, factor);

    AccruedInterest {
        interest,
        reserves_added: w_mul_down(interest, reserve_factor),
        index_added: w_mul_down(borrow_index, factor),
    }
}
