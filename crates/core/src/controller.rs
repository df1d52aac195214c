//! Market registry and collateral policy.
//!
//! The [`Controller`] owns every [`MarketListing`], the price oracle and the
//! global close factor. It never moves funds: pools ask it whether an action
//! is allowed and it answers from the stored pool state.
//!
//! # Account Liquidity
//!
//! ```text
//! collateral_value = Σ supply_underlying(m) * price(m) / 10^decimals(m) * collateral_factor(m)
//! borrow_value     = Σ borrow_balance(m)    * price(m) / 10^decimals(m)
//! ```
//!
//! The sums run over the markets the account has entered. Collateral rounds
//! down and debt rounds up, so rounding never authorizes a borrow that the
//! exact values would reject.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{Address, U256};
use serde::Serialize;

use crate::error::LendingError;
use crate::math::{amount_to_value, w_mul_down, zero_floor_sub, RoundingDirection, WAD};
use crate::oracle::PriceOracle;
use crate::pool::Pool;

/// Controller-side configuration of one listed asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketListing {
    pub asset: Address,
    /// Address of the pool serving the asset
    pub pool: Address,
    /// Fraction of supplied value usable as borrowing power (WAD, at most 1.0)
    pub collateral_factor: U256,
    pub is_listed: bool,
    pub mint_paused: bool,
    pub borrow_paused: bool,
    /// Ceiling on the pool's total borrows; zero means uncapped
    pub borrow_cap: U256,
    entered_by: BTreeSet<Address>,
}

impl MarketListing {
    /// Whether `account` counts this market toward its liquidity
    pub fn is_entered_by(&self, account: Address) -> bool {
        self.entered_by.contains(&account)
    }

    pub fn entered_accounts(&self) -> impl Iterator<Item = &Address> {
        self.entered_by.iter()
    }
}

/// Aggregate collateral and debt of an account, in quote value (WAD)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AccountLiquidity {
    /// Supplied value weighted by collateral factors
    pub collateral_value: U256,
    pub borrow_value: U256,
}

impl AccountLiquidity {
    /// Unused borrowing power
    pub fn liquidity(&self) -> U256 {
        zero_floor_sub(self.collateral_value, self.borrow_value)
    }

    /// Debt not covered by collateral
    pub fn shortfall(&self) -> U256 {
        zero_floor_sub(self.borrow_value, self.collateral_value)
    }

    pub fn is_solvent(&self) -> bool {
        self.borrow_value <= self.collateral_value
    }
}

/// A pending change to one market, applied before liquidity is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HypotheticalAction {
    pub asset: Address,
    /// Underlying about to leave the account's supply
    pub redeem_amount: U256,
    /// Underlying about to be added to the account's debt
    pub borrow_amount: U256,
}

impl HypotheticalAction {
    pub fn redeem(asset: Address, amount: U256) -> Self {
        Self {
            asset,
            redeem_amount: amount,
            borrow_amount: U256::ZERO,
        }
    }

    pub fn borrow(asset: Address, amount: U256) -> Self {
        Self {
            asset,
            redeem_amount: U256::ZERO,
            borrow_amount: amount,
        }
    }
}

/// An account's standing in a single market, in quote value (WAD)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarketValues {
    pub price: U256,
    pub collateral_factor: U256,
    /// Value of the supplied underlying
    pub supply_value: U256,
    /// `supply_value * collateral_factor`
    pub collateral_value: U256,
    pub borrow_value: U256,
}

/// Controller state that can be saved and restored
#[derive(Debug, Clone)]
pub struct ControllerCheckpoint {
    markets: BTreeMap<Address, MarketListing>,
    close_factor: U256,
}

/// Registry of listed markets with the collateral checks built on it.
#[derive(Debug, Default)]
pub struct Controller {
    markets: BTreeMap<Address, MarketListing>,
    oracle: Option<Box<dyn PriceOracle>>,
    close_factor: U256,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Configuration ====================

    /// Lists `pool`'s asset with the given collateral factor.
    ///
    /// # Errors
    ///
    /// - [`LendingError::InvalidFactor`] if `collateral_factor` exceeds 1.0
    /// - [`LendingError::MarketAlreadyListed`] if the asset is already listed
    pub fn support_market_with_collateral_factor(
        &mut self,
        pool: &Pool,
        collateral_factor: U256,
    ) -> Result<(), LendingError> {
        if collateral_factor > WAD {
            return Err(LendingError::InvalidFactor {
                value: collateral_factor,
            });
        }
        if self.markets.contains_key(&pool.asset) {
            return Err(LendingError::MarketAlreadyListed { asset: pool.asset });
        }

        self.markets.insert(
            pool.asset,
            MarketListing {
                asset: pool.asset,
                pool: pool.address,
                collateral_factor,
                is_listed: true,
                mint_paused: false,
                borrow_paused: false,
                borrow_cap: U256::ZERO,
                entered_by: BTreeSet::new(),
            },
        );

        tracing::info!(asset = %pool.asset, pool = %pool.address, %collateral_factor, "market listed");
        Ok(())
    }

    pub fn set_price_oracle(&mut self, oracle: Box<dyn PriceOracle>) {
        self.oracle = Some(oracle);
    }

    pub fn oracle(&self) -> Option<&dyn PriceOracle> {
        self.oracle.as_deref()
    }

    /// Pins `asset` to `price` on the configured oracle
    pub fn set_fixed_price(&mut self, asset: Address, price: U256) -> Result<(), LendingError> {
        let oracle = self.oracle.as_deref_mut().ok_or(LendingError::OracleNotSet)?;
        oracle.set_fixed_price(asset, price);
        Ok(())
    }

    /// Sets the share of a borrow repayable in one liquidation (WAD, in [0, 1])
    pub fn set_close_factor_mantissa(&mut self, close_factor: U256) -> Result<(), LendingError> {
        if close_factor > WAD {
            return Err(LendingError::InvalidRange {
                name: "close factor",
                value: close_factor,
                min: U256::ZERO,
                max: WAD,
            });
        }
        self.close_factor = close_factor;
        Ok(())
    }

    pub fn close_factor(&self) -> U256 {
        self.close_factor
    }

    pub fn set_collateral_factor(&mut self, asset: Address, collateral_factor: U256) -> Result<(), LendingError> {
        if collateral_factor > WAD {
            return Err(LendingError::InvalidFactor {
                value: collateral_factor,
            });
        }
        let listing = self.listing_mut(asset)?;
        let old = listing.collateral_factor;
        listing.collateral_factor = collateral_factor;

        tracing::info!(%asset, %old, new = %collateral_factor, "collateral factor updated");
        Ok(())
    }

    pub fn set_mint_paused(&mut self, asset: Address, paused: bool) -> Result<(), LendingError> {
        self.listing_mut(asset)?.mint_paused = paused;
        Ok(())
    }

    pub fn set_borrow_paused(&mut self, asset: Address, paused: bool) -> Result<(), LendingError> {
        self.listing_mut(asset)?.borrow_paused = paused;
        Ok(())
    }

    /// Caps the pool's total borrows; zero removes the cap
    pub fn set_borrow_cap(&mut self, asset: Address, cap: U256) -> Result<(), LendingError> {
        self.listing_mut(asset)?.borrow_cap = cap;
        Ok(())
    }

    // ==================== Registry ====================

    pub fn listing(&self, asset: Address) -> Result<&MarketListing, LendingError> {
        self.markets
            .get(&asset)
            .filter(|listing| listing.is_listed)
            .ok_or(LendingError::MarketNotListed { asset })
    }

    fn listing_mut(&mut self, asset: Address) -> Result<&mut MarketListing, LendingError> {
        self.markets
            .get_mut(&asset)
            .filter(|listing| listing.is_listed)
            .ok_or(LendingError::MarketNotListed { asset })
    }

    pub fn is_listed(&self, asset: Address) -> bool {
        self.listing(asset).is_ok()
    }

    pub fn markets(&self) -> impl Iterator<Item = &MarketListing> {
        self.markets.values()
    }

    /// Markets `account` has entered, in asset order
    pub fn assets_in(&self, account: Address) -> Vec<Address> {
        self.markets
            .values()
            .filter(|listing| listing.is_entered_by(account))
            .map(|listing| listing.asset)
            .collect()
    }

    /// Starts counting each of `assets` toward `account`'s liquidity
    pub fn enter_markets(&mut self, account: Address, assets: &[Address]) -> Result<(), LendingError> {
        for asset in assets {
            self.listing(*asset)?;
        }
        for asset in assets {
            if let Some(listing) = self.markets.get_mut(asset) {
                if listing.entered_by.insert(account) {
                    tracing::debug!(%account, %asset, "market entered");
                }
            }
        }
        Ok(())
    }

    /// Stops counting `asset` toward `account`'s liquidity.
    ///
    /// # Errors
    ///
    /// - [`LendingError::ExitMarketRejected`] if the account still owes the
    ///   market, or dropping its collateral would leave a shortfall
    pub fn exit_market(
        &mut self,
        account: Address,
        asset: Address,
        pools: &BTreeMap<Address, Pool>,
    ) -> Result<(), LendingError> {
        let listing = self.listing(asset)?;
        if !listing.is_entered_by(account) {
            return Ok(());
        }

        let pool = pools.get(&asset).ok_or(LendingError::MarketNotListed { asset })?;
        if !pool.borrow_balance_stored(account).is_zero() {
            return Err(LendingError::ExitMarketRejected { account, asset });
        }
        let action = HypotheticalAction::redeem(asset, pool.balance_of_underlying(account));
        let liquidity = self.hypothetical_account_liquidity(account, pools, Some(action))?;
        if !liquidity.is_solvent() {
            return Err(LendingError::ExitMarketRejected { account, asset });
        }

        if let Some(listing) = self.markets.get_mut(&asset) {
            listing.entered_by.remove(&account);
        }
        tracing::debug!(%account, %asset, "market exited");
        Ok(())
    }

    // ==================== Pricing ====================

    /// Oracle price of `asset`.
    ///
    /// A missing or zero price is a configuration error.
    pub fn price_of(&self, asset: Address) -> Result<U256, LendingError> {
        let oracle = self.oracle().ok_or(LendingError::OracleNotSet)?;
        match oracle.get_price(asset) {
            Some(price) if !price.is_zero() => Ok(price),
            _ => Err(LendingError::PriceUnavailable { asset }),
        }
    }

    /// Liquidity of `account` after applying `action` to its balances.
    ///
    /// Covers every entered market plus the action's market. Balances are
    /// read at stored state.
    pub fn hypothetical_account_liquidity(
        &self,
        account: Address,
        pools: &BTreeMap<Address, Pool>,
        action: Option<HypotheticalAction>,
    ) -> Result<AccountLiquidity, LendingError> {
        let mut liquidity = AccountLiquidity::default();

        for listing in self.markets.values() {
            let is_action_market = action.is_some_and(|a| a.asset == listing.asset);
            if !listing.is_listed || !(listing.is_entered_by(account) || is_action_market) {
                continue;
            }

            let pool = pools
                .get(&listing.asset)
                .ok_or(LendingError::MarketNotListed { asset: listing.asset })?;
            let price = self.price_of(listing.asset)?;

            let mut supplied = pool.balance_of_underlying(account);
            let mut borrowed = pool.borrow_balance_stored(account);
            if let Some(action) = action.filter(|_| is_action_market) {
                supplied = zero_floor_sub(supplied, action.redeem_amount);
                borrowed = borrowed.saturating_add(action.borrow_amount);
            }

            let supply_value = amount_to_value(supplied, price, pool.decimals, RoundingDirection::Down);
            liquidity.collateral_value = liquidity
                .collateral_value
                .saturating_add(w_mul_down(supply_value, listing.collateral_factor));
            liquidity.borrow_value = liquidity
                .borrow_value
                .saturating_add(amount_to_value(borrowed, price, pool.decimals, RoundingDirection::Up));
        }

        Ok(liquidity)
    }

    /// `(collateral_value, borrow_value)` of `account` across its entered markets
    pub fn account_liquidity(
        &self,
        account: Address,
        pools: &BTreeMap<Address, Pool>,
    ) -> Result<AccountLiquidity, LendingError> {
        self.hypothetical_account_liquidity(account, pools, None)
    }

    /// Standing of `account` in the single market of `asset`
    pub fn market_values(
        &self,
        account: Address,
        asset: Address,
        pools: &BTreeMap<Address, Pool>,
    ) -> Result<MarketValues, LendingError> {
        let listing = self.listing(asset)?;
        let pool = pools.get(&asset).ok_or(LendingError::MarketNotListed { asset })?;
        let price = self.price_of(asset)?;

        let supply_value = amount_to_value(
            pool.balance_of_underlying(account),
            price,
            pool.decimals,
            RoundingDirection::Down,
        );
        Ok(MarketValues {
            price,
            collateral_factor: listing.collateral_factor,
            supply_value,
            collateral_value: w_mul_down(supply_value, listing.collateral_factor),
            borrow_value: amount_to_value(
                pool.borrow_balance_stored(account),
                price,
                pool.decimals,
                RoundingDirection::Up,
            ),
        })
    }

    // ==================== Authorization ====================

    /// Checks that deposits into `asset` are open
    pub fn authorize_mint(&self, asset: Address) -> Result<(), LendingError> {
        if self.listing(asset)?.mint_paused {
            return Err(LendingError::MintPaused { asset });
        }
        Ok(())
    }

    /// Admission check for new debt.
    ///
    /// Authorized iff `borrow_value + amount * price(asset) <= collateral_value`,
    /// recomputed from current balances and prices on every call.
    ///
    /// # Errors
    ///
    /// - [`LendingError::MarketNotListed`] if `asset` is not listed
    /// - [`LendingError::BorrowPaused`] if borrowing is paused
    /// - [`LendingError::BorrowCapExceeded`] if the pool would exceed its cap
    /// - [`LendingError::BorrowNotAuthorized`] on insufficient collateral
    pub fn authorize_borrow(
        &self,
        account: Address,
        asset: Address,
        amount: U256,
        pools: &BTreeMap<Address, Pool>,
    ) -> Result<(), LendingError> {
        let listing = self.listing(asset)?;
        if listing.borrow_paused {
            return Err(LendingError::BorrowPaused { asset });
        }

        let pool = pools.get(&asset).ok_or(LendingError::MarketNotListed { asset })?;
        if !listing.borrow_cap.is_zero() && pool.total_borrows.saturating_add(amount) > listing.borrow_cap {
            return Err(LendingError::BorrowCapExceeded {
                asset,
                cap: listing.borrow_cap,
            });
        }

        let liquidity =
            self.hypothetical_account_liquidity(account, pools, Some(HypotheticalAction::borrow(asset, amount)))?;
        if !liquidity.is_solvent() {
            return Err(LendingError::BorrowNotAuthorized {
                account,
                asset,
                shortfall: liquidity.shortfall(),
            });
        }
        Ok(())
    }

    /// Solvency check for taking `amount` of underlying out of `asset`'s supply
    pub fn authorize_redeem(
        &self,
        account: Address,
        asset: Address,
        amount: U256,
        pools: &BTreeMap<Address, Pool>,
    ) -> Result<(), LendingError> {
        let listing = self.listing(asset)?;
        // supply outside entered markets backs nothing
        if !listing.is_entered_by(account) {
            return Ok(());
        }

        let liquidity =
            self.hypothetical_account_liquidity(account, pools, Some(HypotheticalAction::redeem(asset, amount)))?;
        if !liquidity.is_solvent() {
            return Err(LendingError::UndercollateralizedAfterWithdraw {
                account,
                asset,
                shortfall: liquidity.shortfall(),
            });
        }
        Ok(())
    }

    /// Largest repayment of `account`'s `asset` debt a liquidator may make
    /// in one call: `close_factor * borrow_balance`
    pub fn max_close_amount(
        &self,
        account: Address,
        asset: Address,
        pools: &BTreeMap<Address, Pool>,
    ) -> Result<U256, LendingError> {
        self.listing(asset)?;
        let pool = pools.get(&asset).ok_or(LendingError::MarketNotListed { asset })?;
        Ok(w_mul_down(pool.borrow_balance_stored(account), self.close_factor))
    }

    // ==================== Checkpoints ====================

    /// Saves the listings and close factor. The oracle is not captured.
    pub fn checkpoint(&self) -> ControllerCheckpoint {
        ControllerCheckpoint {
            markets: self.markets.clone(),
            close_factor: self.close_factor,
        }
    }

    pub fn restore(&mut self, checkpoint: ControllerCheckpoint) {
        self.markets = checkpoint.markets;
        self.close_factor = checkpoint.close_factor;
    }
}
