//! The lending market: controller, pools and token ledgers behind one API.
//!
//! [`LendingMarket`] is the explicit registry every caller works against.
//! Each entry point runs a complete operation:
//!
//! 1. accrue the target pool up to `timestamp`
//! 2. run the controller checks against the accrued state
//! 3. apply the pool primitive, moving tokens through the asset's [`Token`]
//!
//! A failed check returns before anything is written.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

use crate::controller::{AccountLiquidity, Controller, ControllerCheckpoint, MarketValues};
use crate::error::LendingError;
use crate::pool::{Pool, PoolConfig};
use crate::position::AccountSnapshot;
use crate::token::Token;

/// Saved market state, restored by [`LendingMarket::restore`]
#[derive(Debug, Clone)]
pub struct MarketCheckpoint {
    controller: ControllerCheckpoint,
    pools: BTreeMap<Address, Pool>,
    tokens: BTreeMap<Address, Token>,
}

/// Parameters for listing a new market
#[derive(Debug, Clone)]
pub struct ListingRequest {
    pub token: Token,
    /// Account holding the pool's cash
    pub pool_address: Address,
    pub pool_config: PoolConfig,
    pub collateral_factor: U256,
}

/// Controller, pools and tokens of one lending deployment.
#[derive(Debug, Default)]
pub struct LendingMarket {
    pub controller: Controller,
    pools: BTreeMap<Address, Pool>,
    tokens: BTreeMap<Address, Token>,
}

impl LendingMarket {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller,
            pools: BTreeMap::new(),
            tokens: BTreeMap::new(),
        }
    }

    /// Creates a pool for `request.token` and lists it with the controller
    pub fn list_market(&mut self, request: ListingRequest, timestamp: u64) -> Result<(), LendingError> {
        let asset = request.token.address;
        if self.pools.contains_key(&asset) {
            return Err(LendingError::MarketAlreadyListed { asset });
        }

        let pool = Pool::new(
            asset,
            request.pool_address,
            request.token.decimals,
            request.pool_config,
            timestamp,
        )?
        .with_token_metadata(&request.token);
        self.controller
            .support_market_with_collateral_factor(&pool, request.collateral_factor)?;
        self.pools.insert(asset, pool);
        self.tokens.insert(asset, request.token);
        Ok(())
    }

    // ==================== Accessors ====================

    pub fn pools(&self) -> &BTreeMap<Address, Pool> {
        &self.pools
    }

    pub fn pool(&self, asset: Address) -> Result<&Pool, LendingError> {
        self.pools.get(&asset).ok_or(LendingError::MarketNotListed { asset })
    }

    fn pool_mut(&mut self, asset: Address) -> Result<&mut Pool, LendingError> {
        self.pools.get_mut(&asset).ok_or(LendingError::MarketNotListed { asset })
    }

    pub fn token(&self, asset: Address) -> Result<&Token, LendingError> {
        self.tokens.get(&asset).ok_or(LendingError::UnknownToken { asset })
    }

    pub fn token_mut(&mut self, asset: Address) -> Result<&mut Token, LendingError> {
        self.tokens.get_mut(&asset).ok_or(LendingError::UnknownToken { asset })
    }

    /// Pool and token of `asset`, borrowed together
    fn pool_and_token(&mut self, asset: Address) -> Result<(&mut Pool, &mut Token), LendingError> {
        let pool = self.pools.get_mut(&asset).ok_or(LendingError::MarketNotListed { asset })?;
        let token = self.tokens.get_mut(&asset).ok_or(LendingError::UnknownToken { asset })?;
        Ok((pool, token))
    }

    pub fn mint(&mut self, asset: Address, to: Address, amount: U256) -> Result<(), LendingError> {
        self.token_mut(asset)?.mint(to, amount);
        Ok(())
    }

    pub fn approve(&mut self, asset: Address, owner: Address, spender: Address, amount: U256) -> Result<(), LendingError> {
        self.token_mut(asset)?.approve(owner, spender, amount);
        Ok(())
    }

    pub fn set_price(&mut self, asset: Address, price: U256) -> Result<(), LendingError> {
        self.controller.set_fixed_price(asset, price)
    }

    // ==================== Pool Operations ====================

    pub fn accrue_interest(&mut self, asset: Address, timestamp: u64) -> Result<U256, LendingError> {
        self.pool_mut(asset)?.accrue_interest(timestamp)
    }

    /// Deposits `amount` of `account`'s own tokens
    pub fn deposit(&mut self, account: Address, asset: Address, amount: U256, timestamp: u64) -> Result<U256, LendingError> {
        self.deposit_behalf(account, account, asset, amount, timestamp)
    }

    /// Deposits `amount` paid by `payer`, crediting the shares to `account`.
    ///
    /// The market is entered for `account` so the deposit counts as collateral.
    pub fn deposit_behalf(
        &mut self,
        payer: Address,
        account: Address,
        asset: Address,
        amount: U256,
        timestamp: u64,
    ) -> Result<U256, LendingError> {
        self.controller.authorize_mint(asset)?;
        let (pool, token) = self.pool_and_token(asset)?;
        let shares = pool.deposit(token, payer, account, amount, timestamp)?;
        self.controller.enter_markets(account, &[asset])?;
        Ok(shares)
    }

    /// Burns `shares` of `account` and pays out the underlying.
    ///
    /// # Errors
    ///
    /// - [`LendingError::InsufficientShares`] / [`LendingError::InsufficientLiquidity`] from the pool
    /// - [`LendingError::UndercollateralizedAfterWithdraw`] if the remaining
    ///   collateral no longer covers the account's borrows
    pub fn withdraw(&mut self, account: Address, asset: Address, shares: U256, timestamp: u64) -> Result<U256, LendingError> {
        self.pool_mut(asset)?.accrue_interest(timestamp)?;

        let amount = self.pool(asset)?.preview_withdraw(account, shares)?;
        self.controller.authorize_redeem(account, asset, amount, &self.pools)?;

        let (pool, token) = self.pool_and_token(asset)?;
        pool.withdraw(token, account, shares, timestamp)
    }

    /// Withdraws at least `amount` of underlying, burning shares rounded up.
    ///
    /// Returns the underlying paid out.
    pub fn withdraw_underlying(
        &mut self,
        account: Address,
        asset: Address,
        amount: U256,
        timestamp: u64,
    ) -> Result<U256, LendingError> {
        self.pool_mut(asset)?.accrue_interest(timestamp)?;
        if amount.is_zero() {
            return Err(LendingError::InvalidAmount);
        }
        let shares = self.pool(asset)?.shares_for_underlying(amount);
        self.withdraw(account, asset, shares, timestamp)
    }

    /// Borrows `amount` for `account`, paid to `account`
    pub fn borrow(&mut self, account: Address, asset: Address, amount: U256, timestamp: u64) -> Result<(), LendingError> {
        self.borrow_behalf(account, account, asset, amount, timestamp)
    }

    /// Borrows `amount` against `borrower`'s collateral, paid to `delegatee`.
    ///
    /// Unless `delegatee == borrower`, the borrower must have delegated at
    /// least `amount` of borrowing power with [`LendingMarket::approve_delegate`].
    ///
    /// # Errors
    ///
    /// - [`LendingError::InvalidAmount`] if `amount` is zero
    /// - [`LendingError::InsufficientDelegation`] if the delegation is too small
    /// - [`LendingError::BorrowNotAuthorized`] if collateral does not cover the new debt
    /// - [`LendingError::InsufficientLiquidity`] if the pool lacks the cash
    pub fn borrow_behalf(
        &mut self,
        delegatee: Address,
        borrower: Address,
        asset: Address,
        amount: U256,
        timestamp: u64,
    ) -> Result<(), LendingError> {
        let pool = self.pool_mut(asset)?;
        pool.accrue_interest(timestamp)?;
        if amount.is_zero() {
            return Err(LendingError::InvalidAmount);
        }
        pool.check_delegation(borrower, delegatee, amount)?;

        self.controller.authorize_borrow(borrower, asset, amount, &self.pools)?;

        let (pool, token) = self.pool_and_token(asset)?;
        pool.borrow(token, borrower, delegatee, amount, timestamp)?;
        pool.spend_delegation(borrower, delegatee, amount)?;
        self.controller.enter_markets(borrower, &[asset])
    }

    /// Repays up to `amount` of `account`'s debt from its own tokens
    pub fn repay(&mut self, account: Address, asset: Address, amount: U256, timestamp: u64) -> Result<U256, LendingError> {
        self.repay_behalf(account, account, asset, amount, timestamp)
    }

    /// Repays up to `amount` of `borrower`'s debt with `payer`'s tokens
    pub fn repay_behalf(
        &mut self,
        payer: Address,
        borrower: Address,
        asset: Address,
        amount: U256,
        timestamp: u64,
    ) -> Result<U256, LendingError> {
        self.controller.listing(asset)?;
        let (pool, token) = self.pool_and_token(asset)?;
        pool.repay(token, payer, borrower, amount, timestamp)
    }

    /// Lets `delegatee` borrow up to `amount` of `asset` on `borrower`'s account
    pub fn approve_delegate(
        &mut self,
        asset: Address,
        borrower: Address,
        delegatee: Address,
        amount: U256,
    ) -> Result<(), LendingError> {
        self.pool_mut(asset)?.approve_delegate(borrower, delegatee, amount);
        Ok(())
    }

    pub fn enter_markets(&mut self, account: Address, assets: &[Address]) -> Result<(), LendingError> {
        self.controller.enter_markets(account, assets)
    }

    pub fn exit_market(&mut self, account: Address, asset: Address) -> Result<(), LendingError> {
        self.controller.exit_market(account, asset, &self.pools)
    }

    // ==================== Administration ====================

    pub fn set_reserve_factor(&mut self, asset: Address, reserve_factor: U256, timestamp: u64) -> Result<(), LendingError> {
        self.pool_mut(asset)?.set_reserve_factor(reserve_factor, timestamp)
    }

    /// Pays `amount` of `asset` reserves out to `to`
    pub fn reduce_reserves(&mut self, asset: Address, to: Address, amount: U256, timestamp: u64) -> Result<(), LendingError> {
        let (pool, token) = self.pool_and_token(asset)?;
        pool.reduce_reserves(token, to, amount, timestamp)
    }

    // ==================== Queries ====================

    pub fn balance_of(&self, account: Address, asset: Address) -> Result<U256, LendingError> {
        Ok(self.pool(asset)?.balance_of(account))
    }

    pub fn balance_of_underlying(&self, account: Address, asset: Address) -> Result<U256, LendingError> {
        Ok(self.pool(asset)?.balance_of_underlying(account))
    }

    pub fn borrow_balance_stored(&self, account: Address, asset: Address) -> Result<U256, LendingError> {
        Ok(self.pool(asset)?.borrow_balance_stored(account))
    }

    pub fn account_snapshot(&self, account: Address, asset: Address) -> Result<AccountSnapshot, LendingError> {
        Ok(self.pool(asset)?.account_snapshot(account))
    }

    pub fn account_liquidity(&self, account: Address) -> Result<AccountLiquidity, LendingError> {
        self.controller.account_liquidity(account, &self.pools)
    }

    pub fn market_values(&self, account: Address, asset: Address) -> Result<MarketValues, LendingError> {
        self.controller.market_values(account, asset, &self.pools)
    }

    pub fn max_close_amount(&self, account: Address, asset: Address) -> Result<U256, LendingError> {
        self.controller.max_close_amount(account, asset, &self.pools)
    }

    // ==================== Checkpoints ====================

    /// Captures pools, token ledgers and controller listings
    pub fn checkpoint(&self) -> MarketCheckpoint {
        MarketCheckpoint {
            controller: self.controller.checkpoint(),
            pools: self.pools.clone(),
            tokens: self.tokens.clone(),
        }
    }

    pub fn restore(&mut self, checkpoint: MarketCheckpoint) {
        self.controller.restore(checkpoint.controller);
        self.pools = checkpoint.pools;
        self.tokens = checkpoint.tokens;
    }
}
