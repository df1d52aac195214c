//! In-memory token ledger used as the transfer boundary of every pool.

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

use crate::error::LendingError;

/// Balances and allowances of a single fungible token.
#[derive(Debug, Clone)]
pub struct Token {
    /// Token address, also the asset identifier of its market
    pub address: Address,
    /// Full name, the symbol unless set with [`Token::with_name`]
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    total_supply: U256,
    balances: BTreeMap<Address, U256>,
    allowances: BTreeMap<(Address, Address), U256>,
}

impl Token {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        let symbol = symbol.into();
        Self {
            address,
            name: symbol.clone(),
            symbol,
            decimals,
            total_supply: U256::ZERO,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    /// Creates `amount` new tokens for `to`
    pub fn mint(&mut self, to: Address, amount: U256) {
        self.total_supply += amount;
        *self.balances.entry(to).or_default() += amount;
    }

    /// Sets the amount `spender` may move out of `owner`'s balance
    pub fn approve(&mut self, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((owner, spender), amount);
    }

    /// Moves `amount` from `from` to `to`. Fails without side effects if
    /// `from` does not hold enough.
    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), LendingError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(LendingError::InsufficientBalance {
                account: from,
                asset: self.address,
                needed: amount,
                available,
            });
        }
        if from == to || amount.is_zero() {
            return Ok(());
        }
        self.balances.insert(from, available - amount);
        *self.balances.entry(to).or_default() += amount;
        Ok(())
    }

    /// Moves `amount` from `owner` to `to` on behalf of `spender`, consuming
    /// allowance. An owner moving its own tokens needs no allowance.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), LendingError> {
        if spender == owner {
            return self.transfer(owner, to, amount);
        }

        let allowed = self.allowance(owner, spender);
        if allowed < amount {
            return Err(LendingError::InsufficientAllowance {
                owner,
                spender,
                asset: self.address,
                needed: amount,
                available: allowed,
            });
        }
        self.transfer(owner, to, amount)?;
        if allowed != U256::MAX {
            self.allowances.insert((owner, spender), allowed - amount);
        }
        Ok(())
    }
}
