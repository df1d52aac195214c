//! Price oracle boundary.
//!
//! Prices are WAD-scaled quote units per whole token (1e18 == 1.0), so a
//! price does not depend on the token's decimals.

use std::collections::BTreeMap;
use std::fmt::Debug;

use alloy_primitives::{Address, U256};

/// Scale of every oracle price
pub const PRICE_PRECISION: U256 = crate::math::WAD;

/// Source of unit prices for listed assets.
///
/// The controller and leverager treat the oracle as synchronous and always
/// available; a missing price is a configuration error.
pub trait PriceOracle: Debug + Send + Sync {
    /// Unit price of `asset`, or `None` when the asset is unknown
    fn get_price(&self, asset: Address) -> Option<U256>;

    /// Pins `asset` to a fixed price
    fn set_fixed_price(&mut self, asset: Address, price: U256);
}

/// Oracle backed by a table of fixed prices.
#[derive(Debug, Clone, Default)]
pub struct FixedPriceOracle {
    prices: BTreeMap<Address, U256>,
}

impl FixedPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`PriceOracle::set_fixed_price`]
    pub fn with_price(mut self, asset: Address, price: U256) -> Self {
        self.prices.insert(asset, price);
        self
    }
}

impl PriceOracle for FixedPriceOracle {
    fn get_price(&self, asset: Address) -> Option<U256> {
        self.prices.get(&asset).copied()
    }

    fn set_fixed_price(&mut self, asset: Address, price: U256) {
        tracing::debug!(%asset, %price, "fixed price set");
        self.prices.insert(asset, price);
    }
}
