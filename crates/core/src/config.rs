//! Scenario configuration.
//!
//! A [`ScenarioConfig`] describes a complete market setup in JSON: listed
//! assets with their prices and risk parameters, seeded liquidity and funded
//! accounts. [`ScenarioConfig::build`] turns it into a ready
//! [`LendingMarket`].
//!
//! Amounts and prices are human-readable decimal strings ("2000", "0.5");
//! risk parameters are basis points.
//!
//! ```json
//! {
//!   "close_factor_bps": 5000,
//!   "markets": [
//!     { "symbol": "DAI", "name": "Dai Stablecoin", "decimals": 18, "price": "1", "collateral_factor_bps": 9000, "liquidity": "100000" }
//!   ],
//!   "accounts": [
//!     { "address": "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1", "balances": { "DAI": "2000" } }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;

use alloy_primitives::{keccak256, Address, U256};
use serde::{Deserialize, Serialize};

use crate::controller::Controller;
use crate::error::LendingError;
use crate::irm::JumpRateModel;
use crate::lending::{LendingMarket, ListingRequest};
use crate::leverager::Leverager;
use crate::math::{bps_to_wad, parse_units, WAD};
use crate::oracle::FixedPriceOracle;
use crate::pool::PoolConfig;
use crate::token::Token;

/// Account that supplies each market's seeded liquidity
pub const LIQUIDITY_PROVIDER: Address = Address::new([0x11; 20]);

/// Leverager account used when the scenario does not name one
pub const DEFAULT_LEVERAGER: Address = Address::new([0x1e; 20]);

/// Decimals of every oracle price
const PRICE_DECIMALS: u8 = 18;

fn default_close_factor_bps() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

/// Jump-rate parameters, all yearly and in basis points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RateModelConfig {
    #[serde(default)]
    pub base_bps: u64,
    #[serde(default)]
    pub multiplier_bps: u64,
    #[serde(default)]
    pub jump_multiplier_bps: u64,
    #[serde(default)]
    pub kink_bps: u64,
}

impl RateModelConfig {
    pub fn to_model(&self) -> JumpRateModel {
        JumpRateModel::from_yearly_bps(self.base_bps, self.multiplier_bps, self.jump_multiplier_bps, self.kink_bps)
    }
}

/// One listed asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub symbol: String,
    /// Underlying token name; the symbol when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Token address; derived from the symbol when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub decimals: u8,
    /// Quote price of one whole token
    pub price: String,
    pub collateral_factor_bps: u64,
    #[serde(default)]
    pub reserve_factor_bps: u64,
    #[serde(default)]
    pub rate_model: RateModelConfig,
    /// Supplied by [`LIQUIDITY_PROVIDER`] at build time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borrow_cap: Option<String>,
}

impl MarketConfig {
    pub fn asset_address(&self) -> Address {
        self.address
            .unwrap_or_else(|| Address::from_word(keccak256(format!("lendloop:asset:{}", self.symbol))))
    }

    pub fn pool_address(&self) -> Address {
        Address::from_word(keccak256(format!("lendloop:pool:{}", self.symbol)))
    }
}

/// A funded account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub address: Address,
    /// Starting wallet balances by market symbol
    #[serde(default)]
    pub balances: BTreeMap<String, String>,
    /// Grant the leverager unlimited allowance and borrow delegation on every market
    #[serde(default = "default_true")]
    pub approve_leverager: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeveragerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Dust threshold in raw asset units
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dust_threshold: Option<u64>,
    #[serde(default = "default_true")]
    pub atomic: bool,
}

impl Default for LeveragerConfig {
    fn default() -> Self {
        Self {
            address: None,
            dust_threshold: None,
            atomic: true,
        }
    }
}

/// Complete market setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Timestamp (seconds) the markets are created at
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default = "default_close_factor_bps")]
    pub close_factor_bps: u64,
    /// Reject repayments above the outstanding debt in every pool
    #[serde(default)]
    pub strict_repay: bool,
    pub markets: Vec<MarketConfig>,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
    #[serde(default)]
    pub leverager: LeveragerConfig,
}

/// A built scenario
#[derive(Debug)]
pub struct Scenario {
    pub market: LendingMarket,
    pub leverager: Leverager,
    /// Market symbol to asset address
    pub assets: BTreeMap<String, Address>,
    pub timestamp: u64,
}

impl Scenario {
    pub fn asset(&self, symbol: &str) -> Result<Address, LendingError> {
        self.assets
            .get(symbol)
            .copied()
            .ok_or_else(|| LendingError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }
}

impl ScenarioConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Lists every market, seeds liquidity and funds the accounts.
    pub fn build(&self) -> Result<Scenario, LendingError> {
        let mut controller = Controller::new();
        controller.set_close_factor_mantissa(bps_to_wad(self.close_factor_bps))?;

        let mut assets = BTreeMap::new();
        let mut oracle = FixedPriceOracle::new();
        for config in &self.markets {
            let asset = config.asset_address();
            if assets.insert(config.symbol.clone(), asset).is_some() {
                return Err(LendingError::MarketAlreadyListed { asset });
            }
            oracle = oracle.with_price(asset, parse_units(&config.price, PRICE_DECIMALS)?);
        }
        controller.set_price_oracle(Box::new(oracle));

        let leverager = Leverager::new(self.leverager.address.unwrap_or(DEFAULT_LEVERAGER))
            .with_dust_threshold(self.leverager.dust_threshold.map_or(U256::from(1), U256::from))
            .with_atomic(self.leverager.atomic);

        let mut market = LendingMarket::new(controller);
        for config in &self.markets {
            self.list(&mut market, config)?;
        }

        for account in &self.accounts {
            for (symbol, amount) in &account.balances {
                let asset = assets.get(symbol).copied().ok_or_else(|| LendingError::UnknownSymbol {
                    symbol: symbol.clone(),
                })?;
                let decimals = market.token(asset)?.decimals;
                market.mint(asset, account.address, parse_units(amount, decimals)?)?;
            }
            if account.approve_leverager {
                for asset in assets.values() {
                    market.approve(*asset, account.address, leverager.address, U256::MAX)?;
                    market.approve_delegate(*asset, account.address, leverager.address, U256::MAX)?;
                }
            }
        }

        tracing::info!(
            markets = self.markets.len(),
            accounts = self.accounts.len(),
            "scenario built"
        );
        Ok(Scenario {
            market,
            leverager,
            assets,
            timestamp: self.timestamp,
        })
    }

    fn list(&self, market: &mut LendingMarket, config: &MarketConfig) -> Result<(), LendingError> {
        let asset = config.asset_address();
        let mut token = Token::new(asset, config.symbol.clone(), config.decimals);
        if let Some(name) = &config.name {
            token = token.with_name(name.clone());
        }
        market.list_market(
            ListingRequest {
                token,
                pool_address: config.pool_address(),
                pool_config: PoolConfig {
                    interest_rate_model: config.rate_model.to_model(),
                    reserve_factor: bps_to_wad(config.reserve_factor_bps),
                    strict_repay: self.strict_repay,
                    initial_exchange_rate: WAD,
                },
                collateral_factor: bps_to_wad(config.collateral_factor_bps),
            },
            self.timestamp,
        )?;

        if let Some(cap) = &config.borrow_cap {
            market
                .controller
                .set_borrow_cap(asset, parse_units(cap, config.decimals)?)?;
        }
        if let Some(liquidity) = &config.liquidity {
            let amount = parse_units(liquidity, config.decimals)?;
            if !amount.is_zero() {
                market.mint(asset, LIQUIDITY_PROVIDER, amount)?;
                market.deposit(LIQUIDITY_PROVIDER, asset, amount, self.timestamp)?;
            }
        }
        Ok(())
    }
}
