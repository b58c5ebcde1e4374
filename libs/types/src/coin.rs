//! Coin listing types
//!
//! A coin has a reference price that the pricing model moves, and a
//! circulating supply that never changes after listing.

use crate::ids::CoinId;
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Smallest step the pricing model applies (0.01%)
pub const DEFAULT_MIN_VOLATILITY: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Largest step the pricing model applies (5%)
pub const DEFAULT_MAX_VOLATILITY: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Listing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CoinStatus {
    /// Accepting orders
    Active,
    /// Trading halted; existing orders may still be cancelled
    Suspended,
}

/// Tradable synthetic asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub coin_id: CoinId,
    pub name: String,
    pub current_price: Price,
    pub circulating_supply: Quantity,
    pub min_volatility: Decimal,
    pub max_volatility: Decimal,
    pub status: CoinStatus,
    pub listed_at: i64,
    pub price_updated_at: i64,
}

impl Coin {
    pub fn new(
        coin_id: CoinId,
        name: impl Into<String>,
        initial_price: Price,
        circulating_supply: Quantity,
        timestamp: i64,
    ) -> Self {
        Self {
            coin_id,
            name: name.into(),
            current_price: initial_price,
            circulating_supply,
            min_volatility: DEFAULT_MIN_VOLATILITY,
            max_volatility: DEFAULT_MAX_VOLATILITY,
            status: CoinStatus::Active,
            listed_at: timestamp,
            price_updated_at: timestamp,
        }
    }

    pub fn with_volatility(mut self, min_volatility: Decimal, max_volatility: Decimal) -> Self {
        self.min_volatility = min_volatility;
        self.max_volatility = max_volatility;
        self
    }

    /// Bounds must satisfy 0 < min <= max < 1
    pub fn volatility_bounds_valid(&self) -> bool {
        self.min_volatility > Decimal::ZERO
            && self.min_volatility <= self.max_volatility
            && self.max_volatility < Decimal::ONE
    }

    /// Clamp the magnitude of a relative price step into the volatility bounds
    ///
    /// The sign of `step` is kept; a zero step stays zero.
    pub fn clamp_step(&self, step: Decimal) -> Decimal {
        if step.is_zero() {
            return Decimal::ZERO;
        }
        let magnitude = step.abs().max(self.min_volatility).min(self.max_volatility);
        if step.is_sign_negative() {
            -magnitude
        } else {
            magnitude
        }
    }

    pub fn is_tradable(&self) -> bool {
        self.status == CoinStatus::Active
    }
}
