//! Fee calculation types
//!
//! Every trade charges both sides independently. Fees are a rate applied to
//! the notional value and floored to whole gold units.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default trading fee: 5% of notional for each side
pub const DEFAULT_FEE_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Fee rates applied to both sides of a trade
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub buy_rate: Decimal,
    pub sell_rate: Decimal,
}

impl FeeSchedule {
    pub fn new(buy_rate: Decimal, sell_rate: Decimal) -> Self {
        Self { buy_rate, sell_rate }
    }

    /// Fee charged to the buyer for a trade value
    pub fn calculate_buy_fee(&self, trade_value: Decimal) -> Decimal {
        floor_fee(trade_value * self.buy_rate)
    }

    /// Fee charged to the seller for a trade value
    pub fn calculate_sell_fee(&self, trade_value: Decimal) -> Decimal {
        floor_fee(trade_value * self.sell_rate)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_FEE_RATE, DEFAULT_FEE_RATE)
    }
}

fn floor_fee(raw: Decimal) -> Decimal {
    raw.floor().max(Decimal::ZERO)
}
