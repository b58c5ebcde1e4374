//! Trade execution types
//!
//! A trade is immutable once created. Consumers (candles, the audit chain,
//! broadcasting) receive it through `TradeListener`.

use crate::ids::{CoinId, OrderId, TradeId, WalletId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Executed trade
///
/// Order ids are `None` on the side filled by the market maker's synthetic
/// inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub sequence: u64, // Engine-wide monotonic sequence
    pub coin_id: CoinId,

    // Order references
    pub buy_order_id: Option<OrderId>,
    pub sell_order_id: Option<OrderId>,

    // Wallet references
    pub buyer: WalletId,
    pub seller: WalletId,

    /// Side of the incoming (taker) order
    pub taker_side: Side,
    pub price: Price,
    pub quantity: Quantity,

    // Fees, in gold units
    pub buy_fee: Decimal,
    pub sell_fee: Decimal,

    pub executed_at: i64, // Unix nanos
}

impl Trade {
    /// Calculate trade value (price × quantity)
    pub fn notional(&self) -> Decimal {
        self.price.notional(self.quantity)
    }

    /// True if one side was filled by the market maker
    pub fn is_maker_fill(&self) -> bool {
        self.buyer.is_market_maker() || self.seller.is_market_maker()
    }

    pub fn total_fees(&self) -> Decimal {
        self.buy_fee + self.sell_fee
    }
}

/// Consumer of settled trades
///
/// Listeners run after settlement and must not fail the trade; anything
/// that goes wrong inside is logged by the implementation.
pub trait TradeListener: Send + Sync {
    fn on_trade(&self, trade: &Trade);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_trade(seller: WalletId) -> Trade {
        Trade {
            trade_id: TradeId::new(),
            sequence: 7,
            coin_id: CoinId::new("GLD"),
            buy_order_id: Some(OrderId::new()),
            sell_order_id: None,
            buyer: WalletId::new(),
            seller,
            taker_side: Side::BUY,
            price: Price::from_u64(12),
            quantity: Quantity::from_u64(3),
            buy_fee: Decimal::from(1),
            sell_fee: Decimal::from(1),
            executed_at: 1708123456789000000,
        }
    }

    #[test]
    fn test_trade_value() {
        let trade = test_trade(WalletId::new());
        assert_eq!(trade.notional(), Decimal::from(36));
        assert_eq!(trade.total_fees(), Decimal::from(2));
        assert!(!trade.is_maker_fill());
    }

    #[test]
    fn test_maker_fill_detection() {
        let trade = test_trade(WalletId::market_maker());
        assert!(trade.is_maker_fill());
    }

    #[test]
    fn test_trade_serialization() {
        let trade = test_trade(WalletId::new());
        let json = serde_json::to_string(&trade).unwrap();
        let deserialized: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deserialized);
    }
}
