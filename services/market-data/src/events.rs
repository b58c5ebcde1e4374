//! Market events published to subscribers
//!
//! Every event is scoped to one coin and carries a sequence number assigned
//! by the broadcaster at publish time.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::ids::{CoinId, TradeId};
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::trade::Trade;
use uuid::Uuid;

use crate::candles::Candle;

/// What moved the reference price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriceSource {
    /// Per-trade nudge
    Trade,
    /// Periodic volatility tick
    Tick,
}

/// Aggregated quantity at one price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: Price,
    pub total_quantity: Quantity,
    pub order_count: u32,
}

/// Depth view of one coin's book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub coin_id: CoinId,
    /// Descending price order (best first)
    pub bids: Vec<BookLevel>,
    /// Ascending price order (best first)
    pub asks: Vec<BookLevel>,
    pub timestamp: i64,
}

impl BookSnapshot {
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|level| level.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|level| level.price)
    }

    /// best_ask - best_bid, when both sides are present
    pub fn spread(&self) -> Option<Decimal> {
        Some(self.best_ask()?.as_decimal() - self.best_bid()?.as_decimal())
    }
}

/// Envelope delivered on a coin channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub event_id: Uuid,
    /// Broadcaster-wide monotonic sequence
    pub sequence: u64,
    /// Unix nanoseconds
    pub timestamp: i64,
    pub coin_id: CoinId,
    pub payload: MarketEventPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum MarketEventPayload {
    PriceUpdate {
        previous: Price,
        current: Price,
        source: PriceSource,
    },

    TradePrint {
        trade_id: TradeId,
        price: Price,
        quantity: Quantity,
        /// Side from taker perspective
        taker_side: Side,
        executed_at: i64,
    },

    OrderBook(BookSnapshot),

    CandleUpdate(Candle),
}

impl MarketEventPayload {
    pub fn trade_print(trade: &Trade) -> Self {
        MarketEventPayload::TradePrint {
            trade_id: trade.trade_id,
            price: trade.price,
            quantity: trade.quantity,
            taker_side: trade.taker_side,
            executed_at: trade.executed_at,
        }
    }

    /// Label for logging
    pub fn event_type_label(&self) -> &'static str {
        match self {
            MarketEventPayload::PriceUpdate { .. } => "PriceUpdate",
            MarketEventPayload::TradePrint { .. } => "TradePrint",
            MarketEventPayload::OrderBook(_) => "OrderBook",
            MarketEventPayload::CandleUpdate(_) => "CandleUpdate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spread() {
        let snapshot = BookSnapshot {
            coin_id: CoinId::new("GLD"),
            bids: vec![BookLevel {
                price: Price::from_u64(99),
                total_quantity: Quantity::from_u64(3),
                order_count: 1,
            }],
            asks: vec![BookLevel {
                price: Price::from_u64(101),
                total_quantity: Quantity::from_u64(2),
                order_count: 2,
            }],
            timestamp: 0,
        };
        assert_eq!(snapshot.spread(), Some(Decimal::from(2)));
    }

    #[test]
    fn test_payload_is_tagged() {
        let payload = MarketEventPayload::PriceUpdate {
            previous: Price::from_u64(10),
            current: Price::from_u64(11),
            source: PriceSource::Tick,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["event_type"], "PriceUpdate");
        assert_eq!(json["source"], "TICK");
    }
}
