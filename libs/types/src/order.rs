//! Order lifecycle types
//!
//! Regular orders move PENDING → PARTIAL → FILLED, or to CANCELLED from
//! either open state. Stop orders carry a `StopTrigger` with its own
//! ARMED → TRIGGERED / CANCELLED state machine.

use crate::errors::ExchangeError;
use crate::ids::{CoinId, OrderId, WalletId};
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }
}

/// How an order is priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderMethod {
    /// Execute immediately against whatever liquidity exists
    MARKET,
    /// Execute at the limit price or better, rest otherwise
    LIMIT,
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Accepted, nothing filled yet
    #[serde(rename = "PENDING")]
    Pending,

    /// Partially matched
    #[serde(rename = "PARTIAL")]
    Partial,

    /// Completely matched (terminal)
    #[serde(rename = "FILLED")]
    Filled,

    /// Cancelled by the owner or the system (terminal)
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Partial => "PARTIAL",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

/// Conditional order flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopType {
    /// Sell once price falls to the stop price
    StopLoss,
    /// Sell once price rises to the stop price
    TakeProfit,
    /// Sell once price retraces a percentage from its high-water mark
    TrailingStop,
}

/// Stop order state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StopState {
    Armed,
    Triggered,
    Cancelled,
}

/// Trigger parameters and state of a stop order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopTrigger {
    pub stop_type: StopType,
    /// Threshold for STOP_LOSS / TAKE_PROFIT
    pub stop_price: Option<Price>,
    /// Retrace percentage (e.g. 5 = 5%) for TRAILING_STOP
    pub trailing_percent: Option<Decimal>,
    /// High-water mark, seeded on the first evaluation
    pub trailing_price: Option<Price>,
    pub state: StopState,
    pub triggered_at: Option<i64>,
    /// Order submitted to the engine when the stop fired
    pub triggered_order_id: Option<OrderId>,
}

impl StopTrigger {
    pub fn new(
        stop_type: StopType,
        stop_price: Option<Price>,
        trailing_percent: Option<Decimal>,
    ) -> Self {
        Self {
            stop_type,
            stop_price,
            trailing_percent,
            trailing_price: None,
            state: StopState::Armed,
            triggered_at: None,
            triggered_order_id: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.state == StopState::Armed
    }

    pub fn stop_triggered(&self) -> bool {
        self.state == StopState::Triggered
    }
}

/// Complete order structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub wallet_id: WalletId,
    pub coin_id: CoinId,
    pub side: Side,
    pub method: OrderMethod,
    /// Limit price; set on MARKET orders only when a remainder rests
    pub price: Option<Price>,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub status: OrderStatus,
    /// Gold held for a resting BUY, released on fill or cancel
    pub reserved_gold: Decimal,
    pub stop: Option<StopTrigger>,
    pub created_at: i64, // Unix nanos
    pub updated_at: i64, // Unix nanos
    pub version: u64,
}

impl Order {
    /// Create a new pending order
    pub fn new(
        wallet_id: WalletId,
        coin_id: CoinId,
        side: Side,
        method: OrderMethod,
        price: Option<Price>,
        quantity: Quantity,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            wallet_id,
            coin_id,
            side,
            method,
            price,
            quantity,
            filled_quantity: Quantity::zero(),
            status: OrderStatus::Pending,
            reserved_gold: Decimal::ZERO,
            stop: None,
            created_at: timestamp,
            updated_at: timestamp,
            version: 0,
        }
    }

    pub fn market(wallet_id: WalletId, coin_id: CoinId, side: Side, quantity: Quantity, timestamp: i64) -> Self {
        Self::new(wallet_id, coin_id, side, OrderMethod::MARKET, None, quantity, timestamp)
    }

    pub fn limit(
        wallet_id: WalletId,
        coin_id: CoinId,
        side: Side,
        price: Price,
        quantity: Quantity,
        timestamp: i64,
    ) -> Self {
        Self::new(wallet_id, coin_id, side, OrderMethod::LIMIT, Some(price), quantity, timestamp)
    }

    /// Dormant stop order: always a SELL that becomes a MARKET order on trigger
    pub fn stop(
        wallet_id: WalletId,
        coin_id: CoinId,
        quantity: Quantity,
        trigger: StopTrigger,
        timestamp: i64,
    ) -> Self {
        let mut order = Self::market(wallet_id, coin_id, Side::SELL, quantity, timestamp);
        order.stop = Some(trigger);
        order
    }

    /// quantity - filled_quantity
    pub fn remaining(&self) -> Quantity {
        self.quantity.saturating_sub(self.filled_quantity)
    }

    /// Check quantity invariant: filled never exceeds quantity
    pub fn check_invariant(&self) -> bool {
        self.filled_quantity <= self.quantity && self.reserved_gold >= Decimal::ZERO
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.filled_quantity == self.quantity
    }

    /// Check if order has any fills
    pub fn has_fills(&self) -> bool {
        !self.filled_quantity.is_zero()
    }

    /// PENDING or PARTIAL
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_stop_order(&self) -> bool {
        self.stop.is_some()
    }

    /// Update filled quantity and adjust status
    ///
    /// # Panics
    /// Panics if the fill would exceed total quantity
    pub fn add_fill(&mut self, fill_quantity: Quantity, timestamp: i64) {
        let new_filled = self.filled_quantity + fill_quantity;

        assert!(new_filled <= self.quantity, "Fill would exceed order quantity");

        self.filled_quantity = new_filled;

        if self.is_filled() {
            self.status = OrderStatus::Filled;
        } else if self.has_fills() {
            self.status = OrderStatus::Partial;
        }

        self.updated_at = timestamp;
        self.version += 1;
    }

    /// Cancel the order
    ///
    /// Returns `Ok(false)` when the order was already cancelled, so callers
    /// can skip releasing reservations a second time.
    pub fn cancel(&mut self, timestamp: i64) -> Result<bool, ExchangeError> {
        match self.status {
            OrderStatus::Cancelled => Ok(false),
            OrderStatus::Filled => Err(ExchangeError::invalid(format!(
                "order {} is already FILLED",
                self.order_id
            ))),
            OrderStatus::Pending | OrderStatus::Partial => {
                self.status = OrderStatus::Cancelled;
                self.updated_at = timestamp;
                self.version += 1;
                Ok(true)
            }
        }
    }
}
