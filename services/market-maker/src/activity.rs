//! Order-flow tracking
//!
//! Trailing window of order counts per side and traded volume, per coin.
//! Entries older than the window are evicted lazily on every access.

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use types::errors::ExchangeResult;
use types::ids::CoinId;
use types::numeric::Quantity;
use types::order::Side;

/// Counts inside the window at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub buy_orders: u64,
    pub sell_orders: u64,
    pub volume: Decimal,
}

impl FlowSnapshot {
    /// (buys - sells) / (buys + sells), in [-1, 1]; zero with no orders
    pub fn imbalance(&self) -> Decimal {
        let total = self.buy_orders + self.sell_orders;
        if total == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.buy_orders) - Decimal::from(self.sell_orders)) / Decimal::from(total)
    }
}

#[derive(Debug, Default)]
struct FlowWindow {
    buys: VecDeque<i64>,
    sells: VecDeque<i64>,
    trades: VecDeque<(i64, Decimal)>,
    volume: Decimal,
}

impl FlowWindow {
    fn evict(&mut self, cutoff: i64) {
        while self.buys.front().is_some_and(|&t| t < cutoff) {
            self.buys.pop_front();
        }
        while self.sells.front().is_some_and(|&t| t < cutoff) {
            self.sells.pop_front();
        }
        while let Some(&(t, qty)) = self.trades.front() {
            if t >= cutoff {
                break;
            }
            self.volume -= qty;
            self.trades.pop_front();
        }
    }

    fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            buy_orders: self.buys.len() as u64,
            sell_orders: self.sells.len() as u64,
            volume: self.volume,
        }
    }
}

pub struct OrderFlowTracker {
    window_nanos: i64,
    windows: DashMap<CoinId, Arc<Mutex<FlowWindow>>>,
}

impl OrderFlowTracker {
    pub fn new(window_nanos: i64) -> Self {
        Self {
            window_nanos: window_nanos.max(1),
            windows: DashMap::new(),
        }
    }

    fn cell(&self, coin_id: &CoinId) -> Arc<Mutex<FlowWindow>> {
        Arc::clone(self.windows.entry(coin_id.clone()).or_default().value())
    }

    pub fn record_order(&self, coin_id: &CoinId, side: Side, timestamp: i64) -> ExchangeResult<()> {
        let cell = self.cell(coin_id);
        let mut window = ledger::sync::lock(&cell, &format!("flow:{}", coin_id))?;
        window.evict(timestamp - self.window_nanos);
        match side {
            Side::BUY => window.buys.push_back(timestamp),
            Side::SELL => window.sells.push_back(timestamp),
        }
        Ok(())
    }

    pub fn record_trade(&self, coin_id: &CoinId, quantity: Quantity, timestamp: i64) -> ExchangeResult<()> {
        let cell = self.cell(coin_id);
        let mut window = ledger::sync::lock(&cell, &format!("flow:{}", coin_id))?;
        window.evict(timestamp - self.window_nanos);
        window.trades.push_back((timestamp, quantity.as_decimal()));
        window.volume += quantity.as_decimal();
        Ok(())
    }

    /// Window contents as of `now`
    pub fn snapshot(&self, coin_id: &CoinId, now: i64) -> ExchangeResult<FlowSnapshot> {
        let cell = self.cell(coin_id);
        let mut window = ledger::sync::lock(&cell, &format!("flow:{}", coin_id))?;
        window.evict(now - self.window_nanos);
        Ok(window.snapshot())
    }
}
