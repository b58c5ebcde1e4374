//! Stop order monitor
//!
//! Holds dormant stop orders and converts them into MARKET sells once their
//! trigger fires. A stop keeps its quantity locked in the ledger while ARMED.
//!
//! **Key Invariants:**
//! - ARMED → TRIGGERED happens at most once, under the stop's own lock
//! - A failed conversion re-locks the coins and reverts to ARMED
//! - TRIGGERED and CANCELLED are terminal

use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use ledger::sync;
use ledger::{BalanceLedger, CoinRegistry};
use matching_engine::{MatchingEngine, OrderRequest};
use types::clock::Clock;
use types::errors::{ExchangeError, ExchangeResult};
use types::ids::{CoinId, OrderId, WalletId};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderStatus, Side, StopState, StopTrigger, StopType};

use crate::trigger::{self, TriggerDecision};

/// Stop monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopMonitorConfig {
    /// Poll period for the scheduler
    pub poll_interval_ms: u64,
}

impl Default for StopMonitorConfig {
    fn default() -> Self {
        Self { poll_interval_ms: 1_000 }
    }
}

/// Parameters of a new stop order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopRequest {
    pub wallet_id: WalletId,
    pub coin_id: CoinId,
    pub stop_type: StopType,
    pub quantity: Quantity,
    pub stop_price: Option<Price>,
    pub trailing_percent: Option<Decimal>,
}

impl StopRequest {
    pub fn stop_loss(wallet_id: WalletId, coin_id: CoinId, quantity: Quantity, stop_price: Price) -> Self {
        Self {
            wallet_id,
            coin_id,
            stop_type: StopType::StopLoss,
            quantity,
            stop_price: Some(stop_price),
            trailing_percent: None,
        }
    }

    pub fn take_profit(wallet_id: WalletId, coin_id: CoinId, quantity: Quantity, stop_price: Price) -> Self {
        Self {
            stop_type: StopType::TakeProfit,
            ..Self::stop_loss(wallet_id, coin_id, quantity, stop_price)
        }
    }

    pub fn trailing(wallet_id: WalletId, coin_id: CoinId, quantity: Quantity, trailing_percent: Decimal) -> Self {
        Self {
            wallet_id,
            coin_id,
            stop_type: StopType::TrailingStop,
            quantity,
            stop_price: None,
            trailing_percent: Some(trailing_percent),
        }
    }
}

/// Result of one polling pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Armed stops looked at
    pub evaluated: usize,
    /// Stops converted into market sells
    pub triggered: Vec<OrderId>,
    /// Stops that fired but went back to ARMED
    pub reverted: usize,
}

pub struct StopMonitor {
    config: StopMonitorConfig,
    stops: DashMap<OrderId, Arc<Mutex<Order>>>,
    ledger: Arc<BalanceLedger>,
    coins: Arc<CoinRegistry>,
    engine: Arc<MatchingEngine>,
    clock: Arc<dyn Clock>,
}

impl StopMonitor {
    pub fn new(
        config: StopMonitorConfig,
        ledger: Arc<BalanceLedger>,
        engine: Arc<MatchingEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            stops: DashMap::new(),
            coins: Arc::clone(ledger.coins()),
            ledger,
            engine,
            clock,
        }
    }

    pub fn config(&self) -> &StopMonitorConfig {
        &self.config
    }

    /// Register an ARMED stop, locking its quantity
    pub fn create_stop_order(&self, request: StopRequest) -> ExchangeResult<Order> {
        if request.quantity.is_zero() {
            return Err(ExchangeError::invalid("quantity must be positive"));
        }
        trigger::validate_trigger(request.stop_type, request.stop_price, request.trailing_percent)?;
        if request.wallet_id.is_market_maker() || !self.ledger.has_wallet(&request.wallet_id) {
            return Err(ExchangeError::invalid(format!("unknown wallet {}", request.wallet_id)));
        }
        let coin = self.coins.coin(&request.coin_id)?;
        if !coin.is_tradable() {
            return Err(ExchangeError::invalid(format!("coin {} is not ACTIVE", coin.coin_id)));
        }

        self.ledger
            .lock_coin(&request.wallet_id, &request.coin_id, request.quantity)?;

        let stop = StopTrigger::new(request.stop_type, request.stop_price, request.trailing_percent);
        let order = Order::stop(
            request.wallet_id,
            request.coin_id,
            request.quantity,
            stop,
            self.clock.now_nanos(),
        );
        self.stops.insert(order.order_id, Arc::new(Mutex::new(order.clone())));

        info!(
            order_id = %order.order_id,
            wallet = %order.wallet_id,
            coin = %order.coin_id,
            stop_type = ?request.stop_type,
            quantity = %order.quantity,
            "Stop order armed"
        );
        Ok(order)
    }

    /// ARMED → CANCELLED, unlocking the coins
    ///
    /// Cancelling a cancelled stop returns it unchanged.
    pub fn cancel_stop_order(&self, wallet_id: &WalletId, order_id: &OrderId) -> ExchangeResult<Order> {
        let cell = self.cell(order_id)?;
        let mut order = sync::lock(&cell, "stop:order")?;
        if order.wallet_id != *wallet_id {
            return Err(ExchangeError::Unauthorized {
                wallet: wallet_id.to_string(),
                resource: format!("stop order {}", order_id),
            });
        }

        match order.stop.as_ref().map(|stop| stop.state) {
            Some(StopState::Cancelled) => return Ok(order.clone()),
            Some(StopState::Triggered) => {
                return Err(ExchangeError::invalid(format!("stop order {} already TRIGGERED", order_id)));
            }
            Some(StopState::Armed) => {}
            None => return Err(ExchangeError::conflict(format!("stop:{}", order_id))),
        }

        self.ledger
            .unlock_coin(&order.wallet_id, &order.coin_id, order.remaining())?;
        order.cancel(self.clock.now_nanos())?;
        if let Some(stop) = order.stop.as_mut() {
            stop.state = StopState::Cancelled;
        }

        info!(order_id = %order_id, wallet = %wallet_id, "Stop order cancelled");
        Ok(order.clone())
    }

    pub fn stop_order(&self, order_id: &OrderId) -> ExchangeResult<Order> {
        let cell = self.cell(order_id)?;
        let order = sync::lock(&cell, "stop:order")?;
        Ok(order.clone())
    }

    /// Stops of a wallet in creation order
    pub fn stop_orders(&self, wallet_id: &WalletId) -> ExchangeResult<Vec<Order>> {
        let mut orders = Vec::new();
        for cell in self.cells() {
            let order = sync::lock(&cell, "stop:order")?;
            if order.wallet_id == *wallet_id {
                orders.push(order.clone());
            }
        }
        Ok(orders)
    }

    pub fn armed_count(&self) -> usize {
        self.cells()
            .iter()
            .filter(|cell| {
                sync::lock(cell, "stop:order")
                    .map(|order| order.stop.as_ref().is_some_and(StopTrigger::is_armed))
                    .unwrap_or(false)
            })
            .count()
    }

    // ========================================================================
    // Polling
    // ========================================================================

    /// Evaluate every ARMED stop against its coin's current price
    pub fn poll_once(&self) -> PollReport {
        let mut report = PollReport::default();

        for cell in self.cells() {
            let mut order = match sync::lock(&cell, "stop:order") {
                Ok(order) => order,
                Err(err) => {
                    warn!(error = %err, "Stop order skipped");
                    continue;
                }
            };
            let price = match self.coins.current_price(&order.coin_id) {
                Ok(price) => price,
                Err(err) => {
                    warn!(order_id = %order.order_id, error = %err, "No price for stop");
                    continue;
                }
            };
            let Some(stop) = order.stop.as_mut() else {
                continue;
            };
            if !stop.is_armed() {
                continue;
            }
            report.evaluated += 1;

            if trigger::evaluate(stop, price) == TriggerDecision::Hold {
                continue;
            }
            match self.fire(&mut order, price) {
                Ok(()) => report.triggered.push(order.order_id),
                Err(err) => {
                    warn!(order_id = %order.order_id, error = %err, "Stop conversion failed, re-armed");
                    report.reverted += 1;
                }
            }
        }

        if !report.triggered.is_empty() || report.reverted > 0 {
            info!(
                evaluated = report.evaluated,
                triggered = report.triggered.len(),
                reverted = report.reverted,
                "Stop poll complete"
            );
        } else {
            debug!(evaluated = report.evaluated, "Stop poll complete");
        }
        report
    }

    /// TRIGGERED, unlock, submit the market sell; revert on failure
    fn fire(&self, order: &mut Order, price: Price) -> ExchangeResult<()> {
        let now = self.clock.now_nanos();
        let quantity = order.remaining();
        Self::set_state(order, StopState::Triggered, Some(now));

        if let Err(err) = self.ledger.unlock_coin(&order.wallet_id, &order.coin_id, quantity) {
            Self::set_state(order, StopState::Armed, None);
            return Err(err);
        }

        let request = OrderRequest::market(order.wallet_id, order.coin_id.clone(), Side::SELL, quantity);
        match self.engine.place_order(request) {
            Ok(result) => {
                if let Some(stop) = order.stop.as_mut() {
                    stop.triggered_order_id = Some(result.order.order_id);
                }
                order.filled_quantity = result.matched;
                order.status = result.order.status;
                order.updated_at = now;
                order.version += 1;

                info!(
                    order_id = %order.order_id,
                    market_order_id = %result.order.order_id,
                    coin = %order.coin_id,
                    price = %price,
                    matched = %result.matched,
                    "Stop order triggered"
                );
                Ok(())
            }
            Err(err) => {
                if let Err(relock) = self.ledger.lock_coin(&order.wallet_id, &order.coin_id, quantity) {
                    // Coins spent elsewhere in the meantime: the stop can no longer be backed
                    error!(order_id = %order.order_id, error = %relock, "Stop could not re-lock, cancelling");
                    order.status = OrderStatus::Cancelled;
                    Self::set_state(order, StopState::Cancelled, None);
                    return Err(err);
                }
                Self::set_state(order, StopState::Armed, None);
                Err(err)
            }
        }
    }

    fn set_state(order: &mut Order, state: StopState, triggered_at: Option<i64>) {
        if let Some(stop) = order.stop.as_mut() {
            stop.state = state;
            stop.triggered_at = triggered_at;
        }
    }

    fn cell(&self, order_id: &OrderId) -> ExchangeResult<Arc<Mutex<Order>>> {
        self.stops
            .get(order_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ExchangeError::OrderNotFound {
                order_id: order_id.to_string(),
            })
    }

    /// All stop cells in creation order
    fn cells(&self) -> Vec<Arc<Mutex<Order>>> {
        let mut cells: Vec<(OrderId, Arc<Mutex<Order>>)> = self
            .stops
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        cells.sort_by_key(|(order_id, _)| *order_id);
        cells.into_iter().map(|(_, cell)| cell).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_data::ChannelBroadcaster;
    use market_maker::{MarketMaker, PricingConfig};
    use matching_engine::EngineConfig;
    use types::clock::ManualClock;
    use types::coin::{Coin, CoinStatus};

    struct Fixture {
        monitor: StopMonitor,
        ledger: Arc<BalanceLedger>,
        coins: Arc<CoinRegistry>,
    }

    fn gld() -> CoinId {
        CoinId::new("GLD")
    }

    fn fixture() -> Fixture {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(0));
        let coins = Arc::new(CoinRegistry::new(Arc::clone(&clock)));
        coins
            .list_coin(Coin::new(gld(), "Goldleaf", Price::from_u64(100), Quantity::from_u64(1_000), 0))
            .unwrap();
        let ledger = Arc::new(BalanceLedger::new(Arc::clone(&coins), Arc::clone(&clock)));
        let broadcaster = Arc::new(ChannelBroadcaster::default());
        let maker = Arc::new(MarketMaker::new(
            PricingConfig::default(),
            Arc::clone(&ledger),
            broadcaster.clone(),
            Arc::clone(&clock),
        ));
        let engine = Arc::new(MatchingEngine::new(
            EngineConfig::default(),
            Arc::clone(&ledger),
            maker,
            broadcaster,
            Arc::clone(&clock),
        ));
        let monitor = StopMonitor::new(StopMonitorConfig::default(), Arc::clone(&ledger), engine, clock);
        Fixture { monitor, ledger, coins }
    }

    fn holder(f: &Fixture, coins: u64) -> WalletId {
        let wallet = f.ledger.open_wallet(Decimal::ZERO).unwrap();
        f.ledger
            .allocate_from_supply(&wallet, &gld(), Quantity::from_u64(coins))
            .unwrap();
        wallet
    }

    #[test]
    fn test_create_locks_quantity() {
        let f = fixture();
        let wallet = holder(&f, 10);
        let order = f
            .monitor
            .create_stop_order(StopRequest::stop_loss(wallet, gld(), Quantity::from_u64(4), Price::from_u64(90)))
            .unwrap();

        assert!(order.is_stop_order());
        assert_eq!(order.side, Side::SELL);
        let balance = f.ledger.balance(&wallet, &gld()).unwrap();
        assert_eq!(balance.locked_amount, Decimal::from(4));
        assert_eq!(balance.available_amount, Decimal::from(6));
        assert_eq!(f.monitor.armed_count(), 1);
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let f = fixture();
        let wallet = holder(&f, 10);

        let too_many = StopRequest::stop_loss(wallet, gld(), Quantity::from_u64(11), Price::from_u64(90));
        assert!(matches!(
            f.monitor.create_stop_order(too_many),
            Err(ExchangeError::InsufficientInventory { .. })
        ));

        let bad_percent = StopRequest::trailing(wallet, gld(), Quantity::from_u64(1), Decimal::from(150));
        assert!(matches!(
            f.monitor.create_stop_order(bad_percent),
            Err(ExchangeError::InvalidOrderParameters { .. })
        ));
        assert_eq!(f.monitor.armed_count(), 0);
    }

    #[test]
    fn test_cancel_unlocks_and_is_idempotent() {
        let f = fixture();
        let wallet = holder(&f, 10);
        let order = f
            .monitor
            .create_stop_order(StopRequest::take_profit(wallet, gld(), Quantity::from_u64(5), Price::from_u64(150)))
            .unwrap();

        assert!(matches!(
            f.monitor.cancel_stop_order(&WalletId::new(), &order.order_id),
            Err(ExchangeError::Unauthorized { .. })
        ));

        let cancelled = f.monitor.cancel_stop_order(&wallet, &order.order_id).unwrap();
        assert_eq!(cancelled.stop.as_ref().unwrap().state, StopState::Cancelled);
        assert_eq!(f.monitor.cancel_stop_order(&wallet, &order.order_id).unwrap(), cancelled);
        assert_eq!(f.ledger.balance(&wallet, &gld()).unwrap().available_amount, Decimal::from(10));

        assert!(matches!(
            f.monitor.cancel_stop_order(&wallet, &OrderId::new()),
            Err(ExchangeError::OrderNotFound { .. })
        ));
    }

    #[test]
    fn test_stop_loss_fires_into_market_sell() {
        let f = fixture();
        let wallet = holder(&f, 10);
        let order = f
            .monitor
            .create_stop_order(StopRequest::stop_loss(wallet, gld(), Quantity::from_u64(10), Price::from_u64(90)))
            .unwrap();

        assert!(f.monitor.poll_once().triggered.is_empty());

        f.coins.set_price(&gld(), Price::from_u64(90)).unwrap();
        let report = f.monitor.poll_once();
        assert_eq!(report.triggered, vec![order.order_id]);

        let fired = f.monitor.stop_order(&order.order_id).unwrap();
        let stop = fired.stop.unwrap();
        assert_eq!(stop.state, StopState::Triggered);
        assert!(stop.triggered_order_id.is_some());
        assert_eq!(fired.status, OrderStatus::Filled);

        // Sold 10 @ 90 to the maker, minus floor(45)
        assert_eq!(f.ledger.wallet(&wallet).unwrap().gold_balance, Decimal::from(855));
        assert!(f.ledger.balance(&wallet, &gld()).unwrap().total().is_zero());

        // Terminal
        assert_eq!(f.monitor.poll_once().evaluated, 0);
        assert!(f.monitor.cancel_stop_order(&wallet, &order.order_id).is_err());
    }

    #[test]
    fn test_failed_conversion_reverts_to_armed() {
        let f = fixture();
        let wallet = holder(&f, 10);
        let order = f
            .monitor
            .create_stop_order(StopRequest::stop_loss(wallet, gld(), Quantity::from_u64(3), Price::from_u64(100)))
            .unwrap();

        f.coins.set_status(&gld(), CoinStatus::Suspended).unwrap();
        let report = f.monitor.poll_once();
        assert!(report.triggered.is_empty());
        assert_eq!(report.reverted, 1);

        let stop = f.monitor.stop_order(&order.order_id).unwrap().stop.unwrap();
        assert_eq!(stop.state, StopState::Armed);
        assert_eq!(stop.triggered_at, None);
        assert_eq!(f.ledger.balance(&wallet, &gld()).unwrap().locked_amount, Decimal::from(3));

        f.coins.set_status(&gld(), CoinStatus::Active).unwrap();
        assert_eq!(f.monitor.poll_once().triggered, vec![order.order_id]);
    }
}
