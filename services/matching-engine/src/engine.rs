//! Main matching engine
//!
//! Orchestrates order placement, matching against resting orders, the
//! market maker fallback, and cancellation. Each coin has its own book behind
//! its own lock; all matching for a coin happens under that lock in strict
//! price-then-time order. Coins never block each other.
//!
//! **Reservation rules:**
//! - SELL: the full quantity is locked in the wallet's coin balance
//! - LIMIT BUY: `limit × qty + fee` gold moves into the wallet's reservation
//! - MARKET BUY: each fill is paid from available gold
//!
//! A resting order's reservation always covers its unfilled remainder and is
//! released on FILLED (leftover from price improvement) or on cancel.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use ledger::sync;
use ledger::{BalanceLedger, BuyerLeg, CoinRegistry, CoinSource, GoldSource, SellerLeg};
use market_data::{BookLevel, BookSnapshot, Broadcaster, MarketEventPayload};
use market_maker::MarketMaker;
use types::clock::Clock;
use types::errors::{ExchangeError, ExchangeResult};
use types::fee::FeeSchedule;
use types::ids::{CoinId, OrderId, WalletId};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderMethod, OrderStatus, Side};
use types::trade::{Trade, TradeListener};

use crate::book::{AskBook, BidBook, LevelEntry, RestingMatch};
use crate::matching::{maker_can_fill, FillPlan, MatchExecutor};

/// Matching engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fees: FeeSchedule,
    /// Trades kept per coin for `recent_trades`
    pub recent_trades_capacity: usize,
    /// Levels per side in broadcast book snapshots
    pub snapshot_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fees: FeeSchedule::default(),
            recent_trades_capacity: 1_000,
            snapshot_depth: 20,
        }
    }
}

/// Order placement request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub wallet_id: WalletId,
    pub coin_id: CoinId,
    pub side: Side,
    pub method: OrderMethod,
    pub quantity: Quantity,
    pub price: Option<Price>,
}

impl OrderRequest {
    pub fn market(wallet_id: WalletId, coin_id: CoinId, side: Side, quantity: Quantity) -> Self {
        Self {
            wallet_id,
            coin_id,
            side,
            method: OrderMethod::MARKET,
            quantity,
            price: None,
        }
    }

    pub fn limit(wallet_id: WalletId, coin_id: CoinId, side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            wallet_id,
            coin_id,
            side,
            method: OrderMethod::LIMIT,
            quantity,
            price: Some(price),
        }
    }
}

/// Result of placing an order
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOrderResult {
    /// Order state after matching
    pub order: Order,
    /// Trades in execution order
    pub trades: Vec<Trade>,
    pub matched: Quantity,
    pub remaining: Quantity,
}

/// Order book for a single coin
#[derive(Debug, Default)]
struct CoinBook {
    bids: BidBook,
    asks: AskBook,
    /// Every accepted order for this coin, open or terminal
    orders: HashMap<OrderId, Order>,
    /// Newest at the back
    trades: VecDeque<Trade>,
}

impl CoinBook {
    fn rest(&mut self, order: &Order) -> ExchangeResult<()> {
        let price = order
            .price
            .ok_or_else(|| ExchangeError::invalid(format!("order {} has no resting price", order.order_id)))?;
        let entry = LevelEntry {
            order_id: order.order_id,
            wallet_id: order.wallet_id,
            remaining: order.remaining(),
            created_at: order.created_at,
        };
        match order.side {
            Side::BUY => self.bids.insert(price, entry),
            Side::SELL => self.asks.insert(price, entry),
        }
        Ok(())
    }

    fn unrest(&mut self, order: &Order) -> bool {
        let Some(price) = order.price else {
            return false;
        };
        match order.side {
            Side::BUY => self.bids.remove(&order.order_id, price),
            Side::SELL => self.asks.remove(&order.order_id, price),
        }
    }

    fn next_match(&self, order: &Order) -> Option<RestingMatch> {
        let limit = match order.method {
            OrderMethod::LIMIT => order.price,
            OrderMethod::MARKET => None,
        };
        match order.side {
            Side::BUY => self.asks.next_match(&order.wallet_id, limit),
            Side::SELL => self.bids.next_match(&order.wallet_id, limit),
        }
    }

    fn record_trade(&mut self, trade: &Trade, capacity: usize) {
        self.trades.push_back(trade.clone());
        while self.trades.len() > capacity {
            self.trades.pop_front();
        }
    }

    fn snapshot(&self, coin_id: &CoinId, depth: usize, timestamp: i64) -> BookSnapshot {
        let levels = |raw: Vec<(Price, Quantity, usize)>| {
            raw.into_iter()
                .map(|(price, total_quantity, count)| BookLevel {
                    price,
                    total_quantity,
                    order_count: u32::try_from(count).unwrap_or(u32::MAX),
                })
                .collect()
        };
        BookSnapshot {
            coin_id: coin_id.clone(),
            bids: levels(self.bids.depth_snapshot(depth)),
            asks: levels(self.asks.depth_snapshot(depth)),
            timestamp,
        }
    }
}

/// Main matching engine
pub struct MatchingEngine {
    config: EngineConfig,
    books: DashMap<CoinId, Arc<Mutex<CoinBook>>>,
    order_index: DashMap<OrderId, CoinId>,
    executor: MatchExecutor,
    ledger: Arc<BalanceLedger>,
    coins: Arc<CoinRegistry>,
    maker: Arc<MarketMaker>,
    listeners: RwLock<Vec<Arc<dyn TradeListener>>>,
    broadcaster: Arc<dyn Broadcaster>,
    clock: Arc<dyn Clock>,
}

impl MatchingEngine {
    pub fn new(
        config: EngineConfig,
        ledger: Arc<BalanceLedger>,
        maker: Arc<MarketMaker>,
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            executor: MatchExecutor::new(1, config.fees),
            config,
            books: DashMap::new(),
            order_index: DashMap::new(),
            coins: Arc::clone(ledger.coins()),
            ledger,
            maker,
            listeners: RwLock::new(Vec::new()),
            broadcaster,
            clock,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Register a consumer of settled trades
    pub fn add_listener(&self, listener: Arc<dyn TradeListener>) -> ExchangeResult<()> {
        sync::write(&self.listeners, "engine:listeners")?.push(listener);
        Ok(())
    }

    /// Sequence of the most recent trade, 0 before the first
    pub fn last_trade_sequence(&self) -> u64 {
        self.executor.last_sequence()
    }

    // ========================================================================
    // Placement
    // ========================================================================

    /// Place an order and match it
    ///
    /// Errors before the first fill leave no trace: reservations are undone
    /// and the order is not stored. Once something has traded, a failure
    /// cancels the remainder instead.
    pub fn place_order(&self, request: OrderRequest) -> ExchangeResult<PlaceOrderResult> {
        self.validate(&request)?;

        let cell = self.book_cell(&request.coin_id);
        let mut guard = sync::lock(&cell, "engine:book")?;
        let book = &mut *guard;

        let now = self.clock.now_nanos();
        let mut order = Order::new(
            request.wallet_id,
            request.coin_id,
            request.side,
            request.method,
            request.price,
            request.quantity,
            now,
        );

        self.reserve(&mut order)?;
        self.maker.record_order(&order.coin_id, order.side);

        let mut trades = Vec::new();
        let mut halted = match self.match_book(book, &mut order, &mut trades) {
            Ok(()) => self.fill_from_maker(book, &mut order, &mut trades),
            Err(err) => Err(err),
        };

        if let Err(err) = &halted {
            if trades.is_empty() {
                self.undo_reservation(&mut order);
                return Err(err.clone());
            }
        }

        if order.is_filled() {
            self.release_leftover(&mut order);
        } else if halted.is_ok() {
            halted = self.rest_remainder(book, &mut order);
            if let Err(err) = &halted {
                if trades.is_empty() {
                    self.undo_reservation(&mut order);
                    return Err(err.clone());
                }
            }
        }

        if let Err(err) = halted {
            warn!(
                order_id = %order.order_id,
                filled = %order.filled_quantity,
                remaining = %order.remaining(),
                error = %err,
                "Matching halted, cancelling remainder"
            );
            self.cancel_remainder(&mut order);
        }

        self.order_index.insert(order.order_id, order.coin_id.clone());
        book.orders.insert(order.order_id, order.clone());
        self.publish_book(book, &order.coin_id);

        info!(
            order_id = %order.order_id,
            wallet = %order.wallet_id,
            coin = %order.coin_id,
            side = ?order.side,
            method = ?order.method,
            status = order.status.as_str(),
            trades = trades.len(),
            "Order placed"
        );

        Ok(PlaceOrderResult {
            matched: order.filled_quantity,
            remaining: order.remaining(),
            order,
            trades,
        })
    }

    fn validate(&self, request: &OrderRequest) -> ExchangeResult<()> {
        if request.quantity.is_zero() {
            return Err(ExchangeError::invalid("quantity must be positive"));
        }
        match (request.method, request.price) {
            (OrderMethod::LIMIT, None) => return Err(ExchangeError::invalid("LIMIT order requires a price")),
            (OrderMethod::MARKET, Some(_)) => {
                return Err(ExchangeError::invalid("MARKET order must not carry a price"))
            }
            _ => {}
        }
        if request.wallet_id.is_market_maker() || !self.ledger.has_wallet(&request.wallet_id) {
            return Err(ExchangeError::invalid(format!("unknown wallet {}", request.wallet_id)));
        }
        let coin = self.coins.coin(&request.coin_id)?;
        if !coin.is_tradable() {
            return Err(ExchangeError::invalid(format!("coin {} is not ACTIVE", coin.coin_id)));
        }

        // Twice the notional at the higher of limit and reference must fit
        let basis = request
            .price
            .map_or(coin.current_price, |limit| limit.max(coin.current_price));
        let fits = basis
            .checked_notional(request.quantity)
            .and_then(|notional| notional.checked_mul(Decimal::from(2)))
            .is_some();
        if !fits {
            return Err(ExchangeError::invalid(format!(
                "order value {} x {} is out of range",
                basis, request.quantity
            )));
        }
        Ok(())
    }

    /// Gold a BUY must hold back to cover `quantity` at `price`, fee included
    pub fn buy_reservation(&self, price: Price, quantity: Quantity) -> ExchangeResult<Decimal> {
        let notional = price
            .checked_notional(quantity)
            .ok_or_else(|| ExchangeError::invalid(format!("order value {} x {} is out of range", price, quantity)))?;
        notional
            .checked_add(self.executor.fees().calculate_buy_fee(notional))
            .ok_or_else(|| ExchangeError::invalid(format!("order value {} x {} is out of range", price, quantity)))
    }

    fn reserve(&self, order: &mut Order) -> ExchangeResult<()> {
        match (order.side, order.method, order.price) {
            (Side::SELL, _, _) => self.ledger.lock_coin(&order.wallet_id, &order.coin_id, order.quantity),
            (Side::BUY, OrderMethod::LIMIT, Some(limit)) => {
                let amount = self.buy_reservation(limit, order.quantity)?;
                self.ledger.reserve_gold(&order.wallet_id, amount)?;
                order.reserved_gold = amount;
                Ok(())
            }
            (Side::BUY, _, _) => Ok(()),
        }
    }

    // ========================================================================
    // Matching
    // ========================================================================

    fn match_book(&self, book: &mut CoinBook, order: &mut Order, trades: &mut Vec<Trade>) -> ExchangeResult<()> {
        while !order.is_filled() {
            let Some(resting) = book.next_match(order) else {
                break;
            };
            let quantity = order.remaining().min(resting.remaining);

            let plan = match order.side {
                Side::BUY => FillPlan {
                    coin_id: order.coin_id.clone(),
                    buyer: BuyerLeg::Wallet {
                        wallet_id: order.wallet_id,
                        funding: Self::buy_funding(order),
                    },
                    seller: SellerLeg::Wallet {
                        wallet_id: resting.wallet_id,
                        funding: CoinSource::Locked,
                    },
                    buy_order_id: Some(order.order_id),
                    sell_order_id: Some(resting.order_id),
                    taker_side: Side::BUY,
                    price: resting.price,
                    quantity,
                },
                Side::SELL => FillPlan {
                    coin_id: order.coin_id.clone(),
                    buyer: BuyerLeg::Wallet {
                        wallet_id: resting.wallet_id,
                        funding: GoldSource::Reserved,
                    },
                    seller: SellerLeg::Wallet {
                        wallet_id: order.wallet_id,
                        funding: CoinSource::Locked,
                    },
                    buy_order_id: Some(resting.order_id),
                    sell_order_id: Some(order.order_id),
                    taker_side: Side::SELL,
                    price: resting.price,
                    quantity,
                },
            };

            let trade = self.execute(book, &plan)?;
            self.apply_resting_fill(book, &resting, &trade);
            Self::apply_incoming_fill(order, &trade);
            trades.push(trade);
        }
        Ok(())
    }

    /// Trade any remainder against the market maker at the reference price
    fn fill_from_maker(&self, book: &mut CoinBook, order: &mut Order, trades: &mut Vec<Trade>) -> ExchangeResult<()> {
        if order.is_filled() {
            return Ok(());
        }
        let reference = self.coins.current_price(&order.coin_id)?;
        if !maker_can_fill(order.side, order.method, order.price, reference) {
            return Ok(());
        }

        let plan = match order.side {
            Side::BUY => {
                let inventory = self.maker.inventory(&order.coin_id)?;
                FillPlan {
                    coin_id: order.coin_id.clone(),
                    buyer: BuyerLeg::Wallet {
                        wallet_id: order.wallet_id,
                        funding: Self::buy_funding(order),
                    },
                    seller: SellerLeg::Maker,
                    buy_order_id: Some(order.order_id),
                    sell_order_id: None,
                    taker_side: Side::BUY,
                    price: reference,
                    quantity: order.remaining().min(inventory),
                }
            }
            Side::SELL => FillPlan {
                coin_id: order.coin_id.clone(),
                buyer: BuyerLeg::Maker,
                seller: SellerLeg::Wallet {
                    wallet_id: order.wallet_id,
                    funding: CoinSource::Locked,
                },
                buy_order_id: None,
                sell_order_id: Some(order.order_id),
                taker_side: Side::SELL,
                price: reference,
                quantity: order.remaining(),
            },
        };
        if plan.quantity.is_zero() {
            debug!(coin = %order.coin_id, "Maker inventory exhausted");
            return Ok(());
        }

        let trade = self.execute(book, &plan)?;
        Self::apply_incoming_fill(order, &trade);
        trades.push(trade);
        Ok(())
    }

    fn buy_funding(order: &Order) -> GoldSource {
        match order.method {
            OrderMethod::LIMIT => GoldSource::Reserved,
            OrderMethod::MARKET => GoldSource::Available,
        }
    }

    /// Settle one fill, then hand the trade to every consumer
    fn execute(&self, book: &mut CoinBook, plan: &FillPlan) -> ExchangeResult<Trade> {
        let settlement = self.executor.settlement(plan);
        self.ledger.settle_trade(&settlement)?;
        let trade = self.executor.execute_trade(plan, &settlement, self.clock.now_nanos());

        debug!(
            sequence = trade.sequence,
            coin = %trade.coin_id,
            price = %trade.price,
            quantity = %trade.quantity,
            buyer = %trade.buyer,
            seller = %trade.seller,
            "Trade executed"
        );

        book.record_trade(&trade, self.config.recent_trades_capacity);
        self.notify(&trade);
        if let Err(err) = self.maker.apply_trade_impact(&trade) {
            warn!(sequence = trade.sequence, error = %err, "Price impact skipped");
        }
        Ok(trade)
    }

    fn notify(&self, trade: &Trade) {
        match sync::read(&self.listeners, "engine:listeners") {
            Ok(listeners) => {
                for listener in listeners.iter() {
                    listener.on_trade(trade);
                }
            }
            Err(err) => warn!(sequence = trade.sequence, error = %err, "Trade listeners skipped"),
        }
        self.broadcaster
            .publish(&trade.coin_id, MarketEventPayload::trade_print(trade), trade.executed_at);
    }

    fn trade_cost(trade: &Trade) -> Decimal {
        trade.notional() + trade.buy_fee
    }

    fn apply_resting_fill(&self, book: &mut CoinBook, resting: &RestingMatch, trade: &Trade) {
        let reduced = match trade.taker_side {
            Side::BUY => book.asks.reduce(resting.price, &resting.order_id, trade.quantity),
            Side::SELL => book.bids.reduce(resting.price, &resting.order_id, trade.quantity),
        };
        if reduced.is_none() {
            error!(order_id = %resting.order_id, "Resting order missing from price level");
        }

        let Some(resting_order) = book.orders.get_mut(&resting.order_id) else {
            error!(order_id = %resting.order_id, "Resting order missing from book");
            return;
        };
        resting_order.add_fill(trade.quantity, trade.executed_at);
        if resting_order.side == Side::BUY {
            resting_order.reserved_gold -= Self::trade_cost(trade);
        }
        if resting_order.is_filled() {
            self.release_leftover(resting_order);
        }
    }

    fn apply_incoming_fill(order: &mut Order, trade: &Trade) {
        order.add_fill(trade.quantity, trade.executed_at);
        if order.side == Side::BUY && order.method == OrderMethod::LIMIT {
            order.reserved_gold -= Self::trade_cost(trade);
        }
    }

    // ========================================================================
    // Remainders and reservations
    // ========================================================================

    /// Put the unfilled part of an order on the book
    ///
    /// A MARKET buy the maker could not fill rests at the reference price and
    /// reserves gold for what is left. A MARKET sell is always absorbed by the
    /// maker, so anything left of one is cancelled.
    fn rest_remainder(&self, book: &mut CoinBook, order: &mut Order) -> ExchangeResult<()> {
        match (order.side, order.method) {
            (_, OrderMethod::LIMIT) => {}
            (Side::BUY, OrderMethod::MARKET) => {
                let reference = self.coins.current_price(&order.coin_id)?;
                let amount = self.buy_reservation(reference, order.remaining())?;
                self.ledger.reserve_gold(&order.wallet_id, amount)?;
                order.price = Some(reference);
                order.reserved_gold = amount;
            }
            (Side::SELL, OrderMethod::MARKET) => {
                return Err(ExchangeError::invalid("MARKET sell remainder found no buyer"));
            }
        }
        book.rest(order)?;
        debug!(
            order_id = %order.order_id,
            price = ?order.price,
            remaining = %order.remaining(),
            "Order resting"
        );
        Ok(())
    }

    /// Release whatever gold a filled BUY still holds
    fn release_leftover(&self, order: &mut Order) {
        if order.side != Side::BUY || order.reserved_gold <= Decimal::ZERO {
            return;
        }
        match self.ledger.release_gold(&order.wallet_id, order.reserved_gold) {
            Ok(()) => order.reserved_gold = Decimal::ZERO,
            Err(err) => error!(order_id = %order.order_id, error = %err, "Leftover reservation not released"),
        }
    }

    /// Give back what the order still holds for its unfilled part
    fn release_remainder(&self, order: &mut Order) -> ExchangeResult<()> {
        match order.side {
            Side::SELL => {
                let remaining = order.remaining();
                if !remaining.is_zero() {
                    self.ledger.unlock_coin(&order.wallet_id, &order.coin_id, remaining)?;
                }
            }
            Side::BUY => {
                if order.reserved_gold > Decimal::ZERO {
                    self.ledger.release_gold(&order.wallet_id, order.reserved_gold)?;
                    order.reserved_gold = Decimal::ZERO;
                }
            }
        }
        Ok(())
    }

    fn undo_reservation(&self, order: &mut Order) {
        if let Err(err) = self.release_remainder(order) {
            error!(order_id = %order.order_id, error = %err, "Reservation rollback failed");
        }
    }

    fn cancel_remainder(&self, order: &mut Order) {
        self.undo_reservation(order);
        if let Err(err) = order.cancel(self.clock.now_nanos()) {
            error!(order_id = %order.order_id, error = %err, "Order not cancelled");
        }
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    /// Cancel an open order owned by `wallet_id`
    ///
    /// Cancelling an already cancelled order returns it unchanged.
    pub fn cancel_order(&self, wallet_id: &WalletId, order_id: &OrderId) -> ExchangeResult<Order> {
        let not_found = || ExchangeError::OrderNotFound {
            order_id: order_id.to_string(),
        };
        let coin_id = self
            .order_index
            .get(order_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(not_found)?;

        let cell = self.book_cell(&coin_id);
        let mut guard = sync::lock(&cell, "engine:book")?;
        let book = &mut *guard;

        let order = book.orders.get_mut(order_id).ok_or_else(not_found)?;
        if order.wallet_id != *wallet_id {
            return Err(ExchangeError::Unauthorized {
                wallet: wallet_id.to_string(),
                resource: format!("order {}", order_id),
            });
        }
        match order.status {
            OrderStatus::Cancelled => return Ok(order.clone()),
            OrderStatus::Filled => {
                return Err(ExchangeError::invalid(format!("order {} is already FILLED", order_id)));
            }
            OrderStatus::Pending | OrderStatus::Partial => {}
        }

        self.release_remainder(order)?;
        order.cancel(self.clock.now_nanos())?;
        let cancelled = order.clone();

        if !book.unrest(&cancelled) {
            warn!(order_id = %order_id, "Cancelled order was not on the book");
        }
        self.publish_book(book, &coin_id);

        info!(
            order_id = %order_id,
            wallet = %wallet_id,
            coin = %coin_id,
            filled = %cancelled.filled_quantity,
            "Order cancelled"
        );
        Ok(cancelled)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Aggregated depth for a listed coin
    pub fn get_order_book(&self, coin_id: &CoinId, depth: usize) -> ExchangeResult<BookSnapshot> {
        self.coins.coin(coin_id)?;
        let now = self.clock.now_nanos();
        let Some(cell) = self.books.get(coin_id).map(|entry| Arc::clone(entry.value())) else {
            return Ok(CoinBook::default().snapshot(coin_id, depth, now));
        };
        let book = sync::lock(&cell, "engine:book")?;
        Ok(book.snapshot(coin_id, depth, now))
    }

    pub fn get_order(&self, order_id: &OrderId) -> ExchangeResult<Order> {
        let not_found = || ExchangeError::OrderNotFound {
            order_id: order_id.to_string(),
        };
        let coin_id = self
            .order_index
            .get(order_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(not_found)?;
        let cell = self.book_cell(&coin_id);
        let book = sync::lock(&cell, "engine:book")?;
        book.orders.get(order_id).cloned().ok_or_else(not_found)
    }

    /// PENDING and PARTIAL orders of a wallet, oldest first
    pub fn open_orders(&self, wallet_id: &WalletId) -> ExchangeResult<Vec<Order>> {
        let cells: Vec<_> = self.books.iter().map(|entry| Arc::clone(entry.value())).collect();
        let mut open = Vec::new();
        for cell in cells {
            let book = sync::lock(&cell, "engine:book")?;
            open.extend(
                book.orders
                    .values()
                    .filter(|order| order.wallet_id == *wallet_id && order.is_open())
                    .cloned(),
            );
        }
        open.sort_by_key(|order| (order.created_at, order.order_id));
        Ok(open)
    }

    /// Most recent trades for a coin, newest first
    pub fn recent_trades(&self, coin_id: &CoinId, limit: usize) -> ExchangeResult<Vec<Trade>> {
        let Some(cell) = self.books.get(coin_id).map(|entry| Arc::clone(entry.value())) else {
            return Ok(Vec::new());
        };
        let book = sync::lock(&cell, "engine:book")?;
        Ok(book.trades.iter().rev().take(limit).cloned().collect())
    }

    fn book_cell(&self, coin_id: &CoinId) -> Arc<Mutex<CoinBook>> {
        Arc::clone(self.books.entry(coin_id.clone()).or_default().value())
    }

    fn publish_book(&self, book: &CoinBook, coin_id: &CoinId) {
        let snapshot = book.snapshot(coin_id, self.config.snapshot_depth, self.clock.now_nanos());
        let timestamp = snapshot.timestamp;
        self.broadcaster
            .publish(coin_id, MarketEventPayload::OrderBook(snapshot), timestamp);
    }
}
