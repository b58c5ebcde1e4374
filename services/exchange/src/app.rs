//! Exchange facade
//!
//! Builds every component once and wires the trade listeners. Callers go
//! through this type for the in-process operation surface.

use std::sync::Arc;

use blockchain::{Block, Blockchain, TradeRecorder};
use ledger::{BalanceLedger, CoinRegistry};
use market_data::{BookSnapshot, Candle, CandleAggregator, ChannelBroadcaster, MarketEvent, Timeframe};
use market_maker::MarketMaker;
use matching_engine::{MatchingEngine, OrderRequest, PlaceOrderResult};
use rust_decimal::Decimal;
use stop_monitor::{StopMonitor, StopRequest};
use tokio::sync::broadcast;
use tracing::info;
use types::clock::Clock;
use types::coin::Coin;
use types::errors::ExchangeResult;
use types::ids::{CoinId, OrderId, WalletId};
use types::order::Order;

use crate::config::ExchangeConfig;

pub struct Exchange {
    config: ExchangeConfig,
    coins: Arc<CoinRegistry>,
    ledger: Arc<BalanceLedger>,
    broadcaster: Arc<ChannelBroadcaster>,
    maker: Arc<MarketMaker>,
    engine: Arc<MatchingEngine>,
    stops: StopMonitor,
    candles: Arc<CandleAggregator>,
    chain: Arc<Blockchain>,
}

impl Exchange {
    pub fn new(config: ExchangeConfig, clock: Arc<dyn Clock>) -> ExchangeResult<Self> {
        let coins = Arc::new(CoinRegistry::new(Arc::clone(&clock)));
        let ledger = Arc::new(BalanceLedger::new(Arc::clone(&coins), Arc::clone(&clock)));
        let broadcaster = Arc::new(ChannelBroadcaster::new(config.broadcast_capacity));

        let maker = Arc::new(MarketMaker::new(
            config.pricing.clone(),
            Arc::clone(&ledger),
            broadcaster.clone(),
            Arc::clone(&clock),
        ));
        let engine = Arc::new(MatchingEngine::new(
            config.engine.clone(),
            Arc::clone(&ledger),
            Arc::clone(&maker),
            broadcaster.clone(),
            Arc::clone(&clock),
        ));
        let stops = StopMonitor::new(
            config.stops.clone(),
            Arc::clone(&ledger),
            Arc::clone(&engine),
            Arc::clone(&clock),
        );

        let candles = Arc::new(CandleAggregator::new(config.candles.clone(), broadcaster.clone()));
        let chain = Arc::new(Blockchain::new(config.chain.clone(), clock)?);
        engine.add_listener(candles.clone())?;
        engine.add_listener(Arc::new(TradeRecorder::new(Arc::clone(&chain))))?;

        info!(
            difficulty = config.chain.difficulty,
            seed = config.pricing.seed,
            "Exchange core wired"
        );

        Ok(Self {
            config,
            coins,
            ledger,
            broadcaster,
            maker,
            engine,
            stops,
            candles,
            chain,
        })
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    pub fn list_coin(&self, coin: Coin) -> ExchangeResult<()> {
        self.coins.list_coin(coin)
    }

    pub fn open_wallet(&self, initial_gold: Decimal) -> ExchangeResult<WalletId> {
        self.ledger.open_wallet(initial_gold)
    }

    pub fn place_order(&self, request: OrderRequest) -> ExchangeResult<PlaceOrderResult> {
        self.engine.place_order(request)
    }

    pub fn cancel_order(&self, wallet_id: &WalletId, order_id: &OrderId) -> ExchangeResult<Order> {
        self.engine.cancel_order(wallet_id, order_id)
    }

    pub fn create_stop_order(&self, request: StopRequest) -> ExchangeResult<Order> {
        self.stops.create_stop_order(request)
    }

    pub fn cancel_stop_order(&self, wallet_id: &WalletId, order_id: &OrderId) -> ExchangeResult<Order> {
        self.stops.cancel_stop_order(wallet_id, order_id)
    }

    /// Book snapshot at the configured depth
    pub fn get_order_book(&self, coin_id: &CoinId) -> ExchangeResult<BookSnapshot> {
        self.engine.get_order_book(coin_id, self.config.engine.snapshot_depth)
    }

    /// Mine pending chain transactions, defaulting to the configured miner
    pub fn mine_block(&self, miner_address: Option<&str>) -> ExchangeResult<Block> {
        self.chain.mine_block(miner_address)
    }

    pub fn validate_chain(&self) -> bool {
        self.chain.validate_chain()
    }

    pub fn candles(&self, coin_id: &CoinId, timeframe: Timeframe, limit: usize) -> ExchangeResult<Vec<Candle>> {
        self.candles.candles(coin_id, timeframe, limit)
    }

    pub fn subscribe(&self, coin_id: &CoinId) -> broadcast::Receiver<MarketEvent> {
        self.broadcaster.subscribe(coin_id)
    }

    pub fn coins(&self) -> &Arc<CoinRegistry> {
        &self.coins
    }

    pub fn ledger(&self) -> &Arc<BalanceLedger> {
        &self.ledger
    }

    pub fn maker(&self) -> &Arc<MarketMaker> {
        &self.maker
    }

    pub fn engine(&self) -> &Arc<MatchingEngine> {
        &self.engine
    }

    pub fn stops(&self) -> &StopMonitor {
        &self.stops
    }

    pub fn chain(&self) -> &Arc<Blockchain> {
        &self.chain
    }
}
