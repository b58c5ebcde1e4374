//! Market maker service
//!
//! The synthetic counterparty behind every coin. It never rests orders; its
//! sellable inventory is the coin's headroom in the ledger, and its effect on
//! the market is the reference price it moves.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use ledger::coins::PriceChange;
use ledger::{BalanceLedger, CoinRegistry, SupplyReport};
use market_data::{Broadcaster, MarketEventPayload, PriceSource};
use types::clock::{Clock, NANOS_PER_SECOND};
use types::errors::ExchangeResult;
use types::ids::CoinId;
use types::numeric::Quantity;
use types::order::Side;
use types::trade::Trade;

use crate::activity::OrderFlowTracker;
use crate::pricing::{self, PricingConfig};

pub struct MarketMaker {
    config: PricingConfig,
    coins: Arc<CoinRegistry>,
    ledger: Arc<BalanceLedger>,
    flow: OrderFlowTracker,
    rng: Mutex<ChaCha8Rng>,
    broadcaster: Arc<dyn Broadcaster>,
    clock: Arc<dyn Clock>,
}

impl MarketMaker {
    pub fn new(
        config: PricingConfig,
        ledger: Arc<BalanceLedger>,
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let window = config.flow_window_secs as i64 * NANOS_PER_SECOND;
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(config.seed)),
            flow: OrderFlowTracker::new(window),
            coins: Arc::clone(ledger.coins()),
            config,
            ledger,
            broadcaster,
            clock,
        }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn flow(&self) -> &OrderFlowTracker {
        &self.flow
    }

    /// Count an accepted order toward the flow window
    pub fn record_order(&self, coin_id: &CoinId, side: Side) {
        if let Err(err) = self.flow.record_order(coin_id, side, self.clock.now_nanos()) {
            warn!(coin = %coin_id, error = %err, "Order flow not recorded");
        }
    }

    /// Sellable inventory for `coin_id`
    pub fn inventory(&self, coin_id: &CoinId) -> ExchangeResult<Quantity> {
        self.ledger.maker_inventory(coin_id)
    }

    /// Nudge the reference price after a trade
    pub fn apply_trade_impact(&self, trade: &Trade) -> ExchangeResult<Option<PriceChange>> {
        self.flow.record_trade(&trade.coin_id, trade.quantity, trade.executed_at)?;
        let flow = self.flow.snapshot(&trade.coin_id, self.clock.now_nanos())?;

        let change = self.coins.update_price(&trade.coin_id, |coin| {
            let step = pricing::nudge_step(coin, trade.price, trade.quantity, &flow, &self.config);
            pricing::apply_step(coin.current_price, step)
        })?;

        if let Some(change) = &change {
            debug!(
                coin = %trade.coin_id,
                from = %change.previous,
                to = %change.current,
                "Price nudged"
            );
            self.publish(&trade.coin_id, change, PriceSource::Trade);
        }
        Ok(change)
    }

    /// One volatility tick for one coin
    pub fn tick_coin(&self, coin_id: &CoinId) -> ExchangeResult<Option<PriceChange>> {
        let flow = self.flow.snapshot(coin_id, self.clock.now_nanos())?;
        let mut rng = ledger::sync::lock(&self.rng, "maker:rng")?;

        let change = self.coins.update_price(coin_id, |coin| {
            if !coin.is_tradable() {
                return None;
            }
            let step = pricing::tick_step(coin, &flow, &self.config, &mut *rng);
            pricing::apply_step(coin.current_price, step)
        })?;
        drop(rng);

        if let Some(change) = &change {
            self.publish(coin_id, change, PriceSource::Tick);
        }
        Ok(change)
    }

    /// Volatility tick across every active coin
    ///
    /// Coins are visited in symbol order so a seeded run is reproducible.
    pub fn volatility_tick(&self) -> Vec<(CoinId, PriceChange)> {
        let mut changes = Vec::new();
        for coin_id in self.coins.coin_ids() {
            match self.tick_coin(&coin_id) {
                Ok(Some(change)) => changes.push((coin_id, change)),
                Ok(None) => {}
                Err(err) => warn!(coin = %coin_id, error = %err, "Volatility tick failed"),
            }
        }
        debug!(moved = changes.len(), "Volatility tick complete");
        changes
    }

    /// Reconcile tracked holdings against a scan for every coin and log the
    /// resulting inventory
    pub fn refresh_liquidity(&self) -> Vec<SupplyReport> {
        let mut reports = Vec::new();
        for coin_id in self.coins.coin_ids() {
            match self.ledger.reconcile_supply(&coin_id) {
                Ok(report) => {
                    info!(
                        coin = %coin_id,
                        inventory = %report.maker_inventory,
                        circulating = %report.circulating_supply,
                        "Maker inventory refreshed"
                    );
                    reports.push(report);
                }
                Err(err) => warn!(coin = %coin_id, error = %err, "Liquidity refresh failed"),
            }
        }
        reports
    }

    fn publish(&self, coin_id: &CoinId, change: &PriceChange, source: PriceSource) {
        self.broadcaster.publish(
            coin_id,
            MarketEventPayload::PriceUpdate {
                previous: change.previous,
                current: change.current,
                source,
            },
            change.at,
        );
    }
}
