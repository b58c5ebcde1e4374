//! OHLCV Candle Aggregation
//!
//! Builds OHLCV (Open, High, Low, Close, Volume) candles from executed
//! trades, one series per (coin, timeframe).
//!
//! Candle boundaries are aligned to epoch (e.g., 1m candles open on minute
//! boundaries). Only the bucket covering the latest trade is mutable; when a
//! trade opens a newer bucket the previous one is closed for good, and any
//! empty buckets in between are backfilled with the previous close and zero
//! volume. A trade older than the open bucket is dropped.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use types::errors::{ExchangeError, ExchangeResult};
use types::ids::CoinId;
use types::numeric::{Price, Quantity};
use types::trade::{Trade, TradeListener};

use crate::broadcast::Broadcaster;
use crate::events::MarketEventPayload;

/// Default closed candles kept per series
pub const DEFAULT_MAX_HISTORY: usize = 500;

/// Supported candle timeframes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// Duration of this timeframe in nanoseconds.
    pub fn duration_nanos(&self) -> i64 {
        match self {
            Timeframe::M1 => 60 * 1_000_000_000,
            Timeframe::M5 => 5 * 60 * 1_000_000_000,
            Timeframe::M15 => 15 * 60 * 1_000_000_000,
            Timeframe::H1 => 3600 * 1_000_000_000,
            Timeframe::H4 => 4 * 3600 * 1_000_000_000,
            Timeframe::D1 => 86400 * 1_000_000_000_i64,
        }
    }

    /// All supported timeframes.
    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::M1,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::all().iter().copied().find(|tf| tf.label() == label)
    }

    /// Align a timestamp to this timeframe's boundary (floor).
    pub fn align_to_boundary(&self, timestamp_nanos: i64) -> i64 {
        timestamp_nanos.div_euclid(self.duration_nanos()) * self.duration_nanos()
    }
}

/// A single OHLCV candle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub coin_id: CoinId,
    pub timeframe: Timeframe,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub trade_count: u64,
    pub open_time: i64,
    pub close_time: i64,
}

impl Candle {
    /// Create a new candle from the first trade in this period.
    fn new(coin_id: CoinId, timeframe: Timeframe, price: Decimal, volume: Decimal, open_time: i64) -> Self {
        Self {
            coin_id,
            timeframe,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
            trade_count: 1,
            open_time,
            close_time: open_time + timeframe.duration_nanos() - 1,
        }
    }

    /// Update the candle with a new trade.
    fn update(&mut self, price: Decimal, volume: Decimal) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += volume;
        self.trade_count += 1;
    }

    /// Create a flat (no-trade) candle for backfill.
    fn flat(coin_id: CoinId, timeframe: Timeframe, prev_close: Decimal, open_time: i64) -> Self {
        Self {
            coin_id,
            timeframe,
            open: prev_close,
            high: prev_close,
            low: prev_close,
            close: prev_close,
            volume: Decimal::ZERO,
            trade_count: 0,
            open_time,
            close_time: open_time + timeframe.duration_nanos() - 1,
        }
    }

    /// Validate candle integrity (OHLCV invariants).
    pub fn is_valid(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.high >= self.low
            && self.low <= self.open
            && self.low <= self.close
            && self.volume >= Decimal::ZERO
            && self.close_time > self.open_time
    }
}

/// Outcome of feeding one trade into a series
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandleUpdate {
    /// Trade landed in the open bucket
    Updated(Candle),
    /// Trade opened a new bucket
    Opened {
        candle: Candle,
        /// Previous bucket, now immutable
        closed: Option<Candle>,
        /// Flat buckets inserted between the two
        backfilled: Vec<Candle>,
    },
    /// Trade predates the open bucket
    Late,
}

impl CandleUpdate {
    /// The open candle after the update, if the trade was applied
    pub fn current(&self) -> Option<&Candle> {
        match self {
            CandleUpdate::Updated(candle) => Some(candle),
            CandleUpdate::Opened { candle, .. } => Some(candle),
            CandleUpdate::Late => None,
        }
    }
}

/// Candles for a single timeframe on a single coin.
pub struct CandleSeries {
    coin_id: CoinId,
    timeframe: Timeframe,
    /// Currently building candle (not yet closed).
    current: Option<Candle>,
    /// Closed candles stored by open_time.
    closed: BTreeMap<i64, Candle>,
    max_history: usize,
}

impl CandleSeries {
    pub fn new(coin_id: CoinId, timeframe: Timeframe, max_history: usize) -> Self {
        Self {
            coin_id,
            timeframe,
            current: None,
            closed: BTreeMap::new(),
            max_history: max_history.max(1),
        }
    }

    pub fn apply_trade(&mut self, price: Price, quantity: Quantity, timestamp: i64) -> CandleUpdate {
        let price = price.as_decimal();
        let volume = quantity.as_decimal();
        let boundary = self.timeframe.align_to_boundary(timestamp);

        let previous = match self.current.take() {
            None => None,
            Some(mut current) if boundary == current.open_time => {
                current.update(price, volume);
                self.current = Some(current.clone());
                return CandleUpdate::Updated(current);
            }
            Some(current) if boundary < current.open_time => {
                self.current = Some(current);
                return CandleUpdate::Late;
            }
            Some(current) => Some(current),
        };

        let mut backfilled = Vec::new();
        if let Some(previous) = &previous {
            backfilled = self.backfill(previous, boundary);
            self.closed.insert(previous.open_time, previous.clone());
            self.trim_history();
        }

        let candle = Candle::new(self.coin_id.clone(), self.timeframe, price, volume, boundary);
        self.current = Some(candle.clone());
        CandleUpdate::Opened {
            candle,
            closed: previous,
            backfilled,
        }
    }

    /// Flat candles for the empty buckets strictly between `previous` and
    /// `next_open`, capped at the history size.
    fn backfill(&mut self, previous: &Candle, next_open: i64) -> Vec<Candle> {
        let duration = self.timeframe.duration_nanos();
        let earliest = next_open - duration * self.max_history as i64;
        let mut t = (previous.open_time + duration).max(earliest);

        let mut backfilled = Vec::new();
        while t < next_open {
            let candle = Candle::flat(self.coin_id.clone(), self.timeframe, previous.close, t);
            self.closed.insert(t, candle.clone());
            backfilled.push(candle);
            t += duration;
        }
        backfilled
    }

    /// Newest first, the open candle included.
    pub fn candles(&self, limit: usize) -> Vec<Candle> {
        self.current
            .iter()
            .chain(self.closed.values().rev())
            .take(limit)
            .cloned()
            .collect()
    }

    /// Get the current (unclosed) candle.
    pub fn current_candle(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    pub fn closed_len(&self) -> usize {
        self.closed.len()
    }

    fn trim_history(&mut self) {
        while self.closed.len() > self.max_history {
            self.closed.pop_first();
        }
    }
}

/// Candle aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandleConfig {
    pub timeframes: Vec<Timeframe>,
    /// Closed candles kept per (coin, timeframe)
    pub max_history: usize,
}

impl Default for CandleConfig {
    fn default() -> Self {
        Self {
            timeframes: Timeframe::all().to_vec(),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

type SeriesKey = (CoinId, Timeframe);

/// Candle series for every traded coin, fed by the trade stream.
pub struct CandleAggregator {
    config: CandleConfig,
    series: DashMap<SeriesKey, Arc<Mutex<CandleSeries>>>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl CandleAggregator {
    pub fn new(config: CandleConfig, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            config,
            series: DashMap::new(),
            broadcaster,
        }
    }

    fn series_cell(&self, coin_id: &CoinId, timeframe: Timeframe) -> Arc<Mutex<CandleSeries>> {
        let max_history = self.config.max_history;
        let entry = self
            .series
            .entry((coin_id.clone(), timeframe))
            .or_insert_with(|| Arc::new(Mutex::new(CandleSeries::new(coin_id.clone(), timeframe, max_history))));
        Arc::clone(entry.value())
    }

    /// Apply a trade to every configured timeframe and publish the open
    /// candles. Returns the candles that changed.
    pub fn record_trade(&self, trade: &Trade) -> ExchangeResult<Vec<Candle>> {
        let mut updated = Vec::with_capacity(self.config.timeframes.len());

        for &timeframe in &self.config.timeframes {
            let cell = self.series_cell(&trade.coin_id, timeframe);
            let outcome = {
                let mut series = cell
                    .lock()
                    .map_err(|_| ExchangeError::conflict(format!("candles:{}:{}", trade.coin_id, timeframe.label())))?;
                series.apply_trade(trade.price, trade.quantity, trade.executed_at)
            };

            match outcome.current() {
                Some(candle) => {
                    self.broadcaster.publish(
                        &trade.coin_id,
                        MarketEventPayload::CandleUpdate(candle.clone()),
                        trade.executed_at,
                    );
                    updated.push(candle.clone());
                }
                None => warn!(
                    coin = %trade.coin_id,
                    timeframe = timeframe.label(),
                    executed_at = trade.executed_at,
                    "Dropping trade older than the open candle"
                ),
            }
        }

        Ok(updated)
    }

    /// Newest first, the open candle included.
    pub fn candles(&self, coin_id: &CoinId, timeframe: Timeframe, limit: usize) -> ExchangeResult<Vec<Candle>> {
        let Some(cell) = self.series.get(&(coin_id.clone(), timeframe)).map(|e| Arc::clone(e.value())) else {
            return Ok(Vec::new());
        };
        let series = cell
            .lock()
            .map_err(|_| ExchangeError::conflict(format!("candles:{}:{}", coin_id, timeframe.label())))?;
        Ok(series.candles(limit))
    }

    pub fn current_candle(&self, coin_id: &CoinId, timeframe: Timeframe) -> ExchangeResult<Option<Candle>> {
        Ok(self.candles(coin_id, timeframe, 1)?.into_iter().next())
    }
}

impl TradeListener for CandleAggregator {
    fn on_trade(&self, trade: &Trade) {
        if let Err(err) = self.record_trade(trade) {
            warn!(coin = %trade.coin_id, error = %err, "Candle update failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nanos(minutes: i64) -> i64 {
        minutes * 60 * 1_000_000_000
    }

    fn series(max_history: usize) -> CandleSeries {
        CandleSeries::new(CoinId::new("GLD"), Timeframe::M1, max_history)
    }

    fn qty(n: u64) -> Quantity {
        Quantity::from_u64(n)
    }

    #[test]
    fn test_timeframe_duration() {
        assert_eq!(Timeframe::M1.duration_nanos(), 60_000_000_000);
        assert_eq!(Timeframe::H1.duration_nanos(), 3_600_000_000_000);
        assert_eq!(Timeframe::D1.duration_nanos(), 86_400_000_000_000);
    }

    #[test]
    fn test_timeframe_alignment() {
        let ts = nanos(5) + 30_000_000_000; // 5m30s
        assert_eq!(Timeframe::M1.align_to_boundary(ts), nanos(5));
        assert_eq!(Timeframe::M5.align_to_boundary(ts), nanos(5));
        assert_eq!(Timeframe::M15.align_to_boundary(ts), nanos(0));
    }

    #[test]
    fn test_timeframe_labels() {
        for tf in Timeframe::all() {
            assert_eq!(Timeframe::parse(tf.label()), Some(*tf));
        }
        assert_eq!(Timeframe::parse("30m"), None);
        assert_eq!(serde_json::to_string(&Timeframe::H4).unwrap(), "\"4h\"");
    }

    #[test]
    fn test_three_trades_in_one_bucket() {
        let mut series = series(10);
        series.apply_trade(Price::from_u64(10), qty(1), nanos(0) + 1);
        series.apply_trade(Price::from_u64(12), qty(2), nanos(0) + 2);
        let update = series.apply_trade(Price::from_u64(9), qty(3), nanos(0) + 3);

        let candle = update.current().unwrap();
        assert_eq!(candle.open, Decimal::from(10));
        assert_eq!(candle.high, Decimal::from(12));
        assert_eq!(candle.low, Decimal::from(9));
        assert_eq!(candle.close, Decimal::from(9));
        assert_eq!(candle.volume, Decimal::from(6));
        assert_eq!(candle.trade_count, 3);
        assert!(candle.is_valid());
    }

    #[test]
    fn test_candle_close_at_boundary() {
        let mut series = series(10);
        series.apply_trade(Price::from_u64(50), qty(1), nanos(0) + 10_000_000_000);

        let update = series.apply_trade(Price::from_u64(51), qty(2), nanos(1) + 5_000_000_000);
        match update {
            CandleUpdate::Opened { closed: Some(closed), backfilled, candle } => {
                assert_eq!(closed.open, Decimal::from(50));
                assert_eq!(closed.trade_count, 1);
                assert!(backfilled.is_empty());
                assert_eq!(candle.open_time, nanos(1));
            }
            other => panic!("expected a new bucket, got {:?}", other),
        }
    }

    #[test]
    fn test_gap_is_backfilled_flat() {
        let mut series = series(10);
        series.apply_trade(Price::from_u64(50), qty(1), nanos(0));
        let update = series.apply_trade(Price::from_u64(55), qty(1), nanos(3));

        let CandleUpdate::Opened { backfilled, .. } = update else {
            panic!("expected a new bucket");
        };
        assert_eq!(backfilled.len(), 2);
        for candle in &backfilled {
            assert_eq!(candle.open, Decimal::from(50));
            assert_eq!(candle.close, Decimal::from(50));
            assert_eq!(candle.volume, Decimal::ZERO);
            assert_eq!(candle.trade_count, 0);
            assert!(candle.is_valid());
        }
        assert_eq!(series.closed_len(), 3);
    }

    #[test]
    fn test_late_trade_dropped() {
        let mut series = series(10);
        series.apply_trade(Price::from_u64(50), qty(1), nanos(2));
        let update = series.apply_trade(Price::from_u64(1), qty(1), nanos(1));

        assert_eq!(update, CandleUpdate::Late);
        let current = series.current_candle().unwrap();
        assert_eq!(current.low, Decimal::from(50));
        assert_eq!(current.trade_count, 1);
    }

    #[test]
    fn test_closed_candles_never_change() {
        let mut series = series(10);
        series.apply_trade(Price::from_u64(50), qty(1), nanos(0));
        series.apply_trade(Price::from_u64(60), qty(1), nanos(1));
        let before = series.candles(10)[1].clone();

        series.apply_trade(Price::from_u64(70), qty(1), nanos(0) + 5);
        series.apply_trade(Price::from_u64(80), qty(1), nanos(1) + 5);
        assert_eq!(series.candles(10)[1], before);
    }

    #[test]
    fn test_history_limit() {
        let mut series = series(3);
        for minute in 0..6 {
            series.apply_trade(Price::from_u64(50), qty(1), nanos(minute) + 5_000_000_000);
        }
        assert_eq!(series.closed_len(), 3);
        // open candle plus three closed
        assert_eq!(series.candles(10).len(), 4);
    }

    #[test]
    fn test_long_gap_backfill_is_capped() {
        let mut series = series(5);
        series.apply_trade(Price::from_u64(50), qty(1), nanos(0));
        series.apply_trade(Price::from_u64(50), qty(1), nanos(10_000));
        assert_eq!(series.closed_len(), 5);
    }

    #[test]
    fn test_candle_integrity_validation() {
        let invalid = Candle {
            coin_id: CoinId::new("GLD"),
            timeframe: Timeframe::M1,
            open: Decimal::from(50),
            high: Decimal::from(49), // High < Open
            low: Decimal::from(48),
            close: Decimal::from(49),
            volume: Decimal::from(1),
            trade_count: 1,
            open_time: nanos(0),
            close_time: nanos(0) + Timeframe::M1.duration_nanos() - 1,
        };
        assert!(!invalid.is_valid());
    }

    #[test]
    fn test_candle_serialization() {
        let candle = Candle::new(CoinId::new("GLD"), Timeframe::M5, Decimal::from(50), Decimal::ONE, nanos(0));
        let json = serde_json::to_string(&candle).unwrap();
        let deserialized: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(candle, deserialized);
    }
}
