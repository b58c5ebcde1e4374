//! Candle stream tests for the Market Data Service
//!
//! Feeds trades through the aggregator as a trade listener and checks what
//! subscribers of the coin channel see.

use market_data::candles::{CandleAggregator, CandleConfig, Timeframe};
use market_data::events::MarketEventPayload;
use market_data::ChannelBroadcaster;
use rust_decimal::Decimal;
use std::sync::Arc;
use types::ids::{CoinId, TradeId, WalletId};
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::trade::{Trade, TradeListener};

const MINUTE: i64 = 60 * 1_000_000_000;

fn make_trade(seq: u64, price: u64, qty: u64, executed_at: i64) -> Trade {
    Trade {
        trade_id: TradeId::new(),
        sequence: seq,
        coin_id: CoinId::new("GLD"),
        buy_order_id: None,
        sell_order_id: None,
        buyer: WalletId::new(),
        seller: WalletId::market_maker(),
        taker_side: Side::BUY,
        price: Price::from_u64(price),
        quantity: Quantity::from_u64(qty),
        buy_fee: Decimal::ZERO,
        sell_fee: Decimal::ZERO,
        executed_at,
    }
}

fn aggregator(timeframes: Vec<Timeframe>) -> (CandleAggregator, Arc<ChannelBroadcaster>) {
    let broadcaster = Arc::new(ChannelBroadcaster::new(256));
    let config = CandleConfig {
        timeframes,
        max_history: 50,
    };
    (CandleAggregator::new(config, broadcaster.clone()), broadcaster)
}

#[test]
fn test_trade_listener_builds_minute_and_hour_candles() {
    let (aggregator, _) = aggregator(vec![Timeframe::M1, Timeframe::H1]);
    let coin = CoinId::new("GLD");

    aggregator.on_trade(&make_trade(1, 10, 1, 5));
    aggregator.on_trade(&make_trade(2, 12, 1, 10));
    aggregator.on_trade(&make_trade(3, 9, 1, 20));
    aggregator.on_trade(&make_trade(4, 11, 2, MINUTE + 1));

    let minutes = aggregator.candles(&coin, Timeframe::M1, 10).unwrap();
    assert_eq!(minutes.len(), 2);
    let first = &minutes[1];
    assert_eq!(first.open, Decimal::from(10));
    assert_eq!(first.high, Decimal::from(12));
    assert_eq!(first.low, Decimal::from(9));
    assert_eq!(first.close, Decimal::from(9));
    assert_eq!(first.trade_count, 3);

    let hour = aggregator.current_candle(&coin, Timeframe::H1).unwrap().unwrap();
    assert_eq!(hour.trade_count, 4);
    assert_eq!(hour.volume, Decimal::from(5));
    assert_eq!(hour.close, Decimal::from(11));
}

#[test]
fn test_subscribers_receive_candle_updates() {
    let (aggregator, broadcaster) = aggregator(vec![Timeframe::M1]);
    let mut rx = broadcaster.subscribe(&CoinId::new("GLD"));

    aggregator.on_trade(&make_trade(1, 10, 1, 0));
    aggregator.on_trade(&make_trade(2, 14, 1, 1));

    let mut closes = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event.payload {
            MarketEventPayload::CandleUpdate(candle) => closes.push(candle.close),
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert_eq!(closes, vec![Decimal::from(10), Decimal::from(14)]);
}

#[test]
fn test_late_trade_is_not_published() {
    let (aggregator, broadcaster) = aggregator(vec![Timeframe::M1]);
    let mut rx = broadcaster.subscribe(&CoinId::new("GLD"));

    aggregator.on_trade(&make_trade(1, 10, 1, 2 * MINUTE));
    let updated = aggregator.record_trade(&make_trade(2, 99, 1, MINUTE)).unwrap();

    assert!(updated.is_empty());
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_unknown_series_is_empty() {
    let (aggregator, _) = aggregator(vec![Timeframe::M1]);
    assert!(aggregator.candles(&CoinId::new("NONE"), Timeframe::M1, 5).unwrap().is_empty());
    assert!(aggregator.current_candle(&CoinId::new("GLD"), Timeframe::D1).unwrap().is_none());
}
