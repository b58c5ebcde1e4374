//! Market Data Service
//!
//! Consumes executed trades and engine snapshots and produces:
//! - OHLCV candle aggregation (multi-timeframe, per coin)
//! - Per-coin event channels: price updates, trade prints, order book
//!   snapshots and candle updates
//!
//! # Architecture
//!
//! ```text
//!   Matching Engine ──trade──► CandleAggregator
//!         │                          │
//!         │ price / print / book     │ candle update
//!         ▼                          ▼
//!   ┌────────────────────────────────────┐
//!   │  Broadcaster (channel per coin)    │
//!   └────────────────────────────────────┘
//! ```

pub mod broadcast;
pub mod candles;
pub mod events;

pub use broadcast::{Broadcaster, ChannelBroadcaster};
pub use candles::{Candle, CandleAggregator, CandleConfig, Timeframe};
pub use events::{BookLevel, BookSnapshot, MarketEvent, MarketEventPayload, PriceSource};

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
