//! Synthetic exchange core wiring
//!
//! Builds the ledger, market maker, matching engine, stop monitor, candle
//! aggregator and audit chain once, and runs their periodic jobs:
//! - volatility tick (default every 5 minutes)
//! - liquidity refresh (hourly)
//! - stop order polling (every second)
//! - block mining

pub mod app;
pub mod config;
pub mod demo;
pub mod scheduler;

pub use app::Exchange;
pub use config::{ConfigError, ExchangeConfig, ScheduleConfig};
pub use demo::{seed_demo_market, DemoMarket};
pub use scheduler::Scheduler;
