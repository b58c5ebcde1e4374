//! Market Maker / Pricing Model
//!
//! The synthetic counterparty that keeps every coin tradable:
//! - Per-trade price nudge toward the execution price
//! - Periodic volatility tick with an activity-dependent envelope
//! - Trailing order-flow window per coin
//! - Inventory refresh against the ledger's supply records
//!
//! **Key Invariants:**
//! - Every price change is a ratio within `[min_volatility, max_volatility]`
//! - Sellable inventory is always `circulating_supply - Σ user holdings`
//! - Ticks are reproducible for a given seed

pub mod activity;
pub mod maker;
pub mod pricing;

pub use activity::{FlowSnapshot, OrderFlowTracker};
pub use maker::MarketMaker;
pub use pricing::PricingConfig;
