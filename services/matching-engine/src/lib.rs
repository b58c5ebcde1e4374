//! Matching Engine Service
//!
//! Per-coin order books with price-time priority matching, backed by the
//! balance ledger for reservations and settlement and by the market maker
//! for liquidity the book cannot provide.
//!
//! **Key Invariants:**
//! - Price-time priority strictly enforced
//! - No self-trades: an incoming order skips its own wallet's resting orders
//! - A resting order's reservation covers its unfilled remainder
//! - Trade sequences are gap-free and monotonic

pub mod book;
pub mod engine;
pub mod matching;

pub use engine::{EngineConfig, MatchingEngine, OrderRequest, PlaceOrderResult};
