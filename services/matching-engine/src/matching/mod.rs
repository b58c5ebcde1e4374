//! Matching logic module
//!
//! Implements price-time priority matching algorithm

pub mod crossing;
pub mod executor;

pub use crossing::{can_match, incoming_can_match, maker_can_fill};
pub use executor::{FillPlan, MatchExecutor};
