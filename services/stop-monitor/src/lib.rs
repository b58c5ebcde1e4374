//! Stop Monitor Service
//!
//! Dormant conditional sells (stop-loss, take-profit, trailing stop) polled
//! against the reference price and handed to the matching engine as MARKET
//! sells when they fire.

pub mod monitor;
pub mod trigger;

pub use monitor::{PollReport, StopMonitor, StopMonitorConfig, StopRequest};
pub use trigger::{evaluate, validate_trigger, TriggerDecision};
