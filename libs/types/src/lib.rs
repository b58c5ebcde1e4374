//! Types library for the synthetic exchange core
//!
//! This library provides all core type definitions shared across the
//! ledger, matching engine, pricing model, stop monitor, market data and
//! audit chain.
//!
//! # Modules
//! - `ids`: Unique identifiers (OrderId, TradeId, WalletId, CoinId)
//! - `numeric`: Fixed-point decimal types (Price, Quantity)
//! - `order`: Order lifecycle and stop-trigger types
//! - `trade`: Trade execution types and the trade listener seam
//! - `coin`: Coin listing and volatility bounds
//! - `account`: Wallet and coin balance records
//! - `fee`: Fee schedule
//! - `clock`: Time source abstraction
//! - `errors`: Error taxonomy

pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;
pub mod coin;
pub mod account;
pub mod fee;
pub mod clock;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::account::*;
    pub use crate::clock::*;
    pub use crate::coin::*;
    pub use crate::errors::*;
    pub use crate::fee::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::trade::*;
}
