//! Balance Ledger
//!
//! The transactional store underneath the exchange core:
//! - Wallet gold balances and reservations
//! - Per-(wallet, coin) holdings with available/locked split
//! - Coin registry with advisory reference prices
//! - Supply accounting for the market maker's logical inventory
//!
//! **Key Invariants:**
//! - `available_amount >= 0` and `locked_amount >= 0` for every holding
//! - `Σ(user holdings) + maker_inventory == circulating_supply` per coin
//! - Trade settlement applies all legs or none
//!
//! Every record sits behind its own mutex; there is no ledger-wide lock.
//! Multi-key operations lock supply → wallets → holdings, each group in
//! sorted key order.

pub mod balances;
pub mod coins;
pub mod settlement;
pub mod sync;

pub use balances::{BalanceLedger, SupplyReport};
pub use coins::CoinRegistry;
pub use settlement::{BuyerLeg, CoinSource, GoldSource, SellerLeg, Settlement};
