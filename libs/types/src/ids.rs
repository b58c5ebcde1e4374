//! Unique identifier types for exchange entities
//!
//! Order, trade and wallet ids use UUID v7 so they sort by creation time.
//! Coins are identified by their upper-case ticker symbol.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an order (regular or stop)
///
/// Uses UUID v7 for time-based sorting. Orders can be efficiently
/// queried in chronological order using the embedded timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Create a new OrderId with current timestamp
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Create from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get inner UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(Uuid);

impl TradeId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a wallet
///
/// `Ord` is derived so multi-wallet operations can lock in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(Uuid);

impl WalletId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Wallet the market maker trades under. Never holds a `CoinBalance`.
    pub fn market_maker() -> Self {
        Self(Uuid::nil())
    }

    pub fn is_market_maker(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for WalletId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_market_maker() {
            write!(f, "market-maker")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Coin identifier (ticker symbol)
///
/// Format: 1-16 ASCII alphanumeric characters, stored upper-case (e.g. "GLD", "RUBY").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoinId(String);

impl CoinId {
    /// Create a new CoinId from a symbol
    ///
    /// # Panics
    /// Panics if the symbol is empty, longer than 16 characters or not alphanumeric
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::try_new(symbol).expect("CoinId must be 1-16 alphanumeric characters")
    }

    /// Try to create a CoinId, returning None if invalid
    pub fn try_new(symbol: impl Into<String>) -> Option<Self> {
        let s = symbol.into();
        let valid = !s.is_empty() && s.len() <= 16 && s.chars().all(|c| c.is_ascii_alphanumeric());
        valid.then(|| Self(s.to_ascii_uppercase()))
    }

    /// Get the symbol string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CoinId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_creation() {
        let id1 = OrderId::new();
        let id2 = OrderId::new();
        assert_ne!(id1, id2, "OrderIds should be unique");
    }

    #[test]
    fn test_order_id_serialization() {
        let id = OrderId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: OrderId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_wallet_id_market_maker() {
        assert!(WalletId::market_maker().is_market_maker());
        assert!(!WalletId::new().is_market_maker());
        assert_eq!(WalletId::market_maker().to_string(), "market-maker");
    }

    #[test]
    fn test_coin_id_normalizes_case() {
        let coin = CoinId::new("ruby");
        assert_eq!(coin.as_str(), "RUBY");
        assert_eq!(coin, CoinId::from("RUBY"));
    }

    #[test]
    fn test_coin_id_try_new() {
        assert!(CoinId::try_new("GLD").is_some());
        assert!(CoinId::try_new("").is_none());
        assert!(CoinId::try_new("BAD/SYM").is_none());
        assert!(CoinId::try_new("A".repeat(17)).is_none());
    }

    #[test]
    #[should_panic(expected = "CoinId must be 1-16 alphanumeric characters")]
    fn test_coin_id_invalid_format() {
        CoinId::new("NOT VALID");
    }

    #[test]
    fn test_coin_id_serialization() {
        let coin = CoinId::new("ETH");
        let json = serde_json::to_string(&coin).unwrap();
        assert_eq!(json, "\"ETH\"");

        let deserialized: CoinId = serde_json::from_str(&json).unwrap();
        assert_eq!(coin, deserialized);
    }
}
