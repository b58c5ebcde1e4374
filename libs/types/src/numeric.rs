//! Fixed-point decimal types for prices and quantities
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Gold amounts are plain `Decimal`; prices and quantities get newtypes so
//! their sign invariants are enforced at construction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

/// Scale used when rounding derived prices (nudges, ticks)
pub const PRICE_SCALE: u32 = 8;

/// Strictly positive price in gold units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Create a price, returning None unless the value is > 0
    pub fn try_new(value: Decimal) -> Option<Self> {
        (value > Decimal::ZERO).then_some(Self(value.normalize()))
    }

    /// Create from an integer
    ///
    /// # Panics
    /// Panics if `value` is zero
    pub fn from_u64(value: u64) -> Self {
        assert!(value > 0, "Price must be positive");
        Self(Decimal::from(value))
    }

    /// Parse from a decimal string, None if malformed or not positive
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        s.parse::<Decimal>().ok().and_then(Self::try_new)
    }

    /// Get inner decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Notional value of `quantity` units at this price, saturating at
    /// `Decimal::MAX`
    pub fn notional(&self, quantity: Quantity) -> Decimal {
        self.0.saturating_mul(quantity.as_decimal())
    }

    /// Notional value, None if it does not fit in a `Decimal`
    pub fn checked_notional(&self, quantity: Quantity) -> Option<Decimal> {
        self.0.checked_mul(quantity.as_decimal())
    }
}

impl TryFrom<Decimal> for Price {
    type Error = String;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value).ok_or_else(|| format!("price must be positive, got {}", value))
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-negative quantity of coin units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a quantity, returning None if negative
    pub fn try_new(value: Decimal) -> Option<Self> {
        (value >= Decimal::ZERO).then_some(Self(value.normalize()))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Parse from a decimal string, None if malformed or negative
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        s.parse::<Decimal>().ok().and_then(Self::try_new)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Subtraction that refuses to go below zero
    pub fn checked_sub(self, other: Quantity) -> Option<Quantity> {
        Self::try_new(self.0 - other.0)
    }

    /// Subtraction clamped at zero
    pub fn saturating_sub(self, other: Quantity) -> Quantity {
        self.checked_sub(other).unwrap_or(Quantity::zero())
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = String;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::try_new(value).ok_or_else(|| format!("quantity must not be negative, got {}", value))
    }
}

impl From<Quantity> for Decimal {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

/// Saturates at `Decimal::MAX`
impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_must_be_positive() {
        assert!(Price::try_new(Decimal::ZERO).is_none());
        assert!(Price::try_new(Decimal::from(-1)).is_none());
        assert!(Price::from_str("0.5").is_some());
        assert!(Price::from_str("abc").is_none());
    }

    #[test]
    fn test_price_ordering_ignores_scale() {
        let a = Price::from_str("10.0").unwrap();
        let b = Price::from_u64(10);
        assert_eq!(a, b);
        assert!(Price::from_u64(9) < b);
    }

    #[test]
    fn test_quantity_arithmetic() {
        let five = Quantity::from_u64(5);
        let three = Quantity::from_u64(3);
        assert_eq!(five.checked_sub(three), Some(Quantity::from_u64(2)));
        assert_eq!(three.checked_sub(five), None);
        assert_eq!(three.saturating_sub(five), Quantity::zero());
        assert_eq!(five + three, Quantity::from_u64(8));
    }

    #[test]
    fn test_notional() {
        let price = Price::from_u64(12);
        assert_eq!(price.notional(Quantity::from_u64(3)), Decimal::from(36));
        assert_eq!(price.checked_notional(Quantity::from_u64(3)), Some(Decimal::from(36)));
    }

    #[test]
    fn test_notional_overflow() {
        let huge = Price::from_str("100000000000000000").unwrap();
        let qty = Quantity::from_str("100000000000000000").unwrap();
        assert_eq!(huge.checked_notional(qty), None);
        assert_eq!(huge.notional(qty), Decimal::MAX);
    }

    #[test]
    fn test_quantity_default_is_zero() {
        assert_eq!(Quantity::default(), Quantity::zero());
    }

    #[test]
    fn test_deserialize_enforces_sign() {
        assert!(serde_json::from_str::<Price>("\"0\"").is_err());
        assert!(serde_json::from_str::<Price>("\"-3\"").is_err());
        assert_eq!(serde_json::from_str::<Price>("\"2.50\"").unwrap(), Price::from_str("2.5").unwrap());
        assert!(serde_json::from_str::<Quantity>("\"-1\"").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("\"0\"").unwrap(), Quantity::zero());
    }
}
