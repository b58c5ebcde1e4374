//! Crossing detection logic
//!
//! Determines when an incoming order may trade at a given price, whether
//! against a resting order or against the market maker's reference price.

use types::numeric::Price;
use types::order::{OrderMethod, Side};

/// Check if a bid and ask can match at given prices
pub fn can_match(bid_price: Price, ask_price: Price) -> bool {
    bid_price >= ask_price
}

/// Check if an incoming order price crosses a resting order price
pub fn incoming_can_match(incoming_side: Side, incoming_price: Price, resting_price: Price) -> bool {
    match incoming_side {
        Side::BUY => can_match(incoming_price, resting_price),
        Side::SELL => can_match(resting_price, incoming_price),
    }
}

/// Whether the market maker may fill an order's remainder at `reference`
///
/// MARKET orders always qualify. A LIMIT buy qualifies when the reference is
/// at or below its limit, a LIMIT sell when it is at or above.
pub fn maker_can_fill(side: Side, method: OrderMethod, limit: Option<Price>, reference: Price) -> bool {
    match (method, limit) {
        (OrderMethod::MARKET, _) => true,
        (OrderMethod::LIMIT, Some(limit)) => incoming_can_match(side, limit, reference),
        (OrderMethod::LIMIT, None) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_match_crossing() {
        assert!(can_match(Price::from_u64(50), Price::from_u64(49)), "Bid >= ask should match");
        assert!(can_match(Price::from_u64(50), Price::from_u64(50)), "Equal prices should match");
        assert!(!can_match(Price::from_u64(49), Price::from_u64(50)), "Bid < ask should not match");
    }

    #[test]
    fn test_incoming_sides() {
        assert!(incoming_can_match(Side::BUY, Price::from_u64(50), Price::from_u64(49)));
        assert!(!incoming_can_match(Side::BUY, Price::from_u64(48), Price::from_u64(49)));
        assert!(incoming_can_match(Side::SELL, Price::from_u64(49), Price::from_u64(50)));
        assert!(!incoming_can_match(Side::SELL, Price::from_u64(51), Price::from_u64(50)));
    }

    #[test]
    fn test_maker_can_fill() {
        let reference = Price::from_u64(100);
        assert!(maker_can_fill(Side::BUY, OrderMethod::MARKET, None, reference));
        assert!(maker_can_fill(Side::SELL, OrderMethod::MARKET, None, reference));

        assert!(maker_can_fill(Side::BUY, OrderMethod::LIMIT, Some(Price::from_u64(100)), reference));
        assert!(!maker_can_fill(Side::BUY, OrderMethod::LIMIT, Some(Price::from_u64(99)), reference));

        assert!(maker_can_fill(Side::SELL, OrderMethod::LIMIT, Some(Price::from_u64(95)), reference));
        assert!(!maker_can_fill(Side::SELL, OrderMethod::LIMIT, Some(Price::from_u64(101)), reference));
    }
}
