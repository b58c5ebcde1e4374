//! Bid (buy-side) order book
//!
//! Maintains buy orders sorted by price descending (best bid first).
//! BTreeMap iterates ascending, so lookups walk it in reverse.

use std::collections::BTreeMap;
use types::ids::{OrderId, WalletId};
use types::numeric::{Price, Quantity};

use super::price_level::{LevelEntry, PriceLevel};
use super::RestingMatch;

/// Bid (buy) side order book
#[derive(Debug, Clone, Default)]
pub struct BidBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, price: Price, entry: LevelEntry) {
        self.levels.entry(price).or_default().insert(entry);
    }

    /// Returns true if the order was found and removed
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> bool {
        let Some(level) = self.levels.get_mut(&price) else {
            return false;
        };
        if level.remove(order_id).is_none() {
            return false;
        }
        if level.is_empty() {
            self.levels.remove(&price);
        }
        true
    }

    /// Best buy a seller from `seller` may hit, at or above `limit` if given
    pub fn next_match(&self, seller: &WalletId, limit: Option<Price>) -> Option<RestingMatch> {
        self.levels
            .iter()
            .rev()
            .take_while(|(price, _)| limit.map_or(true, |limit| **price >= limit))
            .find_map(|(price, level)| level.first_eligible(seller).map(|entry| RestingMatch::new(*price, entry)))
    }

    /// Take `quantity` from a resting order; returns what is left of it
    pub fn reduce(&mut self, price: Price, order_id: &OrderId, quantity: Quantity) -> Option<Quantity> {
        let level = self.levels.get_mut(&price)?;
        let remaining = level.reduce(order_id, quantity)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some(remaining)
    }

    /// Get the best bid (highest price)
    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        self.levels
            .iter()
            .next_back()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    /// Top N price levels as (price, quantity, order count), best first
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, Quantity, usize)> {
        self.levels
            .iter()
            .rev()
            .take(depth)
            .map(|(price, level)| (*price, level.total_quantity(), level.order_count()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_entry(wallet_id: WalletId, qty: u64, created_at: i64) -> LevelEntry {
        LevelEntry {
            order_id: OrderId::new(),
            wallet_id,
            remaining: Quantity::from_u64(qty),
            created_at,
        }
    }

    #[test]
    fn test_bid_book_best_bid() {
        let mut book = BidBook::new();
        let wallet = WalletId::new();
        book.insert(Price::from_u64(50), create_test_entry(wallet, 1, 1));
        book.insert(Price::from_u64(52), create_test_entry(wallet, 2, 2));
        book.insert(Price::from_u64(49), create_test_entry(wallet, 3, 3));

        let (best_price, best_qty) = book.best_bid().unwrap();
        assert_eq!(best_price, Price::from_u64(52));
        assert_eq!(best_qty, Quantity::from_u64(2));
    }

    #[test]
    fn test_depth_snapshot_descending() {
        let mut book = BidBook::new();
        let wallet = WalletId::new();
        for (i, price) in [10u64, 30, 20].iter().enumerate() {
            book.insert(Price::from_u64(*price), create_test_entry(wallet, 1, i as i64));
        }

        let prices: Vec<Price> = book.depth_snapshot(2).into_iter().map(|(p, _, _)| p).collect();
        assert_eq!(prices, vec![Price::from_u64(30), Price::from_u64(20)]);
    }

    #[test]
    fn test_next_match_respects_limit() {
        let mut book = BidBook::new();
        book.insert(Price::from_u64(9), create_test_entry(WalletId::new(), 5, 1));

        let seller = WalletId::new();
        assert!(book.next_match(&seller, Some(Price::from_u64(10))).is_none());
        assert!(book.next_match(&seller, Some(Price::from_u64(9))).is_some());
    }

    #[test]
    fn test_next_match_skips_own_orders() {
        let mut book = BidBook::new();
        let me = WalletId::new();
        book.insert(Price::from_u64(10), create_test_entry(me, 5, 1));

        assert!(book.next_match(&me, None).is_none());
        assert!(book.next_match(&WalletId::new(), None).is_some());
    }
}
