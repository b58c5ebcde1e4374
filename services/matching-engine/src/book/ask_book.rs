//! Ask (sell-side) order book
//!
//! Maintains sell orders sorted by price ascending (best ask first).
//! Uses BTreeMap for deterministic iteration order.

use std::collections::BTreeMap;
use types::ids::{OrderId, WalletId};
use types::numeric::{Price, Quantity};

use super::price_level::{LevelEntry, PriceLevel};
use super::RestingMatch;

/// Ask (sell) side order book
#[derive(Debug, Clone, Default)]
pub struct AskBook {
    /// Price levels sorted ascending (lowest price first)
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
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

    /// Best sell a buyer from `buyer` may take, at or below `limit` if given
    pub fn next_match(&self, buyer: &WalletId, limit: Option<Price>) -> Option<RestingMatch> {
        self.levels
            .iter()
            .take_while(|(price, _)| limit.map_or(true, |limit| **price <= limit))
            .find_map(|(price, level)| level.first_eligible(buyer).map(|entry| RestingMatch::new(*price, entry)))
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

    /// Get the best ask (lowest price)
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.levels
            .iter()
            .next()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    /// Top N price levels as (price, quantity, order count)
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, Quantity, usize)> {
        self.levels
            .iter()
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
    fn test_ask_book_best_ask() {
        let mut book = AskBook::new();
        let wallet = WalletId::new();
        book.insert(Price::from_u64(50), create_test_entry(wallet, 1, 1));
        book.insert(Price::from_u64(51), create_test_entry(wallet, 2, 2));
        book.insert(Price::from_u64(49), create_test_entry(wallet, 3, 3));

        let (best_price, best_qty) = book.best_ask().unwrap();
        assert_eq!(best_price, Price::from_u64(49));
        assert_eq!(best_qty, Quantity::from_u64(3));
        assert_eq!(book.depth_snapshot(10).len(), 3);
    }

    #[test]
    fn test_next_match_respects_limit() {
        let mut book = AskBook::new();
        let seller = WalletId::new();
        book.insert(Price::from_u64(12), create_test_entry(seller, 5, 1));

        let buyer = WalletId::new();
        assert!(book.next_match(&buyer, Some(Price::from_u64(11))).is_none());
        assert_eq!(
            book.next_match(&buyer, Some(Price::from_u64(12))).unwrap().price,
            Price::from_u64(12)
        );
        assert!(book.next_match(&buyer, None).is_some());
    }

    #[test]
    fn test_next_match_skips_own_level() {
        let mut book = AskBook::new();
        let me = WalletId::new();
        let other = WalletId::new();
        book.insert(Price::from_u64(10), create_test_entry(me, 5, 1));
        book.insert(Price::from_u64(11), create_test_entry(other, 5, 2));

        let found = book.next_match(&me, None).unwrap();
        assert_eq!(found.price, Price::from_u64(11));
        assert_eq!(found.wallet_id, other);
    }

    #[test]
    fn test_reduce_drops_empty_level() {
        let mut book = AskBook::new();
        let entry = create_test_entry(WalletId::new(), 5, 1);
        let id = entry.order_id;
        book.insert(Price::from_u64(10), entry);

        assert_eq!(book.reduce(Price::from_u64(10), &id, Quantity::from_u64(5)), Some(Quantity::zero()));
        assert!(book.is_empty());
    }

    #[test]
    fn test_remove() {
        let mut book = AskBook::new();
        let entry = create_test_entry(WalletId::new(), 5, 1);
        let id = entry.order_id;
        book.insert(Price::from_u64(10), entry);

        assert!(!book.remove(&id, Price::from_u64(11)));
        assert!(book.remove(&id, Price::from_u64(10)));
        assert!(book.is_empty());
    }
}
