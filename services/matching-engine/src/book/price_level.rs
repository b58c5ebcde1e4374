//! Price level implementation with FIFO queue
//!
//! A price level contains all resting orders at a specific price point.
//! Orders are kept in arrival order to enforce time priority. An incoming
//! order skips entries owned by its own wallet; skipped entries keep their
//! queue position.

use std::collections::VecDeque;
use types::ids::{OrderId, WalletId};
use types::numeric::Quantity;

/// Entry in the price level queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelEntry {
    pub order_id: OrderId,
    pub wallet_id: WalletId,
    pub remaining: Quantity,
    pub created_at: i64,
}

/// A price level containing orders at a specific price
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    /// Queue of orders at this price level (FIFO order)
    orders: VecDeque<LevelEntry>,
    /// Total quantity available at this level
    total_quantity: Quantity,
}

impl PriceLevel {
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_quantity: Quantity::zero(),
        }
    }

    /// Insert an order at the back of the queue (time priority)
    pub fn insert(&mut self, entry: LevelEntry) {
        self.total_quantity = self.total_quantity + entry.remaining;
        self.orders.push_back(entry);
    }

    /// Remove an order from the queue by OrderId
    ///
    /// Returns the remaining quantity of the removed order, or None if not found
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Quantity> {
        let position = self.orders.iter().position(|entry| &entry.order_id == order_id)?;
        let entry = self.orders.remove(position)?;
        self.total_quantity = self.total_quantity.saturating_sub(entry.remaining);
        Some(entry.remaining)
    }

    /// Earliest entry not owned by `exclude`
    pub fn first_eligible(&self, exclude: &WalletId) -> Option<&LevelEntry> {
        self.orders.iter().find(|entry| &entry.wallet_id != exclude)
    }

    /// Take `quantity` from an entry, dropping it once empty
    ///
    /// Returns the entry's remaining quantity, or None if not found.
    pub fn reduce(&mut self, order_id: &OrderId, quantity: Quantity) -> Option<Quantity> {
        let position = self.orders.iter().position(|entry| &entry.order_id == order_id)?;
        let entry = self.orders.get_mut(position)?;
        let remaining = entry.remaining.saturating_sub(quantity);
        let taken = entry.remaining.saturating_sub(remaining);
        entry.remaining = remaining;

        if remaining.is_zero() {
            self.orders.remove(position);
        }
        self.total_quantity = self.total_quantity.saturating_sub(taken);
        Some(remaining)
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(wallet_id: WalletId, qty: &str, created_at: i64) -> LevelEntry {
        LevelEntry {
            order_id: OrderId::new(),
            wallet_id,
            remaining: Quantity::from_str(qty).unwrap(),
            created_at,
        }
    }

    #[test]
    fn test_price_level_insert() {
        let mut level = PriceLevel::new();
        level.insert(entry(WalletId::new(), "1.5", 1));

        assert_eq!(level.order_count(), 1);
        assert_eq!(level.total_quantity(), Quantity::from_str("1.5").unwrap());
        assert!(!level.is_empty());
    }

    #[test]
    fn test_price_level_fifo_order() {
        let mut level = PriceLevel::new();
        let wallet = WalletId::new();
        let first = entry(wallet, "1.0", 1);
        let first_id = first.order_id;
        level.insert(first);
        level.insert(entry(wallet, "2.0", 2));
        level.insert(entry(wallet, "3.0", 3));

        assert_eq!(level.first_eligible(&WalletId::new()).unwrap().order_id, first_id);
        assert_eq!(level.total_quantity(), Quantity::from_u64(6));
    }

    #[test]
    fn test_price_level_remove() {
        let mut level = PriceLevel::new();
        let wallet = WalletId::new();
        let first = entry(wallet, "1.0", 1);
        let first_id = first.order_id;
        level.insert(first);
        level.insert(entry(wallet, "2.0", 2));

        assert_eq!(level.remove(&first_id), Some(Quantity::from_u64(1)));
        assert_eq!(level.order_count(), 1);
        assert_eq!(level.total_quantity(), Quantity::from_u64(2));
        assert_eq!(level.remove(&first_id), None);
    }

    #[test]
    fn test_first_eligible_skips_own_orders() {
        let mut level = PriceLevel::new();
        let me = WalletId::new();
        let other = WalletId::new();
        level.insert(entry(me, "1.0", 1));
        let theirs = entry(other, "2.0", 2);
        let theirs_id = theirs.order_id;
        level.insert(theirs);

        assert_eq!(level.first_eligible(&me).unwrap().order_id, theirs_id);
        assert_eq!(level.first_eligible(&other).unwrap().wallet_id, me);
    }

    #[test]
    fn test_reduce_partial_then_full() {
        let mut level = PriceLevel::new();
        let e = entry(WalletId::new(), "5.0", 1);
        let id = e.order_id;
        level.insert(e);

        assert_eq!(level.reduce(&id, Quantity::from_u64(2)), Some(Quantity::from_u64(3)));
        assert_eq!(level.total_quantity(), Quantity::from_u64(3));
        assert_eq!(level.order_count(), 1);

        assert_eq!(level.reduce(&id, Quantity::from_u64(3)), Some(Quantity::zero()));
        assert!(level.is_empty());
        assert_eq!(level.total_quantity(), Quantity::zero());
    }
}
