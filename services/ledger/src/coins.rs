//! Coin registry
//!
//! Listing metadata and the advisory reference price. The price is written
//! by the periodic volatility tick and the per-trade nudge without
//! coordination: last write wins.

use dashmap::DashMap;
use std::sync::{Arc, RwLock};
use tracing::info;
use types::clock::Clock;
use types::coin::{Coin, CoinStatus};
use types::errors::{ExchangeError, ExchangeResult};
use types::ids::CoinId;
use types::numeric::Price;

use crate::sync;

/// Price change applied to a coin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceChange {
    pub previous: Price,
    pub current: Price,
    pub at: i64,
}

/// Registry of listed coins
pub struct CoinRegistry {
    coins: DashMap<CoinId, Arc<RwLock<Coin>>>,
    clock: Arc<dyn Clock>,
}

impl CoinRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            coins: DashMap::new(),
            clock,
        }
    }

    /// List a new coin
    ///
    /// Rejects duplicate ids, zero supply and inverted volatility bounds.
    pub fn list_coin(&self, coin: Coin) -> ExchangeResult<()> {
        if coin.circulating_supply.is_zero() {
            return Err(ExchangeError::invalid(format!(
                "coin {} must have a positive circulating supply",
                coin.coin_id
            )));
        }
        if !coin.volatility_bounds_valid() {
            return Err(ExchangeError::invalid(format!(
                "coin {} volatility bounds must satisfy 0 < min <= max < 1",
                coin.coin_id
            )));
        }

        match self.coins.entry(coin.coin_id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(ExchangeError::invalid(format!(
                "coin {} is already listed",
                coin.coin_id
            ))),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                info!(
                    coin = %coin.coin_id,
                    price = %coin.current_price,
                    supply = %coin.circulating_supply,
                    "Coin listed"
                );
                slot.insert(Arc::new(RwLock::new(coin)));
                Ok(())
            }
        }
    }

    fn cell(&self, coin_id: &CoinId) -> ExchangeResult<Arc<RwLock<Coin>>> {
        self.coins
            .get(coin_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ExchangeError::invalid(format!("unknown coin {}", coin_id)))
    }

    /// Snapshot of a coin
    pub fn coin(&self, coin_id: &CoinId) -> ExchangeResult<Coin> {
        let cell = self.cell(coin_id)?;
        let coin = sync::read(&cell, &format!("coin:{}", coin_id))?;
        Ok(coin.clone())
    }

    pub fn contains(&self, coin_id: &CoinId) -> bool {
        self.coins.contains_key(coin_id)
    }

    pub fn current_price(&self, coin_id: &CoinId) -> ExchangeResult<Price> {
        Ok(self.coin(coin_id)?.current_price)
    }

    /// Overwrite the reference price
    pub fn set_price(&self, coin_id: &CoinId, price: Price) -> ExchangeResult<PriceChange> {
        self.update_price(coin_id, |_| Some(price))?
            .ok_or_else(|| ExchangeError::conflict(format!("coin:{}", coin_id)))
    }

    /// Compute and store a new reference price under the coin's write lock
    ///
    /// `compute` sees the current coin and returns the new price, or None to
    /// leave it untouched.
    pub fn update_price<F>(&self, coin_id: &CoinId, compute: F) -> ExchangeResult<Option<PriceChange>>
    where
        F: FnOnce(&Coin) -> Option<Price>,
    {
        let cell = self.cell(coin_id)?;
        let mut coin = sync::write(&cell, &format!("coin:{}", coin_id))?;
        let Some(next) = compute(&coin) else {
            return Ok(None);
        };

        let at = self.clock.now_nanos();
        let change = PriceChange {
            previous: coin.current_price,
            current: next,
            at,
        };
        coin.current_price = next;
        coin.price_updated_at = at;
        Ok(Some(change))
    }

    pub fn set_status(&self, coin_id: &CoinId, status: CoinStatus) -> ExchangeResult<()> {
        let cell = self.cell(coin_id)?;
        let mut coin = sync::write(&cell, &format!("coin:{}", coin_id))?;
        if coin.status != status {
            info!(coin = %coin_id, from = ?coin.status, to = ?status, "Coin status changed");
            coin.status = status;
        }
        Ok(())
    }

    /// Listed coin ids in symbol order
    pub fn coin_ids(&self) -> Vec<CoinId> {
        let mut ids: Vec<CoinId> = self.coins.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Snapshots of all listed coins in symbol order
    pub fn coins(&self) -> Vec<Coin> {
        self.coin_ids()
            .iter()
            .filter_map(|id| self.coin(id).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use types::clock::ManualClock;
    use types::numeric::Quantity;

    fn registry() -> CoinRegistry {
        CoinRegistry::new(Arc::new(ManualClock::new(1_000)))
    }

    fn coin(symbol: &str) -> Coin {
        Coin::new(CoinId::new(symbol), symbol, Price::from_u64(100), Quantity::from_u64(1_000), 0)
    }

    #[test]
    fn test_list_and_lookup() {
        let registry = registry();
        registry.list_coin(coin("GLD")).unwrap();

        let listed = registry.coin(&CoinId::new("GLD")).unwrap();
        assert_eq!(listed.current_price, Price::from_u64(100));
        assert!(registry.contains(&CoinId::new("GLD")));
    }

    #[test]
    fn test_duplicate_listing_rejected() {
        let registry = registry();
        registry.list_coin(coin("GLD")).unwrap();

        let result = registry.list_coin(coin("GLD"));
        assert!(matches!(result, Err(ExchangeError::InvalidOrderParameters { .. })));
    }

    #[test]
    fn test_zero_supply_rejected() {
        let registry = registry();
        let mut bad = coin("GLD");
        bad.circulating_supply = Quantity::zero();
        assert!(registry.list_coin(bad).is_err());
    }

    #[test]
    fn test_unknown_coin() {
        let registry = registry();
        assert!(registry.coin(&CoinId::new("NOPE")).is_err());
    }

    #[test]
    fn test_set_price_records_change() {
        let registry = registry();
        registry.list_coin(coin("GLD")).unwrap();

        let change = registry.set_price(&CoinId::new("GLD"), Price::from_u64(110)).unwrap();
        assert_eq!(change.previous, Price::from_u64(100));
        assert_eq!(change.current, Price::from_u64(110));
        assert_eq!(change.at, 1_000);
        assert_eq!(registry.current_price(&CoinId::new("GLD")).unwrap(), Price::from_u64(110));
    }

    #[test]
    fn test_update_price_can_skip() {
        let registry = registry();
        registry.list_coin(coin("GLD")).unwrap();

        let change = registry.update_price(&CoinId::new("GLD"), |_| None).unwrap();
        assert!(change.is_none());
        assert_eq!(registry.current_price(&CoinId::new("GLD")).unwrap(), Price::from_u64(100));
    }

    #[test]
    fn test_status_and_ordering() {
        let registry = registry();
        registry.list_coin(coin("ZED")).unwrap();
        registry.list_coin(coin("ABC")).unwrap();
        registry.set_status(&CoinId::new("ZED"), CoinStatus::Suspended).unwrap();

        let coins = registry.coins();
        assert_eq!(coins[0].coin_id, CoinId::new("ABC"));
        assert_eq!(coins[1].status, CoinStatus::Suspended);
        assert_eq!(coins[0].min_volatility, Decimal::from_str_exact("0.0001").unwrap());
    }
}
