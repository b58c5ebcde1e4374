//! Order book infrastructure module
//!
//! Contains price levels, bid book, and ask book implementations.

pub mod price_level;
pub mod bid_book;
pub mod ask_book;

pub use price_level::{LevelEntry, PriceLevel};
pub use bid_book::BidBook;
pub use ask_book::AskBook;

use types::ids::{OrderId, WalletId};
use types::numeric::{Price, Quantity};

/// Resting order an incoming order can trade against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestingMatch {
    pub price: Price,
    pub order_id: OrderId,
    pub wallet_id: WalletId,
    pub remaining: Quantity,
}

impl RestingMatch {
    fn new(price: Price, entry: &LevelEntry) -> Self {
        Self {
            price,
            order_id: entry.order_id,
            wallet_id: entry.wallet_id,
            remaining: entry.remaining,
        }
    }
}
