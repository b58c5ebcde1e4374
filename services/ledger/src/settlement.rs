//! Trade settlement description
//!
//! A `Settlement` names the two counterparties of a trade and where each one
//! pays from. The ledger applies it atomically in `BalanceLedger::settle_trade`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::errors::{ExchangeError, ExchangeResult};
use types::ids::{CoinId, WalletId};
use types::numeric::{Price, Quantity};

/// Where a buying wallet's gold comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoldSource {
    /// Spendable balance (MARKET buys)
    Available,
    /// Reservation held by a resting BUY
    Reserved,
}

/// Where a selling wallet's coins come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinSource {
    Available,
    /// Coins locked by a resting SELL
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuyerLeg {
    Wallet { wallet_id: WalletId, funding: GoldSource },
    /// Market maker buying back into inventory
    Maker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SellerLeg {
    Wallet { wallet_id: WalletId, funding: CoinSource },
    /// Market maker selling out of inventory
    Maker,
}

impl BuyerLeg {
    pub fn wallet_id(&self) -> WalletId {
        match self {
            BuyerLeg::Wallet { wallet_id, .. } => *wallet_id,
            BuyerLeg::Maker => WalletId::market_maker(),
        }
    }

    pub fn is_maker(&self) -> bool {
        matches!(self, BuyerLeg::Maker)
    }
}

impl SellerLeg {
    pub fn wallet_id(&self) -> WalletId {
        match self {
            SellerLeg::Wallet { wallet_id, .. } => *wallet_id,
            SellerLeg::Maker => WalletId::market_maker(),
        }
    }

    pub fn is_maker(&self) -> bool {
        matches!(self, SellerLeg::Maker)
    }
}

/// One executed trade to be applied to balances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub coin_id: CoinId,
    pub price: Price,
    pub quantity: Quantity,
    pub buy_fee: Decimal,
    pub sell_fee: Decimal,
    pub buyer: BuyerLeg,
    pub seller: SellerLeg,
}

impl Settlement {
    /// price × quantity
    pub fn notional(&self) -> Decimal {
        self.price.notional(self.quantity)
    }

    /// Gold leaving the buyer
    pub fn buyer_cost(&self) -> Decimal {
        self.notional().saturating_add(self.buy_fee)
    }

    /// Gold reaching the seller
    pub fn seller_proceeds(&self) -> Decimal {
        self.notional() - self.sell_fee
    }

    /// Structural checks that do not need any balance
    pub fn validate(&self) -> ExchangeResult<()> {
        if self.quantity.is_zero() {
            return Err(ExchangeError::invalid("settlement quantity must be positive"));
        }
        if self
            .price
            .checked_notional(self.quantity)
            .and_then(|notional| notional.checked_add(self.buy_fee))
            .is_none()
        {
            return Err(ExchangeError::invalid(format!(
                "settlement value {} x {} is out of range",
                self.price, self.quantity
            )));
        }
        if self.buy_fee < Decimal::ZERO || self.sell_fee < Decimal::ZERO {
            return Err(ExchangeError::invalid("fees must not be negative"));
        }
        if self.seller_proceeds() < Decimal::ZERO {
            return Err(ExchangeError::invalid(format!(
                "sell fee {} exceeds notional {}",
                self.sell_fee,
                self.notional()
            )));
        }
        if self.buyer.is_maker() && self.seller.is_maker() {
            return Err(ExchangeError::invalid("market maker cannot trade with itself"));
        }
        if self.buyer.wallet_id() == self.seller.wallet_id() {
            return Err(ExchangeError::invalid(format!(
                "wallet {} cannot trade with itself",
                self.buyer.wallet_id()
            )));
        }
        Ok(())
    }
}
