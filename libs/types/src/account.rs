//! Wallet and coin balance types
//!
//! These are plain records. All mutation goes through the balance ledger,
//! which holds the per-key locks; the helpers here only enforce the
//! non-negativity invariants on a single record.

use crate::errors::ExchangeError;
use crate::ids::{CoinId, WalletId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Gold wallet
///
/// Invariant: gold_balance >= 0 and gold_reserved >= 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub wallet_id: WalletId,
    /// Spendable gold
    pub gold_balance: Decimal,
    /// Gold held for resting BUY orders
    pub gold_reserved: Decimal,
    pub total_deposited: Decimal,
    pub total_withdrawn: Decimal,
    pub created_at: i64,
    pub version: u64,
}

impl Wallet {
    pub fn new(wallet_id: WalletId, gold_balance: Decimal, timestamp: i64) -> Self {
        Self {
            wallet_id,
            gold_balance,
            gold_reserved: Decimal::ZERO,
            total_deposited: Decimal::ZERO,
            total_withdrawn: Decimal::ZERO,
            created_at: timestamp,
            version: 0,
        }
    }

    pub fn check_invariant(&self) -> bool {
        self.gold_balance >= Decimal::ZERO && self.gold_reserved >= Decimal::ZERO
    }

    /// Spendable plus reserved gold
    pub fn total_gold(&self) -> Decimal {
        self.gold_balance + self.gold_reserved
    }

    /// Fail with `InsufficientFunds` unless `amount` is spendable
    pub fn ensure_available(&self, amount: Decimal) -> Result<(), ExchangeError> {
        if amount > self.gold_balance {
            return Err(self.insufficient(amount, self.gold_balance));
        }
        Ok(())
    }

    /// Fail with `InsufficientFunds` unless `amount` is reserved
    pub fn ensure_reserved(&self, amount: Decimal) -> Result<(), ExchangeError> {
        if amount > self.gold_reserved {
            return Err(self.insufficient(amount, self.gold_reserved));
        }
        Ok(())
    }

    fn insufficient(&self, required: Decimal, available: Decimal) -> ExchangeError {
        ExchangeError::InsufficientFunds {
            wallet: self.wallet_id.to_string(),
            required: required.to_string(),
            available: available.to_string(),
        }
    }
}

/// Holding of one coin by one wallet
///
/// Invariant: available_amount >= 0 and locked_amount >= 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinBalance {
    pub wallet_id: WalletId,
    pub coin_id: CoinId,
    pub available_amount: Decimal,
    pub locked_amount: Decimal,
}

impl CoinBalance {
    pub fn empty(wallet_id: WalletId, coin_id: CoinId) -> Self {
        Self {
            wallet_id,
            coin_id,
            available_amount: Decimal::ZERO,
            locked_amount: Decimal::ZERO,
        }
    }

    /// available + locked
    pub fn total(&self) -> Decimal {
        self.available_amount + self.locked_amount
    }

    pub fn check_invariant(&self) -> bool {
        self.available_amount >= Decimal::ZERO && self.locked_amount >= Decimal::ZERO
    }

    /// Fail with `InsufficientInventory` unless `amount` is available
    pub fn ensure_available(&self, amount: Decimal) -> Result<(), ExchangeError> {
        if amount > self.available_amount {
            return Err(self.insufficient(amount, self.available_amount));
        }
        Ok(())
    }

    /// Fail with `InsufficientInventory` unless `amount` is locked
    pub fn ensure_locked(&self, amount: Decimal) -> Result<(), ExchangeError> {
        if amount > self.locked_amount {
            return Err(self.insufficient(amount, self.locked_amount));
        }
        Ok(())
    }

    /// Move `amount` from available to locked
    pub fn lock(&mut self, amount: Decimal) -> Result<(), ExchangeError> {
        self.ensure_available(amount)?;
        self.available_amount -= amount;
        self.locked_amount += amount;
        Ok(())
    }

    /// Move `amount` from locked back to available
    pub fn unlock(&mut self, amount: Decimal) -> Result<(), ExchangeError> {
        self.ensure_locked(amount)?;
        self.locked_amount -= amount;
        self.available_amount += amount;
        Ok(())
    }

    fn insufficient(&self, required: Decimal, available: Decimal) -> ExchangeError {
        ExchangeError::InsufficientInventory {
            holder: self.wallet_id.to_string(),
            coin: self.coin_id.to_string(),
            required: required.to_string(),
            available: available.to_string(),
        }
    }
}
