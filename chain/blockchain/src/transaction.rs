//! Chain transactions
//!
//! A transaction is hashed once at submission; the hash covers every field
//! except its confirmation state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::merkle::sha256_hex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Settled exchange trade, seller → buyer
    Trade,
    Transfer,
    /// Block reward paid to the miner
    Reward,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Trade => "TRADE",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::Reward => "REWARD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainTransaction {
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    pub amount: Decimal,
    pub fee: Decimal,
    pub tx_type: TransactionType,
    pub timestamp: i64,
    pub nonce: u64,
    pub status: TransactionStatus,
    /// Set once the including block is appended
    pub block_number: Option<u64>,
}

impl ChainTransaction {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        amount: Decimal,
        fee: Decimal,
        tx_type: TransactionType,
        timestamp: i64,
        nonce: u64,
    ) -> Self {
        let mut tx = Self {
            tx_hash: String::new(),
            from: from.into(),
            to: to.into(),
            amount,
            fee,
            tx_type,
            timestamp,
            nonce,
            status: TransactionStatus::Pending,
            block_number: None,
        };
        tx.tx_hash = tx.compute_hash();
        tx
    }

    /// `sha256(from|to|amount|fee|type|timestamp|nonce)`
    pub fn compute_hash(&self) -> String {
        let preimage = format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.from,
            self.to,
            self.amount.normalize(),
            self.fee.normalize(),
            self.tx_type.as_str(),
            self.timestamp,
            self.nonce
        );
        sha256_hex(preimage.as_bytes())
    }

    /// Stored hash still matches the contents
    pub fn verify_hash(&self) -> bool {
        self.tx_hash == self.compute_hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(nonce: u64) -> ChainTransaction {
        ChainTransaction::new("alice", "bob", Decimal::from(100), Decimal::from(5), TransactionType::Trade, 7, nonce)
    }

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(tx(1).tx_hash, tx(1).tx_hash);
        assert_ne!(tx(1).tx_hash, tx(2).tx_hash);
        assert_eq!(tx(1).tx_hash.len(), 64);
    }

    #[test]
    fn test_hash_ignores_decimal_scale() {
        let a = ChainTransaction::new("a", "b", Decimal::new(1000, 1), Decimal::ZERO, TransactionType::Transfer, 0, 0);
        let b = ChainTransaction::new("a", "b", Decimal::from(100), Decimal::ZERO, TransactionType::Transfer, 0, 0);
        assert_eq!(a.tx_hash, b.tx_hash);
    }

    #[test]
    fn test_tampering_detected() {
        let mut t = tx(1);
        assert!(t.verify_hash());
        t.amount = Decimal::from(1_000_000);
        assert!(!t.verify_hash());
    }

    #[test]
    fn test_status_not_hashed() {
        let mut t = tx(3);
        t.status = TransactionStatus::Confirmed;
        t.block_number = Some(4);
        assert!(t.verify_hash());
    }
}
