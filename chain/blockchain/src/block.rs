//! Blocks and proof-of-work
//!
//! The header hash commits to `block_number|previous_hash|merkle_root|nonce`.
//! Transactions are bound through the Merkle root; the timestamp and miner are
//! informational only.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::merkle::{merkle_root, sha256_hex};
use crate::transaction::ChainTransaction;

/// Hex digits in a SHA-256 hash; the highest mineable difficulty
pub const MAX_DIFFICULTY: u32 = 64;

/// `previous_hash` of the genesis block
pub const GENESIS_PREVIOUS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub block_number: u64,
    pub previous_hash: String,
    pub merkle_root: String,
    pub nonce: u64,
    /// Required leading zero hex digits
    pub difficulty: u32,
    pub timestamp: i64,
    pub miner_address: Option<String>,
    /// Amount of the REWARD transaction, zero when none was paid
    pub reward: Decimal,
    pub transactions: Vec<ChainTransaction>,
    pub current_hash: String,
}

/// Hex SHA-256 of the block header
pub fn header_hash(block_number: u64, previous_hash: &str, merkle_root: &str, nonce: u64) -> String {
    let preimage = format!("{}|{}|{}|{}", block_number, previous_hash, merkle_root, nonce);
    sha256_hex(preimage.as_bytes())
}

pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    let zeros = difficulty as usize;
    hash.len() >= zeros && hash.bytes().take(zeros).all(|b| b == b'0')
}

impl Block {
    /// Build a block and search nonces from zero until the header hash meets
    /// `difficulty`
    pub fn mine(
        block_number: u64,
        previous_hash: impl Into<String>,
        transactions: Vec<ChainTransaction>,
        difficulty: u32,
        miner_address: Option<String>,
        timestamp: i64,
    ) -> Self {
        let previous_hash = previous_hash.into();
        let merkle_root = merkle_root(&tx_hashes(&transactions));

        let mut nonce = 0u64;
        let mut hash = header_hash(block_number, &previous_hash, &merkle_root, nonce);
        while !meets_difficulty(&hash, difficulty) {
            nonce = nonce.wrapping_add(1);
            hash = header_hash(block_number, &previous_hash, &merkle_root, nonce);
        }

        Self {
            block_number,
            previous_hash,
            merkle_root,
            nonce,
            difficulty,
            timestamp,
            miner_address,
            reward: Decimal::ZERO,
            transactions,
            current_hash: hash,
        }
    }

    pub fn genesis(difficulty: u32, timestamp: i64) -> Self {
        Self::mine(0, GENESIS_PREVIOUS_HASH, Vec::new(), difficulty, None, timestamp)
    }

    pub fn compute_hash(&self) -> String {
        header_hash(self.block_number, &self.previous_hash, &self.merkle_root, self.nonce)
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Merkle root recomputed from the carried transactions
    pub fn compute_merkle_root(&self) -> String {
        merkle_root(&tx_hashes(&self.transactions))
    }
}

fn tx_hashes(transactions: &[ChainTransaction]) -> Vec<&str> {
    transactions.iter().map(|tx| tx.tx_hash.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::empty_root;
    use crate::transaction::TransactionType;

    #[test]
    fn test_genesis_shape() {
        let genesis = Block::genesis(2, 0);
        assert_eq!(genesis.block_number, 0);
        assert_eq!(genesis.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(genesis.merkle_root, empty_root());
        assert!(genesis.current_hash.starts_with("00"));
        assert_eq!(genesis.current_hash, genesis.compute_hash());
    }

    #[test]
    fn test_mined_block_meets_difficulty() {
        let tx = ChainTransaction::new("a", "b", Decimal::ONE, Decimal::ZERO, TransactionType::Trade, 1, 0);
        let block = Block::mine(1, "ab".repeat(32), vec![tx], 3, Some("miner".into()), 5);
        assert!(meets_difficulty(&block.current_hash, 3));
        assert_eq!(block.merkle_root, block.compute_merkle_root());
    }

    #[test]
    fn test_meets_difficulty() {
        assert!(meets_difficulty("00ab", 2));
        assert!(!meets_difficulty("0a0b", 2));
        assert!(meets_difficulty("anything", 0));
        assert!(!meets_difficulty("0", 2));
    }
}
