//! Append-only audit chain
//!
//! The chain and the pending pool each sit behind their own `Mutex`. Mining
//! reads the tip, releases every lock while searching nonces, then re-checks
//! the tip on append. Lock order when both are held: chain → pool.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use types::clock::Clock;
use types::errors::{ExchangeError, ExchangeResult};

use crate::block::{meets_difficulty, Block, GENESIS_PREVIOUS_HASH, MAX_DIFFICULTY};
use crate::transaction::{ChainTransaction, TransactionStatus, TransactionType};

/// Sender of block reward transactions
pub const REWARD_SENDER: &str = "SYSTEM";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Leading zero hex digits required of every block hash
    pub difficulty: u32,
    pub max_transactions_per_block: usize,
    /// Paid to the miner in a REWARD transaction; zero disables rewards
    pub block_reward: Decimal,
    pub default_miner: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            difficulty: 3,
            max_transactions_per_block: 100,
            block_reward: Decimal::ZERO,
            default_miner: "exchange-miner".to_string(),
        }
    }
}

impl ChainConfig {
    pub fn validate(&self) -> ExchangeResult<()> {
        if self.difficulty > MAX_DIFFICULTY {
            return Err(ExchangeError::invalid(format!(
                "difficulty {} exceeds {} hex digits",
                self.difficulty, MAX_DIFFICULTY
            )));
        }
        if self.max_transactions_per_block == 0 {
            return Err(ExchangeError::invalid("max_transactions_per_block must be positive"));
        }
        if self.block_reward.is_sign_negative() {
            return Err(ExchangeError::invalid("block_reward must not be negative"));
        }
        Ok(())
    }
}

pub struct Blockchain {
    config: ChainConfig,
    chain: Mutex<Vec<Block>>,
    pool: Mutex<Vec<ChainTransaction>>,
    next_nonce: AtomicU64,
    clock: Arc<dyn Clock>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, resource: &str) -> ExchangeResult<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| ExchangeError::conflict(resource))
}

impl Blockchain {
    /// New chain holding only the genesis block
    pub fn new(config: ChainConfig, clock: Arc<dyn Clock>) -> ExchangeResult<Self> {
        config.validate()?;
        let genesis = Block::genesis(config.difficulty, clock.now_nanos());
        info!(hash = %genesis.current_hash, difficulty = config.difficulty, "Genesis block created");
        Ok(Self {
            config,
            chain: Mutex::new(vec![genesis]),
            pool: Mutex::new(Vec::new()),
            next_nonce: AtomicU64::new(0),
            clock,
        })
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Add a PENDING transaction to the pool
    pub fn submit_transaction(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
        amount: Decimal,
        fee: Decimal,
        tx_type: TransactionType,
    ) -> ExchangeResult<ChainTransaction> {
        if amount.is_sign_negative() || fee.is_sign_negative() {
            return Err(ExchangeError::invalid("transaction amount and fee must be non-negative"));
        }
        let nonce = self.next_nonce.fetch_add(1, Ordering::SeqCst);
        let tx = ChainTransaction::new(from, to, amount, fee, tx_type, self.clock.now_nanos(), nonce);

        lock(&self.pool, "chain:pool")?.push(tx.clone());
        debug!(tx_hash = %tx.tx_hash, tx_type = tx.tx_type.as_str(), "Transaction submitted");
        Ok(tx)
    }

    /// Mine a candidate block on the current tip without appending it
    ///
    /// No lock is held while searching nonces.
    pub fn create_block(
        &self,
        transactions: Vec<ChainTransaction>,
        miner: Option<&str>,
    ) -> ExchangeResult<Block> {
        let (number, previous_hash) = {
            let chain = lock(&self.chain, "chain:blocks")?;
            match chain.last() {
                Some(tip) => (tip.block_number + 1, tip.current_hash.clone()),
                None => (0, GENESIS_PREVIOUS_HASH.to_string()),
            }
        };

        let mut transactions = transactions;
        let miner = miner.map(str::to_string);
        if let Some(miner) = &miner {
            if self.config.block_reward > Decimal::ZERO {
                let nonce = self.next_nonce.fetch_add(1, Ordering::SeqCst);
                transactions.push(ChainTransaction::new(
                    REWARD_SENDER,
                    miner.clone(),
                    self.config.block_reward,
                    Decimal::ZERO,
                    TransactionType::Reward,
                    self.clock.now_nanos(),
                    nonce,
                ));
            }
        }

        let reward = transactions
            .iter()
            .filter(|tx| tx.tx_type == TransactionType::Reward)
            .map(|tx| tx.amount)
            .sum();
        let mut block = Block::mine(
            number,
            previous_hash,
            transactions,
            self.config.difficulty,
            miner,
            self.clock.now_nanos(),
        );
        block.reward = reward;
        Ok(block)
    }

    /// Append a mined block
    ///
    /// Fails with `ConcurrencyConflict` when the tip moved since the block was
    /// created; its transactions then stay PENDING.
    pub fn append_block(&self, mut block: Block) -> ExchangeResult<Block> {
        let mut chain = lock(&self.chain, "chain:blocks")?;
        let tip = chain.last().ok_or_else(|| ExchangeError::conflict("chain:blocks"))?;
        if block.block_number != tip.block_number + 1 || block.previous_hash != tip.current_hash {
            warn!(block_number = block.block_number, "Chain tip moved while mining");
            return Err(ExchangeError::conflict("chain:tip"));
        }
        verify_block(&block)?;

        let included: HashSet<String> = block.transactions.iter().map(|tx| tx.tx_hash.clone()).collect();
        for tx in &mut block.transactions {
            tx.status = TransactionStatus::Confirmed;
            tx.block_number = Some(block.block_number);
        }
        chain.push(block.clone());

        lock(&self.pool, "chain:pool")?.retain(|tx| !included.contains(&tx.tx_hash));
        drop(chain);

        info!(
            block_number = block.block_number,
            hash = %block.current_hash,
            transactions = block.transactions.len(),
            "Block appended"
        );
        Ok(block)
    }

    /// Mine up to `max_transactions_per_block` pending transactions into the
    /// next block
    pub fn mine_block(&self, miner: Option<&str>) -> ExchangeResult<Block> {
        let batch: Vec<ChainTransaction> = lock(&self.pool, "chain:pool")?
            .iter()
            .take(self.config.max_transactions_per_block)
            .cloned()
            .collect();
        let miner = miner.unwrap_or(&self.config.default_miner);
        let block = self.create_block(batch, Some(miner))?;
        self.append_block(block)
    }

    pub fn validate_chain(&self) -> bool {
        match self.verify_chain() {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "Chain validation failed");
                false
            }
        }
    }

    pub fn verify_chain(&self) -> ExchangeResult<()> {
        let chain = lock(&self.chain, "chain:blocks")?;
        verify_blocks(&chain)
    }

    pub fn latest_block(&self) -> ExchangeResult<Block> {
        lock(&self.chain, "chain:blocks")?
            .last()
            .cloned()
            .ok_or_else(|| ExchangeError::conflict("chain:blocks"))
    }

    pub fn block(&self, block_number: u64) -> ExchangeResult<Option<Block>> {
        let chain = lock(&self.chain, "chain:blocks")?;
        Ok(usize::try_from(block_number).ok().and_then(|i| chain.get(i)).cloned())
    }

    /// Number of blocks, genesis included
    pub fn height(&self) -> ExchangeResult<u64> {
        Ok(lock(&self.chain, "chain:blocks")?.len() as u64)
    }

    pub fn blocks(&self) -> ExchangeResult<Vec<Block>> {
        Ok(lock(&self.chain, "chain:blocks")?.clone())
    }

    pub fn pending_count(&self) -> ExchangeResult<usize> {
        Ok(lock(&self.pool, "chain:pool")?.len())
    }

    /// Look a transaction up in the pool, then in the chain
    pub fn transaction(&self, tx_hash: &str) -> ExchangeResult<Option<ChainTransaction>> {
        let chain = lock(&self.chain, "chain:blocks")?;
        let pool = lock(&self.pool, "chain:pool")?;
        if let Some(tx) = pool.iter().find(|tx| tx.tx_hash == tx_hash) {
            return Ok(Some(tx.clone()));
        }
        Ok(chain
            .iter()
            .rev()
            .flat_map(|block| block.transactions.iter())
            .find(|tx| tx.tx_hash == tx_hash)
            .cloned())
    }
}

fn integrity(block_number: u64, reason: impl Into<String>) -> ExchangeError {
    ExchangeError::ChainIntegrity {
        block_number,
        reason: reason.into(),
    }
}

/// Check a single block's own hashes
pub fn verify_block(block: &Block) -> ExchangeResult<()> {
    let n = block.block_number;
    if let Some(tx) = block.transactions.iter().find(|tx| !tx.verify_hash()) {
        return Err(integrity(n, format!("transaction {} hash mismatch", tx.tx_hash)));
    }
    if block.compute_merkle_root() != block.merkle_root {
        return Err(integrity(n, "merkle root mismatch"));
    }
    if block.compute_hash() != block.current_hash {
        return Err(integrity(n, "header hash mismatch"));
    }
    if !meets_difficulty(&block.current_hash, block.difficulty) {
        return Err(integrity(n, "hash does not meet difficulty"));
    }
    Ok(())
}

/// Walk a chain from genesis checking linkage and every block's hashes
pub fn verify_blocks(blocks: &[Block]) -> ExchangeResult<()> {
    let mut previous: Option<&Block> = None;
    for (index, block) in blocks.iter().enumerate() {
        if block.block_number != index as u64 {
            return Err(integrity(index as u64, "block number out of sequence"));
        }
        let expected_previous = previous.map_or(GENESIS_PREVIOUS_HASH, |p| p.current_hash.as_str());
        if block.previous_hash != expected_previous {
            return Err(integrity(block.block_number, "previous hash mismatch"));
        }
        verify_block(block)?;
        previous = Some(block);
    }
    Ok(())
}
