//! Audit blockchain for settled trades
//!
//! Trades are submitted as pending transactions, batched into blocks under a
//! Merkle root and sealed with a proof-of-work header hash. The chain is a
//! tamper-evident record only; balances live in the ledger.

pub mod block;
pub mod chain;
pub mod merkle;
pub mod recorder;
pub mod transaction;

pub use block::{Block, GENESIS_PREVIOUS_HASH, MAX_DIFFICULTY};
pub use chain::{Blockchain, ChainConfig};
pub use merkle::merkle_root;
pub use recorder::TradeRecorder;
pub use transaction::{ChainTransaction, TransactionStatus, TransactionType};
