//! Trade audit recorder
//!
//! Writes each settled trade to the pool as a TRADE transaction, seller to
//! buyer. Recording is audit only: a failure is logged and the trade stands.

use std::sync::Arc;

use tracing::warn;
use types::trade::{Trade, TradeListener};

use crate::chain::Blockchain;
use crate::transaction::TransactionType;

pub struct TradeRecorder {
    chain: Arc<Blockchain>,
}

impl TradeRecorder {
    pub fn new(chain: Arc<Blockchain>) -> Self {
        Self { chain }
    }
}

impl TradeListener for TradeRecorder {
    fn on_trade(&self, trade: &Trade) {
        let result = self.chain.submit_transaction(
            trade.seller.to_string(),
            trade.buyer.to_string(),
            trade.notional(),
            trade.total_fees(),
            TransactionType::Trade,
        );
        if let Err(error) = result {
            warn!(trade_id = %trade.trade_id, %error, "Failed to record trade on chain");
        }
    }
}
