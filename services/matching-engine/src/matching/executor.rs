//! Trade execution logic
//!
//! Turns a planned fill into a ledger `Settlement` and, once settled, into a
//! sequenced `Trade`. Sequences are only consumed by settled trades, so they
//! are gap-free across the engine.

use std::sync::atomic::{AtomicU64, Ordering};

use ledger::{BuyerLeg, Settlement, SellerLeg};
use types::fee::FeeSchedule;
use types::ids::{CoinId, OrderId, TradeId};
use types::numeric::{Price, Quantity};
use types::order::Side;
use types::trade::Trade;

/// One fill between two counterparties, before settlement
#[derive(Debug, Clone, PartialEq)]
pub struct FillPlan {
    pub coin_id: CoinId,
    pub buyer: BuyerLeg,
    pub seller: SellerLeg,
    pub buy_order_id: Option<OrderId>,
    pub sell_order_id: Option<OrderId>,
    pub taker_side: Side,
    pub price: Price,
    pub quantity: Quantity,
}

/// Match executor for handling trade generation
pub struct MatchExecutor {
    sequence_counter: AtomicU64,
    fees: FeeSchedule,
}

impl MatchExecutor {
    /// Create a new match executor with starting sequence number
    pub fn new(starting_sequence: u64, fees: FeeSchedule) -> Self {
        Self {
            sequence_counter: AtomicU64::new(starting_sequence),
            fees,
        }
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Last sequence number handed out
    pub fn last_sequence(&self) -> u64 {
        self.sequence_counter.load(Ordering::SeqCst).saturating_sub(1)
    }

    /// Get next sequence number (monotonically increasing)
    fn next_sequence(&self) -> u64 {
        self.sequence_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Price the fill: both sides pay the floored fee on notional
    pub fn settlement(&self, plan: &FillPlan) -> Settlement {
        let notional = plan.price.notional(plan.quantity);
        Settlement {
            coin_id: plan.coin_id.clone(),
            price: plan.price,
            quantity: plan.quantity,
            buy_fee: self.fees.calculate_buy_fee(notional),
            sell_fee: self.fees.calculate_sell_fee(notional),
            buyer: plan.buyer,
            seller: plan.seller,
        }
    }

    /// Record a settled fill as a trade
    pub fn execute_trade(&self, plan: &FillPlan, settlement: &Settlement, timestamp: i64) -> Trade {
        Trade {
            trade_id: TradeId::new(),
            sequence: self.next_sequence(),
            coin_id: plan.coin_id.clone(),
            buy_order_id: plan.buy_order_id,
            sell_order_id: plan.sell_order_id,
            buyer: plan.buyer.wallet_id(),
            seller: plan.seller.wallet_id(),
            taker_side: plan.taker_side,
            price: plan.price,
            quantity: plan.quantity,
            buy_fee: settlement.buy_fee,
            sell_fee: settlement.sell_fee,
            executed_at: timestamp,
        }
    }
}

impl Default for MatchExecutor {
    fn default() -> Self {
        Self::new(1, FeeSchedule::default())
    }
}
