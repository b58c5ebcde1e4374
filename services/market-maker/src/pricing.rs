//! Reference price model
//!
//! Two sources of price motion, both expressed as a signed multiplicative
//! step and clamped to the coin's volatility bounds:
//! - **Nudge**: after each trade, pull toward the execution price, weighted
//!   by trade size relative to supply, biased by order-flow imbalance
//! - **Tick**: periodic random walk whose envelope widens with activity
//!
//! A zero signal leaves the price untouched; any non-zero step has magnitude
//! in `[min_volatility, max_volatility]`.

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use types::coin::Coin;
use types::numeric::{Price, Quantity, PRICE_SCALE};

use crate::activity::FlowSnapshot;

/// Resolution of the uniform draw inside the tick envelope
const DRAW_RESOLUTION: u32 = 1_000_000;

/// Pricing model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// RNG seed for the volatility tick
    pub seed: u64,
    /// Trailing order-flow window in seconds
    pub flow_window_secs: u64,
    /// Multiplier on quantity / circulating_supply before capping at 1
    pub impact_scale: Decimal,
    /// Share of max_volatility contributed by a fully one-sided order flow
    pub imbalance_weight: Decimal,
    /// Tick envelope at zero activity, as a fraction of max_volatility
    pub base_envelope: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            flow_window_secs: 300,
            impact_scale: Decimal::from(100),
            imbalance_weight: Decimal::new(5, 1),
            base_envelope: Decimal::new(2, 1),
        }
    }
}

/// Share of supply represented by `quantity`, scaled and capped at 1
pub fn size_weight(coin: &Coin, quantity: Decimal, config: &PricingConfig) -> Decimal {
    let supply = coin.circulating_supply.as_decimal();
    if supply <= Decimal::ZERO || quantity <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (quantity / supply * config.impact_scale).min(Decimal::ONE)
}

/// Signed step after a trade at `execution_price`
pub fn nudge_step(
    coin: &Coin,
    execution_price: Price,
    quantity: Quantity,
    flow: &FlowSnapshot,
    config: &PricingConfig,
) -> Decimal {
    let current = coin.current_price.as_decimal();
    let weight = size_weight(coin, quantity.as_decimal(), config);
    let pull = (execution_price.as_decimal() - current) / current;
    let bias = flow.imbalance() * config.imbalance_weight * coin.max_volatility;

    coin.clamp_step((pull + bias) * weight)
}

/// Upper bound of the tick magnitude for the given activity
pub fn tick_envelope(coin: &Coin, flow: &FlowSnapshot, config: &PricingConfig) -> Decimal {
    let activity = size_weight(coin, flow.volume, config);
    let base = config.base_envelope.max(Decimal::ZERO).min(Decimal::ONE);
    let envelope = coin.max_volatility * (base + (Decimal::ONE - base) * activity);
    envelope.max(coin.min_volatility)
}

/// Random signed step in `[min_volatility, envelope]`
pub fn tick_step<R: Rng>(coin: &Coin, flow: &FlowSnapshot, config: &PricingConfig, rng: &mut R) -> Decimal {
    let envelope = tick_envelope(coin, flow, config);
    let draw = Decimal::from(rng.gen_range(0..=DRAW_RESOLUTION)) / Decimal::from(DRAW_RESOLUTION);
    let magnitude = coin.min_volatility + (envelope - coin.min_volatility) * draw;
    let step = if rng.gen_bool(0.5) { magnitude } else { -magnitude };

    coin.clamp_step(step)
}

/// current × (1 + step), None when the step is zero
pub fn apply_step(current: Price, step: Decimal) -> Option<Price> {
    if step.is_zero() {
        return None;
    }
    let next = (current.as_decimal() * (Decimal::ONE + step)).round_dp(PRICE_SCALE);
    Price::try_new(next)
}
