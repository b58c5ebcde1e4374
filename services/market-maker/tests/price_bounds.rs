//! Price motion bound tests
//!
//! Whatever the trade size, execution price or order flow, a nudge or tick
//! either leaves the price alone or moves it by a ratio inside the coin's
//! volatility bounds.

use market_maker::activity::FlowSnapshot;
use market_maker::pricing::{nudge_step, tick_step, PricingConfig};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use types::coin::Coin;
use types::ids::CoinId;
use types::numeric::{Price, Quantity};

fn coin(price: u64, supply: u64, min_bp: u32, max_bp: u32) -> Coin {
    Coin::new(CoinId::new("GLD"), "Goldleaf", Price::from_u64(price), Quantity::from_u64(supply), 0)
        .with_volatility(Decimal::new(min_bp as i64, 4), Decimal::new(max_bp as i64, 4))
}

fn within_bounds(coin: &Coin, step: Decimal) -> bool {
    step.is_zero() || (step.abs() >= coin.min_volatility && step.abs() <= coin.max_volatility)
}

proptest! {
    #[test]
    fn prop_nudge_within_bounds(
        reference in 1u64..10_000,
        execution in 1u64..10_000,
        quantity in 1u64..5_000,
        supply in 1u64..100_000,
        buys in 0u64..50,
        sells in 0u64..50,
        min_bp in 1u32..50,
        extra_bp in 0u32..500,
    ) {
        let coin = coin(reference, supply, min_bp, min_bp + extra_bp);
        let flow = FlowSnapshot { buy_orders: buys, sell_orders: sells, volume: Decimal::ZERO };
        let step = nudge_step(&coin, Price::from_u64(execution), Quantity::from_u64(quantity), &flow, &PricingConfig::default());
        prop_assert!(within_bounds(&coin, step), "step {} outside bounds", step);
    }

    #[test]
    fn prop_tick_within_bounds(
        seed in any::<u64>(),
        volume in 0u64..100_000,
        min_bp in 1u32..50,
        extra_bp in 0u32..500,
    ) {
        let coin = coin(100, 10_000, min_bp, min_bp + extra_bp);
        let flow = FlowSnapshot { buy_orders: 0, sell_orders: 0, volume: Decimal::from(volume) };
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for _ in 0..10 {
            let step = tick_step(&coin, &flow, &PricingConfig::default(), &mut rng);
            prop_assert!(!step.is_zero());
            prop_assert!(within_bounds(&coin, step), "step {} outside bounds", step);
        }
    }
}

#[test]
fn test_nudge_direction_follows_execution_price() {
    let coin = coin(100, 1_000, 1, 500);
    let flow = FlowSnapshot::default();
    let config = PricingConfig::default();

    let above = nudge_step(&coin, Price::from_u64(101), Quantity::from_u64(10), &flow, &config);
    let below = nudge_step(&coin, Price::from_u64(99), Quantity::from_u64(10), &flow, &config);
    assert!(above > Decimal::ZERO);
    assert!(below < Decimal::ZERO);
}
