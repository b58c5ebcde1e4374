//! Seeded demo market for the binary

use rust_decimal::Decimal;
use tracing::info;
use types::coin::Coin;
use types::errors::ExchangeResult;
use types::ids::{CoinId, WalletId};
use types::numeric::{Price, Quantity};
use types::order::Side;

use matching_engine::OrderRequest;

use crate::app::Exchange;

/// (symbol, name, price, circulating supply)
const DEMO_COINS: &[(&str, &str, u64, u64)] = &[
    ("OPAL", "Opal", 100, 1_000_000),
    ("RUBY", "Ruby", 250, 400_000),
    ("JADE", "Jade", 40, 2_500_000),
];

const DEMO_WALLETS: usize = 4;
const DEMO_GOLD: u64 = 50_000;
const DEMO_AIRDROP: u64 = 200;

#[derive(Debug, Clone)]
pub struct DemoMarket {
    pub coins: Vec<CoinId>,
    pub wallets: Vec<WalletId>,
}

/// List the demo coins, fund wallets, airdrop holdings and rest a ladder of
/// orders around each reference price
pub fn seed_demo_market(exchange: &Exchange) -> ExchangeResult<DemoMarket> {
    let mut coins = Vec::with_capacity(DEMO_COINS.len());
    for &(symbol, name, price, supply) in DEMO_COINS {
        let coin_id = CoinId::new(symbol);
        exchange.list_coin(Coin::new(
            coin_id.clone(),
            name,
            Price::from_u64(price),
            Quantity::from_u64(supply),
            0,
        ))?;
        coins.push(coin_id);
    }

    let mut wallets = Vec::with_capacity(DEMO_WALLETS);
    for _ in 0..DEMO_WALLETS {
        let wallet = exchange.open_wallet(Decimal::from(DEMO_GOLD))?;
        for coin_id in &coins {
            exchange
                .ledger()
                .allocate_from_supply(&wallet, coin_id, Quantity::from_u64(DEMO_AIRDROP))?;
        }
        wallets.push(wallet);
    }

    for (coin_id, &(_, _, price, _)) in coins.iter().zip(DEMO_COINS) {
        for (i, wallet) in wallets.iter().enumerate() {
            let offset = ((i as u64 + 1) * price / 100).max(1);
            let (side, limit) = if i % 2 == 0 {
                (Side::BUY, price.saturating_sub(offset).max(1))
            } else {
                (Side::SELL, price + offset)
            };
            exchange.place_order(OrderRequest::limit(
                *wallet,
                coin_id.clone(),
                side,
                Price::from_u64(limit),
                Quantity::from_u64(5),
            ))?;
        }
    }

    info!(coins = coins.len(), wallets = wallets.len(), "Demo market seeded");
    Ok(DemoMarket { coins, wallets })
}
