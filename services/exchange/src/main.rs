use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exchange::{seed_demo_market, Exchange, ExchangeConfig, Scheduler};
use types::clock::SystemClock;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ExchangeConfig::load().context("loading exchange configuration")?;
    let exchange = Arc::new(Exchange::new(config, Arc::new(SystemClock))?);
    let market = seed_demo_market(&exchange)?;
    info!(coins = ?market.coins, "Exchange core running, Ctrl-C to stop");

    let scheduler = Scheduler::new(Arc::clone(&exchange));
    let handles = scheduler.start();

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("Shutdown signal received");
    scheduler.shutdown(handles).await;

    if exchange.validate_chain() {
        info!(height = exchange.chain().height()?, "Audit chain valid at shutdown");
    } else {
        error!("Audit chain failed validation at shutdown");
    }
    Ok(())
}
