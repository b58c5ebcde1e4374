//! Scheduled tasks
//!
//! One tokio task per periodic job, all stopped through a shared
//! `CancellationToken`. Ticks that fall behind are skipped, never bunched.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::Exchange;
use crate::config::ScheduleConfig;

pub struct Scheduler {
    exchange: Arc<Exchange>,
    schedule: ScheduleConfig,
    stop_poll: Duration,
    cancel_token: CancellationToken,
}

impl Scheduler {
    pub fn new(exchange: Arc<Exchange>) -> Self {
        let schedule = exchange.config().schedule.clone();
        let stop_poll = Duration::from_millis(exchange.config().stops.poll_interval_ms.max(1));
        Self {
            exchange,
            schedule,
            stop_poll,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Token that stops every task spawned by `start`
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn start(&self) -> Vec<JoinHandle<()>> {
        info!(
            volatility_tick_secs = self.schedule.volatility_tick_secs,
            liquidity_refresh_secs = self.schedule.liquidity_refresh_secs,
            mining_interval_secs = self.schedule.mining_interval_secs,
            stop_poll_ms = self.stop_poll.as_millis() as u64,
            "Starting scheduled tasks"
        );
        vec![
            self.spawn_volatility_task(),
            self.spawn_liquidity_task(),
            self.spawn_stop_poll_task(),
            self.spawn_mining_task(),
        ]
    }

    /// Cancel every task and wait for them to finish
    pub async fn shutdown(&self, handles: Vec<JoinHandle<()>>) {
        self.cancel_token.cancel();
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "Scheduled task ended abnormally");
            }
        }
        info!("Scheduled tasks stopped");
    }

    fn spawn_volatility_task(&self) -> JoinHandle<()> {
        let exchange = Arc::clone(&self.exchange);
        spawn_periodic(
            "volatility_tick",
            secs(self.schedule.volatility_tick_secs),
            self.cancel_token.clone(),
            move || {
                let moved = exchange.maker().volatility_tick();
                debug!(moved = moved.len(), "Volatility tick");
            },
        )
    }

    fn spawn_liquidity_task(&self) -> JoinHandle<()> {
        let exchange = Arc::clone(&self.exchange);
        spawn_periodic(
            "liquidity_refresh",
            secs(self.schedule.liquidity_refresh_secs),
            self.cancel_token.clone(),
            move || {
                let reports = exchange.maker().refresh_liquidity();
                let drifted = reports.iter().filter(|report| !report.is_consistent()).count();
                if drifted > 0 {
                    warn!(drifted, "Supply drift found during liquidity refresh");
                }
            },
        )
    }

    fn spawn_stop_poll_task(&self) -> JoinHandle<()> {
        let exchange = Arc::clone(&self.exchange);
        spawn_periodic("stop_poll", self.stop_poll, self.cancel_token.clone(), move || {
            let report = exchange.stops().poll_once();
            if !report.triggered.is_empty() || report.reverted > 0 {
                info!(
                    evaluated = report.evaluated,
                    triggered = report.triggered.len(),
                    reverted = report.reverted,
                    "Stop poll"
                );
            }
        })
    }

    /// Mining searches nonces on the blocking pool
    fn spawn_mining_task(&self) -> JoinHandle<()> {
        let exchange = Arc::clone(&self.exchange);
        let cancel_token = self.cancel_token.clone();
        let period = secs(self.schedule.mining_interval_secs);

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let pending = match exchange.chain().pending_count() {
                            Ok(pending) => pending,
                            Err(err) => {
                                warn!(error = %err, "Transaction pool unavailable");
                                continue;
                            }
                        };
                        if pending == 0 {
                            continue;
                        }
                        let miner = Arc::clone(&exchange);
                        match tokio::task::spawn_blocking(move || miner.mine_block(None)).await {
                            Ok(Ok(block)) => debug!(block_number = block.block_number, "Scheduled block mined"),
                            Ok(Err(err)) => warn!(error = %err, "Scheduled mining failed"),
                            Err(err) => error!(error = %err, "Mining task panicked"),
                        }
                    }
                    _ = cancel_token.cancelled() => break,
                }
            }
            debug!(task = "mining", "Task stopped");
        })
    }
}

fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}

/// Run `job` every `period` until cancelled; the first run is one period in
fn spawn_periodic<F>(name: &'static str, period: Duration, cancel_token: CancellationToken, job: F) -> JoinHandle<()>
where
    F: Fn() + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => job(),
                _ = cancel_token.cancelled() => break,
            }
        }
        debug!(task = name, "Task stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExchangeConfig;
    use types::clock::ManualClock;

    fn exchange() -> Arc<Exchange> {
        let mut config = ExchangeConfig::default();
        config.chain.difficulty = 1;
        Arc::new(Exchange::new(config, Arc::new(ManualClock::new(0))).unwrap())
    }

    #[tokio::test]
    async fn test_shutdown_stops_every_task() {
        let scheduler = Scheduler::new(exchange());
        let handles = scheduler.start();
        assert_eq!(handles.len(), 4);

        scheduler.shutdown(handles).await;
        assert!(scheduler.cancel_token().is_cancelled());
    }
}
