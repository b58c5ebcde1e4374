//! Per-coin publish/subscribe transport
//!
//! The core only publishes. Publishing to a coin nobody listens to is not an
//! error; the event is counted and dropped.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::trace;
use types::ids::CoinId;
use uuid::Uuid;

use crate::events::{MarketEvent, MarketEventPayload};

/// Default per-coin channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Sink for market events
pub trait Broadcaster: Send + Sync {
    fn publish(&self, coin_id: &CoinId, payload: MarketEventPayload, timestamp: i64);
}

/// `tokio::sync::broadcast` channel per coin
pub struct ChannelBroadcaster {
    channels: DashMap<CoinId, broadcast::Sender<MarketEvent>>,
    capacity: usize,
    sequence: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl ChannelBroadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
            sequence: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Receive every event published for `coin_id` from now on
    pub fn subscribe(&self, coin_id: &CoinId) -> broadcast::Receiver<MarketEvent> {
        self.channels
            .entry(coin_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn subscriber_count(&self, coin_id: &CoinId) -> usize {
        self.channels
            .get(coin_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Events handed to at least one subscriber
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Events published with nobody listening
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Last sequence handed out (0 before the first publish)
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn publish(&self, coin_id: &CoinId, payload: MarketEventPayload, timestamp: i64) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let label = payload.event_type_label();

        let Some(sender) = self.channels.get(coin_id).map(|entry| entry.value().clone()) else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        };

        let event = MarketEvent {
            event_id: Uuid::now_v7(),
            sequence,
            timestamp,
            coin_id: coin_id.clone(),
            payload,
        };

        match sender.send(event) {
            Ok(receivers) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                trace!(coin = %coin_id, sequence, event = label, receivers, "Event published");
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PriceSource;
    use types::numeric::Price;

    fn price_update(previous: u64, current: u64) -> MarketEventPayload {
        MarketEventPayload::PriceUpdate {
            previous: Price::from_u64(previous),
            current: Price::from_u64(current),
            source: PriceSource::Trade,
        }
    }

    #[test]
    fn test_publish_without_subscribers() {
        let broadcaster = ChannelBroadcaster::default();
        broadcaster.publish(&CoinId::new("GLD"), price_update(10, 11), 0);
        assert_eq!(broadcaster.dropped_count(), 1);
        assert_eq!(broadcaster.delivered_count(), 0);
    }

    #[test]
    fn test_subscriber_receives_in_order() {
        let broadcaster = ChannelBroadcaster::new(16);
        let coin = CoinId::new("GLD");
        let mut rx = broadcaster.subscribe(&coin);

        broadcaster.publish(&coin, price_update(10, 11), 1);
        broadcaster.publish(&coin, price_update(11, 12), 2);

        let first = rx.try_recv().unwrap();
        let second = rx.try_recv().unwrap();
        assert!(first.sequence < second.sequence);
        assert_eq!(second.timestamp, 2);
        assert_eq!(broadcaster.delivered_count(), 2);
    }

    #[test]
    fn test_channels_are_per_coin() {
        let broadcaster = ChannelBroadcaster::new(16);
        let mut gold = broadcaster.subscribe(&CoinId::new("GLD"));
        let _ruby = broadcaster.subscribe(&CoinId::new("RUBY"));

        broadcaster.publish(&CoinId::new("RUBY"), price_update(5, 6), 0);
        assert!(gold.try_recv().is_err());
        assert_eq!(broadcaster.subscriber_count(&CoinId::new("RUBY")), 1);
    }

    #[tokio::test]
    async fn test_async_subscriber() {
        let broadcaster = std::sync::Arc::new(ChannelBroadcaster::new(4));
        let coin = CoinId::new("GLD");
        let mut rx = broadcaster.subscribe(&coin);

        let publisher = std::sync::Arc::clone(&broadcaster);
        let publish_coin = coin.clone();
        tokio::spawn(async move {
            publisher.publish(&publish_coin, price_update(1, 2), 7);
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.coin_id, coin);
        assert_eq!(event.payload.event_type_label(), "PriceUpdate");
    }
}
