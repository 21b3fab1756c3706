//! In-process pub/sub fan-out of real-time market events to WebSocket
//! subscribers, built on a single `broadcast` channel with a fixed
//! channel-naming scheme (`market:{id}:orderbook`, `market:{id}:price`).
//!
//! A single broadcast channel carries every published event; subscribers
//! filter by channel name client-side. Slow subscribers that fall behind
//! the channel capacity are dropped — `tokio::sync::broadcast` surfaces
//! this as `RecvError::Lagged(n)`, which the WS handler logs and treats
//! as "resubscribe from current state" rather than propagating an error.
//! This is the stated back-pressure policy: prefer freshness over
//! completeness for real-time fan-out.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const BUS_CAPACITY: usize = 4096;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusEvent {
    OrderbookUpdate {
        channel: String,
        market_id: String,
        outcome: String,
        best_bid: Option<f64>,
        best_ask: Option<f64>,
        mid: Option<f64>,
    },
    PriceUpdate {
        channel: String,
        market_id: String,
        outcome: String,
        price: f64,
    },
}

impl BusEvent {
    pub fn orderbook_channel(market_id: &str) -> String {
        format!("market:{market_id}:orderbook")
    }

    pub fn price_channel(market_id: &str) -> String {
        format!("market:{market_id}:price")
    }

    pub fn channel(&self) -> &str {
        match self {
            BusEvent::OrderbookUpdate { channel, .. } => channel,
            BusEvent::PriceUpdate { channel, .. } => channel,
        }
    }
}

#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<BusEvent>,
}

impl Bus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BusEvent> {
        self.tx.subscribe()
    }

    /// Publish regardless of subscriber count; a channel with no
    /// listeners is a normal, silent no-op.
    pub fn publish(&self, event: BusEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = Bus::new();
        let mut rx = bus.subscribe();
        bus.publish(BusEvent::PriceUpdate {
            channel: BusEvent::price_channel("m1"),
            market_id: "m1".into(),
            outcome: "YES".into(),
            price: 0.52,
        });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.channel(), "market:m1:price");
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = Bus::new();
        bus.publish(BusEvent::PriceUpdate {
            channel: BusEvent::price_channel("m2"),
            market_id: "m2".into(),
            outcome: "NO".into(),
            price: 0.31,
        });
    }
}
