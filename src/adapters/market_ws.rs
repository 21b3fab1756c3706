//! Prediction-market WebSocket feed adapter. Owns the socket and the
//! reconnect loop; normalizes frames into [`WsMessage`] and forwards them
//! on an mpsc channel. Order-book state itself is owned by the Stream
//! Service, not here.

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

const WS_URL: &str = "wss://ws-subscriptions-clob.polymarket.com/ws/market";
const PING_INTERVAL: Duration = Duration::from_secs(5);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub enum WsMessage {
    OrderbookUpdate {
        market_id: String,
        outcome: String,
        side: Side,
        price: String,
        size: String,
        snapshot_start: bool,
        snapshot_end: bool,
    },
    Trade {
        market_id: String,
        outcome: String,
        price: String,
        size: String,
    },
    PriceUpdate {
        market_id: String,
        outcome: String,
        best_bid: Option<f64>,
        best_ask: Option<f64>,
        mid: Option<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Bid,
    Ask,
}

#[derive(Debug, Deserialize)]
struct RawWsFrame {
    event_type: String,
    #[serde(default)]
    market: Option<String>,
    #[serde(default)]
    asset_id: Option<String>,
    #[serde(default)]
    side: Option<String>,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    snapshot: Option<String>,
    #[serde(default)]
    best_bid: Option<String>,
    #[serde(default)]
    best_ask: Option<String>,
}

pub enum WsCommand {
    Subscribe(String),
}

pub struct MarketWsAdapter {
    cmd_tx: mpsc::Sender<WsCommand>,
}

impl MarketWsAdapter {
    pub fn spawn(events_tx: mpsc::Sender<WsMessage>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        tokio::spawn(run(cmd_rx, events_tx));
        Self { cmd_tx }
    }

    pub async fn subscribe(&self, token_id: String) {
        let _ = self.cmd_tx.send(WsCommand::Subscribe(token_id)).await;
    }
}

async fn run(mut cmd_rx: mpsc::Receiver<WsCommand>, events_tx: mpsc::Sender<WsMessage>) {
    let mut subscribed: Vec<String> = Vec::new();
    let mut backoff = INITIAL_BACKOFF;

    loop {
        // Drain any subscribe commands queued while disconnected so the
        // next connect attempt re-subscribes everything tracked so far.
        while let Ok(cmd) = cmd_rx.try_recv() {
            match cmd {
                WsCommand::Subscribe(token_id) => {
                    if !subscribed.contains(&token_id) {
                        subscribed.push(token_id);
                    }
                }
            }
        }

        match connect_and_stream(&subscribed, &mut cmd_rx, &events_tx).await {
            Ok(()) => {
                backoff = INITIAL_BACKOFF;
            }
            Err(e) => {
                warn!("market ws stream ended: {e}, reconnecting in {:?}", backoff);
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
            }
        }
    }
}

async fn connect_and_stream(
    subscribed: &[String],
    cmd_rx: &mut mpsc::Receiver<WsCommand>,
    events_tx: &mpsc::Sender<WsMessage>,
) -> anyhow::Result<()> {
    let (ws_stream, _) = tokio_tungstenite::connect_async(WS_URL).await?;
    let (mut write, mut read) = ws_stream.split();

    if !subscribed.is_empty() {
        let payload = serde_json::json!({ "assets_ids": subscribed, "type": "market" });
        write.send(Message::Text(payload.to_string())).await?;
    }

    info!("market ws connected, {} subscriptions", subscribed.len());

    let mut ping = interval(PING_INTERVAL);
    let mut local_subscribed: Vec<String> = subscribed.to_vec();

    loop {
        tokio::select! {
            _ = ping.tick() => {
                write.send(Message::Text("PING".to_string())).await?;
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(WsCommand::Subscribe(token_id)) => {
                        if !local_subscribed.contains(&token_id) {
                            local_subscribed.push(token_id.clone());
                            let payload = serde_json::json!({ "assets_ids": [token_id], "type": "market" });
                            write.send(Message::Text(payload.to_string())).await?;
                        }
                    }
                    None => return Ok(()),
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_text_message(&text, events_tx).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        anyhow::bail!("socket closed");
                    }
                    Some(Err(e)) => {
                        anyhow::bail!("socket error: {e}");
                    }
                    _ => {}
                }
            }
        }
    }
}

async fn handle_text_message(text: &str, events_tx: &mpsc::Sender<WsMessage>) {
    if text == "PONG" {
        return;
    }
    let frame: RawWsFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            debug!("unparseable ws frame: {e}");
            return;
        }
    };

    let Some(market_id) = frame.market.clone() else {
        return;
    };
    let outcome = frame.asset_id.clone().unwrap_or_default();

    let event = match frame.event_type.as_str() {
        "book" | "price_change" => {
            let Some(side) = frame.side.as_deref() else { return };
            let side = match side {
                "BUY" | "bid" => Side::Bid,
                _ => Side::Ask,
            };
            WsMessage::OrderbookUpdate {
                market_id,
                outcome,
                side,
                price: frame.price.unwrap_or_default(),
                size: frame.size.unwrap_or_default(),
                snapshot_start: frame.snapshot.as_deref() == Some("start"),
                snapshot_end: frame.snapshot.as_deref() == Some("end"),
            }
        }
        "trade" => WsMessage::Trade {
            market_id,
            outcome,
            price: frame.price.unwrap_or_default(),
            size: frame.size.unwrap_or_default(),
        },
        "tick_size_change" | "price_update" => WsMessage::PriceUpdate {
            market_id,
            outcome,
            best_bid: frame.best_bid.and_then(|s| s.parse().ok()),
            best_ask: frame.best_ask.and_then(|s| s.parse().ok()),
            mid: None,
        },
        _ => return,
    };

    let _ = events_tx.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_matches_buy_sell_tokens() {
        assert_eq!(
            match "BUY" {
                "BUY" | "bid" => Side::Bid,
                _ => Side::Ask,
            },
            Side::Bid
        );
    }
}
