//! WebSocket fan-out: clients subscribe to `market:{id}:orderbook` /
//! `market:{id}:price` channels by sending a JSON subscribe message;
//! the handler filters the shared bus by channel name client-side, per
//! the bus's single-broadcast-channel design.

use crate::bus::BusEvent;
use crate::context::AppContext;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(ctx): State<AppContext>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, ctx))
}

async fn handle_socket(mut socket: WebSocket, ctx: AppContext) {
    let mut rx = ctx.bus.subscribe();
    let mut channels: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        if !channels.contains(event.channel()) {
                            continue;
                        }
                        if send_event(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "ws subscriber lagged behind bus, continuing from current state");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(msg) = serde_json::from_str::<ClientMessage>(&text) {
                            match msg {
                                ClientMessage::Subscribe { channel } => { channels.insert(channel); }
                                ClientMessage::Unsubscribe { channel } => { channels.remove(&channel); }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &BusEvent) -> Result<(), axum::Error> {
    let text = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    socket.send(Message::Text(text)).await
}
