//! Stream Service: owns per-(market, outcome) order-book state, seeds it
//! from a REST snapshot, consumes the normalized WebSocket feed, persists
//! deltas, and publishes to the pub/sub bus.

use crate::adapters::market_catalog::{canonicalize_outcome, MarketCatalogAdapter, RawOrderBook};
use crate::adapters::market_ws::{MarketWsAdapter, Side, WsMessage};
use crate::bus::BusEvent;
use crate::context::AppContext;
use crate::error::AdapterError;
use crate::models::{OrderbookEvent, OrderbookSnapshot, PriceLevel, TradeEvent};
use crate::store::{EventRepository, MarketRepository};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

const SNAPSHOT_TTL_SECS: i64 = 3600;

/// Sorted side ladders for one (market, outcome) book. Bids
/// non-increasing, asks non-decreasing, while `is_fresh`.
#[derive(Debug, Clone, Default)]
pub struct OrderbookState {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl OrderbookState {
    fn from_snapshot(snapshot: &OrderbookSnapshot) -> Self {
        Self {
            bids: snapshot.bids.clone(),
            asks: snapshot.asks.clone(),
        }
    }

    fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }

    /// Size "0" removes the level; otherwise inserts/replaces, keeping
    /// bids sorted descending and asks ascending by price.
    fn apply(&mut self, side: Side, price: &str, size: &str) {
        let levels = match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        };
        let price_f: f64 = price.parse().unwrap_or(0.0);
        let is_zero = size.parse::<f64>().map(|s| s == 0.0).unwrap_or(false);

        let pos = levels
            .iter()
            .position(|l| l.price.parse::<f64>().unwrap_or(0.0) == price_f);

        if is_zero {
            if let Some(idx) = pos {
                levels.remove(idx);
            }
            return;
        }

        let level = PriceLevel {
            price: price.to_string(),
            size: size.to_string(),
        };
        match pos {
            Some(idx) => levels[idx] = level,
            None => {
                let insert_at = match side {
                    Side::Bid => levels
                        .iter()
                        .position(|l| l.price.parse::<f64>().unwrap_or(0.0) < price_f)
                        .unwrap_or(levels.len()),
                    Side::Ask => levels
                        .iter()
                        .position(|l| l.price.parse::<f64>().unwrap_or(0.0) > price_f)
                        .unwrap_or(levels.len()),
                };
                levels.insert(insert_at, level);
            }
        }
    }

    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().and_then(|l| l.price.parse().ok())
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().and_then(|l| l.price.parse().ok())
    }

    pub fn mid(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some(b), Some(a)) => Some((b + a) / 2.0),
            _ => None,
        }
    }

    fn to_snapshot(&self, market_id: &str, outcome: &str) -> OrderbookSnapshot {
        OrderbookSnapshot {
            market_id: market_id.to_string(),
            outcome: outcome.to_string(),
            bids: self.bids.clone(),
            asks: self.asks.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(SNAPSHOT_TTL_SECS),
        }
    }
}

type BookKey = (String, String);

pub struct StreamService {
    ctx: AppContext,
    ws: Arc<MarketWsAdapter>,
    states: Arc<Mutex<HashMap<BookKey, OrderbookState>>>,
    in_snapshot_framing: Arc<Mutex<std::collections::HashSet<BookKey>>>,
}

impl StreamService {
    pub fn start(ctx: AppContext) -> Self {
        let (tx, rx) = mpsc::channel::<WsMessage>(1024);
        let ws = Arc::new(MarketWsAdapter::spawn(tx));
        let states = Arc::new(Mutex::new(HashMap::new()));
        let in_snapshot_framing = Arc::new(Mutex::new(std::collections::HashSet::new()));

        let service = Self {
            ctx: ctx.clone(),
            ws: ws.clone(),
            states: states.clone(),
            in_snapshot_framing: in_snapshot_framing.clone(),
        };

        tokio::spawn(consume_loop(ctx, rx, states, in_snapshot_framing));
        service
    }

    /// Seed state from a REST snapshot and subscribe to the live feed for
    /// a newly discovered or newly re-synced market outcome. Called by
    /// the indexer after each sync batch.
    pub async fn ensure_subscribed(
        &self,
        market_id: &str,
        outcome: &str,
        token_id: &str,
    ) -> anyhow::Result<()> {
        let key = (market_id.to_string(), outcome.to_string());
        if self.states.lock().contains_key(&key) {
            self.ws.subscribe(token_id.to_string()).await;
            return Ok(());
        }

        let catalog = MarketCatalogAdapter::new(self.ctx.clone());
        match catalog.fetch_orderbook(token_id).await {
            Ok(raw) => {
                let state = raw_to_state(raw);
                let snapshot = state.to_snapshot(market_id, outcome);
                self.ctx.store.upsert_orderbook_snapshot(&snapshot)?;

                let event = OrderbookEvent {
                    id: Uuid::new_v4().to_string(),
                    market_id: market_id.to_string(),
                    outcome: outcome.to_string(),
                    timestamp: Utc::now(),
                    best_bid: state.best_bid(),
                    best_ask: state.best_ask(),
                    mid: state.mid(),
                };
                self.ctx.store.insert_orderbook_event(&event)?;
                self.publish_orderbook(market_id, outcome, &state);

                self.states.lock().insert(key, state);
                self.ws.subscribe(token_id.to_string()).await;
            }
            Err(AdapterError::NotFound) => {
                warn!(market_id, outcome, "orderbook 404 on seed, skipping subscription");
            }
            Err(e) => {
                warn!(market_id, outcome, error = %e, "failed to seed orderbook snapshot");
            }
        }
        Ok(())
    }

    fn publish_orderbook(&self, market_id: &str, outcome: &str, state: &OrderbookState) {
        self.ctx.bus.publish(BusEvent::OrderbookUpdate {
            channel: BusEvent::orderbook_channel(market_id),
            market_id: market_id.to_string(),
            outcome: outcome.to_string(),
            best_bid: state.best_bid(),
            best_ask: state.best_ask(),
            mid: state.mid(),
        });
    }
}

fn raw_to_state(raw: RawOrderBook) -> OrderbookState {
    let mut bids: Vec<PriceLevel> = raw.bids.into_iter().map(Into::into).collect();
    let mut asks: Vec<PriceLevel> = raw.asks.into_iter().map(Into::into).collect();
    bids.sort_by(|a, b| {
        b.price
            .parse::<f64>()
            .unwrap_or(0.0)
            .total_cmp(&a.price.parse::<f64>().unwrap_or(0.0))
    });
    asks.sort_by(|a, b| {
        a.price
            .parse::<f64>()
            .unwrap_or(0.0)
            .total_cmp(&b.price.parse::<f64>().unwrap_or(0.0))
    });
    OrderbookState { bids, asks }
}

async fn consume_loop(
    ctx: AppContext,
    mut rx: mpsc::Receiver<WsMessage>,
    states: Arc<Mutex<HashMap<BookKey, OrderbookState>>>,
    in_snapshot_framing: Arc<Mutex<std::collections::HashSet<BookKey>>>,
) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = handle_message(&ctx, msg, &states, &in_snapshot_framing) {
            warn!(error = %e, "failed to process market ws message");
        }
    }
    info!("market ws consume loop ended");
}

fn handle_message(
    ctx: &AppContext,
    msg: WsMessage,
    states: &Arc<Mutex<HashMap<BookKey, OrderbookState>>>,
    in_snapshot_framing: &Arc<Mutex<std::collections::HashSet<BookKey>>>,
) -> anyhow::Result<()> {
    match msg {
        WsMessage::OrderbookUpdate {
            market_id,
            outcome,
            side,
            price,
            size,
            snapshot_start,
            snapshot_end,
        } => {
            let outcome = canonicalize_outcome(&outcome);
            let key = (market_id.clone(), outcome.clone());

            if snapshot_start {
                in_snapshot_framing.lock().insert(key.clone());
                states.lock().entry(key.clone()).or_default().reset();
            }

            {
                let mut guard = states.lock();
                let state = guard.entry(key.clone()).or_default();
                state.apply(side, &price, &size);
            }

            if snapshot_end {
                in_snapshot_framing.lock().remove(&key);
            }

            // Deltas applied inside start/end framing only rebuild local
            // state; only the closing event (or a standalone delta
            // outside framing) is persisted and published.
            if in_snapshot_framing.lock().contains(&key) && !snapshot_end {
                return Ok(());
            }

            let state = states.lock().get(&key).cloned().unwrap_or_default();
            let event = OrderbookEvent {
                id: Uuid::new_v4().to_string(),
                market_id: market_id.clone(),
                outcome: outcome.clone(),
                timestamp: Utc::now(),
                best_bid: state.best_bid(),
                best_ask: state.best_ask(),
                mid: state.mid(),
            };
            ctx.store.insert_orderbook_event(&event)?;
            ctx.store
                .upsert_orderbook_snapshot(&state.to_snapshot(&market_id, &outcome))?;

            ctx.bus.publish(BusEvent::OrderbookUpdate {
                channel: BusEvent::orderbook_channel(&market_id),
                market_id: market_id.clone(),
                outcome: outcome.clone(),
                best_bid: state.best_bid(),
                best_ask: state.best_ask(),
                mid: state.mid(),
            });
            if let Some(mid) = state.mid() {
                ctx.bus.publish(BusEvent::PriceUpdate {
                    channel: BusEvent::price_channel(&market_id),
                    market_id,
                    outcome,
                    price: mid,
                });
            }
        }
        WsMessage::Trade {
            market_id,
            outcome,
            price,
            size,
        } => {
            let outcome = canonicalize_outcome(&outcome);
            let price_f: f64 = price.parse().unwrap_or(0.0);
            let size_f: f64 = size.parse().unwrap_or(0.0);
            let ts = Utc::now();
            let event = TradeEvent {
                id: TradeEvent::natural_id(&market_id, &outcome, ts.timestamp_millis(), price_f, size_f),
                market_id: market_id.clone(),
                outcome: outcome.clone(),
                timestamp: ts,
                price: price_f,
                size: size_f,
            };
            ctx.store.insert_trade_event(&event)?;
            ctx.bus.publish(BusEvent::PriceUpdate {
                channel: BusEvent::price_channel(&market_id),
                market_id,
                outcome,
                price: price_f,
            });
        }
        WsMessage::PriceUpdate {
            market_id,
            outcome,
            mid,
            ..
        } => {
            let outcome = canonicalize_outcome(&outcome);
            if let Some(mid) = mid {
                ctx.bus.publish(BusEvent::PriceUpdate {
                    channel: BusEvent::price_channel(&market_id),
                    market_id,
                    outcome,
                    price: mid,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_delta_removes_zero_size_level_and_inserts_new() {
        let mut state = OrderbookState {
            bids: vec![
                PriceLevel { price: "0.49".into(), size: "100".into() },
                PriceLevel { price: "0.48".into(), size: "200".into() },
            ],
            asks: vec![PriceLevel { price: "0.51".into(), size: "150".into() }],
        };
        state.apply(Side::Bid, "0.49", "0");
        state.apply(Side::Bid, "0.495", "50");

        assert_eq!(state.best_bid(), Some(0.495));
        assert_eq!(state.best_ask(), Some(0.51));
        assert_eq!(state.mid(), Some(0.5025));
    }

    #[test]
    fn bids_stay_sorted_descending_after_inserts() {
        let mut state = OrderbookState::default();
        state.apply(Side::Bid, "0.40", "10");
        state.apply(Side::Bid, "0.45", "10");
        state.apply(Side::Bid, "0.42", "10");
        let prices: Vec<f64> = state.bids.iter().map(|l| l.price.parse().unwrap()).collect();
        assert_eq!(prices, vec![0.45, 0.42, 0.40]);
    }
}
