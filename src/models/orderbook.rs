use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One price level (decimal strings, parsed only at comparison sites).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: String,
    pub size: String,
}

/// Per (market, outcome) order-book snapshot. Bids are non-increasing in
/// price, asks non-decreasing, while unexpired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderbookSnapshot {
    pub market_id: String,
    pub outcome: String,
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
    pub expires_at: DateTime<Utc>,
}

impl OrderbookSnapshot {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
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
}

/// Append-only order-book delta event, deduped by a natural id derived
/// from (market, outcome, timestamp).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderbookEvent {
    pub id: String,
    pub market_id: String,
    pub outcome: String,
    pub timestamp: DateTime<Utc>,
    pub best_bid: Option<f64>,
    pub best_ask: Option<f64>,
    pub mid: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeEvent {
    pub id: String,
    pub market_id: String,
    pub outcome: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub size: f64,
}

impl TradeEvent {
    /// Natural dedup id: `(conditionId:outcome:timestampMs:price:size)`.
    pub fn natural_id(market_id: &str, outcome: &str, ts_ms: i64, price: f64, size: f64) -> String {
        format!("{market_id}:{outcome}:{ts_ms}:{price}:{size}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookSide {
    Bid,
    Ask,
}
