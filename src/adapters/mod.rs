//! One adapter per external source. Each normalizes source-specific JSON
//! into internal record types, owns its own retry/backoff via
//! [`retry::execute_with_retry`], and never writes to the store — callers
//! decide what to persist.

pub mod filings;
pub mod historical_trades;
pub mod market_catalog;
pub mod market_ws;
pub mod news;
pub mod retry;
pub mod transcripts;

use chrono::{DateTime, Utc};

/// A paginated fetcher exposes a lazy forward-only sequence of page
/// batches plus a server-reported total so the caller decides when to
/// stop walking pages.
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: Option<u64>,
}

/// Normalized filing/news/transcript discovery candidate, source-agnostic.
#[derive(Debug, Clone)]
pub struct DiscoveredDocument {
    pub source_id: String,
    pub source_url: String,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub publisher_slug: String,
    pub related_tickers: Vec<String>,
    pub summary: String,
}
