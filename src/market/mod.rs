//! Prediction-market ingestion: catalog sync, the live order-book stream,
//! and one-shot historical backfill. Order-book state (`stream::OrderbookState`)
//! is owned exclusively by the Stream Service; nothing else mutates it.

pub mod backfill;
pub mod indexer;
pub mod stream;

pub use indexer::MarketIndexer;
pub use stream::StreamService;
