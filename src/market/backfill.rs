//! Historical Backfill: one-shot bulk paginated trade ingest per market,
//! fire-and-forget from the indexer. Its failure never blocks catalog
//! sync — callers spawn it and only log the outcome.

use crate::adapters::historical_trades::HistoricalTradesAdapter;
use crate::adapters::market_catalog::canonicalize_outcome;
use crate::context::AppContext;
use crate::models::TradeEvent;
use crate::store::{BackfillRecord, BackfillRepository, BackfillStatus, EventRepository};
use chrono::{DateTime, TimeZone, Utc};
use tracing::info;

pub struct BackfillJob {
    ctx: AppContext,
}

impl BackfillJob {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, market_id: &str) -> anyhow::Result<()> {
        if let Some(existing) = self.ctx.store.find_backfill(market_id)? {
            if existing.status == BackfillStatus::Completed {
                return Ok(());
            }
        }

        self.ctx.store.upsert_backfill(&BackfillRecord {
            market_id: market_id.to_string(),
            status: BackfillStatus::InProgress,
            trade_events_count: 0,
            earliest_ts: None,
            latest_ts: None,
            error_message: None,
        })?;

        let adapter = HistoricalTradesAdapter::new(self.ctx.clone());
        let page_size = self.ctx.config.backfill_page_size as u64;
        let mut offset = 0u64;
        let mut count = 0i64;
        let mut earliest: Option<DateTime<Utc>> = None;
        let mut latest: Option<DateTime<Utc>> = None;

        loop {
            let page = match adapter.fetch_trades(market_id, offset, page_size).await {
                Ok(page) => page,
                Err(e) => {
                    self.ctx.store.upsert_backfill(&BackfillRecord {
                        market_id: market_id.to_string(),
                        status: BackfillStatus::Failed,
                        trade_events_count: count,
                        earliest_ts: earliest,
                        latest_ts: latest,
                        error_message: Some(e.to_string()),
                    })?;
                    return Err(e.into());
                }
            };

            let page_len = page.items.len();
            for raw in &page.items {
                let outcome = canonicalize_outcome(&raw.outcome);
                let price: f64 = raw.price.parse().unwrap_or(0.0);
                let size: f64 = raw.size.parse().unwrap_or(0.0);
                let timestamp = Utc
                    .timestamp_millis_opt(raw.timestamp)
                    .single()
                    .unwrap_or_else(Utc::now);

                let event = TradeEvent {
                    id: TradeEvent::natural_id(&raw.condition_id, &outcome, raw.timestamp, price, size),
                    market_id: raw.condition_id.clone(),
                    outcome,
                    timestamp,
                    price,
                    size,
                };
                if self.ctx.store.insert_trade_event(&event)? {
                    count += 1;
                    earliest = Some(earliest.map_or(timestamp, |e| e.min(timestamp)));
                    latest = Some(latest.map_or(timestamp, |l| l.max(timestamp)));
                }
            }

            if (page_len as u64) < page_size {
                break;
            }
            offset += page_len as u64;
        }

        self.ctx.store.upsert_backfill(&BackfillRecord {
            market_id: market_id.to_string(),
            status: BackfillStatus::Completed,
            trade_events_count: count,
            earliest_ts: earliest,
            latest_ts: latest,
            error_message: None,
        })?;

        info!(market_id, trade_events_count = count, "historical backfill complete");
        Ok(())
    }
}
