//! Market Indexer: full and incremental prediction-market catalog sync.
//! Both flavors process markets in small batches (width configured, 2 by
//! default) with an inter-batch delay, refreshing live-stream
//! subscriptions after every batch so newly discovered markets join the
//! feed without waiting for the next tick.

use super::backfill::BackfillJob;
use super::stream::StreamService;
use crate::adapters::market_catalog::{canonicalize_outcome, MarketCatalogAdapter, RawMarket};
use crate::context::AppContext;
use crate::models::{Market, MarketUpdate};
use crate::store::MarketRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};

pub struct MarketIndexer {
    ctx: AppContext,
    catalog: MarketCatalogAdapter,
    stream: Arc<StreamService>,
}

impl MarketIndexer {
    pub fn new(ctx: AppContext, stream: Arc<StreamService>) -> Self {
        let catalog = MarketCatalogAdapter::new(ctx.clone());
        Self { ctx, catalog, stream }
    }

    /// Pull the full paginated catalog (200/page, closed excluded), upsert
    /// each market, and fire-and-forget historical backfill for markets
    /// newly discovered by this pass.
    pub async fn full_sync(&self) -> anyhow::Result<usize> {
        let mut offset = 0u64;
        let mut total_upserted = 0usize;

        loop {
            let page = self.catalog.fetch_markets_page(offset).await?;
            if page.items.is_empty() {
                break;
            }

            for batch in page.items.chunks(self.ctx.config.market_sync_batch_width) {
                for raw in batch {
                    let is_new = self.ctx.store.find_market(&raw.condition_id)?.is_none();
                    self.upsert_raw_market(raw)?;
                    total_upserted += 1;
                    if is_new {
                        self.spawn_backfill(&raw.condition_id);
                    }
                }
                self.refresh_subscriptions(batch).await;
                sleep(self.ctx.config.market_sync_batch_delay).await;
            }

            let page_len = page.items.len() as u64;
            if page_len < 200 {
                break;
            }
            offset += page_len;
        }

        info!(count = total_upserted, "full market sync complete");
        Ok(total_upserted)
    }

    /// For each locally known market, re-fetch current state and skip the
    /// write if `lastUpdatedBlock` hasn't advanced.
    pub async fn incremental_sync(&self) -> anyhow::Result<usize> {
        let ids = self.ctx.store.list_all_market_ids()?;
        let mut updated = 0usize;

        for batch in ids.chunks(self.ctx.config.market_sync_batch_width) {
            let mut synced_raws = Vec::new();
            for condition_id in batch {
                match self.catalog.fetch_market_state(condition_id).await {
                    Ok(raw) => {
                        let Some(existing) = self.ctx.store.find_market(condition_id)? else {
                            continue;
                        };
                        let incoming_block = None; // catalog response carries no block marker field observed in samples
                        if !existing.should_apply_incremental(incoming_block) {
                            continue;
                        }
                        self.upsert_raw_market(&raw)?;
                        updated += 1;
                        synced_raws.push(raw);
                    }
                    Err(e) => {
                        warn!(condition_id, error = %e, "incremental market refresh failed");
                    }
                }
            }
            self.refresh_subscriptions(&synced_raws).await;
            sleep(self.ctx.config.market_sync_batch_delay).await;
        }

        Ok(updated)
    }

    fn upsert_raw_market(&self, raw: &RawMarket) -> anyhow::Result<()> {
        let existing = self.ctx.store.find_market(&raw.condition_id)?;
        let mut market = existing.unwrap_or_else(|| {
            Market::new(raw.condition_id.clone(), raw.question.clone(), outcome_labels(raw))
        });

        let outcome_tokens = raw
            .tokens
            .iter()
            .map(|t| (canonicalize_outcome(&t.outcome), t.token_id.clone()))
            .collect();
        let last_prices = std::collections::HashMap::new();

        market.merge_upsert(MarketUpdate {
            question: raw.question.clone(),
            outcome_tokens,
            expiry: parse_expiry(raw.end_date_iso.as_deref()),
            last_prices,
            liquidity: raw.liquidity.clone(),
            volume: raw.volume.clone(),
            active: !raw.closed,
            last_updated_block: None,
        });

        self.ctx.store.upsert_market(&market)?;
        Ok(())
    }

    fn spawn_backfill(&self, market_id: &str) {
        let ctx = self.ctx.clone();
        let market_id = market_id.to_string();
        tokio::spawn(async move {
            let job = BackfillJob::new(ctx);
            if let Err(e) = job.run(&market_id).await {
                error!(market_id, error = %e, "historical backfill failed");
            }
        });
    }

    async fn refresh_subscriptions(&self, raws: &[RawMarket]) {
        for raw in raws {
            for token in &raw.tokens {
                let outcome = canonicalize_outcome(&token.outcome);
                if let Err(e) = self
                    .stream
                    .ensure_subscribed(&raw.condition_id, &outcome, &token.token_id)
                    .await
                {
                    warn!(market_id = %raw.condition_id, error = %e, "subscription refresh failed");
                }
            }
        }
    }
}

fn outcome_labels(raw: &RawMarket) -> Vec<String> {
    raw.tokens.iter().map(|t| canonicalize_outcome(&t.outcome)).collect()
}

fn parse_expiry(s: Option<&str>) -> Option<DateTime<Utc>> {
    s.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_expiry_handles_missing_and_present() {
        assert!(parse_expiry(None).is_none());
        assert!(parse_expiry(Some("2026-01-01T00:00:00Z")).is_some());
        assert!(parse_expiry(Some("not-a-date")).is_none());
    }
}
