//! Historical trades data API adapter, used by the backfill job.

use super::retry::execute_with_retry;
use super::Page;
use crate::context::AppContext;
use crate::error::AdapterError;
use serde::Deserialize;

const TRADES_API_BASE: &str = "https://data-api.polymarket.com";

#[derive(Debug, Clone, Deserialize)]
pub struct RawTrade {
    pub condition_id: String,
    pub outcome: String,
    pub price: String,
    pub size: String,
    pub timestamp: i64,
}

pub struct HistoricalTradesAdapter {
    ctx: AppContext,
}

impl HistoricalTradesAdapter {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// One page of trades for `market_id`, ordered oldest-first.
    pub async fn fetch_trades(
        &self,
        market_id: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Page<RawTrade>, AdapterError> {
        self.ctx.rate_limiters.historical_trades.acquire().await;

        let client = self.ctx.http_client.clone();
        let url = format!("{TRADES_API_BASE}/trades");
        let market_id = market_id.to_string();

        let response = execute_with_retry("historical_trades.fetch_trades", || {
            client
                .get(&url)
                .query(&[
                    ("market", market_id.as_str()),
                    ("offset", &offset.to_string()),
                    ("limit", &limit.to_string()),
                ])
                .send()
        })
        .await?;

        let trades: Vec<RawTrade> = response.json().await.map_err(AdapterError::Request)?;
        let count = trades.len() as u64;

        Ok(Page {
            items: trades,
            total: Some(count),
        })
    }
}
