//! Prediction-market catalog & order-book REST adapter.

use super::retry::execute_with_retry;
use super::Page;
use crate::context::AppContext;
use crate::error::AdapterError;
use crate::models::PriceLevel;
use serde::Deserialize;

const CLOB_API_BASE: &str = "https://clob.polymarket.com";
const GAMMA_API_BASE: &str = "https://gamma-api.polymarket.com";

#[derive(Debug, Clone, Deserialize)]
pub struct RawToken {
    pub token_id: String,
    pub outcome: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMarket {
    pub condition_id: String,
    pub question: String,
    pub tokens: Vec<RawToken>,
    #[serde(default)]
    pub end_date_iso: Option<String>,
    #[serde(default)]
    pub liquidity: Option<String>,
    #[serde(default)]
    pub volume: Option<String>,
    #[serde(default)]
    pub closed: bool,
}

#[derive(Debug, Deserialize)]
struct GammaMarketsResponse {
    data: Vec<RawMarket>,
}

#[derive(Debug, Deserialize)]
pub struct RawOrderBook {
    pub bids: Vec<RawOrderLevel>,
    pub asks: Vec<RawOrderLevel>,
}

#[derive(Debug, Deserialize)]
pub struct RawOrderLevel {
    pub price: String,
    pub size: String,
}

impl From<RawOrderLevel> for PriceLevel {
    fn from(level: RawOrderLevel) -> Self {
        PriceLevel {
            price: level.price,
            size: level.size,
        }
    }
}

pub struct MarketCatalogAdapter {
    ctx: AppContext,
}

impl MarketCatalogAdapter {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Full paginated catalog, 200 per page, closed markets excluded.
    pub async fn fetch_markets_page(&self, offset: u64) -> Result<Page<RawMarket>, AdapterError> {
        self.ctx.rate_limiters.market_catalog.acquire().await;

        let client = self.ctx.http_client.clone();
        let url = format!("{GAMMA_API_BASE}/markets");

        let response = execute_with_retry("market_catalog.fetch_markets_page", || {
            client
                .get(&url)
                .query(&[
                    ("limit", "200"),
                    ("offset", &offset.to_string()),
                    ("closed", "false"),
                ])
                .send()
        })
        .await?;

        let parsed: GammaMarketsResponse = response.json().await.map_err(AdapterError::Request)?;
        let total = parsed.data.len() as u64;

        Ok(Page {
            items: parsed.data,
            total: Some(total),
        })
    }

    pub async fn fetch_orderbook(&self, token_id: &str) -> Result<RawOrderBook, AdapterError> {
        self.ctx.rate_limiters.market_catalog.acquire().await;

        let client = self.ctx.http_client.clone();
        let url = format!("{CLOB_API_BASE}/book");
        let token_id = token_id.to_string();

        let response = execute_with_retry("market_catalog.fetch_orderbook", || {
            client.get(&url).query(&[("token_id", token_id.as_str())]).send()
        })
        .await?;

        response.json().await.map_err(AdapterError::Request)
    }

    /// Re-fetch a single market's current state for incremental sync.
    pub async fn fetch_market_state(&self, condition_id: &str) -> Result<RawMarket, AdapterError> {
        self.ctx.rate_limiters.market_catalog.acquire().await;

        let client = self.ctx.http_client.clone();
        let url = format!("{CLOB_API_BASE}/markets/{condition_id}");

        let response = execute_with_retry("market_catalog.fetch_market_state", || client.get(&url).send()).await?;

        response.json().await.map_err(AdapterError::Request)
    }
}

/// Canonicalize an outcome label to the stored uppercase form (`YES`/`NO`).
pub fn canonicalize_outcome(label: &str) -> String {
    label.trim().to_uppercase()
}
