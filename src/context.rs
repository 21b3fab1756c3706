//! Explicit application context, constructed once at boot and threaded
//! into every service and job by value (cheaply `Clone`-able `Arc`
//! handles) rather than reached for through ambient singletons.

use crate::api::auth::{InMemoryNonceStore, NonceStore};
use crate::bus::Bus;
use crate::config::AppConfig;
use crate::objectstore::{LocalObjectStore, ObjectStore};
use crate::ratelimit::HostRateLimiter;
use crate::store::Store;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

pub struct SourceRateLimiters {
    pub filings: HostRateLimiter,
    pub market_catalog: HostRateLimiter,
    pub market_ws: HostRateLimiter,
    pub historical_trades: HostRateLimiter,
    pub news: HostRateLimiter,
    pub transcripts: HostRateLimiter,
}

impl SourceRateLimiters {
    fn from_config(config: &AppConfig) -> Self {
        let intervals = &config.rate_limit_intervals_ms;
        Self {
            filings: HostRateLimiter::new(Duration::from_millis(intervals.filings_ms)),
            market_catalog: HostRateLimiter::new(Duration::from_millis(intervals.market_catalog_ms)),
            market_ws: HostRateLimiter::new(Duration::from_millis(intervals.market_ws_ms)),
            historical_trades: HostRateLimiter::new(Duration::from_millis(intervals.historical_trades_ms)),
            news: HostRateLimiter::new(Duration::from_millis(intervals.news_ms)),
            transcripts: HostRateLimiter::new(Duration::from_millis(intervals.transcripts_ms)),
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub store: Arc<Store>,
    pub object_store: Arc<dyn ObjectStore>,
    pub http_client: Client,
    pub bus: Bus,
    pub rate_limiters: Arc<SourceRateLimiters>,
    pub nonce_store: Arc<dyn NonceStore>,
}

impl AppContext {
    pub fn build(config: AppConfig) -> anyhow::Result<Self> {
        let store = Store::new(&config.database_path)?;
        let object_store = LocalObjectStore::new(config.object_store_root.clone());
        let http_client = Client::builder()
            .timeout(config.http_timeout)
            .user_agent("market-intel-backend/0.1")
            .build()?;
        let rate_limiters = SourceRateLimiters::from_config(&config);
        let nonce_store = InMemoryNonceStore::new(config.nonce_ttl);

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
            object_store: Arc::new(object_store),
            http_client,
            bus: Bus::new(),
            rate_limiters: Arc::new(rate_limiters),
            nonce_store: Arc::new(nonce_store),
        })
    }
}
