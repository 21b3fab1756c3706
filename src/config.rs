//! Centralized application configuration.
//!
//! Construction is centralized here and performed once at boot, re-casting
//! what would otherwise be scattered `env::var(...).unwrap_or(...)` call
//! sites into one explicit struct that is then threaded through
//! `AppContext`.

use std::env;
use std::time::Duration;

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub object_store_root: String,
    pub cors_origin: String,

    pub news_api_key: String,

    /// Minimum milliseconds between outbound calls, per external host.
    pub rate_limit_intervals_ms: RateLimitIntervals,

    pub http_timeout: Duration,

    pub document_batch_size: usize,
    pub lifecycle_poll_interval: Duration,

    pub market_full_sync_interval: Duration,
    pub market_incremental_sync_interval: Duration,
    pub market_sync_batch_width: usize,
    pub market_sync_batch_delay: Duration,

    pub backfill_page_size: usize,

    pub fact_min_confidence: f64,
    pub fact_min_keyword_density: f64,
    pub signal_evidence_ttl: Duration,

    pub cache_ttl: Duration,
    pub nonce_ttl: Duration,

    pub feature_filings_worker: bool,
    pub feature_news_worker: bool,
    pub feature_signal_computation: bool,
    pub feature_search_indexer: bool,
}

#[derive(Debug, Clone)]
pub struct RateLimitIntervals {
    pub filings_ms: u64,
    pub market_catalog_ms: u64,
    pub market_ws_ms: u64,
    pub historical_trades_ms: u64,
    pub news_ms: u64,
    pub transcripts_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();

        Self {
            host: env_string("HOST", "0.0.0.0"),
            port: env_u64("PORT", 3000) as u16,
            database_path: env_string("DATABASE_URL", "market_intel.db"),
            object_store_root: env_string("OBJECT_STORE_ROOT", "./blobs"),
            cors_origin: env_string("CORS_ORIGIN", "*"),

            news_api_key: env_string("NEWS_API_KEY", ""),

            rate_limit_intervals_ms: RateLimitIntervals {
                filings_ms: env_u64("RATE_LIMIT_FILINGS_MS", 200),
                market_catalog_ms: env_u64("RATE_LIMIT_MARKET_CATALOG_MS", 150),
                market_ws_ms: env_u64("RATE_LIMIT_MARKET_WS_MS", 0),
                historical_trades_ms: env_u64("RATE_LIMIT_HISTORICAL_TRADES_MS", 200),
                news_ms: env_u64("RATE_LIMIT_NEWS_MS", 500),
                transcripts_ms: env_u64("RATE_LIMIT_TRANSCRIPTS_MS", 500),
            },

            http_timeout: Duration::from_secs(env_u64("HTTP_TIMEOUT_SECS", 30)),

            document_batch_size: env_usize("LIFECYCLE_BATCH_SIZE", 25),
            lifecycle_poll_interval: Duration::from_secs(env_u64("LIFECYCLE_POLL_SECS", 15)),

            market_full_sync_interval: Duration::from_secs(env_u64(
                "MARKET_FULL_SYNC_SECS",
                3600,
            )),
            market_incremental_sync_interval: Duration::from_secs(env_u64(
                "MARKET_INCREMENTAL_SYNC_SECS",
                60,
            )),
            market_sync_batch_width: env_usize("MARKET_SYNC_BATCH_WIDTH", 2),
            market_sync_batch_delay: Duration::from_millis(env_u64(
                "MARKET_SYNC_BATCH_DELAY_MS",
                1000,
            )),

            backfill_page_size: env_usize("BACKFILL_PAGE_SIZE", 5000),

            fact_min_confidence: env_f64("FACT_MIN_CONFIDENCE", 0.55),
            fact_min_keyword_density: env_f64("FACT_MIN_KEYWORD_DENSITY", 1.0),
            signal_evidence_ttl: Duration::from_secs(60 * 60 * 24 * 90),

            cache_ttl: Duration::from_secs(env_u64("CACHE_TTL_SECS", 30)),
            nonce_ttl: Duration::from_secs(env_u64("NONCE_TTL_SECS", 300)),

            feature_filings_worker: env_flag("FEATURE_FILINGS_WORKER", true),
            feature_news_worker: env_flag("FEATURE_NEWS_WORKER", true),
            feature_signal_computation: env_flag("FEATURE_SIGNAL_COMPUTATION", true),
            feature_search_indexer: env_flag("FEATURE_SEARCH_INDEXER", false),
        }
    }
}
