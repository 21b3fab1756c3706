use crate::api::auth::{validate_wallet, NonceResponse};
use crate::context::AppContext;
use crate::error::DomainError;
use crate::models::CandleInterval;
use crate::store::{EventRepository, MarketRepository};
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct ListMarketsQuery {
    pub active: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListMarketsResponse {
    pub markets: Vec<crate::models::Market>,
    pub total: i64,
}

pub async fn list_markets(
    State(ctx): State<AppContext>,
    Query(query): Query<ListMarketsQuery>,
) -> Result<Json<ListMarketsResponse>, DomainError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let offset = query.offset.unwrap_or(0).max(0);
    let (markets, total) = ctx
        .store
        .list_markets(query.active.unwrap_or(false), limit, offset)?;
    Ok(Json(ListMarketsResponse { markets, total }))
}

pub async fn get_market(
    State(ctx): State<AppContext>,
    Path(market_id): Path<String>,
) -> Result<Json<crate::models::Market>, DomainError> {
    let market = ctx
        .store
        .find_market(&market_id)?
        .ok_or_else(|| DomainError::NotFound(format!("market {market_id}")))?;
    Ok(Json(market))
}

#[derive(Debug, Deserialize)]
pub struct OrderbookQuery {
    pub outcome: String,
}

pub async fn get_orderbook(
    State(ctx): State<AppContext>,
    Path(market_id): Path<String>,
    Query(query): Query<OrderbookQuery>,
) -> Result<Json<crate::models::OrderbookSnapshot>, DomainError> {
    let snapshot = ctx
        .store
        .find_orderbook_snapshot(&market_id, &query.outcome)?
        .ok_or_else(|| DomainError::NotFound(format!("orderbook {market_id}/{}", query.outcome)))?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct CandlesQuery {
    pub outcome: String,
    pub interval: String,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub limit: Option<usize>,
}

pub async fn get_candles(
    State(ctx): State<AppContext>,
    Path(market_id): Path<String>,
    Query(query): Query<CandlesQuery>,
) -> Result<Json<Vec<crate::models::Candle>>, DomainError> {
    let interval = CandleInterval::parse(&query.interval)
        .ok_or_else(|| DomainError::Validation(format!("unknown interval {}", query.interval)))?;

    let aggregator = crate::candles::CandleAggregator::new(ctx);
    let candles = aggregator
        .market_candles(&market_id, &query.outcome, interval, query.from, query.to, query.limit)
        .await?;
    Ok(Json(candles))
}

/// Wallet positions live on-chain; aggregating them is an external
/// collaborator's job (indexer or RPC reader) this crate doesn't own.
/// The handler validates the wallet shape and returns an empty
/// aggregation rather than fabricate position data.
pub async fn get_positions(Path(wallet): Path<String>) -> Result<Json<Value>, DomainError> {
    validate_wallet(&wallet)?;
    Ok(Json(json!({ "wallet": wallet, "positions": [] })))
}

#[derive(Debug, Deserialize)]
pub struct PrepareTradeRequest {
    pub wallet: String,
    pub market_id: String,
    pub outcome: String,
    pub side: String,
    pub size: String,
}

/// Transaction encoding is a pure, stateless collaborator outside this
/// crate. This returns an unsigned-transaction *shape* with a zero
/// calldata payload — real encoding/signing is not implemented here, and
/// no order-matching against the live book happens on this path.
pub async fn prepare_trade(
    Json(request): Json<PrepareTradeRequest>,
) -> Result<Json<Value>, DomainError> {
    validate_wallet(&request.wallet)?;
    if request.size.parse::<f64>().map(|v| v <= 0.0).unwrap_or(true) {
        return Err(DomainError::Validation("size must be a positive decimal".into()));
    }

    Ok(Json(json!({
        "wallet": request.wallet,
        "market_id": request.market_id,
        "outcome": request.outcome,
        "side": request.side,
        "size": request.size,
        "unsigned_tx": { "to": null, "data": "0x", "value": "0x0" },
    })))
}

#[derive(Debug, Deserialize)]
pub struct NonceQuery {
    pub wallet: String,
}

pub async fn get_nonce(
    State(ctx): State<AppContext>,
    Query(query): Query<NonceQuery>,
) -> Result<Json<NonceResponse>, DomainError> {
    validate_wallet(&query.wallet)?;
    Ok(Json(ctx.nonce_store.issue(&query.wallet)))
}

pub async fn health_check() -> &'static str {
    "ok"
}
