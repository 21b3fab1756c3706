use super::handlers;
use super::ws::ws_handler;
use crate::context::AppContext;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn build_router(ctx: AppContext) -> Router {
    let cors = if ctx.config.cors_origin == "*" {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(ctx.config.cors_origin.parse::<axum::http::HeaderValue>().unwrap())
    };

    let api_v1 = Router::new()
        .route("/markets", get(handlers::list_markets))
        .route("/markets/:id", get(handlers::get_market))
        .route("/markets/:id/orderbook", get(handlers::get_orderbook))
        .route("/markets/:id/candles", get(handlers::get_candles))
        .route("/positions/:wallet", get(handlers::get_positions))
        .route("/trades/prepare", post(handlers::prepare_trade))
        .route("/auth/nonce", get(handlers::get_nonce));

    Router::new()
        .nest("/api/v1", api_v1)
        .route("/health", get(handlers::health_check))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(ctx)
}
