//! Error taxonomy for the HTTP/WS boundary.
//!
//! Per-item and per-job failures (adapter retries, lifecycle transitions)
//! are handled locally with `anyhow::Result` and never reach this type;
//! `DomainError` exists only for request-scoped outcomes that must be
//! surfaced to a caller as a specific status.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("insufficient liquidity for requested size")]
    InsufficientLiquidity,

    #[error("upstream unavailable: {0}")]
    Upstream(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for DomainError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::InsufficientLiquidity => {
                (StatusCode::BAD_REQUEST, "insufficient_liquidity")
            }
            DomainError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            DomainError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({
            "error": code,
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

/// Outcome of a source adapter call, distinguishing transient failure
/// (already exhausted its retry budget) from an expected negative
/// response the caller may treat as a domain outcome rather than a
/// failure.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("resource not found upstream")]
    NotFound,

    #[error("rate limited past retry budget")]
    RateLimited,

    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned error status {status}: {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
