//! Shared retry policy for source adapters, generalizing the capped
//! exponential backoff each scraper used to hand-roll per call site.
//!
//! - `429 Too Many Requests` honors `Retry-After` when present, otherwise
//!   backs off exponentially capped at 30s.
//! - `5xx` backs off linearly; these are assumed self-healing upstream
//!   blips rather than a client-side budget problem.
//! - `404` is never retried — it is reported to the caller as
//!   `AdapterError::NotFound` so it can be treated as a domain outcome.
//! - Any other non-2xx status exhausts the retry budget immediately.

use crate::error::AdapterError;
use reqwest::{Response, StatusCode};
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1_000;
const MAX_BACKOFF_MS: u64 = 30_000;

pub async fn execute_with_retry<F, Fut>(label: &str, mut send: F) -> Result<Response, AdapterError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Response, reqwest::Error>>,
{
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    for attempt in 0..MAX_RETRIES {
        let outcome = send().await;
        match outcome {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return Ok(response);
                }
                if status == StatusCode::NOT_FOUND {
                    return Err(AdapterError::NotFound);
                }
                if status == StatusCode::TOO_MANY_REQUESTS {
                    let wait = retry_after(&response).unwrap_or(Duration::from_millis(backoff_ms));
                    warn!(adapter = label, attempt, "rate limited, backing off {:?}", wait);
                    sleep(wait).await;
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                    continue;
                }
                if status.is_server_error() {
                    warn!(adapter = label, attempt, %status, "upstream server error, retrying");
                    sleep(Duration::from_secs(attempt as u64 + 1)).await;
                    continue;
                }
                let body = response.text().await.unwrap_or_default();
                return Err(AdapterError::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            Err(e) => {
                warn!(adapter = label, attempt, error = %e, "request failed");
                if attempt + 1 < MAX_RETRIES {
                    sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                    continue;
                }
                return Err(AdapterError::Request(e));
            }
        }
    }

    Err(AdapterError::RateLimited)
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
