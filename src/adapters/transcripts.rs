//! Earnings transcript API adapter.

use super::retry::execute_with_retry;
use super::DiscoveredDocument;
use crate::context::AppContext;
use crate::error::AdapterError;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const TRANSCRIPTS_API_BASE: &str = "https://api.transcripts.example.com/v1";

#[derive(Debug, Deserialize)]
struct RawTranscript {
    id: String,
    symbol: String,
    quarter: String,
    year: i32,
    #[serde(default)]
    date: Option<String>,
    url: String,
}

pub struct TranscriptsAdapter {
    ctx: AppContext,
}

impl TranscriptsAdapter {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    pub async fn fetch_latest(&self, symbol: &str) -> Result<Option<DiscoveredDocument>, AdapterError> {
        self.ctx.rate_limiters.transcripts.acquire().await;

        let client = self.ctx.http_client.clone();
        let url = format!("{TRANSCRIPTS_API_BASE}/transcripts/{symbol}/latest");

        let response = execute_with_retry("transcripts.fetch_latest", || client.get(&url).send()).await;

        match response {
            Ok(response) => {
                let transcript: RawTranscript = response.json().await.map_err(AdapterError::Request)?;
                Ok(Some(normalize(transcript)))
            }
            Err(AdapterError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn normalize(t: RawTranscript) -> DiscoveredDocument {
    let published_at = t
        .date
        .and_then(|s| DateTime::parse_from_rfc3339(&format!("{s}T00:00:00Z")).ok())
        .map(|dt| dt.with_timezone(&Utc));

    DiscoveredDocument {
        source_id: t.id,
        source_url: t.url,
        title: format!("{} {} {} Earnings Call Transcript", t.symbol, t.quarter, t.year),
        published_at,
        publisher_slug: "earnings-transcripts".to_string(),
        related_tickers: vec![t.symbol],
        summary: String::new(),
    }
}
