//! Regulatory filings adapter: RSS discovery feed plus a historical
//! full-text search endpoint, both normalized to [`DiscoveredDocument`].

use super::retry::execute_with_retry;
use super::{DiscoveredDocument, Page};
use crate::context::AppContext;
use crate::error::AdapterError;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const FILINGS_RSS_BASE: &str = "https://www.sec.gov/cgi-bin/browse-edgar";
const FULL_TEXT_SEARCH_BASE: &str = "https://efts.sec.gov/LATEST/search-index";

#[derive(Debug, Deserialize)]
struct FullTextSearchResponse {
    hits: FullTextSearchHits,
}

#[derive(Debug, Deserialize)]
struct FullTextSearchHits {
    total: FullTextSearchTotal,
    hits: Vec<FullTextSearchHit>,
}

#[derive(Debug, Deserialize)]
struct FullTextSearchTotal {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct FullTextSearchHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: FullTextSearchSource,
}

#[derive(Debug, Deserialize)]
struct FullTextSearchSource {
    #[serde(rename = "file_type")]
    file_type: Option<String>,
    #[serde(rename = "display_names")]
    display_names: Vec<String>,
    #[serde(rename = "file_date")]
    file_date: Option<String>,
    #[serde(rename = "root_forms")]
    root_forms: Vec<String>,
}

pub struct FilingsAdapter {
    ctx: AppContext,
}

impl FilingsAdapter {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// One page of the full-text search index, `from` is the zero-based
    /// result offset (paginated in steps of 100 by the upstream API).
    pub async fn search_full_text(
        &self,
        query: &str,
        from: u64,
    ) -> Result<Page<DiscoveredDocument>, AdapterError> {
        self.ctx.rate_limiters.filings.acquire().await;

        let client = self.ctx.http_client.clone();
        let url = FULL_TEXT_SEARCH_BASE.to_string();
        let query = query.to_string();

        let response = execute_with_retry("filings.full_text_search", || {
            client
                .get(&url)
                .query(&[("q", query.as_str()), ("from", &from.to_string())])
                .send()
        })
        .await?;

        let parsed: FullTextSearchResponse = response
            .json()
            .await
            .map_err(AdapterError::Request)?;

        let items = parsed
            .hits
            .hits
            .into_iter()
            .map(normalize_full_text_hit)
            .collect();

        Ok(Page {
            items,
            total: Some(parsed.hits.total.value),
        })
    }

    /// RSS discovery feed for a given form type, most-recent-first.
    pub async fn discover_recent(&self, form_type: &str) -> Result<Vec<DiscoveredDocument>, AdapterError> {
        self.ctx.rate_limiters.filings.acquire().await;

        let client = self.ctx.http_client.clone();
        let url = FILINGS_RSS_BASE.to_string();
        let form_type = form_type.to_string();

        let response = execute_with_retry("filings.rss_discovery", || {
            client
                .get(&url)
                .query(&[("action", "getcompany"), ("type", form_type.as_str()), ("output", "atom")])
                .send()
        })
        .await?;

        let body = response.text().await.map_err(AdapterError::Request)?;
        Ok(parse_rss_entries(&body))
    }
}

fn normalize_full_text_hit(hit: FullTextSearchHit) -> DiscoveredDocument {
    let published_at = hit
        .source
        .file_date
        .and_then(|d| DateTime::parse_from_rfc3339(&format!("{d}T00:00:00Z")).ok())
        .map(|dt| dt.with_timezone(&Utc));

    DiscoveredDocument {
        source_id: hit.id,
        source_url: String::new(),
        title: hit
            .source
            .root_forms
            .first()
            .cloned()
            .unwrap_or_else(|| "filing".to_string()),
        published_at,
        publisher_slug: "sec-edgar".to_string(),
        related_tickers: hit.source.display_names,
        summary: hit.source.file_type.unwrap_or_default(),
    }
}

/// Minimal hand-rolled atom-entry scan; the feed's structure is stable
/// enough that a dependency-free scan is cheaper than pulling in a full
/// XML parser for six fields.
fn parse_rss_entries(body: &str) -> Vec<DiscoveredDocument> {
    let mut out = Vec::new();
    for entry in body.split("<entry>").skip(1) {
        let Some(entry_body) = entry.split("</entry>").next() else {
            continue;
        };
        let title = extract_tag(entry_body, "title").unwrap_or_default();
        let link = extract_attr(entry_body, "link", "href").unwrap_or_default();
        let updated = extract_tag(entry_body, "updated");
        let published_at = updated
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        if link.is_empty() {
            continue;
        }

        let source_id = link.rsplit('/').next().unwrap_or(&link).to_string();

        out.push(DiscoveredDocument {
            source_id,
            source_url: link,
            title,
            published_at,
            publisher_slug: "sec-edgar".to_string(),
            related_tickers: Vec::new(),
            summary: String::new(),
        });
    }
    out
}

fn extract_tag(haystack: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = haystack.find(&open)? + open.len();
    let end = haystack[start..].find(&close)? + start;
    Some(haystack[start..end].trim().to_string())
}

fn extract_attr(haystack: &str, tag: &str, attr: &str) -> Option<String> {
    let tag_start = haystack.find(&format!("<{tag} "))?;
    let tag_end = haystack[tag_start..].find('>')? + tag_start;
    let tag_text = &haystack[tag_start..tag_end];
    let attr_marker = format!("{attr}=\"");
    let attr_start = tag_text.find(&attr_marker)? + attr_marker.len();
    let attr_end = tag_text[attr_start..].find('"')? + attr_start;
    Some(tag_text[attr_start..attr_end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_atom_entry() {
        let body = r#"<feed><entry><title>10-K</title><link href="https://sec.gov/doc/1" /><updated>2026-01-05T00:00:00Z</updated></entry></feed>"#;
        let docs = parse_rss_entries(body);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source_id, "1");
        assert_eq!(docs[0].title, "10-K");
        assert!(docs[0].published_at.is_some());
    }

    #[test]
    fn skips_entries_missing_link() {
        let body = r#"<feed><entry><title>no link here</title></entry></feed>"#;
        let docs = parse_rss_entries(body);
        assert!(docs.is_empty());
    }
}
