//! News API adapter, discovering news-article documents.

use super::retry::execute_with_retry;
use super::DiscoveredDocument;
use crate::context::AppContext;
use crate::error::AdapterError;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const NEWS_API_BASE: &str = "https://newsapi.org/v2";

#[derive(Debug, Deserialize)]
struct NewsResponse {
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    url: String,
    title: String,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    description: Option<String>,
    source: RawArticleSource,
}

#[derive(Debug, Deserialize)]
struct RawArticleSource {
    name: String,
}

pub struct NewsAdapter {
    ctx: AppContext,
    api_key: String,
}

impl NewsAdapter {
    pub fn new(ctx: AppContext, api_key: String) -> Self {
        Self { ctx, api_key }
    }

    pub async fn search(&self, query: &str) -> Result<Vec<DiscoveredDocument>, AdapterError> {
        self.ctx.rate_limiters.news.acquire().await;

        let client = self.ctx.http_client.clone();
        let url = format!("{NEWS_API_BASE}/everything");
        let query = query.to_string();
        let api_key = self.api_key.clone();

        let response = execute_with_retry("news.search", || {
            client
                .get(&url)
                .query(&[("q", query.as_str()), ("apiKey", api_key.as_str())])
                .send()
        })
        .await?;

        let parsed: NewsResponse = response.json().await.map_err(AdapterError::Request)?;
        Ok(parsed.articles.into_iter().map(normalize).collect())
    }
}

fn normalize(article: RawArticle) -> DiscoveredDocument {
    let published_at = article
        .published_at
        .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    DiscoveredDocument {
        source_id: article.url.clone(),
        source_url: article.url,
        title: article.title,
        published_at,
        publisher_slug: slugify(&article.source.name),
        related_tickers: Vec::new(),
        summary: article.description.unwrap_or_default(),
    }
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("The Wall Street Journal"), "the-wall-street-journal");
    }
}
