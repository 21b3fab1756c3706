//! PENDING -> DOWNLOADING -> DOWNLOADED step: fetch raw bytes, clean
//! text, hash, persist to object storage.

use crate::context::AppContext;
use crate::models::Document;
use crate::objectstore::{object_key, sha256_hex, ObjectStore};
use crate::store::DocumentRepository;
use tracing::warn;

const MIN_TEXT_LEN: usize = 50;

pub async fn download(ctx: &AppContext, mut document: Document) -> anyhow::Result<Document> {
    document.mark_downloading();
    ctx.store.update_document(&document)?;

    match fetch_and_clean(ctx, &document.source_url).await {
        Ok(cleaned) if cleaned.chars().count() >= MIN_TEXT_LEN => {
            let content_hash = sha256_hex(cleaned.as_bytes());
            let key = object_key(&publisher_slug_for(&document), &document.source_id);

            match ctx.object_store.put(&key, cleaned.as_bytes()).await {
                Ok(()) => {
                    document.mark_downloaded(key, content_hash);
                    ctx.store.update_document(&document)?;
                }
                Err(e) => {
                    warn!(document_id = %document.id, error = %e, "object store write failed");
                    document.mark_failed(format!("storage error: {e}"));
                    ctx.store.update_document(&document)?;
                }
            }
        }
        Ok(_) => {
            document.mark_failed("downloaded text shorter than minimum length");
            ctx.store.update_document(&document)?;
        }
        Err(e) => {
            document.mark_failed(e.to_string());
            ctx.store.update_document(&document)?;
        }
    }
    Ok(document)
}

async fn fetch_and_clean(ctx: &AppContext, url: &str) -> anyhow::Result<String> {
    let response = ctx
        .http_client
        .get(url)
        .header("User-Agent", "Mozilla/5.0 (compatible; MarketIntelBot/1.0)")
        .send()
        .await?;

    if response.status().as_u16() >= 400 {
        anyhow::bail!("download failed with status {}", response.status());
    }

    let body = response.text().await?;
    Ok(clean_text(&body))
}

fn publisher_slug_for(document: &Document) -> String {
    document
        .source_url
        .split("//")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or("unknown")
        .replace('.', "-")
}

/// Strip `<script>`/`<style>` blocks, strip remaining tags, decode a
/// fixed set of HTML entities, collapse whitespace.
pub fn clean_text(html: &str) -> String {
    let without_scripts = strip_block(html, "script");
    let without_styles = strip_block(&without_scripts, "style");
    let without_tags = strip_tags(&without_styles);
    let decoded = decode_entities(&without_tags);
    collapse_whitespace(&decoded)
}

fn strip_block(input: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    loop {
        match rest.find(&open) {
            Some(start) => {
                out.push_str(&rest[..start]);
                match rest[start..].find(&close) {
                    Some(end_rel) => {
                        rest = &rest[start + end_rel + close.len()..];
                    }
                    None => return out,
                }
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_and_style_blocks() {
        let html = "<html><head><style>.x{color:red}</style></head><body><script>alert(1)</script><p>Hello  world</p></body></html>";
        let cleaned = clean_text(html);
        assert_eq!(cleaned, "Hello world");
    }

    #[test]
    fn decodes_common_entities() {
        let cleaned = clean_text("<p>Q&amp;A &mdash;unsupported&nbsp;stays</p>");
        assert!(cleaned.contains("Q&A"));
    }
}
