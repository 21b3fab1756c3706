//! Orchestrates the document lifecycle: discovery/dedup, then driving
//! batches of documents through download, parse, and enrich. Per-item
//! failures are caught and marked `FAILED` on that row alone so one bad
//! document never poisons a batch or halts the periodic job that calls it.

use super::{downloader, extractor_runner, parser};
use crate::adapters::DiscoveredDocument;
use crate::context::AppContext;
use crate::models::{
    Document, DocumentInstrumentLink, DocumentStatus, DocumentType, Instrument, InstrumentStatus,
    InstrumentType, MatchMethod, TICKER_STOP_LIST,
};
use crate::store::{DocumentRepository, InstrumentRepository};
use tracing::{error, info, warn};
use uuid::Uuid;

pub struct LifecycleEngine {
    ctx: AppContext,
}

impl LifecycleEngine {
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Insert newly discovered candidates (skip-duplicate by `source_id`),
    /// then link every row that made it into the store — freshly inserted
    /// or already present — to the instruments it names.
    pub fn ingest_discovered(
        &self,
        document_type: DocumentType,
        candidates: Vec<DiscoveredDocument>,
    ) -> anyhow::Result<usize> {
        if candidates.is_empty() {
            return Ok(0);
        }

        let documents: Vec<Document> = candidates
            .iter()
            .map(|c| {
                Document::new_pending(
                    Uuid::new_v4().to_string(),
                    document_type,
                    c.source_id.clone(),
                    c.source_url.clone(),
                    c.title.clone(),
                    c.published_at,
                )
            })
            .collect();

        let inserted = self.ctx.store.insert_documents_skip_duplicates(&documents)?;

        let known_symbols = self.ctx.store.list_active_instruments()?;
        for candidate in &candidates {
            let Some(stored) = self.ctx.store.find_document_by_source_id(&candidate.source_id)? else {
                // Lost to a concurrent writer between insert and lookup; next
                // discovery pass will pick it up again via the same source_id.
                continue;
            };
            if let Err(e) = self.link_instruments(&stored, candidate, &known_symbols) {
                warn!(document_id = %stored.id, error = %e, "instrument linking failed");
            }
        }

        Ok(inserted)
    }

    fn link_instruments(
        &self,
        document: &Document,
        candidate: &DiscoveredDocument,
        known: &[Instrument],
    ) -> anyhow::Result<()> {
        for ticker in &candidate.related_tickers {
            let symbol = ticker.to_uppercase();
            if TICKER_STOP_LIST.contains(&symbol.as_str()) {
                continue;
            }
            let instrument = self.find_or_create_instrument(&symbol, known)?;
            self.ctx.store.link_document_instrument(&DocumentInstrumentLink {
                document_id: document.id.clone(),
                instrument_id: instrument.id,
                relevance_score: 1.0,
                match_method: MatchMethod::ExactSymbol,
            })?;
        }

        // Keyword scan: only run when the source gave us no explicit
        // ticker list (news/transcripts often omit it), against the full
        // title + summary text.
        if candidate.related_tickers.is_empty() {
            let haystack = format!("{} {}", candidate.title, candidate.summary);
            for instrument in known {
                if TICKER_STOP_LIST.contains(&instrument.symbol.as_str()) {
                    continue;
                }
                if contains_word(&haystack, &instrument.symbol) {
                    self.ctx.store.link_document_instrument(&DocumentInstrumentLink {
                        document_id: document.id.clone(),
                        instrument_id: instrument.id.clone(),
                        relevance_score: 0.5,
                        match_method: MatchMethod::KeywordScan,
                    })?;
                }
            }
        }
        Ok(())
    }

    fn find_or_create_instrument(
        &self,
        symbol: &str,
        known: &[Instrument],
    ) -> anyhow::Result<Instrument> {
        if let Some(existing) = known.iter().find(|i| i.symbol == symbol) {
            return Ok(existing.clone());
        }
        if let Some(existing) = self.ctx.store.find_instrument_by_symbol(symbol)? {
            return Ok(existing);
        }
        let placeholder =
            Instrument::new_placeholder(Uuid::new_v4().to_string(), symbol.to_string(), InstrumentType::Equity);
        self.ctx.store.upsert_instrument(&placeholder)?;
        Ok(placeholder)
    }

    pub async fn run_download_batch(&self) -> anyhow::Result<usize> {
        let batch = self.ctx.store.find_documents_by_status(
            DocumentStatus::Pending,
            None,
            self.ctx.config.document_batch_size as i64,
        )?;
        let mut processed = 0;
        for document in batch {
            let id = document.id.clone();
            match downloader::download(&self.ctx, document).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    error!(document_id = %id, error = %e, "download step failed");
                    self.mark_failed_best_effort(&id, &e.to_string());
                }
            }
        }
        Ok(processed)
    }

    pub async fn run_parse_batch(&self) -> anyhow::Result<usize> {
        let batch = self.ctx.store.find_documents_by_status(
            DocumentStatus::Downloaded,
            None,
            self.ctx.config.document_batch_size as i64,
        )?;
        let mut processed = 0;
        for document in batch {
            let id = document.id.clone();
            match parser::parse(&self.ctx, document).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    error!(document_id = %id, error = %e, "parse step failed");
                    self.mark_failed_best_effort(&id, &e.to_string());
                }
            }
        }
        Ok(processed)
    }

    pub async fn run_enrich_batch(&self) -> anyhow::Result<usize> {
        let batch = self.ctx.store.find_documents_by_status(
            DocumentStatus::Parsed,
            None,
            self.ctx.config.document_batch_size as i64,
        )?;
        let mut processed = 0;
        for document in batch {
            let id = document.id.clone();
            match extractor_runner::enrich(&self.ctx, document).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    error!(document_id = %id, error = %e, "enrich step failed");
                    self.mark_failed_best_effort(&id, &e.to_string());
                }
            }
        }
        if processed > 0 {
            info!(count = processed, "enriched documents");
        }
        Ok(processed)
    }

    fn mark_failed_best_effort(&self, document_id: &str, reason: &str) {
        if let Ok(Some(mut document)) = self.ctx.store.find_document(document_id) {
            document.mark_failed(reason);
            let _ = self.ctx.store.update_document(&document);
        }
    }
}

/// Whole-word, case-insensitive containment so "AI" doesn't match inside
/// "said" or "rain".
fn contains_word(haystack: &str, word: &str) -> bool {
    let haystack_upper = haystack.to_uppercase();
    let word_upper = word.to_uppercase();
    haystack_upper
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| token == word_upper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_word_requires_exact_token() {
        assert!(contains_word("Shares of ACME rallied today", "ACME"));
        assert!(!contains_word("Pacemaker devices are in high demand", "ACME"));
    }

    #[test]
    fn instrument_status_new_placeholder_is_active() {
        let instrument =
            Instrument::new_placeholder("id".to_string(), "ACME".to_string(), InstrumentType::Equity);
        assert_eq!(instrument.status, InstrumentStatus::Active);
    }
}
