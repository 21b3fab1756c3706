use super::Store;
use crate::models::{
    Document, DocumentContent, DocumentInstrumentLink, DocumentStatus, DocumentType, MatchMethod,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;

pub trait DocumentRepository {
    /// Insert candidates, skipping rows whose `source_id` already exists.
    /// Returns the number actually inserted.
    fn insert_documents_skip_duplicates(&self, documents: &[Document]) -> anyhow::Result<usize>;
    fn find_document(&self, id: &str) -> anyhow::Result<Option<Document>>;
    fn find_document_by_source_id(&self, source_id: &str) -> anyhow::Result<Option<Document>>;
    fn find_documents_by_status(
        &self,
        status: DocumentStatus,
        document_type: Option<DocumentType>,
        limit: i64,
    ) -> anyhow::Result<Vec<Document>>;
    fn update_document(&self, document: &Document) -> anyhow::Result<()>;
    fn link_document_instrument(&self, link: &DocumentInstrumentLink) -> anyhow::Result<()>;
    fn instruments_for_document(&self, document_id: &str) -> anyhow::Result<Vec<String>>;
    fn upsert_document_content(&self, content: &DocumentContent) -> anyhow::Result<()>;
    fn find_document_content(&self, document_id: &str) -> anyhow::Result<Option<DocumentContent>>;
}

impl DocumentRepository for Store {
    fn insert_documents_skip_duplicates(&self, documents: &[Document]) -> anyhow::Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut inserted = 0usize;
        for doc in documents {
            let changed = tx.execute(
                "INSERT OR IGNORE INTO documents (
                    id, document_type, source_id, source_url, title, published_at, status,
                    storage_path, content_hash, error_message, downloaded_at, parsed_at, created_at
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
                params![
                    doc.id,
                    document_type_str(doc.document_type),
                    doc.source_id,
                    doc.source_url,
                    doc.title,
                    doc.published_at.map(|d| d.to_rfc3339()),
                    document_status_str(doc.status),
                    doc.storage_path,
                    doc.content_hash,
                    doc.error_message,
                    doc.downloaded_at.map(|d| d.to_rfc3339()),
                    doc.parsed_at.map(|d| d.to_rfc3339()),
                    doc.created_at.to_rfc3339(),
                ],
            )?;
            inserted += changed;
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn find_document(&self, id: &str) -> anyhow::Result<Option<Document>> {
        let conn = self.conn()?;
        let doc = conn
            .query_row(
                "SELECT id, document_type, source_id, source_url, title, published_at, status,
                        storage_path, content_hash, error_message, downloaded_at, parsed_at, created_at
                 FROM documents WHERE id = ?1",
                params![id],
                map_document_row,
            )
            .optional()?;
        Ok(doc)
    }

    fn find_document_by_source_id(&self, source_id: &str) -> anyhow::Result<Option<Document>> {
        let conn = self.conn()?;
        let doc = conn
            .query_row(
                "SELECT id, document_type, source_id, source_url, title, published_at, status,
                        storage_path, content_hash, error_message, downloaded_at, parsed_at, created_at
                 FROM documents WHERE source_id = ?1",
                params![source_id],
                map_document_row,
            )
            .optional()?;
        Ok(doc)
    }

    fn find_documents_by_status(
        &self,
        status: DocumentStatus,
        document_type: Option<DocumentType>,
        limit: i64,
    ) -> anyhow::Result<Vec<Document>> {
        let conn = self.conn()?;
        let mut query = String::from(
            "SELECT id, document_type, source_id, source_url, title, published_at, status,
                    storage_path, content_hash, error_message, downloaded_at, parsed_at, created_at
             FROM documents WHERE status = ?1",
        );
        if document_type.is_some() {
            query.push_str(" AND document_type = ?2 ORDER BY created_at ASC LIMIT ?3");
        } else {
            query.push_str(" ORDER BY created_at ASC LIMIT ?2");
        }
        let mut stmt = conn.prepare(&query)?;
        let rows = if let Some(dt) = document_type {
            stmt.query_map(
                params![document_status_str(status), document_type_str(dt), limit],
                map_document_row,
            )?
        } else {
            stmt.query_map(params![document_status_str(status), limit], map_document_row)?
        };
        let mut docs = Vec::new();
        for row in rows {
            docs.push(row?);
        }
        Ok(docs)
    }

    fn update_document(&self, document: &Document) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE documents SET
                status = ?2, storage_path = ?3, content_hash = ?4, error_message = ?5,
                downloaded_at = ?6, parsed_at = ?7
             WHERE id = ?1",
            params![
                document.id,
                document_status_str(document.status),
                document.storage_path,
                document.content_hash,
                document.error_message,
                document.downloaded_at.map(|d| d.to_rfc3339()),
                document.parsed_at.map(|d| d.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    fn link_document_instrument(&self, link: &DocumentInstrumentLink) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO document_instrument_links (document_id, instrument_id, relevance_score, match_method)
             VALUES (?1,?2,?3,?4)
             ON CONFLICT(document_id, instrument_id) DO UPDATE SET
                relevance_score = excluded.relevance_score,
                match_method = excluded.match_method",
            params![
                link.document_id,
                link.instrument_id,
                link.relevance_score,
                match_method_str(link.match_method),
            ],
        )?;
        Ok(())
    }

    fn instruments_for_document(&self, document_id: &str) -> anyhow::Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT instrument_id FROM document_instrument_links WHERE document_id = ?1",
        )?;
        let rows = stmt.query_map(params![document_id], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn upsert_document_content(&self, content: &DocumentContent) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO document_contents (document_id, full_text, sections_json, word_count)
             VALUES (?1,?2,?3,?4)
             ON CONFLICT(document_id) DO UPDATE SET
                full_text = excluded.full_text,
                sections_json = excluded.sections_json,
                word_count = excluded.word_count",
            params![
                content.document_id,
                content.full_text,
                serde_json::to_string(&content.sections)?,
                content.word_count as i64,
            ],
        )?;
        Ok(())
    }

    fn find_document_content(&self, document_id: &str) -> anyhow::Result<Option<DocumentContent>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT document_id, full_text, sections_json, word_count
                 FROM document_contents WHERE document_id = ?1",
                params![document_id],
                |row| {
                    let sections_json: String = row.get(2)?;
                    Ok(DocumentContent {
                        document_id: row.get(0)?,
                        full_text: row.get(1)?,
                        sections: serde_json::from_str::<HashMap<String, String>>(&sections_json)
                            .unwrap_or_default(),
                        word_count: row.get::<_, i64>(3)? as usize,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }
}

fn map_document_row(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let document_type: String = row.get(1)?;
    let published_at: Option<String> = row.get(5)?;
    let status: String = row.get(6)?;
    let downloaded_at: Option<String> = row.get(10)?;
    let parsed_at: Option<String> = row.get(11)?;
    let created_at: String = row.get(12)?;

    Ok(Document {
        id: row.get(0)?,
        document_type: parse_document_type(&document_type),
        source_id: row.get(2)?,
        source_url: row.get(3)?,
        title: row.get(4)?,
        published_at: published_at.and_then(|s| parse_rfc3339(&s)),
        status: parse_document_status(&status),
        storage_path: row.get(7)?,
        content_hash: row.get(8)?,
        error_message: row.get(9)?,
        downloaded_at: downloaded_at.and_then(|s| parse_rfc3339(&s)),
        parsed_at: parsed_at.and_then(|s| parse_rfc3339(&s)),
        created_at: parse_rfc3339(&created_at).unwrap_or_else(Utc::now),
    })
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn document_type_str(t: DocumentType) -> &'static str {
    match t {
        DocumentType::SecFiling => "sec_filing",
        DocumentType::EarningsTranscript => "earnings_transcript",
        DocumentType::NewsArticle => "news_article",
        DocumentType::FilingVariant => "filing_variant",
    }
}

fn parse_document_type(s: &str) -> DocumentType {
    match s {
        "earnings_transcript" => DocumentType::EarningsTranscript,
        "news_article" => DocumentType::NewsArticle,
        "filing_variant" => DocumentType::FilingVariant,
        _ => DocumentType::SecFiling,
    }
}

fn document_status_str(s: DocumentStatus) -> &'static str {
    match s {
        DocumentStatus::Pending => "PENDING",
        DocumentStatus::Downloading => "DOWNLOADING",
        DocumentStatus::Downloaded => "DOWNLOADED",
        DocumentStatus::Parsed => "PARSED",
        DocumentStatus::Enriched => "ENRICHED",
        DocumentStatus::Failed => "FAILED",
    }
}

fn parse_document_status(s: &str) -> DocumentStatus {
    match s {
        "DOWNLOADING" => DocumentStatus::Downloading,
        "DOWNLOADED" => DocumentStatus::Downloaded,
        "PARSED" => DocumentStatus::Parsed,
        "ENRICHED" => DocumentStatus::Enriched,
        "FAILED" => DocumentStatus::Failed,
        _ => DocumentStatus::Pending,
    }
}

fn match_method_str(m: MatchMethod) -> &'static str {
    match m {
        MatchMethod::ExactSymbol => "exact_symbol",
        MatchMethod::KeywordScan => "keyword_scan",
    }
}
