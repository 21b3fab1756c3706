use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    SecFiling,
    EarningsTranscript,
    NewsArticle,
    FilingVariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentStatus {
    Pending,
    Downloading,
    Downloaded,
    Parsed,
    Enriched,
    Failed,
}

impl DocumentStatus {
    /// Monotonic transition guard: any state may go to Failed; otherwise
    /// states only advance along the pipeline.
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Pending, Downloading)
                | (Downloading, Downloaded)
                | (Downloaded, Parsed)
                | (Parsed, Enriched)
        )
    }
}

/// An opaque downloaded artifact moving through the lifecycle state
/// machine. `source_id` is the global dedup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub document_type: DocumentType,
    pub source_id: String,
    pub source_url: String,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
    pub status: DocumentStatus,
    pub storage_path: Option<String>,
    pub content_hash: Option<String>,
    pub error_message: Option<String>,
    pub downloaded_at: Option<DateTime<Utc>>,
    pub parsed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new_pending(
        id: String,
        document_type: DocumentType,
        source_id: String,
        source_url: String,
        title: String,
        published_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            document_type,
            source_id,
            source_url,
            title,
            published_at,
            status: DocumentStatus::Pending,
            storage_path: None,
            content_hash: None,
            error_message: None,
            downloaded_at: None,
            parsed_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn mark_downloading(&mut self) {
        debug_assert!(self.status.can_transition_to(DocumentStatus::Downloading));
        self.status = DocumentStatus::Downloading;
    }

    /// `status == DOWNLOADED` requires `storage_path` and `content_hash`.
    pub fn mark_downloaded(&mut self, storage_path: String, content_hash: String) {
        debug_assert!(self.status.can_transition_to(DocumentStatus::Downloaded));
        self.storage_path = Some(storage_path);
        self.content_hash = Some(content_hash);
        self.status = DocumentStatus::Downloaded;
        self.downloaded_at = Some(Utc::now());
    }

    pub fn mark_parsed(&mut self) {
        self.status = DocumentStatus::Parsed;
        self.parsed_at = Some(Utc::now());
    }

    pub fn mark_enriched(&mut self) {
        self.status = DocumentStatus::Enriched;
    }

    pub fn mark_failed(&mut self, error_message: impl Into<String>) {
        self.status = DocumentStatus::Failed;
        self.error_message = Some(error_message.into());
    }
}

/// Full normalized text and structured sub-sections, 1-to-1 with Document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContent {
    pub document_id: String,
    pub full_text: String,
    pub sections: HashMap<String, String>,
    pub word_count: usize,
}

impl DocumentContent {
    pub fn new(document_id: String, full_text: String, sections: HashMap<String, String>) -> Self {
        let word_count = full_text.split_whitespace().count();
        Self {
            document_id,
            full_text,
            sections,
            word_count,
        }
    }
}
