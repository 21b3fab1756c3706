//! DOWNLOADED -> PARSED step: re-read the stored blob, split out
//! document-type-specific sub-sections, persist `DocumentContent`.

use crate::context::AppContext;
use crate::models::{Document, DocumentContent, DocumentType};
use crate::objectstore::ObjectStore;
use crate::store::DocumentRepository;
use std::collections::HashMap;

pub async fn parse(ctx: &AppContext, mut document: Document) -> anyhow::Result<Document> {
    let Some(storage_path) = document.storage_path.clone() else {
        document.mark_failed("missing storage_path at parse step");
        ctx.store.update_document(&document)?;
        return Ok(document);
    };

    let bytes = ctx.object_store.get(&storage_path).await?;
    let full_text = String::from_utf8_lossy(&bytes).into_owned();

    let sections = split_sections(&full_text, document.document_type);
    let content = DocumentContent::new(document.id.clone(), full_text, sections);
    ctx.store.upsert_document_content(&content)?;

    document.mark_parsed();
    ctx.store.update_document(&document)?;
    Ok(document)
}

/// Split cleaned text into named sub-sections. SEC filings use form-item
/// markers ("Item 1.", "Item 1A.", ...); transcripts split on a
/// prepared-remarks/Q&A boundary; everything else is returned whole.
fn split_sections(text: &str, document_type: DocumentType) -> HashMap<String, String> {
    match document_type {
        DocumentType::SecFiling | DocumentType::FilingVariant => split_filing_items(text),
        DocumentType::EarningsTranscript => split_transcript(text),
        DocumentType::NewsArticle => {
            let mut sections = HashMap::new();
            sections.insert("body".to_string(), text.to_string());
            sections
        }
    }
}

fn split_filing_items(text: &str) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    let markers: Vec<(usize, String)> = ITEM_MARKERS
        .iter()
        .filter_map(|marker| text.find(marker).map(|idx| (idx, marker.to_string())))
        .collect();

    let mut sorted = markers;
    sorted.sort_by_key(|(idx, _)| *idx);

    for (i, (start, label)) in sorted.iter().enumerate() {
        let end = sorted.get(i + 1).map(|(next, _)| *next).unwrap_or(text.len());
        let key = label.trim_end_matches('.').to_lowercase().replace(' ', "_");
        sections.insert(key, text[*start..end].to_string());
    }

    if sections.is_empty() {
        sections.insert("full".to_string(), text.to_string());
    }
    sections
}

const ITEM_MARKERS: &[&str] = &[
    "Item 1.", "Item 1A.", "Item 1B.", "Item 2.", "Item 3.", "Item 4.", "Item 5.", "Item 6.",
    "Item 7.", "Item 7A.", "Item 8.", "Item 9.",
];

fn split_transcript(text: &str) -> HashMap<String, String> {
    let mut sections = HashMap::new();
    if let Some(idx) = text.find("Question-and-Answer") {
        sections.insert("prepared_remarks".to_string(), text[..idx].to_string());
        sections.insert("qa".to_string(), text[idx..].to_string());
    } else {
        sections.insert("prepared_remarks".to_string(), text.to_string());
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_filing_by_item_markers() {
        let text = "preamble Item 1. Business stuff here Item 1A. Risk factors here Item 2. Properties here";
        let sections = split_filing_items(text);
        assert!(sections.contains_key("item_1"));
        assert!(sections.contains_key("item_1a"));
        assert!(sections["item_1"].contains("Business stuff"));
        assert!(!sections["item_1"].contains("Risk factors"));
    }

    #[test]
    fn splits_transcript_into_prepared_remarks_and_qa() {
        let text = "Good morning everyone. Question-and-Answer session begins now. Analyst: thanks.";
        let sections = split_transcript(text);
        assert!(sections["prepared_remarks"].contains("Good morning"));
        assert!(sections["qa"].contains("Analyst"));
    }
}
