//! PARSED -> ENRICHED step: run every applicable fact extractor over a
//! document's content, persist facts, and upsert a signal per linked
//! instrument when confidence and keyword density both clear the
//! configured floor.

use crate::context::AppContext;
use crate::facts::{dilution, earnings_tone, going_concern, insider, ExtractedFact};
use crate::models::{
    Document, DocumentType, Fact, FactType, GeneratedSignal, Severity, SignalEvidence, SignalType,
};
use crate::store::{DocumentRepository, FactRepository, SignalRepository};
use tracing::info;
use uuid::Uuid;

pub async fn enrich(ctx: &AppContext, mut document: Document) -> anyhow::Result<Document> {
    let Some(content) = ctx.store.find_document_content(&document.id)? else {
        document.mark_failed("missing document content at enrich step");
        ctx.store.update_document(&document)?;
        return Ok(document);
    };

    let extracted = run_extractors(&content.full_text, &content.sections, document.document_type);

    let linked_instruments = ctx.store.instruments_for_document(&document.id)?;

    for extraction in &extracted {
        let fact = Fact {
            id: Uuid::new_v4().to_string(),
            document_id: document.id.clone(),
            fact_type: extraction.fact_type,
            payload: extraction.payload.clone(),
            evidence: extraction.evidence.clone(),
            confidence: extraction.confidence,
            severity: extraction.severity,
            created_at: chrono::Utc::now(),
        };
        ctx.store.insert_fact(&fact)?;

        if extraction.confidence < ctx.config.fact_min_confidence
            || extraction.keyword_density < ctx.config.fact_min_keyword_density
        {
            continue;
        }

        let Some(signal_type) = signal_type_for(extraction.fact_type, extraction.severity) else {
            continue;
        };

        for instrument_id in &linked_instruments {
            let generated = GeneratedSignal {
                instrument_id: instrument_id.clone(),
                signal_type,
                score: score_for(extraction.severity, extraction.confidence),
                confidence: extraction.confidence,
                reason: reason_for(extraction.fact_type),
                evidence: vec![SignalEvidence::FactReference {
                    fact_id: fact.id.clone(),
                    snippet: extraction
                        .evidence
                        .first()
                        .map(|e| e.text.clone())
                        .unwrap_or_default(),
                }],
                ttl_days: 90,
            };
            let signal = generated.into_signal(Uuid::new_v4().to_string(), chrono::Utc::now());
            ctx.store.upsert_signal(&signal)?;
        }
    }

    document.mark_enriched();
    ctx.store.update_document(&document)?;
    info!(document_id = %document.id, fact_count = extracted.len(), "document enriched");
    Ok(document)
}

fn run_extractors(
    full_text: &str,
    sections: &std::collections::HashMap<String, String>,
    document_type: DocumentType,
) -> Vec<ExtractedFact> {
    let mut out = Vec::new();
    if let Some(f) = dilution::extract(full_text, sections) {
        out.push(f);
    }
    if let Some(f) = going_concern::extract(full_text, sections) {
        out.push(f);
    }
    if let Some(f) = insider::extract(full_text, sections) {
        out.push(f);
    }
    // Tone shift depends on a prepared-remarks/Q&A split that only
    // transcripts produce.
    if document_type == DocumentType::EarningsTranscript {
        if let Some(f) = earnings_tone::extract(full_text, sections) {
            out.push(f);
        }
    }
    out
}

/// Dilution and going-concern facts have a direct signal-taxonomy
/// counterpart; insider activity and tone shift are persisted as facts
/// but don't (yet) carry their own `SignalType` and are left as evidence
/// for future correlation rather than forced into an unrelated signal.
fn signal_type_for(fact_type: FactType, severity: Severity) -> Option<SignalType> {
    match fact_type {
        FactType::DilutionRisk if severity == Severity::Critical => Some(SignalType::ToxicFinancing),
        FactType::DilutionRisk => Some(SignalType::DilutionRisk),
        FactType::GoingConcernRisk => Some(SignalType::GoingConcernDistress),
        FactType::InsiderActivity | FactType::EarningsToneShift => None,
    }
}

fn score_for(severity: Severity, confidence: f64) -> f64 {
    let base = match severity {
        Severity::Low => 25.0,
        Severity::Medium => 50.0,
        Severity::High => 75.0,
        Severity::Critical => 95.0,
    };
    (base * confidence.max(0.5)).min(100.0)
}

fn reason_for(fact_type: FactType) -> String {
    match fact_type {
        FactType::DilutionRisk => "Dilution-risk language detected in filing text".to_string(),
        FactType::GoingConcernRisk => "Going-concern or liquidity-risk language detected".to_string(),
        FactType::InsiderActivity => "Insider activity language detected".to_string(),
        FactType::EarningsToneShift => "Earnings tone shift detected in transcript".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_dilution_maps_to_toxic_financing() {
        assert_eq!(
            signal_type_for(FactType::DilutionRisk, Severity::Critical),
            Some(SignalType::ToxicFinancing)
        );
        assert_eq!(
            signal_type_for(FactType::DilutionRisk, Severity::Medium),
            Some(SignalType::DilutionRisk)
        );
    }

    #[test]
    fn insider_and_tone_shift_have_no_signal_type() {
        assert_eq!(signal_type_for(FactType::InsiderActivity, Severity::High), None);
        assert_eq!(signal_type_for(FactType::EarningsToneShift, Severity::Critical), None);
    }
}
