//! Earnings-tone-shift extractor: hedging and guidance-withdrawal
//! language in transcripts, scoped to prepared remarks and Q&A exchanges.

use super::{compute_confidence, evidence_snippets, keyword_density, scan, ExtractedFact, ExtractorSpec};
use crate::models::{FactType, Severity};
use std::collections::HashMap;

const KEYWORDS: &[&str] = &[
    "headwinds",
    "challenging environment",
    "softness",
    "uncertain macro",
    "withdrawing guidance",
    "withdrew guidance",
    "pausing guidance",
    "below expectations",
    "miss on",
    "demand softening",
    "pushing out",
    "elongated sales cycle",
    "pockets of weakness",
    "cautious outlook",
];

const STRONG_PHRASES: &[&str] = &["withdrawing guidance", "withdrew guidance"];

const NEGATIONS: &[&str] = &[
    "no headwinds",
    "despite challenging environment",
    "reaffirming guidance",
    "raising guidance",
    "better than expected",
];

pub fn extract(full_text: &str, sections: &HashMap<String, String>) -> Option<ExtractedFact> {
    let spec = ExtractorSpec {
        fact_type: FactType::EarningsToneShift,
        keywords: KEYWORDS,
        strong_phrases: STRONG_PHRASES,
        negations: NEGATIONS,
    };
    let result = scan(full_text, &spec);
    if result.hits.is_empty() {
        return None;
    }

    let density = keyword_density(result.hits.len(), result.word_count);
    let has_strong = result.hits.iter().any(|h| h.is_strong);

    let qa_hits = result
        .hits
        .iter()
        .filter(|h| is_in_qa(full_text, h.offset, sections))
        .count();
    let numeric_boost = if qa_hits >= 2 { 0.1 } else if qa_hits >= 1 { 0.05 } else { 0.0 };

    let confidence = compute_confidence(0.35, density, has_strong, numeric_boost);
    let severity = severity_ladder(result.hits.len(), has_strong, qa_hits);

    let payload = serde_json::json!({
        "match_count": result.hits.len(),
        "keyword_density": density,
        "qa_mention_count": qa_hits,
    });

    Some(ExtractedFact {
        fact_type: FactType::EarningsToneShift,
        payload,
        evidence: evidence_snippets(full_text, &result.hits, sections),
        confidence,
        severity,
        keyword_density: density,
    })
}

fn is_in_qa(_text: &str, offset: usize, sections: &HashMap<String, String>) -> bool {
    match sections.get("prepared_remarks") {
        Some(prepared) => offset >= prepared.chars().count(),
        None => false,
    }
}

fn severity_ladder(match_count: usize, has_strong: bool, qa_hits: usize) -> Severity {
    if has_strong && qa_hits >= 1 {
        Severity::Critical
    } else if has_strong || match_count >= 4 {
        Severity::High
    } else if match_count >= 2 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn withdrawing_guidance_in_qa_is_critical() {
        let mut sections = HashMap::new();
        sections.insert("prepared_remarks".to_string(), "x".repeat(50));
        sections.insert("qa".to_string(), String::new());
        let text = format!(
            "{}We are withdrawing guidance for the remainder of the year given demand softening.",
            "x".repeat(50)
        );
        let fact = extract(&text, &sections).expect("expected a match");
        assert_eq!(fact.severity, Severity::Critical);
    }

    #[test]
    fn reaffirming_guidance_is_negated() {
        let text = "Despite some pockets of weakness internationally, we are reaffirming guidance for the full year.";
        assert!(extract(text, &HashMap::new()).is_none());
    }
}
