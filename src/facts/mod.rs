//! Deterministic, regex-based fact extraction over cleaned document text.
//!
//! Every extractor follows a uniform pattern: scan a frozen keyword
//! table, drop matches that fall inside a local negation window (so
//! "adequate liquidity" doesn't read as a going-concern hit), compute
//! keyword density, parse adjacent numerics, assign severity and
//! confidence from a ladder of conditional rules, and emit evidence
//! snippets tagged by section and nearest preceding speaker. Keeping the
//! pattern in one place means each concrete extractor is just its
//! keyword/negation table plus the numeric fields specific to that fact
//! type.

pub mod dilution;
pub mod earnings_tone;
pub mod going_concern;
pub mod insider;

use crate::models::{EvidenceSnippet, FactType, Severity};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

const NEGATION_WINDOW: usize = 100;
const EVIDENCE_WINDOW: usize = 75;
const MAX_EVIDENCE_SNIPPETS: usize = 5;

pub struct ExtractorSpec {
    pub fact_type: FactType,
    pub keywords: &'static [&'static str],
    pub strong_phrases: &'static [&'static str],
    pub negations: &'static [&'static str],
}

pub struct KeywordHit {
    pub offset: usize,
    pub phrase: &'static str,
    pub is_strong: bool,
}

pub struct ScanResult {
    pub hits: Vec<KeywordHit>,
    pub word_count: usize,
}

#[derive(Debug, Clone)]
pub struct ExtractedFact {
    pub fact_type: FactType,
    pub payload: serde_json::Value,
    pub evidence: Vec<EvidenceSnippet>,
    pub confidence: f64,
    pub severity: Severity,
    pub keyword_density: f64,
}

pub fn scan(text: &str, spec: &ExtractorSpec) -> ScanResult {
    let haystack = text.to_ascii_lowercase();
    let word_count = text.split_whitespace().count().max(1);
    let mut hits = Vec::new();

    for phrase in spec.keywords {
        let needle = phrase.to_ascii_lowercase();
        if needle.is_empty() {
            continue;
        }
        let mut cursor = 0;
        while let Some(pos) = haystack[cursor..].find(&needle) {
            let offset = cursor + pos;
            if !negated(&haystack, offset, needle.len(), spec.negations) {
                hits.push(KeywordHit {
                    offset,
                    phrase,
                    is_strong: spec.strong_phrases.contains(phrase),
                });
            }
            cursor = offset + needle.len();
        }
    }
    hits.sort_by_key(|h| h.offset);
    ScanResult { hits, word_count }
}

fn negated(haystack: &str, offset: usize, match_len: usize, negations: &[&str]) -> bool {
    let window_start = floor_char_boundary(haystack, offset.saturating_sub(NEGATION_WINDOW));
    let window_end = ceil_char_boundary(
        haystack,
        (offset + match_len + NEGATION_WINDOW).min(haystack.len()),
    );
    let window = &haystack[window_start..window_end];
    negations.iter().any(|n| window.contains(&n.to_ascii_lowercase()))
}

pub fn keyword_density(match_count: usize, word_count: usize) -> f64 {
    match_count as f64 / word_count as f64 * 1000.0
}

/// Base confidence plus additive boosts from density, strong-phrase
/// presence, and numeric match quality; clamped to ≤ 0.95.
pub fn compute_confidence(base: f64, density: f64, has_strong_phrase: bool, numeric_boost: f64) -> f64 {
    let mut confidence = base;
    confidence += (density / 10.0).min(0.2);
    if has_strong_phrase {
        confidence += 0.1;
    }
    confidence += numeric_boost;
    confidence.min(0.95)
}

/// First N matches, each as a ±75-char window tagged by section
/// (prepared-remarks vs Q&A, by text offset) and nearest preceding
/// speaker label.
pub fn evidence_snippets(
    text: &str,
    hits: &[KeywordHit],
    sections: &HashMap<String, String>,
) -> Vec<EvidenceSnippet> {
    let prepared_len = sections.get("prepared_remarks").map(|s| s.chars().count());
    let has_qa = sections.contains_key("qa");

    hits.iter()
        .take(MAX_EVIDENCE_SNIPPETS)
        .map(|hit| {
            let start = floor_char_boundary(text, hit.offset.saturating_sub(EVIDENCE_WINDOW));
            let end = ceil_char_boundary(
                text,
                (hit.offset + hit.phrase.len() + EVIDENCE_WINDOW).min(text.len()),
            );
            let snippet = text[start..end].trim().to_string();

            let section = if has_qa {
                match prepared_len {
                    Some(len) if hit.offset < len => Some("prepared_remarks".to_string()),
                    Some(_) => Some("qa".to_string()),
                    None => None,
                }
            } else {
                None
            };

            EvidenceSnippet {
                text: snippet,
                offset: hit.offset,
                section,
                speaker: nearest_preceding_speaker(text, hit.offset),
            }
        })
        .collect()
}

/// Nearest preceding "Speaker Name: ..." line, the convention transcript
/// vendors use to mark a new speaker turn.
fn nearest_preceding_speaker(text: &str, offset: usize) -> Option<String> {
    static SPEAKER_LINE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^([A-Z][A-Za-z.'\- ]{2,40}):").unwrap());
    let safe_offset = floor_char_boundary(text, offset.min(text.len()));
    let preceding = &text[..safe_offset];
    SPEAKER_LINE
        .captures_iter(preceding)
        .last()
        .map(|caps| caps[1].trim().to_string())
}

fn floor_char_boundary(s: &str, idx: usize) -> usize {
    let mut i = idx.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, idx: usize) -> usize {
    let mut i = idx.min(s.len());
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: ExtractorSpec = ExtractorSpec {
        fact_type: FactType::GoingConcernRisk,
        keywords: &["going concern", "substantial doubt"],
        strong_phrases: &["substantial doubt"],
        negations: &["no substantial doubt", "adequate liquidity"],
    };

    #[test]
    fn negation_window_suppresses_match() {
        let text = "Management believes it has adequate liquidity and no substantial doubt about its ability to continue as a going concern this year.";
        let result = scan(text, &SPEC);
        assert!(result.hits.iter().all(|h| h.phrase != "substantial doubt"));
    }

    #[test]
    fn unnegated_match_is_kept() {
        let text = "The auditors expressed substantial doubt about the company's ability to continue as a going concern.";
        let result = scan(text, &SPEC);
        assert!(result.hits.iter().any(|h| h.phrase == "substantial doubt"));
    }

    #[test]
    fn speaker_label_found_before_offset() {
        let text = "Jane Doe: We are seeing substantial doubt creep into guidance.";
        let offset = text.find("substantial doubt").unwrap();
        assert_eq!(nearest_preceding_speaker(text, offset).as_deref(), Some("Jane Doe"));
    }
}
