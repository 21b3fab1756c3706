//! Going-concern / liquidity-risk extractor: auditor doubt language,
//! covenant stress, and explicit cash-runway statements.

use super::{compute_confidence, evidence_snippets, keyword_density, scan, ExtractedFact, ExtractorSpec};
use crate::models::{FactType, Severity};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

const KEYWORDS: &[&str] = &[
    "going concern",
    "substantial doubt",
    "liquidity constraints",
    "unable to continue as a going concern",
    "default under",
    "covenant breach",
    "negative working capital",
    "insufficient cash",
    "runway",
];

const STRONG_PHRASES: &[&str] = &["unable to continue as a going concern", "substantial doubt"];

const NEGATIONS: &[&str] = &[
    "adequate liquidity",
    "sufficient liquidity",
    "no substantial doubt",
    "resolved the substantial doubt",
    "sufficient cash",
    "ample runway",
];

static RUNWAY_MONTHS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([0-9]{1,3})\s*(?:-[0-9]{1,3})?\s*months?\s+(?:of\s+)?runway").unwrap());
static DOLLAR_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\$\s?([0-9][0-9,]*(?:\.[0-9]+)?)\s?(million|billion|thousand)?").unwrap());

pub fn extract(full_text: &str, sections: &HashMap<String, String>) -> Option<ExtractedFact> {
    let spec = ExtractorSpec {
        fact_type: FactType::GoingConcernRisk,
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

    let runway_months = RUNWAY_MONTHS
        .captures_iter(full_text)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse::<f64>().ok()))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));
    let min_cash_musd = DOLLAR_AMOUNT
        .captures_iter(full_text)
        .filter_map(|c| parse_dollar_millions(&c))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));

    let numeric_boost = match runway_months {
        Some(m) if m <= 6.0 => 0.1,
        Some(m) if m <= 12.0 => 0.05,
        _ => 0.0,
    };

    let confidence = compute_confidence(0.5, density, has_strong, numeric_boost);
    let severity = severity_ladder(result.hits.len(), has_strong, runway_months);

    let payload = serde_json::json!({
        "match_count": result.hits.len(),
        "keyword_density": density,
        "runway_months": runway_months,
        "min_cash_mentioned_musd": min_cash_musd,
    });

    Some(ExtractedFact {
        fact_type: FactType::GoingConcernRisk,
        payload,
        evidence: evidence_snippets(full_text, &result.hits, sections),
        confidence,
        severity,
        keyword_density: density,
    })
}

fn parse_dollar_millions(caps: &Captures) -> Option<f64> {
    let num: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(ref unit) if unit == "billion" => 1_000.0,
        Some(ref unit) if unit == "thousand" => 0.001,
        _ => 1.0,
    };
    Some(num * multiplier)
}

fn severity_ladder(match_count: usize, has_strong: bool, runway_months: Option<f64>) -> Severity {
    match runway_months {
        Some(m) if m <= 3.0 => Severity::Critical,
        Some(m) if m <= 6.0 && has_strong => Severity::Critical,
        _ if has_strong && match_count >= 2 => Severity::High,
        _ if match_count >= 3 => Severity::High,
        _ if match_count >= 2 => Severity::Medium,
        _ => Severity::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_runway_statement() {
        let text = "The Company believes it has substantial doubt about its ability to continue and has approximately 4 months of runway remaining.";
        let fact = extract(text, &HashMap::new()).expect("expected a match");
        assert_eq!(fact.severity, Severity::Critical);
        assert_eq!(fact.payload["runway_months"], 4.0);
    }

    #[test]
    fn adequate_liquidity_is_negated() {
        let text = "Despite industry headwinds, the company maintains adequate liquidity and no substantial doubt exists regarding going concern.";
        assert!(extract(text, &HashMap::new()).is_none());
    }
}
