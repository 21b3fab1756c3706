//! Insider-activity extractor: Form 4-adjacent language in filings and
//! transcripts — cluster selling, 10b5-1 terminations, option exercises
//! sold immediately into the market.

use super::{compute_confidence, evidence_snippets, keyword_density, scan, ExtractedFact, ExtractorSpec};
use crate::models::{FactType, Severity};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

const KEYWORDS: &[&str] = &[
    "insider selling",
    "insider sold",
    "form 4",
    "10b5-1",
    "rule 10b5-1",
    "terminated his trading plan",
    "terminated her trading plan",
    "terminated the trading plan",
    "sold shares",
    "disposed of shares",
    "cluster of insider sales",
    "officer resignation",
    "director resignation",
    "exercised options and sold",
];

const STRONG_PHRASES: &[&str] = &["cluster of insider sales", "terminated the trading plan"];

const NEGATIONS: &[&str] = &[
    "purchased shares",
    "insider buying",
    "acquired shares",
    "no insider selling",
    "routine 10b5-1",
];

static SHARE_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([0-9][0-9,]*)\s+shares").unwrap());
static DOLLAR_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\$\s?([0-9][0-9,]*(?:\.[0-9]+)?)\s?(million|billion|thousand)?").unwrap());

pub fn extract(full_text: &str, sections: &HashMap<String, String>) -> Option<ExtractedFact> {
    let spec = ExtractorSpec {
        fact_type: FactType::InsiderActivity,
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

    let max_shares = SHARE_COUNT
        .captures_iter(full_text)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().replace(',', "").parse::<f64>().ok()))
        .fold(0.0_f64, f64::max);
    let max_value_musd = DOLLAR_AMOUNT
        .captures_iter(full_text)
        .filter_map(|c| parse_dollar_millions(&c))
        .fold(0.0_f64, f64::max);

    let numeric_boost = if max_value_musd > 5.0 || max_shares > 100_000.0 {
        0.1
    } else if max_value_musd > 0.0 || max_shares > 0.0 {
        0.05
    } else {
        0.0
    };

    let confidence = compute_confidence(0.4, density, has_strong, numeric_boost);
    let severity = severity_ladder(result.hits.len(), has_strong, max_value_musd);

    let payload = serde_json::json!({
        "match_count": result.hits.len(),
        "keyword_density": density,
        "max_shares_mentioned": opt(max_shares),
        "max_value_musd": opt(max_value_musd),
    });

    Some(ExtractedFact {
        fact_type: FactType::InsiderActivity,
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

fn severity_ladder(match_count: usize, has_strong: bool, max_value_musd: f64) -> Severity {
    if has_strong && max_value_musd > 10.0 {
        Severity::Critical
    } else if match_count >= 3 || max_value_musd > 5.0 {
        Severity::High
    } else if match_count >= 2 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn opt(v: f64) -> Option<f64> {
    (v > 0.0).then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_trading_plan_termination() {
        let text = "The Chief Financial Officer terminated the trading plan and sold 250,000 shares for approximately $12 million.";
        let fact = extract(text, &HashMap::new()).expect("expected a match");
        assert_eq!(fact.severity, Severity::Critical);
        assert_eq!(fact.payload["max_shares_mentioned"], 250000.0);
    }

    #[test]
    fn insider_buying_is_negated() {
        let text = "Form 4 filings this week reflect insider buying as two directors acquired shares in the open market.";
        assert!(extract(text, &HashMap::new()).is_none());
    }
}
