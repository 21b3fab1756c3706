//! Dilution-risk extractor: shelf registrations, ATM offerings, toxic
//! convertible structures — language that precedes share-count expansion.

use super::{compute_confidence, evidence_snippets, keyword_density, scan, ExtractedFact, ExtractorSpec};
use crate::models::{FactType, Severity};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

const KEYWORDS: &[&str] = &[
    "shelf registration",
    "at-the-market offering",
    "atm offering",
    "registered direct offering",
    "private placement",
    "dilutive",
    "convertible notes",
    "convertible preferred",
    "warrant coverage",
    "toxic convertible",
    "death spiral financing",
    "standby equity purchase agreement",
    "equity line of credit",
    "reverse stock split",
];

const STRONG_PHRASES: &[&str] = &["death spiral financing", "toxic convertible"];

const NEGATIONS: &[&str] = &[
    "no dilution",
    "without dilution",
    "not dilutive",
    "does not expect to issue",
    "anti-dilution protection waived",
];

static DOLLAR_AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\$\s?([0-9][0-9,]*(?:\.[0-9]+)?)\s?(million|billion|thousand)?").unwrap());
static PERCENTAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s?%").unwrap());

pub fn extract(full_text: &str, sections: &HashMap<String, String>) -> Option<ExtractedFact> {
    let spec = ExtractorSpec {
        fact_type: FactType::DilutionRisk,
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

    let max_offering_musd = DOLLAR_AMOUNT
        .captures_iter(full_text)
        .filter_map(|c| parse_dollar_millions(&c))
        .fold(0.0_f64, f64::max);
    let max_dilution_pct = PERCENTAGE
        .captures_iter(full_text)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse::<f64>().ok()))
        .fold(0.0_f64, f64::max);

    let numeric_boost = if max_offering_musd > 50.0 || max_dilution_pct > 20.0 {
        0.1
    } else if max_offering_musd > 0.0 || max_dilution_pct > 0.0 {
        0.05
    } else {
        0.0
    };

    let confidence = compute_confidence(0.45, density, has_strong, numeric_boost);
    let severity = severity_ladder(result.hits.len(), has_strong, max_offering_musd, max_dilution_pct);

    let payload = serde_json::json!({
        "match_count": result.hits.len(),
        "keyword_density": density,
        "max_offering_size_musd": opt(max_offering_musd),
        "max_dilution_pct": opt(max_dilution_pct),
    });

    Some(ExtractedFact {
        fact_type: FactType::DilutionRisk,
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

fn severity_ladder(match_count: usize, has_strong: bool, max_musd: f64, max_pct: f64) -> Severity {
    if has_strong && (max_musd > 100.0 || max_pct > 30.0) {
        Severity::Critical
    } else if match_count >= 3 || max_musd > 50.0 {
        Severity::High
    } else if match_count >= 2 || max_pct > 10.0 {
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
    fn detects_atm_offering_with_dollar_amount() {
        let text = "The Company entered into an at-the-market offering agreement to sell up to $75 million of common stock.";
        let fact = extract(text, &HashMap::new()).expect("expected a match");
        assert_eq!(fact.fact_type, FactType::DilutionRisk);
        assert!(fact.confidence > 0.45);
        assert_eq!(fact.payload["max_offering_size_musd"], 75.0);
    }

    #[test]
    fn no_keywords_returns_none() {
        assert!(extract("Revenue grew steadily this quarter.", &HashMap::new()).is_none());
    }

    #[test]
    fn negated_mention_does_not_trigger() {
        let text = "Management has stated the company does not expect to issue a dilutive convertible notes offering this year.";
        assert!(extract(text, &HashMap::new()).is_none());
    }
}
