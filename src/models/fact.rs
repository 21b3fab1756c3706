use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    DilutionRisk,
    GoingConcernRisk,
    InsiderActivity,
    EarningsToneShift,
}

impl FactType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactType::DilutionRisk => "dilution_risk",
            FactType::GoingConcernRisk => "going_concern_risk",
            FactType::InsiderActivity => "insider_activity",
            FactType::EarningsToneShift => "earnings_tone_shift",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Severity is always derivable from (score, confidence) rather than
    /// stored independently, so the two can never drift apart.
    pub fn from_score_confidence(score: f64, confidence: f64) -> Self {
        let weighted = score * confidence.clamp(0.0, 1.0);
        if weighted >= 80.0 {
            Severity::Critical
        } else if weighted >= 55.0 {
            Severity::High
        } else if weighted >= 30.0 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Evidence snippet: a text window around a keyword match, tagged by
/// section and nearest preceding speaker (transcripts only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceSnippet {
    pub text: String,
    pub offset: usize,
    pub section: Option<String>,
    pub speaker: Option<String>,
}

/// A typed extraction from a document, with evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub id: String,
    pub document_id: String,
    pub fact_type: FactType,
    pub payload: serde_json::Value,
    pub evidence: Vec<EvidenceSnippet>,
    pub confidence: f64,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}
