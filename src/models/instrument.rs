use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentType {
    Equity,
    Etf,
    Option,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdentifierType {
    Cik,
    Cusip,
    Isin,
    Figi,
    Ticker,
}

impl IdentifierType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierType::Cik => "CIK",
            IdentifierType::Cusip => "CUSIP",
            IdentifierType::Isin => "ISIN",
            IdentifierType::Figi => "FIGI",
            IdentifierType::Ticker => "TICKER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CIK" => Some(IdentifierType::Cik),
            "CUSIP" => Some(IdentifierType::Cusip),
            "ISIN" => Some(IdentifierType::Isin),
            "FIGI" => Some(IdentifierType::Figi),
            "TICKER" => Some(IdentifierType::Ticker),
            _ => None,
        }
    }
}

/// A tradable entity. Created on first observation, soft-deactivated —
/// never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    pub instrument_type: InstrumentType,
    pub symbol: String,
    pub exchange: Option<String>,
    pub status: InstrumentStatus,
    /// Each identifier type is unique per instrument.
    pub identifiers: HashMap<IdentifierType, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Instrument {
    pub fn new_placeholder(id: String, symbol: String, instrument_type: InstrumentType) -> Self {
        let now = Utc::now();
        Self {
            id,
            instrument_type,
            symbol,
            exchange: None,
            status: InstrumentStatus::Active,
            identifiers: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn deactivate(&mut self) {
        self.status = InstrumentStatus::Inactive;
        self.updated_at = Utc::now();
    }
}

/// Many-to-many link between a Document and an Instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    ExactSymbol,
    KeywordScan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInstrumentLink {
    pub document_id: String,
    pub instrument_id: String,
    pub relevance_score: f64,
    pub match_method: MatchMethod,
}

/// Directed edge between two instruments used by cross-entity signal
/// propagation. Populated out-of-band (e.g. sector/competitor mapping
/// ingestion outside this crate's adapters); generators only read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Competitor,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::Competitor => "competitor",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentRelationship {
    pub instrument_id: String,
    pub related_instrument_id: String,
    pub relationship_type: RelationshipType,
    pub confidence: f64,
}

/// Common short words excluded from keyword-scan ticker matching so that
/// e.g. "A" or "ON" don't spuriously match every document.
pub const TICKER_STOP_LIST: &[&str] = &[
    "A", "I", "AN", "AT", "BE", "BY", "DO", "GO", "IF", "IN", "IS", "IT", "ME", "MY", "NO", "OF",
    "ON", "OR", "SO", "TO", "UP", "US", "WE",
];
