use super::fact::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    DilutionRisk,
    ToxicFinancing,
    GoingConcernDistress,
    ApConcentration,
    FlowShock,
    TrackingStress,
    PeerPriceMovement,
    PeerImpact,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::DilutionRisk => "DILUTION_RISK",
            SignalType::ToxicFinancing => "TOXIC_FINANCING",
            SignalType::GoingConcernDistress => "GOING_CONCERN_DISTRESS",
            SignalType::ApConcentration => "AP_CONCENTRATION",
            SignalType::FlowShock => "FLOW_SHOCK",
            SignalType::TrackingStress => "TRACKING_STRESS",
            SignalType::PeerPriceMovement => "PEER_PRICE_MOVEMENT",
            SignalType::PeerImpact => "PEER_IMPACT",
        }
    }

    /// Signal types that may be the origin of a PEER_IMPACT propagation.
    pub fn is_propagatable(&self) -> bool {
        matches!(
            self,
            SignalType::DilutionRisk
                | SignalType::ToxicFinancing
                | SignalType::GoingConcernDistress
        )
    }
}

/// Typed evidence variants a generator attaches to a signal, carrying
/// just enough to reconstruct "why" without re-querying every metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalEvidence {
    ApConcentration {
        hhi: f64,
        top_ap_share: f64,
    },
    FlowShock {
        flow_zscore: f64,
        window_days: u32,
    },
    TrackingStress {
        premium_discount_bps: f64,
        consecutive_days: u32,
    },
    PeerPriceMovement {
        peer_instrument_id: String,
        move_pct: f64,
    },
    PropagatedSignal {
        source_signal_id: String,
        source_instrument_id: String,
        source_signal_type: SignalType,
        decay_factor: f64,
    },
    FactReference {
        fact_id: String,
        snippet: String,
    },
}

/// A typed, scored, time-bounded assertion about an instrument's risk
/// state. (instrument, type) is upsert-unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub id: String,
    pub instrument_id: String,
    pub signal_type: SignalType,
    pub severity: Severity,
    pub score: f64,
    pub confidence: f64,
    pub reason: String,
    pub evidence: Vec<SignalEvidence>,
    pub computed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Signal {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// What a generator or extractor produces before it is upserted by the
/// wrapping job, which resolves the (instrument, type) uniqueness.
#[derive(Debug, Clone)]
pub struct GeneratedSignal {
    pub instrument_id: String,
    pub signal_type: SignalType,
    pub score: f64,
    pub confidence: f64,
    pub reason: String,
    pub evidence: Vec<SignalEvidence>,
    pub ttl_days: i64,
}

impl GeneratedSignal {
    pub fn into_signal(self, id: String, now: DateTime<Utc>) -> Signal {
        let severity = Severity::from_score_confidence(self.score, self.confidence);
        Signal {
            id,
            instrument_id: self.instrument_id,
            signal_type: self.signal_type,
            severity,
            score: self.score.clamp(0.0, 100.0),
            confidence: self.confidence.clamp(0.0, 1.0),
            reason: self.reason,
            evidence: self.evidence,
            computed_at: now,
            expires_at: now + chrono::Duration::days(self.ttl_days),
        }
    }
}
