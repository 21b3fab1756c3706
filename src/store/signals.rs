use super::Store;
use crate::models::{Severity, Signal, SignalEvidence, SignalType};
use chrono::{DateTime, Utc};
use rusqlite::params;

pub trait SignalRepository {
    /// Upsert keyed by (instrument_id, signal_type).
    fn upsert_signal(&self, signal: &Signal) -> anyhow::Result<()>;
    fn active_signals_for_instrument(&self, instrument_id: &str) -> anyhow::Result<Vec<Signal>>;
    fn active_signals_by_type(&self, signal_type: SignalType) -> anyhow::Result<Vec<Signal>>;
    /// True if an active PEER_IMPACT signal on `target_instrument_id` already
    /// references `source_signal_id` in its evidence.
    fn has_peer_impact_from(&self, target_instrument_id: &str, source_signal_id: &str) -> anyhow::Result<bool>;
}

impl SignalRepository for Store {
    fn upsert_signal(&self, signal: &Signal) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO signals (
                id, instrument_id, signal_type, severity, score, confidence,
                reason, evidence_json, computed_at, expires_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
             ON CONFLICT(instrument_id, signal_type) DO UPDATE SET
                severity = excluded.severity,
                score = excluded.score,
                confidence = excluded.confidence,
                reason = excluded.reason,
                evidence_json = excluded.evidence_json,
                computed_at = excluded.computed_at,
                expires_at = excluded.expires_at",
            params![
                signal.id,
                signal.instrument_id,
                signal.signal_type.as_str(),
                severity_str(signal.severity),
                signal.score,
                signal.confidence,
                signal.reason,
                serde_json::to_string(&signal.evidence)?,
                signal.computed_at.to_rfc3339(),
                signal.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn active_signals_for_instrument(&self, instrument_id: &str) -> anyhow::Result<Vec<Signal>> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let mut stmt = conn.prepare(
            "SELECT id, instrument_id, signal_type, severity, score, confidence, reason,
                    evidence_json, computed_at, expires_at
             FROM signals WHERE instrument_id = ?1 AND expires_at > ?2",
        )?;
        let rows = stmt.query_map(params![instrument_id, now], map_signal_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn active_signals_by_type(&self, signal_type: SignalType) -> anyhow::Result<Vec<Signal>> {
        let conn = self.conn()?;
        let now = Utc::now().to_rfc3339();
        let mut stmt = conn.prepare(
            "SELECT id, instrument_id, signal_type, severity, score, confidence, reason,
                    evidence_json, computed_at, expires_at
             FROM signals WHERE signal_type = ?1 AND expires_at > ?2",
        )?;
        let rows = stmt.query_map(params![signal_type.as_str(), now], map_signal_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn has_peer_impact_from(&self, target_instrument_id: &str, source_signal_id: &str) -> anyhow::Result<bool> {
        let signals = self.active_signals_for_instrument(target_instrument_id)?;
        Ok(signals.iter().any(|s| {
            s.signal_type == SignalType::PeerImpact
                && s.evidence.iter().any(|e| match e {
                    SignalEvidence::PropagatedSignal { source_signal_id: sid, .. } => {
                        sid == source_signal_id
                    }
                    _ => false,
                })
        }))
    }
}

fn map_signal_row(row: &rusqlite::Row) -> rusqlite::Result<Signal> {
    let signal_type: String = row.get(2)?;
    let severity: String = row.get(3)?;
    let evidence_json: String = row.get(7)?;
    let computed_at: String = row.get(8)?;
    let expires_at: String = row.get(9)?;
    Ok(Signal {
        id: row.get(0)?,
        instrument_id: row.get(1)?,
        signal_type: parse_signal_type(&signal_type),
        severity: parse_severity(&severity),
        score: row.get(4)?,
        confidence: row.get(5)?,
        reason: row.get(6)?,
        evidence: serde_json::from_str::<Vec<SignalEvidence>>(&evidence_json).unwrap_or_default(),
        computed_at: parse_rfc3339(&computed_at).unwrap_or_else(Utc::now),
        expires_at: parse_rfc3339(&expires_at).unwrap_or_else(Utc::now),
    })
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn severity_str(s: Severity) -> &'static str {
    match s {
        Severity::Low => "LOW",
        Severity::Medium => "MEDIUM",
        Severity::High => "HIGH",
        Severity::Critical => "CRITICAL",
    }
}

fn parse_severity(s: &str) -> Severity {
    match s {
        "MEDIUM" => Severity::Medium,
        "HIGH" => Severity::High,
        "CRITICAL" => Severity::Critical,
        _ => Severity::Low,
    }
}

fn parse_signal_type(s: &str) -> SignalType {
    match s {
        "TOXIC_FINANCING" => SignalType::ToxicFinancing,
        "GOING_CONCERN_DISTRESS" => SignalType::GoingConcernDistress,
        "AP_CONCENTRATION" => SignalType::ApConcentration,
        "FLOW_SHOCK" => SignalType::FlowShock,
        "TRACKING_STRESS" => SignalType::TrackingStress,
        "PEER_PRICE_MOVEMENT" => SignalType::PeerPriceMovement,
        "PEER_IMPACT" => SignalType::PeerImpact,
        _ => SignalType::DilutionRisk,
    }
}
