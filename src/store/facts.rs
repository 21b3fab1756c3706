use super::Store;
use crate::models::{EvidenceSnippet, Fact, FactType, Severity};
use chrono::{DateTime, Utc};
use rusqlite::params;

pub trait FactRepository {
    fn insert_fact(&self, fact: &Fact) -> anyhow::Result<()>;
    fn facts_for_document(&self, document_id: &str) -> anyhow::Result<Vec<Fact>>;
}

impl FactRepository for Store {
    fn insert_fact(&self, fact: &Fact) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO facts (id, document_id, fact_type, payload_json, evidence_json, confidence, severity, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8)
             ON CONFLICT(id) DO UPDATE SET
                payload_json = excluded.payload_json,
                evidence_json = excluded.evidence_json,
                confidence = excluded.confidence,
                severity = excluded.severity",
            params![
                fact.id,
                fact.document_id,
                fact.fact_type.as_str(),
                serde_json::to_string(&fact.payload)?,
                serde_json::to_string(&fact.evidence)?,
                fact.confidence,
                severity_str(fact.severity),
                fact.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn facts_for_document(&self, document_id: &str) -> anyhow::Result<Vec<Fact>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, document_id, fact_type, payload_json, evidence_json, confidence, severity, created_at
             FROM facts WHERE document_id = ?1",
        )?;
        let rows = stmt.query_map(params![document_id], map_fact_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn map_fact_row(row: &rusqlite::Row) -> rusqlite::Result<Fact> {
    let fact_type: String = row.get(2)?;
    let payload_json: String = row.get(3)?;
    let evidence_json: String = row.get(4)?;
    let severity: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    Ok(Fact {
        id: row.get(0)?,
        document_id: row.get(1)?,
        fact_type: parse_fact_type(&fact_type),
        payload: serde_json::from_str(&payload_json).unwrap_or(serde_json::Value::Null),
        evidence: serde_json::from_str::<Vec<EvidenceSnippet>>(&evidence_json).unwrap_or_default(),
        confidence: row.get(5)?,
        severity: parse_severity(&severity),
        created_at: parse_rfc3339(&created_at).unwrap_or_else(Utc::now),
    })
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_fact_type(s: &str) -> FactType {
    match s {
        "going_concern_risk" => FactType::GoingConcernRisk,
        "insider_activity" => FactType::InsiderActivity,
        "earnings_tone_shift" => FactType::EarningsToneShift,
        _ => FactType::DilutionRisk,
    }
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
