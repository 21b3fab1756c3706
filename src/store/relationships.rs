use super::Store;
use crate::models::{InstrumentRelationship, RelationshipType};
use rusqlite::params;

pub trait RelationshipRepository {
    fn competitors_of(&self, instrument_id: &str) -> anyhow::Result<Vec<InstrumentRelationship>>;
}

impl RelationshipRepository for Store {
    fn competitors_of(&self, instrument_id: &str) -> anyhow::Result<Vec<InstrumentRelationship>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT instrument_id, related_instrument_id, relationship_type, confidence
             FROM instrument_relationships WHERE instrument_id = ?1 AND relationship_type = ?2",
        )?;
        let rows = stmt.query_map(
            params![instrument_id, RelationshipType::Competitor.as_str()],
            |row| {
                Ok(InstrumentRelationship {
                    instrument_id: row.get(0)?,
                    related_instrument_id: row.get(1)?,
                    relationship_type: RelationshipType::Competitor,
                    confidence: row.get(3)?,
                })
            },
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}
