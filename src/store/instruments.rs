use super::Store;
use crate::models::{IdentifierType, Instrument, InstrumentStatus, InstrumentType};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;

pub trait InstrumentRepository {
    fn find_instrument(&self, id: &str) -> anyhow::Result<Option<Instrument>>;
    fn find_instrument_by_symbol(&self, symbol: &str) -> anyhow::Result<Option<Instrument>>;
    fn list_active_instruments(&self) -> anyhow::Result<Vec<Instrument>>;
    fn upsert_instrument(&self, instrument: &Instrument) -> anyhow::Result<()>;
    fn deactivate_instrument(&self, id: &str) -> anyhow::Result<()>;
}

impl InstrumentRepository for Store {
    fn find_instrument(&self, id: &str) -> anyhow::Result<Option<Instrument>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, instrument_type, symbol, exchange, status, created_at, updated_at
                 FROM instruments WHERE id = ?1",
                params![id],
                map_instrument_row,
            )
            .optional()?;
        let Some(mut instrument) = row else {
            return Ok(None);
        };
        instrument.identifiers = load_identifiers(&conn, id)?;
        Ok(Some(instrument))
    }

    fn find_instrument_by_symbol(&self, symbol: &str) -> anyhow::Result<Option<Instrument>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, instrument_type, symbol, exchange, status, created_at, updated_at
                 FROM instruments WHERE symbol = ?1 LIMIT 1",
                params![symbol],
                map_instrument_row,
            )
            .optional()?;
        let Some(mut instrument) = row else {
            return Ok(None);
        };
        instrument.identifiers = load_identifiers(&conn, &instrument.id)?;
        Ok(Some(instrument))
    }

    fn list_active_instruments(&self) -> anyhow::Result<Vec<Instrument>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, instrument_type, symbol, exchange, status, created_at, updated_at
             FROM instruments WHERE status = 'active'",
        )?;
        let rows = stmt.query_map([], map_instrument_row)?;
        let mut out = Vec::new();
        for row in rows {
            let mut instrument = row?;
            instrument.identifiers = load_identifiers(&conn, &instrument.id)?;
            out.push(instrument);
        }
        Ok(out)
    }

    fn upsert_instrument(&self, instrument: &Instrument) -> anyhow::Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO instruments (id, instrument_type, symbol, exchange, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                symbol = excluded.symbol,
                exchange = excluded.exchange,
                status = excluded.status,
                updated_at = excluded.updated_at",
            params![
                instrument.id,
                instrument_type_str(instrument.instrument_type),
                instrument.symbol,
                instrument.exchange,
                instrument_status_str(instrument.status),
                instrument.created_at.to_rfc3339(),
                instrument.updated_at.to_rfc3339(),
            ],
        )?;
        for (identifier_type, value) in &instrument.identifiers {
            tx.execute(
                "INSERT INTO instrument_identifiers (instrument_id, identifier_type, value)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(instrument_id, identifier_type) DO UPDATE SET value = excluded.value",
                params![instrument.id, identifier_type.as_str(), value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn deactivate_instrument(&self, id: &str) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE instruments SET status = 'inactive', updated_at = ?2 WHERE id = ?1",
            params![id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

fn load_identifiers(
    conn: &rusqlite::Connection,
    instrument_id: &str,
) -> anyhow::Result<HashMap<IdentifierType, String>> {
    let mut stmt = conn.prepare(
        "SELECT identifier_type, value FROM instrument_identifiers WHERE instrument_id = ?1",
    )?;
    let rows = stmt.query_map(params![instrument_id], |row| {
        let identifier_type: String = row.get(0)?;
        let value: String = row.get(1)?;
        Ok((identifier_type, value))
    })?;
    let mut out = HashMap::new();
    for row in rows {
        let (identifier_type, value) = row?;
        if let Some(parsed) = IdentifierType::from_str(&identifier_type) {
            out.insert(parsed, value);
        }
    }
    Ok(out)
}

fn map_instrument_row(row: &rusqlite::Row) -> rusqlite::Result<Instrument> {
    let instrument_type: String = row.get(1)?;
    let status: String = row.get(4)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(Instrument {
        id: row.get(0)?,
        instrument_type: parse_instrument_type(&instrument_type),
        symbol: row.get(2)?,
        exchange: row.get(3)?,
        status: parse_instrument_status(&status),
        identifiers: HashMap::new(),
        created_at: parse_rfc3339(&created_at),
        updated_at: parse_rfc3339(&updated_at),
    })
}

fn parse_rfc3339(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn instrument_type_str(t: InstrumentType) -> &'static str {
    match t {
        InstrumentType::Equity => "equity",
        InstrumentType::Etf => "etf",
        InstrumentType::Option => "option",
    }
}

fn parse_instrument_type(s: &str) -> InstrumentType {
    match s {
        "etf" => InstrumentType::Etf,
        "option" => InstrumentType::Option,
        _ => InstrumentType::Equity,
    }
}

fn instrument_status_str(s: InstrumentStatus) -> &'static str {
    match s {
        InstrumentStatus::Active => "active",
        InstrumentStatus::Inactive => "inactive",
    }
}

fn parse_instrument_status(s: &str) -> InstrumentStatus {
    match s {
        "inactive" => InstrumentStatus::Inactive,
        _ => InstrumentStatus::Active,
    }
}
