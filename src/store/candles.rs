use super::Store;
use crate::models::{Candle, CandleInterval, CandleSource};
use chrono::{DateTime, Utc};
use rusqlite::params;

pub trait CandleRepository {
    fn upsert_candles(&self, instrument_id: &str, candles: &[Candle]) -> anyhow::Result<usize>;
    fn find_candles(
        &self,
        instrument_id: &str,
        interval: CandleInterval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Candle>>;
}

impl CandleRepository for Store {
    fn upsert_candles(&self, instrument_id: &str, candles: &[Candle]) -> anyhow::Result<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut written = 0usize;
        for candle in candles {
            tx.execute(
                "INSERT INTO candles (
                    instrument_id, interval, start_time, source, end_time,
                    open, high, low, close, volume, forward_filled
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)
                 ON CONFLICT(instrument_id, interval, start_time, source) DO UPDATE SET
                    end_time = excluded.end_time,
                    open = excluded.open,
                    high = excluded.high,
                    low = excluded.low,
                    close = excluded.close,
                    volume = excluded.volume,
                    forward_filled = excluded.forward_filled",
                params![
                    instrument_id,
                    candle.interval.as_str(),
                    candle.start_time.to_rfc3339(),
                    candle_source_str(candle.source),
                    candle.end_time.to_rfc3339(),
                    candle.open,
                    candle.high,
                    candle.low,
                    candle.close,
                    candle.volume,
                    candle.forward_filled as i64,
                ],
            )?;
            written += 1;
        }
        tx.commit()?;
        Ok(written)
    }

    fn find_candles(
        &self,
        instrument_id: &str,
        interval: CandleInterval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Candle>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT interval, start_time, end_time, open, high, low, close, volume, forward_filled, source
             FROM candles
             WHERE instrument_id = ?1 AND interval = ?2 AND start_time >= ?3 AND start_time <= ?4
             ORDER BY start_time ASC",
        )?;
        let rows = stmt.query_map(
            params![instrument_id, interval.as_str(), from.to_rfc3339(), to.to_rfc3339()],
            map_candle_row,
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn map_candle_row(row: &rusqlite::Row) -> rusqlite::Result<Candle> {
    let interval: String = row.get(0)?;
    let start_time: String = row.get(1)?;
    let end_time: String = row.get(2)?;
    let source: String = row.get(9)?;
    Ok(Candle {
        interval: CandleInterval::parse(&interval).unwrap_or(CandleInterval::OneMinute),
        start_time: parse_rfc3339(&start_time).unwrap_or_else(Utc::now),
        end_time: parse_rfc3339(&end_time).unwrap_or_else(Utc::now),
        open: row.get(3)?,
        high: row.get(4)?,
        low: row.get(5)?,
        close: row.get(6)?,
        volume: row.get(7)?,
        forward_filled: row.get::<_, i64>(8)? != 0,
        source: parse_candle_source(&source),
    })
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn candle_source_str(s: CandleSource) -> &'static str {
    match s {
        CandleSource::Historical => "historical",
        CandleSource::Derived => "derived",
    }
}

fn parse_candle_source(s: &str) -> CandleSource {
    match s {
        "historical" => CandleSource::Historical,
        _ => CandleSource::Derived,
    }
}
