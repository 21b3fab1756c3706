use super::Store;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackfillStatus {
    InProgress,
    Completed,
    Failed,
}

impl BackfillStatus {
    fn as_str(self) -> &'static str {
        match self {
            BackfillStatus::InProgress => "in_progress",
            BackfillStatus::Completed => "completed",
            BackfillStatus::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "completed" => BackfillStatus::Completed,
            "failed" => BackfillStatus::Failed,
            _ => BackfillStatus::InProgress,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackfillRecord {
    pub market_id: String,
    pub status: BackfillStatus,
    pub trade_events_count: i64,
    pub earliest_ts: Option<DateTime<Utc>>,
    pub latest_ts: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

pub trait BackfillRepository {
    fn find_backfill(&self, market_id: &str) -> anyhow::Result<Option<BackfillRecord>>;
    fn upsert_backfill(&self, record: &BackfillRecord) -> anyhow::Result<()>;
    fn get_watermark(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set_watermark(&self, key: &str, value: &str) -> anyhow::Result<()>;
}

impl BackfillRepository for Store {
    fn find_backfill(&self, market_id: &str) -> anyhow::Result<Option<BackfillRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT market_id, status, trade_events_count, earliest_ts, latest_ts, error_message
                 FROM backfill_status WHERE market_id = ?1",
                params![market_id],
                |row| {
                    let status: String = row.get(1)?;
                    let earliest: Option<String> = row.get(3)?;
                    let latest: Option<String> = row.get(4)?;
                    Ok(BackfillRecord {
                        market_id: row.get(0)?,
                        status: BackfillStatus::parse(&status),
                        trade_events_count: row.get(2)?,
                        earliest_ts: earliest.and_then(|s| parse_rfc3339(&s)),
                        latest_ts: latest.and_then(|s| parse_rfc3339(&s)),
                        error_message: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn upsert_backfill(&self, record: &BackfillRecord) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO backfill_status (market_id, status, trade_events_count, earliest_ts, latest_ts, error_message, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7)
             ON CONFLICT(market_id) DO UPDATE SET
                status = excluded.status,
                trade_events_count = excluded.trade_events_count,
                earliest_ts = excluded.earliest_ts,
                latest_ts = excluded.latest_ts,
                error_message = excluded.error_message,
                updated_at = excluded.updated_at",
            params![
                record.market_id,
                record.status.as_str(),
                record.trade_events_count,
                record.earliest_ts.map(|d| d.to_rfc3339()),
                record.latest_ts.map(|d| d.to_rfc3339()),
                record.error_message,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_watermark(&self, key: &str) -> anyhow::Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM sync_watermarks WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_watermark(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sync_watermarks (key, value, updated_at) VALUES (?1,?2,?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
