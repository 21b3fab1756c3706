use super::Store;
use crate::models::{OrderbookEvent, OrderbookSnapshot, PriceLevel, TradeEvent};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

pub trait EventRepository {
    fn upsert_orderbook_snapshot(&self, snapshot: &OrderbookSnapshot) -> anyhow::Result<()>;
    fn find_orderbook_snapshot(&self, market_id: &str, outcome: &str) -> anyhow::Result<Option<OrderbookSnapshot>>;
    fn insert_orderbook_event(&self, event: &OrderbookEvent) -> anyhow::Result<bool>;
    fn insert_trade_event(&self, event: &TradeEvent) -> anyhow::Result<bool>;
    fn orderbook_events_range(
        &self,
        market_id: &str,
        outcome: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<OrderbookEvent>>;
    fn trade_events_range(
        &self,
        market_id: &str,
        outcome: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<TradeEvent>>;
    fn last_event_before(
        &self,
        market_id: &str,
        outcome: &str,
        before: DateTime<Utc>,
    ) -> anyhow::Result<Option<f64>>;
}

impl EventRepository for Store {
    fn upsert_orderbook_snapshot(&self, snapshot: &OrderbookSnapshot) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO orderbook_snapshots (market_id, outcome, bids_json, asks_json, expires_at)
             VALUES (?1,?2,?3,?4,?5)
             ON CONFLICT(market_id, outcome) DO UPDATE SET
                bids_json = excluded.bids_json,
                asks_json = excluded.asks_json,
                expires_at = excluded.expires_at",
            params![
                snapshot.market_id,
                snapshot.outcome,
                serde_json::to_string(&snapshot.bids)?,
                serde_json::to_string(&snapshot.asks)?,
                snapshot.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn find_orderbook_snapshot(&self, market_id: &str, outcome: &str) -> anyhow::Result<Option<OrderbookSnapshot>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT market_id, outcome, bids_json, asks_json, expires_at
                 FROM orderbook_snapshots WHERE market_id = ?1 AND outcome = ?2",
                params![market_id, outcome],
                |row| {
                    let bids_json: String = row.get(2)?;
                    let asks_json: String = row.get(3)?;
                    let expires_at: String = row.get(4)?;
                    Ok(OrderbookSnapshot {
                        market_id: row.get(0)?,
                        outcome: row.get(1)?,
                        bids: serde_json::from_str::<Vec<PriceLevel>>(&bids_json).unwrap_or_default(),
                        asks: serde_json::from_str::<Vec<PriceLevel>>(&asks_json).unwrap_or_default(),
                        expires_at: parse_rfc3339(&expires_at).unwrap_or_else(Utc::now),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn insert_orderbook_event(&self, event: &OrderbookEvent) -> anyhow::Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO orderbook_events (id, market_id, outcome, ts, best_bid, best_ask, mid)
             VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![
                event.id,
                event.market_id,
                event.outcome,
                event.timestamp.to_rfc3339(),
                event.best_bid,
                event.best_ask,
                event.mid,
            ],
        )?;
        Ok(changed > 0)
    }

    fn insert_trade_event(&self, event: &TradeEvent) -> anyhow::Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO trade_events (id, market_id, outcome, ts, price, size)
             VALUES (?1,?2,?3,?4,?5,?6)",
            params![
                event.id,
                event.market_id,
                event.outcome,
                event.timestamp.to_rfc3339(),
                event.price,
                event.size,
            ],
        )?;
        Ok(changed > 0)
    }

    fn orderbook_events_range(
        &self,
        market_id: &str,
        outcome: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<OrderbookEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, market_id, outcome, ts, best_bid, best_ask, mid
             FROM orderbook_events WHERE market_id = ?1 AND outcome = ?2 AND ts >= ?3 AND ts <= ?4
             ORDER BY ts ASC",
        )?;
        let rows = stmt.query_map(
            params![market_id, outcome, from.to_rfc3339(), to.to_rfc3339()],
            map_orderbook_event_row,
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn trade_events_range(
        &self,
        market_id: &str,
        outcome: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> anyhow::Result<Vec<TradeEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, market_id, outcome, ts, price, size
             FROM trade_events WHERE market_id = ?1 AND outcome = ?2 AND ts >= ?3 AND ts <= ?4
             ORDER BY ts ASC",
        )?;
        let rows = stmt.query_map(
            params![market_id, outcome, from.to_rfc3339(), to.to_rfc3339()],
            map_trade_event_row,
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// The most recent event of either kind strictly before `before`,
    /// priced by mid > best_bid > best_ask for an orderbook event, else
    /// the trade price — whichever event is actually the latest, not
    /// whichever table happens to have one.
    fn last_event_before(
        &self,
        market_id: &str,
        outcome: &str,
        before: DateTime<Utc>,
    ) -> anyhow::Result<Option<f64>> {
        let conn = self.conn()?;
        let ob_row: Option<(String, Option<f64>)> = conn
            .query_row(
                "SELECT ts, COALESCE(mid, COALESCE(best_bid, best_ask)) FROM orderbook_events
                 WHERE market_id = ?1 AND outcome = ?2 AND ts < ?3
                 ORDER BY ts DESC LIMIT 1",
                params![market_id, outcome, before.to_rfc3339()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let trade_row: Option<(String, f64)> = conn
            .query_row(
                "SELECT ts, price FROM trade_events
                 WHERE market_id = ?1 AND outcome = ?2 AND ts < ?3
                 ORDER BY ts DESC LIMIT 1",
                params![market_id, outcome, before.to_rfc3339()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match (ob_row, trade_row) {
            (Some((ob_ts, ob_price)), Some((trade_ts, trade_price))) => {
                if ob_ts >= trade_ts {
                    Ok(ob_price.or(Some(trade_price)))
                } else {
                    Ok(Some(trade_price))
                }
            }
            (Some((_, ob_price)), None) => Ok(ob_price),
            (None, Some((_, trade_price))) => Ok(Some(trade_price)),
            (None, None) => Ok(None),
        }
    }
}

fn map_orderbook_event_row(row: &rusqlite::Row) -> rusqlite::Result<OrderbookEvent> {
    let ts: String = row.get(3)?;
    Ok(OrderbookEvent {
        id: row.get(0)?,
        market_id: row.get(1)?,
        outcome: row.get(2)?,
        timestamp: parse_rfc3339(&ts).unwrap_or_else(Utc::now),
        best_bid: row.get(4)?,
        best_ask: row.get(5)?,
        mid: row.get(6)?,
    })
}

fn map_trade_event_row(row: &rusqlite::Row) -> rusqlite::Result<TradeEvent> {
    let ts: String = row.get(3)?;
    Ok(TradeEvent {
        id: row.get(0)?,
        market_id: row.get(1)?,
        outcome: row.get(2)?,
        timestamp: parse_rfc3339(&ts).unwrap_or_else(Utc::now),
        price: row.get(4)?,
        size: row.get(5)?,
    })
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
