use super::Store;
use crate::models::Market;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;

pub trait MarketRepository {
    fn find_market(&self, condition_id: &str) -> anyhow::Result<Option<Market>>;
    fn list_markets(&self, active_only: bool, limit: i64, offset: i64) -> anyhow::Result<(Vec<Market>, i64)>;
    fn list_all_market_ids(&self) -> anyhow::Result<Vec<String>>;
    fn upsert_market(&self, market: &Market) -> anyhow::Result<()>;
}

impl MarketRepository for Store {
    fn find_market(&self, condition_id: &str) -> anyhow::Result<Option<Market>> {
        let conn = self.conn()?;
        let market = conn
            .query_row(
                "SELECT condition_id, question, outcomes_json, outcome_tokens_json, expiry,
                        last_prices_json, liquidity, volume, active, last_updated_block,
                        created_at, updated_at
                 FROM markets WHERE condition_id = ?1",
                params![condition_id],
                map_market_row,
            )
            .optional()?;
        Ok(market)
    }

    fn list_markets(&self, active_only: bool, limit: i64, offset: i64) -> anyhow::Result<(Vec<Market>, i64)> {
        let conn = self.conn()?;
        let where_clause = if active_only { "WHERE active = 1" } else { "" };

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM markets {where_clause}"),
            [],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT condition_id, question, outcomes_json, outcome_tokens_json, expiry,
                    last_prices_json, liquidity, volume, active, last_updated_block,
                    created_at, updated_at
             FROM markets {where_clause} ORDER BY updated_at DESC LIMIT ?1 OFFSET ?2"
        ))?;
        let rows = stmt.query_map(params![limit, offset], map_market_row)?;
        let mut markets = Vec::new();
        for row in rows {
            markets.push(row?);
        }
        Ok((markets, total))
    }

    fn list_all_market_ids(&self) -> anyhow::Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT condition_id FROM markets WHERE active = 1")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn upsert_market(&self, market: &Market) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO markets (
                condition_id, question, outcomes_json, outcome_tokens_json, expiry,
                last_prices_json, liquidity, volume, active, last_updated_block,
                created_at, updated_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)
             ON CONFLICT(condition_id) DO UPDATE SET
                question = excluded.question,
                outcome_tokens_json = CASE
                    WHEN markets.outcome_tokens_json = '{}' THEN excluded.outcome_tokens_json
                    ELSE markets.outcome_tokens_json
                END,
                expiry = excluded.expiry,
                last_prices_json = excluded.last_prices_json,
                liquidity = excluded.liquidity,
                volume = excluded.volume,
                active = excluded.active,
                last_updated_block = excluded.last_updated_block,
                updated_at = excluded.updated_at",
            params![
                market.condition_id,
                market.question,
                serde_json::to_string(&market.outcomes)?,
                serde_json::to_string(&market.outcome_tokens)?,
                market.expiry.map(|d| d.to_rfc3339()),
                serde_json::to_string(&market.last_prices)?,
                market.liquidity,
                market.volume,
                market.active as i64,
                market.last_updated_block,
                market.created_at.to_rfc3339(),
                market.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

fn map_market_row(row: &rusqlite::Row) -> rusqlite::Result<Market> {
    let outcomes_json: String = row.get(2)?;
    let outcome_tokens_json: String = row.get(3)?;
    let expiry: Option<String> = row.get(4)?;
    let last_prices_json: String = row.get(5)?;
    let created_at: String = row.get(10)?;
    let updated_at: String = row.get(11)?;

    Ok(Market {
        condition_id: row.get(0)?,
        question: row.get(1)?,
        outcomes: serde_json::from_str(&outcomes_json).unwrap_or_default(),
        outcome_tokens: serde_json::from_str::<HashMap<String, String>>(&outcome_tokens_json)
            .unwrap_or_default(),
        expiry: expiry.and_then(|s| parse_rfc3339(&s)),
        last_prices: serde_json::from_str(&last_prices_json).unwrap_or_default(),
        liquidity: row.get(6)?,
        volume: row.get(7)?,
        active: row.get::<_, i64>(8)? != 0,
        last_updated_block: row.get(9)?,
        created_at: parse_rfc3339(&created_at).unwrap_or_else(Utc::now),
        updated_at: parse_rfc3339(&updated_at).unwrap_or_else(Utc::now),
    })
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
