use super::Store;
use crate::models::{Metric, MetricSourceType};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;

pub trait MetricRepository {
    fn upsert_metric(&self, metric: &Metric) -> anyhow::Result<()>;
    fn recent_metrics(
        &self,
        instrument_id: &str,
        source_type: MetricSourceType,
        lookback_days: i64,
    ) -> anyhow::Result<Vec<Metric>>;
}

impl MetricRepository for Store {
    fn upsert_metric(&self, metric: &Metric) -> anyhow::Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO etf_metrics (
                id, instrument_id, as_of_date, source_type, nav, market_price,
                premium_discount_bps, shares_outstanding, net_flow,
                ap_concentration_hhi, top_ap_share, created_at
             ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)
             ON CONFLICT(instrument_id, as_of_date, source_type) DO UPDATE SET
                nav = excluded.nav,
                market_price = excluded.market_price,
                premium_discount_bps = excluded.premium_discount_bps,
                shares_outstanding = excluded.shares_outstanding,
                net_flow = excluded.net_flow,
                ap_concentration_hhi = excluded.ap_concentration_hhi,
                top_ap_share = excluded.top_ap_share",
            params![
                metric.id,
                metric.instrument_id,
                metric.as_of_date.to_string(),
                metric.source_type.as_str(),
                metric.nav,
                metric.market_price,
                metric.premium_discount_bps,
                metric.shares_outstanding,
                metric.net_flow,
                metric.ap_concentration_hhi,
                metric.top_ap_share,
                metric.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn recent_metrics(
        &self,
        instrument_id: &str,
        source_type: MetricSourceType,
        lookback_days: i64,
    ) -> anyhow::Result<Vec<Metric>> {
        let conn = self.conn()?;
        let cutoff = (Utc::now() - chrono::Duration::days(lookback_days))
            .date_naive()
            .to_string();
        let mut stmt = conn.prepare(
            "SELECT id, instrument_id, as_of_date, source_type, nav, market_price,
                    premium_discount_bps, shares_outstanding, net_flow,
                    ap_concentration_hhi, top_ap_share, created_at
             FROM etf_metrics
             WHERE instrument_id = ?1 AND source_type = ?2 AND as_of_date >= ?3
             ORDER BY as_of_date ASC",
        )?;
        let rows = stmt.query_map(
            params![instrument_id, source_type.as_str(), cutoff],
            map_metric_row,
        )?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn map_metric_row(row: &rusqlite::Row) -> rusqlite::Result<Metric> {
    let as_of_date: String = row.get(2)?;
    let source_type: String = row.get(3)?;
    let created_at: String = row.get(11)?;
    Ok(Metric {
        id: row.get(0)?,
        instrument_id: row.get(1)?,
        as_of_date: NaiveDate::parse_from_str(&as_of_date, "%Y-%m-%d")
            .unwrap_or_else(|_| Utc::now().date_naive()),
        source_type: parse_source_type(&source_type),
        nav: row.get(4)?,
        market_price: row.get(5)?,
        premium_discount_bps: row.get(6)?,
        shares_outstanding: row.get(7)?,
        net_flow: row.get(8)?,
        ap_concentration_hhi: row.get(9)?,
        top_ap_share: row.get(10)?,
        created_at: parse_rfc3339(&created_at).unwrap_or_else(Utc::now),
    })
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_source_type(s: &str) -> MetricSourceType {
    match s {
        "holdings" => MetricSourceType::Holdings,
        "flow" => MetricSourceType::Flow,
        "creation" => MetricSourceType::Creation,
        _ => MetricSourceType::Nav,
    }
}
