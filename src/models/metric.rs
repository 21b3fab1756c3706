use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricSourceType {
    Nav,
    Holdings,
    Flow,
    Creation,
}

impl MetricSourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricSourceType::Nav => "nav",
            MetricSourceType::Holdings => "holdings",
            MetricSourceType::Flow => "flow",
            MetricSourceType::Creation => "creation",
        }
    }
}

/// Daily ETF structural metric snapshot. Unique on
/// (instrument_id, as_of_date, source_type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub id: String,
    pub instrument_id: String,
    pub as_of_date: NaiveDate,
    pub source_type: MetricSourceType,
    pub nav: Option<f64>,
    pub market_price: Option<f64>,
    pub premium_discount_bps: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub net_flow: Option<f64>,
    /// Herfindahl-Hirschman index over authorized-participant creation
    /// unit share, 0..=10000.
    pub ap_concentration_hhi: Option<f64>,
    pub top_ap_share: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Metric {
    pub fn natural_key(instrument_id: &str, as_of_date: NaiveDate, source_type: MetricSourceType) -> String {
        format!("{instrument_id}:{as_of_date}:{}", source_type.as_str())
    }

    /// Premium/discount in bps: (market_price - nav) / nav * 10_000.
    pub fn compute_premium_discount_bps(nav: f64, market_price: f64) -> Option<f64> {
        if nav == 0.0 {
            return None;
        }
        Some((market_price - nav) / nav * 10_000.0)
    }
}
