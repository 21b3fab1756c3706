use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleInterval {
    OneSecond,
    FiveSeconds,
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
}

impl CandleInterval {
    pub fn millis(self) -> i64 {
        match self {
            CandleInterval::OneSecond => 1_000,
            CandleInterval::FiveSeconds => 5_000,
            CandleInterval::OneMinute => 60_000,
            CandleInterval::FiveMinutes => 5 * 60_000,
            CandleInterval::FifteenMinutes => 15 * 60_000,
            CandleInterval::OneHour => 60 * 60_000,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1s" => Some(CandleInterval::OneSecond),
            "5s" => Some(CandleInterval::FiveSeconds),
            "1m" => Some(CandleInterval::OneMinute),
            "5m" => Some(CandleInterval::FiveMinutes),
            "15m" => Some(CandleInterval::FifteenMinutes),
            "1h" => Some(CandleInterval::OneHour),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CandleInterval::OneSecond => "1s",
            CandleInterval::FiveSeconds => "5s",
            CandleInterval::OneMinute => "1m",
            CandleInterval::FiveMinutes => "5m",
            CandleInterval::FifteenMinutes => "15m",
            CandleInterval::OneHour => "1h",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleSource {
    /// Materialized, instrument-indexed candle from an external
    /// historical source.
    Historical,
    /// Computed on demand from the market event log.
    Derived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub interval: CandleInterval,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub source: CandleSource,
    /// Set only for forward-filled bars: open==high==low==close, volume==0.
    pub forward_filled: bool,
}
