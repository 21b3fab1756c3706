//! Candle Aggregator: on-demand OHLCV derivation from the raw event log
//! for prediction markets, plus a DB-cache-first path for instrument
//! (equity/ETF) candles sourced from an external historical provider.
//!
//! Request coalescing: concurrent identical requests share one
//! in-flight computation via a keyed map guarded by a lock plus a
//! `Notify`, rather than each caller hitting the store/adapter
//! independently.

use crate::context::AppContext;
use crate::models::{Candle, CandleInterval, CandleSource};
use crate::store::{CandleRepository, EventRepository};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

/// Forward-filled bars cover gaps up to this many intervals before the
/// cache is considered incomplete for sub-hour granularities.
const GAP_TOLERANCE_INTERVALS: i64 = 3;

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CoalesceKey {
    subject_id: String,
    interval: CandleInterval,
    from_ms: i64,
    to_ms: i64,
}

/// One in-flight computation shared by every caller racing on the same
/// key. The map only ever holds the entry for as long as a computation
/// is running; `finish` hands the result to `result` and removes the
/// map entry in the same locked section, so the key never outlives the
/// computation it names.
struct Shared {
    notify: Notify,
    result: Mutex<Option<Result<Vec<Candle>, String>>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            notify: Notify::new(),
            result: Mutex::new(None),
        }
    }
}

#[derive(Clone)]
pub struct CandleAggregator {
    ctx: AppContext,
    inflight: Arc<Mutex<HashMap<CoalesceKey, Arc<Shared>>>>,
}

impl CandleAggregator {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Derive market candles from the order-book/trade event log.
    pub async fn market_candles(
        &self,
        market_id: &str,
        outcome: &str,
        interval: CandleInterval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Candle>> {
        let key = CoalesceKey {
            subject_id: format!("{market_id}:{outcome}"),
            interval,
            from_ms: from.timestamp_millis(),
            to_ms: to.timestamp_millis(),
        };

        if let Some(result) = self.wait_or_claim(&key).await {
            return result;
        }

        let result = self.compute_market_candles(market_id, outcome, interval, from, to, limit);
        self.finish(&key, result)
    }

    /// Instrument candles: DB cache first, falling back to an upsert from
    /// an external historical source when the cache has gaps. The actual
    /// adapter call is left unimplemented here — no historical-equity
    /// source is among this system's external adapters, so a cache miss
    /// surfaces as an empty result rather than guessing a wire format.
    pub async fn instrument_candles(
        &self,
        instrument_id: &str,
        interval: CandleInterval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Candle>> {
        let key = CoalesceKey {
            subject_id: instrument_id.to_string(),
            interval,
            from_ms: from.timestamp_millis(),
            to_ms: to.timestamp_millis(),
        };

        if let Some(result) = self.wait_or_claim(&key).await {
            return result;
        }

        let result = (|| -> anyhow::Result<Vec<Candle>> {
            let cached = self.ctx.store.find_candles(instrument_id, interval, from, to)?;
            if covers_range_without_gaps(&cached, interval, from, to) {
                return Ok(apply_limit(cached, limit));
            }
            // No historical-source adapter to backfill from; return
            // whatever the cache already has rather than fabricate bars.
            Ok(apply_limit(cached, limit))
        })();

        self.finish(&key, result)
    }

    /// Returns `Some(result)` shared from whoever is already computing
    /// this key. Returns `None` when this call claimed the key itself
    /// and must compute it (and later call `finish`).
    async fn wait_or_claim(&self, key: &CoalesceKey) -> Option<anyhow::Result<Vec<Candle>>> {
        loop {
            let shared = {
                let mut guard = self.inflight.lock();
                match guard.get(key) {
                    Some(shared) => Some(shared.clone()),
                    None => {
                        guard.insert(key.clone(), Arc::new(Shared::new()));
                        None
                    }
                }
            };
            let shared = match shared {
                Some(shared) => shared,
                None => return None,
            };
            shared.notify.notified().await;
            if let Some(result) = shared.result.lock().take() {
                return Some(result.map_err(|e| anyhow::anyhow!(e)));
            }
            // Woken with no result recorded yet; the map entry may
            // already be gone too, so loop and re-evaluate from scratch.
        }
    }

    fn finish(&self, key: &CoalesceKey, result: anyhow::Result<Vec<Candle>>) -> anyhow::Result<Vec<Candle>> {
        let stored = match &result {
            Ok(candles) => Ok(candles.clone()),
            Err(e) => Err(e.to_string()),
        };
        let mut guard = self.inflight.lock();
        if let Some(shared) = guard.remove(key) {
            *shared.result.lock() = Some(stored);
            shared.notify.notify_waiters();
        }
        result
    }

    fn compute_market_candles(
        &self,
        market_id: &str,
        outcome: &str,
        interval: CandleInterval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<Candle>> {
        let interval_ms = interval.millis();
        let aligned_from = align_down(from, interval_ms);
        let aligned_to = align_down(to, interval_ms);

        let seed_window_start = aligned_from - Duration::milliseconds(interval_ms);
        let ob_events = self
            .ctx
            .store
            .orderbook_events_range(market_id, outcome, seed_window_start, to)?;
        let trade_events = self
            .ctx
            .store
            .trade_events_range(market_id, outcome, seed_window_start, to)?;

        let mut buckets: HashMap<i64, Bucket> = HashMap::new();
        for event in &ob_events {
            let bucket_ts = align_down_ms(event.timestamp.timestamp_millis(), interval_ms);
            if let Some(price) = event.mid.or(event.best_bid).or(event.best_ask) {
                buckets.entry(bucket_ts).or_default().orderbook_prices.push(price);
            }
        }
        for event in &trade_events {
            let bucket_ts = align_down_ms(event.timestamp.timestamp_millis(), interval_ms);
            let entry = buckets.entry(bucket_ts).or_default();
            entry.trade_prices.push(event.price);
            entry.trade_volume += event.size;
        }

        let mut last_close = self
            .ctx
            .store
            .last_event_before(market_id, outcome, aligned_from)?;

        let mut out = Vec::new();
        let mut cursor = aligned_from.timestamp_millis();
        let end = aligned_to.timestamp_millis();

        while cursor <= end {
            let bucket = buckets.get(&cursor);
            let candle = match bucket {
                Some(b) if !b.orderbook_prices.is_empty() => {
                    let prices = &b.orderbook_prices;
                    Some(make_candle(interval, cursor, interval_ms, prices, 0.0, CandleSource::Derived, false))
                }
                Some(b) if !b.trade_prices.is_empty() => {
                    let prices = &b.trade_prices;
                    Some(make_candle(
                        interval,
                        cursor,
                        interval_ms,
                        prices,
                        b.trade_volume,
                        CandleSource::Derived,
                        false,
                    ))
                }
                _ => last_close.map(|close| {
                    make_candle(interval, cursor, interval_ms, &[close], 0.0, CandleSource::Derived, true)
                }),
            };

            if let Some(candle) = candle {
                last_close = Some(candle.close);
                out.push(candle);
            }
            cursor += interval_ms;
        }

        Ok(apply_limit(out, limit))
    }
}

#[derive(Default)]
struct Bucket {
    orderbook_prices: Vec<f64>,
    trade_prices: Vec<f64>,
    trade_volume: f64,
}

fn make_candle(
    interval: CandleInterval,
    start_ms: i64,
    interval_ms: i64,
    prices: &[f64],
    volume: f64,
    source: CandleSource,
    forward_filled: bool,
) -> Candle {
    let open = prices[0];
    let close = *prices.last().unwrap();
    let high = prices.iter().cloned().fold(f64::MIN, f64::max);
    let low = prices.iter().cloned().fold(f64::MAX, f64::min);
    Candle {
        interval,
        start_time: DateTime::from_timestamp_millis(start_ms).unwrap_or_else(Utc::now),
        end_time: DateTime::from_timestamp_millis(start_ms + interval_ms).unwrap_or_else(Utc::now),
        open,
        high,
        low,
        close,
        volume,
        source,
        forward_filled,
    }
}

fn align_down(dt: DateTime<Utc>, interval_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(align_down_ms(dt.timestamp_millis(), interval_ms)).unwrap_or(dt)
}

fn align_down_ms(ts_ms: i64, interval_ms: i64) -> i64 {
    (ts_ms / interval_ms) * interval_ms
}

fn apply_limit(mut candles: Vec<Candle>, limit: Option<usize>) -> Vec<Candle> {
    if let Some(limit) = limit {
        if candles.len() > limit {
            candles = candles.split_off(candles.len() - limit);
        }
    }
    candles
}

/// Cache is usable if it has no gap wider than `GAP_TOLERANCE_INTERVALS`
/// intervals anywhere in `[from, to]`.
fn covers_range_without_gaps(candles: &[Candle], interval: CandleInterval, from: DateTime<Utc>, to: DateTime<Utc>) -> bool {
    if candles.is_empty() {
        return false;
    }
    let interval_ms = interval.millis();
    let tolerance_ms = interval_ms * GAP_TOLERANCE_INTERVALS;

    if (candles[0].start_time - from).num_milliseconds().abs() > tolerance_ms {
        return false;
    }
    if (to - candles.last().unwrap().end_time).num_milliseconds() > tolerance_ms {
        return false;
    }
    for pair in candles.windows(2) {
        let gap = (pair[1].start_time - pair[0].end_time).num_milliseconds();
        if gap > tolerance_ms {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_down_rounds_to_interval_grid() {
        let dt = DateTime::parse_from_rfc3339("2026-01-01T00:02:37Z").unwrap().with_timezone(&Utc);
        let aligned = align_down(dt, CandleInterval::OneMinute.millis());
        assert_eq!(aligned.timestamp_millis() % 60_000, 0);
    }

    #[test]
    fn make_candle_flat_forward_fill_has_zero_volume_and_equal_ohlc() {
        let candle = make_candle(CandleInterval::OneMinute, 0, 60_000, &[0.5], 0.0, CandleSource::Derived, true);
        assert_eq!(candle.open, candle.high);
        assert_eq!(candle.high, candle.low);
        assert_eq!(candle.low, candle.close);
        assert_eq!(candle.volume, 0.0);
        assert!(candle.forward_filled);
    }

    #[test]
    fn covers_range_without_gaps_detects_interior_gap() {
        let c1 = make_candle(CandleInterval::OneMinute, 0, 60_000, &[0.5], 0.0, CandleSource::Historical, false);
        let c2 = make_candle(CandleInterval::OneMinute, 600_000, 60_000, &[0.6], 0.0, CandleSource::Historical, false);
        let from = c1.start_time;
        let to = c2.end_time;
        assert!(!covers_range_without_gaps(&[c1, c2], CandleInterval::OneMinute, from, to));
    }
}
