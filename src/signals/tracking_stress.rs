//! TRACKING_STRESS: flags an ETF trading at a persistent premium or
//! discount to NAV — a multi-day condition, not a single noisy print.

use super::generator::{GenerationContext, SignalGenerator};
use crate::models::{GeneratedSignal, InstrumentType, MetricSourceType, SignalEvidence, SignalType};
use crate::store::{InstrumentRepository, MetricRepository};
use async_trait::async_trait;

const BPS_THRESHOLD: f64 = 50.0;
const MIN_CONSECUTIVE_DAYS: u32 = 3;
const SIGNAL_TTL_DAYS: i64 = 5;

pub struct TrackingStressGenerator;

#[async_trait]
impl SignalGenerator for TrackingStressGenerator {
    fn name(&self) -> &str {
        "tracking_stress"
    }

    fn signal_type(&self) -> SignalType {
        SignalType::TrackingStress
    }

    async fn generate(&self, context: &GenerationContext) -> anyhow::Result<Vec<GeneratedSignal>> {
        let instruments = context.ctx.store.list_active_instruments()?;
        let mut out = Vec::new();

        for instrument in instruments {
            if instrument.instrument_type != InstrumentType::Etf {
                continue;
            }

            let metrics = context.ctx.store.recent_metrics(
                &instrument.id,
                MetricSourceType::Nav,
                context.lookback_days,
            )?;
            let bps_series: Vec<f64> = metrics.iter().filter_map(|m| m.premium_discount_bps).collect();
            let Some((consecutive, latest_bps)) = trailing_stress_run(&bps_series) else {
                continue;
            };
            if consecutive < MIN_CONSECUTIVE_DAYS {
                continue;
            }

            let score = ((latest_bps.abs() / 200.0) * 100.0).clamp(0.0, 100.0);
            let confidence = (0.5 + (consecutive as f64 - MIN_CONSECUTIVE_DAYS as f64) * 0.05).clamp(0.0, 0.95);

            out.push(GeneratedSignal {
                instrument_id: instrument.id.clone(),
                signal_type: SignalType::TrackingStress,
                score,
                confidence,
                reason: format!(
                    "{consecutive} consecutive days beyond {BPS_THRESHOLD} bps premium/discount, latest {latest_bps:.1} bps"
                ),
                evidence: vec![SignalEvidence::TrackingStress {
                    premium_discount_bps: latest_bps,
                    consecutive_days: consecutive,
                }],
                ttl_days: SIGNAL_TTL_DAYS,
            });
        }

        Ok(out)
    }
}

/// Counts the run of trailing days (ending at the series' last element)
/// whose |bps| exceeds the threshold, all on the same side (premium or
/// discount) as the latest day.
fn trailing_stress_run(bps_series: &[f64]) -> Option<(u32, f64)> {
    let latest = *bps_series.last()?;
    if latest.abs() < BPS_THRESHOLD {
        return None;
    }
    let sign = latest.signum();
    let mut count = 0u32;
    for &bps in bps_series.iter().rev() {
        if bps.abs() >= BPS_THRESHOLD && bps.signum() == sign {
            count += 1;
        } else {
            break;
        }
    }
    Some((count, latest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_stress_run_counts_same_sided_streak() {
        let series = vec![10.0, -60.0, -70.0, -80.0];
        let (count, latest) = trailing_stress_run(&series).unwrap();
        assert_eq!(count, 3);
        assert_eq!(latest, -80.0);
    }

    #[test]
    fn trailing_stress_run_none_when_latest_under_threshold() {
        let series = vec![-80.0, -90.0, 10.0];
        assert!(trailing_stress_run(&series).is_none());
    }

    #[test]
    fn trailing_stress_run_breaks_on_sign_flip() {
        let series = vec![80.0, -90.0, -95.0];
        let (count, _) = trailing_stress_run(&series).unwrap();
        assert_eq!(count, 2);
    }
}
