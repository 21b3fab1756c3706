//! FLOW_SHOCK: flags an ETF whose most recent net creation/redemption
//! flow is a statistical outlier against its own trailing distribution.

use super::generator::{GenerationContext, SignalGenerator};
use crate::models::{GeneratedSignal, InstrumentType, MetricSourceType, SignalEvidence, SignalType};
use crate::store::{InstrumentRepository, MetricRepository};
use async_trait::async_trait;

const Z_SCORE_THRESHOLD: f64 = 2.5;
const MIN_SAMPLES: usize = 10;
const SIGNAL_TTL_DAYS: i64 = 3;

pub struct FlowShockGenerator;

#[async_trait]
impl SignalGenerator for FlowShockGenerator {
    fn name(&self) -> &str {
        "flow_shock"
    }

    fn signal_type(&self) -> SignalType {
        SignalType::FlowShock
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
                MetricSourceType::Flow,
                context.lookback_days,
            )?;
            let flows: Vec<f64> = metrics.iter().filter_map(|m| m.net_flow).collect();
            if flows.len() < MIN_SAMPLES {
                continue;
            }

            let (history, latest) = flows.split_at(flows.len() - 1);
            let latest = latest[0];
            let Some(z) = z_score(history, latest) else {
                continue;
            };

            if z.abs() < Z_SCORE_THRESHOLD {
                continue;
            }

            let score = (z.abs() / 4.0 * 100.0).clamp(0.0, 100.0);
            let confidence = (0.5 + (z.abs() - Z_SCORE_THRESHOLD) * 0.08).clamp(0.0, 0.95);

            out.push(GeneratedSignal {
                instrument_id: instrument.id.clone(),
                signal_type: SignalType::FlowShock,
                score,
                confidence,
                reason: format!("net flow z-score {z:.2} against {}-day trailing window", history.len()),
                evidence: vec![SignalEvidence::FlowShock {
                    flow_zscore: z,
                    window_days: history.len() as u32,
                }],
                ttl_days: SIGNAL_TTL_DAYS,
            });
        }

        Ok(out)
    }
}

fn z_score(history: &[f64], latest: f64) -> Option<f64> {
    let n = history.len() as f64;
    if n == 0.0 {
        return None;
    }
    let mean = history.iter().sum::<f64>() / n;
    let variance = history.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    if stddev == 0.0 {
        return None;
    }
    Some((latest - mean) / stddev)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn z_score_detects_outlier_flow_day() {
        let history = vec![10.0, 12.0, 9.0, 11.0, 10.0, 11.0, 9.0, 10.0, 12.0, 10.0];
        let z = z_score(&history, 80.0).unwrap();
        assert!(z > Z_SCORE_THRESHOLD);
    }

    #[test]
    fn z_score_none_when_flat_history() {
        let history = vec![5.0; 10];
        assert!(z_score(&history, 5.0).is_none());
    }
}
