//! AP_CONCENTRATION: flags ETFs whose authorized-participant creation/
//! redemption flow is concentrated in few counterparties — a redemption
//! by the dominant AP can force disorderly unwind.

use super::generator::{GenerationContext, SignalGenerator};
use crate::models::{GeneratedSignal, InstrumentType, MetricSourceType, SignalEvidence, SignalType};
use crate::store::{InstrumentRepository, MetricRepository};
use async_trait::async_trait;

/// HHI above this (0..=10000 scale) is considered concentrated.
const HHI_THRESHOLD: f64 = 2500.0;
const TOP_AP_SHARE_THRESHOLD: f64 = 0.40;
const SIGNAL_TTL_DAYS: i64 = 7;

pub struct ApConcentrationGenerator;

#[async_trait]
impl SignalGenerator for ApConcentrationGenerator {
    fn name(&self) -> &str {
        "ap_concentration"
    }

    fn signal_type(&self) -> SignalType {
        SignalType::ApConcentration
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
                MetricSourceType::Creation,
                context.lookback_days,
            )?;
            let Some(latest) = metrics.last() else {
                continue;
            };
            let (Some(hhi), Some(top_share)) = (latest.ap_concentration_hhi, latest.top_ap_share) else {
                continue;
            };

            if hhi < HHI_THRESHOLD && top_share < TOP_AP_SHARE_THRESHOLD {
                continue;
            }

            let score = (hhi / 10_000.0 * 100.0).clamp(0.0, 100.0);
            let confidence = (0.5 + top_share.min(1.0) * 0.45).clamp(0.0, 0.95);

            out.push(GeneratedSignal {
                instrument_id: instrument.id.clone(),
                signal_type: SignalType::ApConcentration,
                score,
                confidence,
                reason: format!(
                    "authorized-participant concentration hhi={hhi:.0} top_ap_share={top_share:.2}"
                ),
                evidence: vec![SignalEvidence::ApConcentration {
                    hhi,
                    top_ap_share: top_share,
                }],
                ttl_days: SIGNAL_TTL_DAYS,
            });
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hhi_threshold_flags_concentrated_book() {
        assert!(3000.0 >= HHI_THRESHOLD);
        assert!(0.1 < TOP_AP_SHARE_THRESHOLD);
    }
}
