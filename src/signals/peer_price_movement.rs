//! PEER_PRICE_MOVEMENT: when an instrument has a large recent price
//! move, flag its competitors — a move in one name is often informative
//! about the others even before their own price reacts.

use super::generator::{GenerationContext, SignalGenerator};
use crate::models::{CandleInterval, GeneratedSignal, SignalEvidence, SignalType};
use crate::store::{CandleRepository, InstrumentRepository, RelationshipRepository};
use async_trait::async_trait;
use chrono::Duration;

const MOVE_THRESHOLD_PCT: f64 = 5.0;
const SIGNAL_TTL_DAYS: i64 = 2;

pub struct PeerPriceMovementGenerator;

#[async_trait]
impl SignalGenerator for PeerPriceMovementGenerator {
    fn name(&self) -> &str {
        "peer_price_movement"
    }

    fn signal_type(&self) -> SignalType {
        SignalType::PeerPriceMovement
    }

    async fn generate(&self, context: &GenerationContext) -> anyhow::Result<Vec<GeneratedSignal>> {
        let instruments = context.ctx.store.list_active_instruments()?;
        let window_start = context.now - Duration::hours(24);
        let mut out = Vec::new();

        for instrument in &instruments {
            let candles = context.ctx.store.find_candles(
                &instrument.id,
                CandleInterval::OneHour,
                window_start,
                context.now,
            )?;
            let (Some(first), Some(last)) = (candles.first(), candles.last()) else {
                continue;
            };
            if first.open == 0.0 {
                continue;
            }
            let move_pct = (last.close - first.open) / first.open * 100.0;
            if move_pct.abs() < MOVE_THRESHOLD_PCT {
                continue;
            }

            let competitors = context.ctx.store.competitors_of(&instrument.id)?;
            for competitor in competitors {
                let score = (move_pct.abs() / 20.0 * 100.0).clamp(0.0, 100.0);
                let confidence = (0.5 * competitor.confidence).clamp(0.0, 0.95);

                out.push(GeneratedSignal {
                    instrument_id: competitor.related_instrument_id.clone(),
                    signal_type: SignalType::PeerPriceMovement,
                    score,
                    confidence,
                    reason: format!(
                        "competitor {} moved {move_pct:.1}% over the trailing 24h",
                        instrument.symbol
                    ),
                    evidence: vec![SignalEvidence::PeerPriceMovement {
                        peer_instrument_id: instrument.id.clone(),
                        move_pct,
                    }],
                    ttl_days: SIGNAL_TTL_DAYS,
                });
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_threshold_is_a_meaningful_percent() {
        assert!(MOVE_THRESHOLD_PCT > 0.0 && MOVE_THRESHOLD_PCT < 100.0);
    }
}
