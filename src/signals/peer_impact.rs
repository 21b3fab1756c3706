//! PEER_IMPACT: cross-entity propagation. Reads active base signals of a
//! propagatable type, finds each source instrument's competitors, and
//! decays confidence by a fixed factor times the relationship
//! confidence. Duplicate-guarded so a second pass over the same source
//! signal never spawns a second PEER_IMPACT.

use super::generator::{GenerationContext, SignalGenerator};
use crate::models::{GeneratedSignal, Severity, SignalEvidence, SignalType};
use crate::store::{RelationshipRepository, SignalRepository};
use async_trait::async_trait;

/// Fixed cross-entity decay applied on top of the relationship's own
/// confidence.
const DECAY_FACTOR: f64 = 0.8;
const SIGNAL_TTL_DAYS: i64 = 5;

const PROPAGATABLE_TYPES: &[SignalType] = &[
    SignalType::DilutionRisk,
    SignalType::ToxicFinancing,
    SignalType::GoingConcernDistress,
];

pub struct PeerImpactGenerator;

#[async_trait]
impl SignalGenerator for PeerImpactGenerator {
    fn name(&self) -> &str {
        "peer_impact"
    }

    fn signal_type(&self) -> SignalType {
        SignalType::PeerImpact
    }

    async fn generate(&self, context: &GenerationContext) -> anyhow::Result<Vec<GeneratedSignal>> {
        let mut out = Vec::new();

        for &source_type in PROPAGATABLE_TYPES {
            debug_assert!(source_type.is_propagatable());
            let source_signals = context.ctx.store.active_signals_by_type(source_type)?;

            for source in source_signals {
                let competitors = context.ctx.store.competitors_of(&source.instrument_id)?;
                for competitor in competitors {
                    if context
                        .ctx
                        .store
                        .has_peer_impact_from(&competitor.related_instrument_id, &source.id)?
                    {
                        continue;
                    }

                    let confidence =
                        (DECAY_FACTOR * competitor.confidence * source.confidence).clamp(0.0, 0.95);
                    let score = (source.score * DECAY_FACTOR * competitor.confidence).clamp(0.0, 100.0);

                    out.push(GeneratedSignal {
                        instrument_id: competitor.related_instrument_id.clone(),
                        signal_type: SignalType::PeerImpact,
                        score,
                        confidence,
                        reason: format!(
                            "competitor exposure to {} ({:?}) on {}",
                            source.signal_type.as_str(),
                            Severity::from_score_confidence(source.score, source.confidence),
                            source.instrument_id
                        ),
                        evidence: vec![SignalEvidence::PropagatedSignal {
                            source_signal_id: source.id.clone(),
                            source_instrument_id: source.instrument_id.clone(),
                            source_signal_type: source.signal_type,
                            decay_factor: DECAY_FACTOR,
                        }],
                        ttl_days: SIGNAL_TTL_DAYS,
                    });
                }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propagatable_types_match_signal_type_flag() {
        for t in PROPAGATABLE_TYPES {
            assert!(t.is_propagatable());
        }
        assert!(!SignalType::FlowShock.is_propagatable());
    }
}
