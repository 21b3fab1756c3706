//! Signal generators: deterministic rule evaluators over metrics/facts/
//! signals that each produce zero or more `GeneratedSignal`s, upserted by
//! the wrapping job on (instrumentId, signalType).

pub mod ap_concentration;
pub mod flow_shock;
pub mod generator;
pub mod peer_impact;
pub mod peer_price_movement;
pub mod tracking_stress;

pub use generator::{GenerationContext, SignalGenerator};

use crate::context::AppContext;
use crate::models::GeneratedSignal;
use crate::store::SignalRepository;
use tracing::{error, info};
use uuid::Uuid;

/// All generators currently wired into the periodic signal-computation job.
pub fn all_generators() -> Vec<Box<dyn SignalGenerator>> {
    vec![
        Box::new(ap_concentration::ApConcentrationGenerator),
        Box::new(flow_shock::FlowShockGenerator),
        Box::new(tracking_stress::TrackingStressGenerator),
        Box::new(peer_price_movement::PeerPriceMovementGenerator),
        Box::new(peer_impact::PeerImpactGenerator),
    ]
}

/// Runs every generator once and upserts whatever it returns. One
/// generator's failure is logged and does not block the others.
pub async fn run_all(ctx: &AppContext) -> anyhow::Result<usize> {
    let generation_ctx = GenerationContext::new(ctx.clone());
    let mut total = 0usize;

    for generator in all_generators() {
        match generator.generate(&generation_ctx).await {
            Ok(signals) => {
                total += upsert_all(ctx, signals)?;
            }
            Err(e) => {
                error!(generator = generator.name(), error = %e, "signal generator failed");
            }
        }
    }

    info!(count = total, "signal computation pass complete");
    Ok(total)
}

fn upsert_all(ctx: &AppContext, generated: Vec<GeneratedSignal>) -> anyhow::Result<usize> {
    let now = chrono::Utc::now();
    let mut count = 0usize;
    for g in generated {
        let signal = g.into_signal(Uuid::new_v4().to_string(), now);
        ctx.store.upsert_signal(&signal)?;
        count += 1;
    }
    Ok(count)
}
