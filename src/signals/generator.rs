use crate::context::AppContext;
use crate::models::{GeneratedSignal, SignalType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Shared state every generator reads from: the context plus a fixed
/// evaluation timestamp and lookback window so a single pass is
/// internally consistent even if it runs for several seconds.
pub struct GenerationContext {
    pub ctx: AppContext,
    pub now: DateTime<Utc>,
    pub lookback_days: i64,
}

impl GenerationContext {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            now: Utc::now(),
            lookback_days: 60,
        }
    }
}

#[async_trait]
pub trait SignalGenerator: Send + Sync {
    fn name(&self) -> &str;
    fn signal_type(&self) -> SignalType;
    async fn generate(&self, context: &GenerationContext) -> anyhow::Result<Vec<GeneratedSignal>>;
}
