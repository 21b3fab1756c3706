use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prediction market. `outcome_tokens` is immutable once set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub condition_id: String,
    pub question: String,
    pub outcomes: Vec<String>,
    /// outcome label -> token id. Immutable once non-empty.
    pub outcome_tokens: HashMap<String, String>,
    pub expiry: Option<DateTime<Utc>>,
    /// outcome label -> last traded price (decimal string).
    pub last_prices: HashMap<String, String>,
    pub liquidity: Option<String>,
    pub volume: Option<String>,
    pub active: bool,
    pub last_updated_block: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Market {
    pub fn new(condition_id: String, question: String, outcomes: Vec<String>) -> Self {
        let now = Utc::now();
        Self {
            condition_id,
            question,
            outcomes,
            outcome_tokens: HashMap::new(),
            expiry: None,
            last_prices: HashMap::new(),
            liquidity: None,
            volume: None,
            active: true,
            last_updated_block: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge incoming fields into self, preferring new non-empty values
    /// over existing ones. The outcome->token map is never overwritten
    /// once set.
    pub fn merge_upsert(&mut self, incoming: MarketUpdate) {
        if self.outcome_tokens.is_empty() && !incoming.outcome_tokens.is_empty() {
            self.outcome_tokens = incoming.outcome_tokens;
        }
        if !incoming.question.trim().is_empty() {
            self.question = incoming.question;
        }
        if let Some(expiry) = incoming.expiry {
            self.expiry = Some(expiry);
        }
        for (outcome, price) in incoming.last_prices {
            self.last_prices.insert(outcome, price);
        }
        if incoming.liquidity.is_some() {
            self.liquidity = incoming.liquidity;
        }
        if incoming.volume.is_some() {
            self.volume = incoming.volume;
        }
        self.active = incoming.active;
        if let Some(block) = incoming.last_updated_block {
            self.last_updated_block = Some(block);
        }
        self.updated_at = Utc::now();
    }

    /// Incremental sync should skip the write if the incoming block
    /// marker isn't newer than the stored one.
    pub fn should_apply_incremental(&self, incoming_block: Option<i64>) -> bool {
        match (self.last_updated_block, incoming_block) {
            (Some(stored), Some(incoming)) => incoming > stored,
            (None, Some(_)) => true,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MarketUpdate {
    pub question: String,
    pub outcome_tokens: HashMap<String, String>,
    pub expiry: Option<DateTime<Utc>>,
    pub last_prices: HashMap<String, String>,
    pub liquidity: Option<String>,
    pub volume: Option<String>,
    pub active: bool,
    pub last_updated_block: Option<i64>,
}
