//! Wallet-signature authentication: nonce issuance plus verification.
//!
//! Per the system's external-interface boundary, real signature
//! verification (EIP-712 typed-data recovery against an on-chain wallet)
//! and transaction broadcasting live outside this crate; `SignatureVerifier`
//! is the seam a production deployment plugs a real verifier into.
//! `NonceStore` is an abstract TTL repository — the in-memory impl here
//! is single-instance only; multi-instance deployments need a shared
//! backing store behind the same trait.

use crate::error::DomainError;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

static WALLET_RE: Lazy<regex::Regex> =
    Lazy::new(|| regex::Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap());

pub fn validate_wallet(wallet: &str) -> Result<(), DomainError> {
    if WALLET_RE.is_match(wallet) {
        Ok(())
    } else {
        Err(DomainError::Validation(format!("invalid wallet address: {wallet}")))
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct NonceResponse {
    pub nonce: String,
    pub timestamp: i64,
    pub message: String,
}

struct NonceEntry {
    wallet: String,
    issued_at: Instant,
}

/// Abstract nonce repository: issue (single-use, TTL-bound) and consume.
pub trait NonceStore: Send + Sync {
    fn issue(&self, wallet: &str) -> NonceResponse;
    /// Consumes the nonce if present, unexpired, and bound to `wallet`.
    fn consume(&self, wallet: &str, nonce: &str) -> bool;
}

pub struct InMemoryNonceStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, NonceEntry>>,
}

impl InMemoryNonceStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl NonceStore for InMemoryNonceStore {
    fn issue(&self, wallet: &str) -> NonceResponse {
        let nonce = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp();
        let message = format!("Sign in to market-intel as {wallet}. Nonce: {nonce}. Issued: {now}");

        let mut entries = self.entries.lock();
        entries.retain(|_, e| e.issued_at.elapsed() < self.ttl);
        entries.insert(
            nonce.clone(),
            NonceEntry {
                wallet: wallet.to_string(),
                issued_at: Instant::now(),
            },
        );

        NonceResponse {
            nonce,
            timestamp: now,
            message,
        }
    }

    fn consume(&self, wallet: &str, nonce: &str) -> bool {
        let mut entries = self.entries.lock();
        match entries.remove(nonce) {
            Some(entry) if entry.wallet == wallet && entry.issued_at.elapsed() < self.ttl => true,
            _ => false,
        }
    }
}

/// Seam for EIP-712 typed-data signature recovery. Left unimplemented —
/// authentication/nonce issuance is an external collaborator interface,
/// not part of this system's ingestion/signal hard core.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, wallet: &str, message: &str, signature: &str) -> bool;
}

pub struct RejectAllVerifier;

impl SignatureVerifier for RejectAllVerifier {
    fn verify(&self, _wallet: &str, _message: &str, _signature: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_wallet_accepts_checksummed_and_lowercase() {
        assert!(validate_wallet("0x1234567890123456789012345678901234567890").is_ok());
        assert!(validate_wallet("0xABCDEF1234567890123456789012345678901234").is_ok());
    }

    #[test]
    fn validate_wallet_rejects_short_or_missing_prefix() {
        assert!(validate_wallet("1234567890123456789012345678901234567890").is_err());
        assert!(validate_wallet("0x123").is_err());
    }

    #[test]
    fn nonce_is_single_use() {
        let store = InMemoryNonceStore::new(Duration::from_secs(300));
        let issued = store.issue("0x1234567890123456789012345678901234567890");
        assert!(store.consume("0x1234567890123456789012345678901234567890", &issued.nonce));
        assert!(!store.consume("0x1234567890123456789012345678901234567890", &issued.nonce));
    }

    #[test]
    fn nonce_rejects_wrong_wallet() {
        let store = InMemoryNonceStore::new(Duration::from_secs(300));
        let issued = store.issue("0x1234567890123456789012345678901234567890");
        assert!(!store.consume("0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", &issued.nonce));
    }

    #[test]
    fn nonce_expires_after_ttl() {
        let store = InMemoryNonceStore::new(Duration::from_millis(10));
        let issued = store.issue("0x1234567890123456789012345678901234567890");
        std::thread::sleep(Duration::from_millis(20));
        assert!(!store.consume("0x1234567890123456789012345678901234567890", &issued.nonce));
    }
}
