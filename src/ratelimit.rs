//! Per-host minimum-inter-call-interval gate.
//!
//! Each adapter acquires a permit from its own `HostRateLimiter` before
//! issuing a request. Unlike a token bucket this tracks only the instant
//! of the last call and sleeps out the remainder of the configured
//! interval, which is enough to keep a single adapter under its
//! source's documented rate without the bookkeeping of a full window
//! counter.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

pub struct HostRateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl HostRateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Block until at least `min_interval` has elapsed since the previous
    /// acquisition, then record this one.
    pub async fn acquire(&self) {
        if self.min_interval.is_zero() {
            return;
        }
        let mut guard = self.last_call.lock().await;
        let now = Instant::now();
        if let Some(last) = *guard {
            let elapsed = now.duration_since(last);
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *guard = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant as StdInstant;

    #[tokio::test]
    async fn spaces_out_calls_by_min_interval() {
        let limiter = HostRateLimiter::new(Duration::from_millis(50));
        let start = StdInstant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn zero_interval_never_blocks() {
        let limiter = HostRateLimiter::new(Duration::from_millis(0));
        let start = StdInstant::now();
        for _ in 0..50 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
