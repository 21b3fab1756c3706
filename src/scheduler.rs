//! Job Scheduler: a minimal periodic driver. Each `Job` runs an initial
//! pass immediately, then re-runs on a fixed interval until stopped.
//! Jobs are fully independent — no cross-job synchronization except
//! through the store they share.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

type RunFn = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>> + Send + Sync>;

/// A named, independently scheduled unit of periodic work.
pub struct Job {
    name: String,
    interval: Duration,
    run: RunFn,
    stopped: Arc<AtomicBool>,
    wake: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl Job {
    pub fn new<F, Fut>(name: impl Into<String>, interval: Duration, run: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            interval,
            run: Arc::new(move || Box::pin(run())),
            stopped: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
            handle: None,
        }
    }

    /// Kicks off an initial run and schedules subsequent runs at the
    /// configured interval. Calling `start` twice without an intervening
    /// `stop` is a no-op on the second call.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        let name = self.name.clone();
        let interval_dur = self.interval;
        let run = self.run.clone();
        let stopped = self.stopped.clone();
        let wake = self.wake.clone();

        let handle = tokio::spawn(async move {
            loop {
                if let Err(e) = run().await {
                    error!(job = %name, error = %e, "job run failed");
                }
                if stopped.load(Ordering::SeqCst) {
                    break;
                }
                tokio::select! {
                    _ = tokio::time::sleep(interval_dur) => {}
                    _ = wake.notified() => {
                        if stopped.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                }
            }
            info!(job = %name, "job stopped");
        });

        self.handle = Some(handle);
    }

    /// Cancels the next tick; the in-flight run (if any) completes
    /// normally. Does not block waiting for that run to finish.
    pub fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.wake.notify_waiters();
        self.handle = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn job_runs_at_least_once_then_stops_cleanly() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let mut job = Job::new("test_job", Duration::from_millis(20), move || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        job.start();
        tokio::time::sleep(Duration::from_millis(50)).await;
        job.stop();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(counter.load(Ordering::SeqCst) >= 1);
    }
}
