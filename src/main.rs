//! Market intelligence backend entry point.
//!
//! Startup order: configuration load, store connect, HTTP server listen,
//! stream service start, indexer kick-off in the background, periodic
//! jobs start, optional workers (filings, news, signal computation,
//! search indexer) gated by feature flags. On SIGTERM/SIGINT the server
//! stops accepting connections, jobs are told to stop, and the process
//! exits 0.

use anyhow::Context;
use clap::Parser;
use market_intel_backend::adapters::filings::FilingsAdapter;
use market_intel_backend::adapters::news::NewsAdapter;
use market_intel_backend::adapters::transcripts::TranscriptsAdapter;
use market_intel_backend::api::build_router;
use market_intel_backend::config::AppConfig;
use market_intel_backend::context::AppContext;
use market_intel_backend::lifecycle::LifecycleEngine;
use market_intel_backend::market::{MarketIndexer, StreamService};
use market_intel_backend::models::DocumentType;
use market_intel_backend::scheduler::Job;
use market_intel_backend::store::InstrumentRepository;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_intel_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Flag overrides for the handful of settings worth flipping at launch
/// without touching the environment. Unset flags fall through to
/// `AppConfig::from_env`'s usual env-var-or-default resolution.
#[derive(Parser, Debug)]
#[command(name = "market-intel", about = "Market intelligence ingestion and signal backend")]
struct Cli {
    #[arg(long, env = "HOST")]
    host: Option<String>,

    #[arg(long, env = "PORT")]
    port: Option<u16>,

    #[arg(long = "db-path", env = "DATABASE_URL")]
    database_path: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(database_path) = cli.database_path {
        config.database_path = database_path;
    }
    info!(host = %config.host, port = config.port, "starting market intelligence backend");

    let ctx = AppContext::build(config).context("failed to build application context")?;

    let stream = Arc::new(StreamService::start(ctx.clone()));
    let indexer = Arc::new(MarketIndexer::new(ctx.clone(), stream.clone()));

    spawn_initial_indexer_kickoff(indexer.clone());

    let mut jobs = start_periodic_jobs(&ctx, indexer.clone());

    let router = build_router(ctx.clone());
    let addr = format!("{}:{}", ctx.config.host, ctx.config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("accept loop stopped, stopping jobs");
    for job in jobs.iter_mut() {
        job.stop();
    }
    info!("clean shutdown");
    Ok(())
}

/// The indexer's first full sync happens once, in the background, so the
/// HTTP server can start accepting requests without waiting on it.
fn spawn_initial_indexer_kickoff(indexer: Arc<MarketIndexer>) {
    tokio::spawn(async move {
        if let Err(e) = indexer.full_sync().await {
            error!(error = %e, "initial market full sync failed");
        }
    });
}

/// Wires every periodic job declared in the system overview onto the
/// scheduler and starts them. Returns the handles so `main` can call
/// `stop()` on shutdown.
fn start_periodic_jobs(ctx: &AppContext, indexer: Arc<MarketIndexer>) -> Vec<Job> {
    let mut jobs = Vec::new();

    {
        let indexer = indexer.clone();
        let mut job = Job::new(
            "market_incremental_sync",
            ctx.config.market_incremental_sync_interval,
            move || {
                let indexer = indexer.clone();
                async move {
                    indexer.incremental_sync().await?;
                    Ok(())
                }
            },
        );
        job.start();
        jobs.push(job);
    }

    {
        let indexer = indexer.clone();
        let mut job = Job::new(
            "market_full_sync",
            ctx.config.market_full_sync_interval,
            move || {
                let indexer = indexer.clone();
                async move {
                    indexer.full_sync().await?;
                    Ok(())
                }
            },
        );
        job.start();
        jobs.push(job);
    }

    {
        let ctx = ctx.clone();
        let mut job = Job::new("lifecycle_download", ctx.config.lifecycle_poll_interval, move || {
            let ctx = ctx.clone();
            async move {
                let engine = LifecycleEngine::new(ctx);
                engine.run_download_batch().await?;
                Ok(())
            }
        });
        job.start();
        jobs.push(job);
    }

    {
        let ctx = ctx.clone();
        let mut job = Job::new("lifecycle_parse", ctx.config.lifecycle_poll_interval, move || {
            let ctx = ctx.clone();
            async move {
                let engine = LifecycleEngine::new(ctx);
                engine.run_parse_batch().await?;
                Ok(())
            }
        });
        job.start();
        jobs.push(job);
    }

    {
        let ctx = ctx.clone();
        let mut job = Job::new("lifecycle_enrich", ctx.config.lifecycle_poll_interval, move || {
            let ctx = ctx.clone();
            async move {
                let engine = LifecycleEngine::new(ctx);
                engine.run_enrich_batch().await?;
                Ok(())
            }
        });
        job.start();
        jobs.push(job);
    }

    if ctx.config.feature_filings_worker {
        let ctx = ctx.clone();
        let mut job = Job::new(
            "filings_discovery",
            ctx.config.lifecycle_poll_interval,
            move || {
                let ctx = ctx.clone();
                async move { discover_filings(&ctx).await }
            },
        );
        job.start();
        jobs.push(job);

        let ctx2 = ctx.clone();
        let mut transcripts_job = Job::new(
            "transcripts_discovery",
            ctx2.config.market_full_sync_interval,
            move || {
                let ctx = ctx2.clone();
                async move { discover_transcripts(&ctx).await }
            },
        );
        transcripts_job.start();
        jobs.push(transcripts_job);
    } else {
        info!("filings worker disabled by feature flag");
    }

    if ctx.config.feature_news_worker {
        let ctx = ctx.clone();
        let mut job = Job::new("news_discovery", ctx.config.lifecycle_poll_interval, move || {
            let ctx = ctx.clone();
            async move { discover_news(&ctx).await }
        });
        job.start();
        jobs.push(job);
    } else {
        info!("news worker disabled by feature flag");
    }

    if ctx.config.feature_signal_computation {
        let ctx = ctx.clone();
        let mut job = Job::new(
            "signal_computation",
            ctx.config.market_incremental_sync_interval,
            move || {
                let ctx = ctx.clone();
                async move {
                    market_intel_backend::signals::run_all(&ctx).await?;
                    Ok(())
                }
            },
        );
        job.start();
        jobs.push(job);
    } else {
        info!("signal computation disabled by feature flag");
    }

    if ctx.config.feature_search_indexer {
        warn!("search indexer feature flag is set but no search-index collaborator is wired into this crate");
    }

    jobs
}

/// EDGAR RSS discovery for the form types this pipeline is grounded on
/// (prospectus supplements and periodic filings most associated with
/// dilution/going-concern risk language).
async fn discover_filings(ctx: &AppContext) -> anyhow::Result<()> {
    let adapter = FilingsAdapter::new(ctx.clone());
    for form_type in ["424B5", "8-K", "10-Q"] {
        match adapter.discover_recent(form_type).await {
            Ok(candidates) => {
                let engine = LifecycleEngine::new(ctx.clone());
                let inserted = engine.ingest_discovered(DocumentType::SecFiling, candidates)?;
                if inserted > 0 {
                    info!(form_type, inserted, "discovered filings");
                }
            }
            Err(e) => warn!(form_type, error = %e, "filings discovery failed"),
        }
    }
    Ok(())
}

async fn discover_transcripts(ctx: &AppContext) -> anyhow::Result<()> {
    let adapter = TranscriptsAdapter::new(ctx.clone());
    let instruments = ctx.store.list_active_instruments()?;
    let mut candidates = Vec::new();
    for instrument in instruments {
        match adapter.fetch_latest(&instrument.symbol).await {
            Ok(Some(doc)) => candidates.push(doc),
            Ok(None) => {}
            Err(e) => warn!(symbol = %instrument.symbol, error = %e, "transcript fetch failed"),
        }
    }
    if !candidates.is_empty() {
        let engine = LifecycleEngine::new(ctx.clone());
        let inserted = engine.ingest_discovered(DocumentType::EarningsTranscript, candidates)?;
        info!(inserted, "discovered transcripts");
    }
    Ok(())
}

async fn discover_news(ctx: &AppContext) -> anyhow::Result<()> {
    if ctx.config.news_api_key.is_empty() {
        return Ok(());
    }
    let adapter = NewsAdapter::new(ctx.clone(), ctx.config.news_api_key.clone());
    let instruments = ctx.store.list_active_instruments()?;
    let engine = LifecycleEngine::new(ctx.clone());
    for instrument in instruments {
        match adapter.search(&instrument.symbol).await {
            Ok(candidates) if !candidates.is_empty() => {
                engine.ingest_discovered(DocumentType::NewsArticle, candidates)?;
            }
            Ok(_) => {}
            Err(e) => warn!(symbol = %instrument.symbol, error = %e, "news discovery failed"),
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
