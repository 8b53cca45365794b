//! newswatch daemon entrypoint.
//! Loads config, starts the scheduler (eager first run included) and serves
//! the admin HTTP surface until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use newswatch::api::{self, AppState};
use newswatch::ingest::scheduler::Scheduler;
use newswatch::metrics::Metrics;
use newswatch::{Pipeline, WatchConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    newswatch::init_tracing();

    let cfg = Arc::new(WatchConfig::load_default().context("loading config")?);
    tracing::info!(
        site = %cfg.base_url,
        mode = %cfg.dedup_mode,
        interval_secs = cfg.interval_secs,
        state = %cfg.state_path().display(),
        webhook = cfg.webhook_url.is_some(),
        "newswatch starting"
    );

    let metrics = Metrics::init()?;
    let pipeline = Arc::new(Pipeline::from_config(cfg.clone())?);
    let scheduler = Scheduler::spawn(pipeline.clone(), cfg.interval());

    let app = api::router(AppState { pipeline }).merge(metrics.router());
    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.listen_addr))?;
    tracing::info!(addr = %cfg.listen_addr, "admin http listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await
        .context("http server")?;

    scheduler.shutdown().await;
    Ok(())
}
