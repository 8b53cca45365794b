//! Re-announce the newest item on the page right now, without touching the
//! persisted state.

use std::sync::Arc;

use anyhow::{Context, Result};
use newswatch::{Pipeline, WatchConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    newswatch::init_tracing();

    let cfg = Arc::new(WatchConfig::load_default().context("loading config")?);
    let pipeline = Pipeline::from_config(cfg)?;

    match pipeline.force_latest().await? {
        Some(item) => println!("posted: {} ({})", item.title, item.url),
        None => println!("no item found on the page"),
    }
    Ok(())
}
