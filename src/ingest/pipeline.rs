// src/ingest/pipeline.rs
//! One watch cycle: fetch -> extract -> dedup -> persist -> announce.
//!
//! Runs never overlap: a trigger arriving while a run is in progress is
//! skipped, not queued, so the state store only ever has one writer. State
//! is persisted before the announcements go out; a crash in between may
//! re-announce items on the next run but never silently drops them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;

use crate::config::WatchConfig;
use crate::ingest::dedup::{strategy_for, DedupStrategy, Detection};
use crate::ingest::dom::Document;
use crate::ingest::ensure_metrics_described;
use crate::ingest::extract::Extractor;
use crate::ingest::http::HttpTransport;
use crate::ingest::types::{NewsItem, Transport};
use crate::notify::{notifier_from_config, Notifier};
use crate::store::{FileStateStore, SeenState, StateStore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Another run was still in progress.
    Skipped,
    /// Nothing extracted or persisted.
    FetchFailed { error: String },
    NoNews { extracted: usize },
    Announced {
        fresh: usize,
        delivered: usize,
        failed: usize,
        state_saved: bool,
    },
}

/// Clears the running flag when the run ends, however it ends.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Pipeline {
    cfg: Arc<WatchConfig>,
    transport: Arc<dyn Transport>,
    extractor: Extractor,
    dedup: Box<dyn DedupStrategy>,
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
    running: AtomicBool,
}

impl Pipeline {
    pub fn new(
        cfg: Arc<WatchConfig>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        if store.mode() != cfg.dedup_mode {
            bail!(
                "state store is in {} mode but dedup_mode is {}",
                store.mode(),
                cfg.dedup_mode
            );
        }
        let extractor = Extractor::new(cfg.base_origin(), cfg.layout.clone())
            .context("building extractor from layout")?;
        let dedup = strategy_for(&cfg);
        Ok(Self {
            cfg,
            transport,
            extractor,
            dedup,
            store,
            notifier,
            running: AtomicBool::new(false),
        })
    }

    /// Live wiring: HTTP fetch, file-backed state, webhook (or log) sink.
    pub fn from_config(cfg: Arc<WatchConfig>) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(cfg.fetch_timeout_secs)?);
        let store = Arc::new(FileStateStore::new(
            cfg.state_path(),
            cfg.dedup_mode,
            cfg.max_items,
        ));
        let notifier = notifier_from_config(&cfg);
        Self::new(cfg, transport, store, notifier)
    }

    pub fn config(&self) -> &WatchConfig {
        &self.cfg
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub async fn seen_state(&self) -> SeenState {
        self.store.load().await
    }

    pub async fn run_once(&self) -> RunOutcome {
        ensure_metrics_described();

        let Some(_guard) = RunGuard::acquire(&self.running) else {
            counter!("newswatch_runs_skipped_total").increment(1);
            tracing::info!(target: "newswatch", "run already in progress, skipping trigger");
            return RunOutcome::Skipped;
        };
        counter!("newswatch_runs_total").increment(1);
        tracing::info!(
            target: "newswatch",
            site = %self.cfg.base_url,
            mode = %self.dedup.mode(),
            "checking for news"
        );

        let state = self.store.load().await;
        let page = match self
            .transport
            .fetch(&self.cfg.base_url, &self.cfg.fetch_headers())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(target: "newswatch", transport = self.transport.name(), "fetch failed: {e}");
                return RunOutcome::FetchFailed {
                    error: e.to_string(),
                };
            }
        };

        let detection = self.detect(&page, &state, Utc::now());
        let outcome = if detection.fresh.is_empty() {
            tracing::info!(target: "newswatch", extracted = detection.extracted, "no new items");
            RunOutcome::NoNews {
                extracted: detection.extracted,
            }
        } else {
            self.commit(detection).await
        };

        gauge!("newswatch_last_run_ts").set(Utc::now().timestamp() as f64);
        outcome
    }

    /// Re-announce the newest item on the page, ignoring (and not touching)
    /// the persisted state. `Ok(None)` when the page has no items.
    pub async fn force_latest(&self) -> Result<Option<NewsItem>> {
        ensure_metrics_described();
        let page = self
            .transport
            .fetch(&self.cfg.base_url, &self.cfg.fetch_headers())
            .await
            .context("fetching page for forced announce")?;

        let latest = self
            .extractor
            .extract_html(&page, Utc::now())
            .items
            .into_iter()
            .next();
        let Some(item) = latest else {
            tracing::warn!(target: "newswatch", "forced announce found no item");
            return Ok(None);
        };

        self.notifier
            .deliver(&item)
            .await
            .with_context(|| format!("announcing {:?}", item.title))?;
        counter!("newswatch_delivered_total").increment(1);
        tracing::info!(target: "newswatch", title = %item.title, "forced announce sent");
        Ok(Some(item))
    }

    // The parsed document is not Send; it must not live across an await.
    fn detect(&self, page: &str, state: &SeenState, now: DateTime<Utc>) -> Detection {
        let doc = Document::parse(page);
        self.dedup.detect(&self.extractor, &doc, state, now)
    }

    async fn commit(&self, detection: Detection) -> RunOutcome {
        let fresh = detection.fresh;
        counter!("newswatch_fresh_total").increment(fresh.len() as u64);

        let state_saved = match detection.next_state {
            Some(next) => match self.store.save(&next).await {
                Ok(()) => true,
                Err(e) => {
                    counter!("newswatch_state_write_errors_total").increment(1);
                    tracing::warn!(target: "newswatch", "state write failed, items may be announced again: {e}");
                    false
                }
            },
            None => false,
        };

        let (delivered, failed) = self.announce(&fresh).await;
        tracing::info!(
            target: "newswatch",
            fresh = fresh.len(),
            delivered,
            failed,
            "run finished"
        );
        RunOutcome::Announced {
            fresh: fresh.len(),
            delivered,
            failed,
            state_saved,
        }
    }

    /// Oldest first; a failed item does not stop the rest.
    async fn announce(&self, fresh: &[NewsItem]) -> (usize, usize) {
        let mut delivered = 0;
        let mut failed = 0;
        for item in fresh.iter().rev() {
            match self.notifier.deliver(item).await {
                Ok(()) => {
                    delivered += 1;
                    counter!("newswatch_delivered_total").increment(1);
                    tracing::info!(target: "newswatch", title = %item.title, "announced");
                }
                Err(e) => {
                    failed += 1;
                    counter!("newswatch_delivery_errors_total").increment(1);
                    tracing::warn!(
                        target: "newswatch",
                        sink = self.notifier.name(),
                        title = %item.title,
                        "delivery failed: {e}"
                    );
                }
            }
        }
        (delivered, failed)
    }
}
