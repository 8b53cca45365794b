// tests/common/mod.rs
// Shared doubles for the integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;

use newswatch::ingest::types::{NewsItem, Transport, TransportError};
use newswatch::notify::{DeliveryError, Notifier};
use newswatch::store::{MemoryStateStore, SeenState, StateStore, StoreError};
use newswatch::{Pipeline, WatchConfig};

pub const TIMELINE: &str = include_str!("../fixtures/timeline.html");
pub const HEADING_FALLBACK: &str = include_str!("../fixtures/heading_fallback.html");
pub const SECTION_FALLBACK: &str = include_str!("../fixtures/section_fallback.html");
pub const LINK_CLUSTER: &str = include_str!("../fixtures/link_cluster.html");

pub const BASE: &str = "https://www.pokekalos.fr";

pub fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 2, 9, 30, 0).unwrap()
}

pub fn cfg() -> WatchConfig {
    WatchConfig {
        base_url: BASE.into(),
        ..WatchConfig::default()
    }
}

pub fn titles(items: &[NewsItem]) -> Vec<String> {
    items.iter().map(|i| i.title.clone()).collect()
}

/// Remembers every delivered title in delivery order; optionally rejects
/// titles containing `fail_on`.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<String>>,
    attempts: AtomicUsize,
    fail_on: Option<String>,
}

impl RecordingNotifier {
    pub fn failing_on(needle: &str) -> Self {
        Self {
            fail_on: Some(needle.to_string()),
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn deliver(&self, item: &NewsItem) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(needle) = &self.fail_on {
            if item.title.contains(needle.as_str()) {
                return Err(DeliveryError::Rejected(item.title.clone()));
            }
        }
        self.delivered.lock().unwrap().push(item.title.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Serves a fixed page and counts fetches. With a gate, every fetch waits
/// until the gate is opened.
pub struct CountingTransport {
    body: String,
    fetches: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

impl CountingTransport {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            fetches: AtomicUsize::new(0),
            gate: None,
        }
    }

    pub fn gated(body: &str, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(body)
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for CountingTransport {
    async fn fetch(
        &self,
        _url: &str,
        _headers: &BTreeMap<String, String>,
    ) -> Result<String, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(self.body.clone())
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// In-memory store whose saves can be made to fail.
pub struct FlakyStore {
    inner: MemoryStateStore,
    fail_saves: AtomicBool,
}

impl FlakyStore {
    pub fn failing(inner: MemoryStateStore) -> Self {
        Self {
            inner,
            fail_saves: AtomicBool::new(true),
        }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> SeenState {
        self.inner.snapshot()
    }
}

#[async_trait]
impl StateStore for FlakyStore {
    fn mode(&self) -> newswatch::DedupMode {
        self.inner.mode()
    }

    async fn load(&self) -> SeenState {
        self.inner.load().await
    }

    async fn save(&self, state: &SeenState) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.save(state).await
    }
}

pub fn pipeline(
    cfg: WatchConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn StateStore>,
    notifier: Arc<dyn Notifier>,
) -> Pipeline {
    Pipeline::new(Arc::new(cfg), transport, store, notifier).expect("pipeline wiring")
}
