// src/store.rs
//! Durable record of what has already been announced.
//!
//! Item-list mode keeps the newest `max_items` items as pretty JSON; marker
//! mode keeps one title as plain text. Loading never fails the caller: a
//! missing file is "nothing seen yet"; an unreadable, corrupt or other-mode
//! one is the same plus a warning. Saves go through a temp file + rename so
//! a reader never observes a half-written state.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use tokio::fs;

use crate::ingest::dedup::DedupMode;
use crate::ingest::types::NewsItem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "state")]
pub enum SeenState {
    /// Newest first, bounded.
    #[serde(rename = "set_difference")]
    Items(Vec<NewsItem>),
    /// Title of the most recently announced item.
    #[serde(rename = "boundary_scan")]
    Marker(String),
}

impl SeenState {
    pub fn empty(mode: DedupMode) -> Self {
        match mode {
            DedupMode::SetDifference => SeenState::Items(Vec::new()),
            DedupMode::BoundaryScan => SeenState::Marker(String::new()),
        }
    }

    pub fn mode(&self) -> DedupMode {
        match self {
            SeenState::Items(_) => DedupMode::SetDifference,
            SeenState::Marker(_) => DedupMode::BoundaryScan,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SeenState::Items(v) => v.is_empty(),
            SeenState::Marker(m) => m.is_empty(),
        }
    }
}

/// Prepend `fresh` to `stored` and keep the newest `max`.
pub fn retain_newest(fresh: &[NewsItem], stored: &[NewsItem], max: usize) -> Vec<NewsItem> {
    fresh.iter().chain(stored).take(max).cloned().collect()
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state io: {0}")]
    Io(#[from] std::io::Error),

    #[error("state encode: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("store holds {expected} state, got {got}")]
    ModeMismatch { expected: DedupMode, got: DedupMode },
}

#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    fn mode(&self) -> DedupMode;

    /// Never fails; falls back to the empty state.
    async fn load(&self) -> SeenState;

    async fn save(&self, state: &SeenState) -> Result<(), StoreError>;
}

pub struct FileStateStore {
    path: PathBuf,
    mode: DedupMode,
    max_items: usize,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>, mode: DedupMode, max_items: usize) -> Self {
        Self {
            path: path.into(),
            mode,
            max_items: max_items.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn decode(&self, raw: &str) -> Result<SeenState, StoreError> {
        Ok(match self.mode {
            DedupMode::SetDifference => {
                let mut items: Vec<NewsItem> = serde_json::from_str(raw)?;
                items.truncate(self.max_items);
                SeenState::Items(items)
            }
            DedupMode::BoundaryScan => {
                let marker = raw.trim();
                // an item list left behind by set-difference mode
                if marker.starts_with('[') && serde_json::from_str::<Vec<NewsItem>>(marker).is_ok() {
                    return Err(StoreError::ModeMismatch {
                        expected: self.mode,
                        got: DedupMode::SetDifference,
                    });
                }
                SeenState::Marker(marker.to_string())
            }
        })
    }

    fn encode(&self, state: &SeenState) -> Result<Vec<u8>, StoreError> {
        match state {
            SeenState::Items(items) if self.mode == DedupMode::SetDifference => {
                let bounded = &items[..items.len().min(self.max_items)];
                Ok(serde_json::to_vec_pretty(bounded)?)
            }
            SeenState::Marker(title) if self.mode == DedupMode::BoundaryScan => {
                Ok(title.clone().into_bytes())
            }
            other => Err(StoreError::ModeMismatch {
                expected: self.mode,
                got: other.mode(),
            }),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait::async_trait]
impl StateStore for FileStateStore {
    fn mode(&self) -> DedupMode {
        self.mode
    }

    async fn load(&self) -> SeenState {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no state yet");
                return SeenState::empty(self.mode);
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "state unreadable, starting empty: {e:#}");
                return SeenState::empty(self.mode);
            }
        };
        match self.decode(&raw) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "state unusable, starting empty: {e:#}");
                SeenState::empty(self.mode)
            }
        }
    }

    async fn save(&self, state: &SeenState) -> Result<(), StoreError> {
        let bytes = self.encode(state)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).await?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// In-process store for tests and dry runs.
pub struct MemoryStateStore {
    mode: DedupMode,
    state: Mutex<SeenState>,
    saves: AtomicUsize,
}

impl MemoryStateStore {
    pub fn new(initial: SeenState) -> Self {
        Self {
            mode: initial.mode(),
            state: Mutex::new(initial),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn empty(mode: DedupMode) -> Self {
        Self::new(SeenState::empty(mode))
    }

    pub fn snapshot(&self) -> SeenState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StateStore for MemoryStateStore {
    fn mode(&self) -> DedupMode {
        self.mode
    }

    async fn load(&self) -> SeenState {
        self.snapshot()
    }

    async fn save(&self, state: &SeenState) -> Result<(), StoreError> {
        if state.mode() != self.mode {
            return Err(StoreError::ModeMismatch {
                expected: self.mode,
                got: state.mode(),
            });
        }
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
