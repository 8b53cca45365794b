// src/ingest/dedup.rs
//! Which extracted items are genuinely new.
//!
//! Two strategies share one interface:
//! - set-difference compares a full batch against the stored item list
//!   (deep history, pays for extracting every entry);
//! - boundary-scan walks entries newest-first and stops at the stored
//!   marker title (O(new items), but only one item of history).

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::WatchConfig;
use crate::ingest::dom::Document;
use crate::ingest::extract::Extractor;
use crate::ingest::types::NewsItem;
use crate::store::{retain_newest, SeenState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    #[default]
    SetDifference,
    BoundaryScan,
}

impl fmt::Display for DedupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DedupMode::SetDifference => "set_difference",
            DedupMode::BoundaryScan => "boundary_scan",
        })
    }
}

impl FromStr for DedupMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "set_difference" | "items" => Ok(DedupMode::SetDifference),
            "boundary_scan" | "marker" => Ok(DedupMode::BoundaryScan),
            other => Err(anyhow!("unknown dedup mode: {other}")),
        }
    }
}

/// Outcome of one detection pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    /// New items in document order (newest first).
    pub fresh: Vec<NewsItem>,
    /// State to persist; `None` when nothing changed.
    pub next_state: Option<SeenState>,
    /// Entries materialized from the page.
    pub extracted: usize,
}

pub trait DedupStrategy: Send + Sync {
    fn mode(&self) -> DedupMode;

    fn detect(
        &self,
        extractor: &Extractor,
        doc: &Document,
        state: &SeenState,
        scraped_at: DateTime<Utc>,
    ) -> Detection;
}

/// Items of `batch` whose id is not in `stored`, batch order preserved,
/// repeated ids inside the batch collapsed to their first occurrence.
pub fn set_difference(batch: Vec<NewsItem>, stored: &[NewsItem]) -> Vec<NewsItem> {
    let seen: HashSet<&str> = stored.iter().map(|i| i.id.as_str()).collect();
    let mut fresh = Vec::with_capacity(batch.len());
    let mut batch_ids: HashSet<String> = HashSet::new();
    for item in batch {
        if seen.contains(item.id.as_str()) || !batch_ids.insert(item.id.clone()) {
            continue;
        }
        fresh.push(item);
    }
    fresh
}

/// Entries newer than `marker`, newest first, at most `cap`.
pub fn boundary_scan(
    extractor: &Extractor,
    doc: &Document,
    marker: &str,
    cap: usize,
    scraped_at: DateTime<Utc>,
) -> Vec<NewsItem> {
    let scan = extractor.scan_until(doc, marker, cap, scraped_at);
    if !marker.is_empty() && !scan.reached_marker {
        tracing::warn!(
            target: "newswatch",
            marker,
            found = scan.items.len(),
            "stored marker not on page, reporting up to cap"
        );
    }
    scan.items
}

#[derive(Debug, Clone, Copy)]
pub struct SetDifference {
    pub max_items: usize,
}

impl DedupStrategy for SetDifference {
    fn mode(&self) -> DedupMode {
        DedupMode::SetDifference
    }

    fn detect(
        &self,
        extractor: &Extractor,
        doc: &Document,
        state: &SeenState,
        scraped_at: DateTime<Utc>,
    ) -> Detection {
        let stored: &[NewsItem] = match state {
            SeenState::Items(items) => items,
            SeenState::Marker(_) => {
                tracing::warn!(target: "newswatch", "marker state given to set-difference, treating as empty");
                &[]
            }
        };
        let batch = extractor.extract(doc, scraped_at).items;
        let extracted = batch.len();
        let fresh = set_difference(batch, stored);
        let next_state = (!fresh.is_empty())
            .then(|| SeenState::Items(retain_newest(&fresh, stored, self.max_items)));
        Detection {
            fresh,
            next_state,
            extracted,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BoundaryScan {
    pub cap: usize,
}

impl DedupStrategy for BoundaryScan {
    fn mode(&self) -> DedupMode {
        DedupMode::BoundaryScan
    }

    fn detect(
        &self,
        extractor: &Extractor,
        doc: &Document,
        state: &SeenState,
        scraped_at: DateTime<Utc>,
    ) -> Detection {
        let marker = match state {
            SeenState::Marker(m) => m.as_str(),
            SeenState::Items(items) => items.first().map(|i| i.title.as_str()).unwrap_or_default(),
        };
        let fresh = boundary_scan(extractor, doc, marker, self.cap, scraped_at);
        let next_state = fresh.first().map(|newest| SeenState::Marker(newest.title.clone()));
        Detection {
            extracted: fresh.len(),
            fresh,
            next_state,
        }
    }
}

pub fn strategy_for(cfg: &WatchConfig) -> Box<dyn DedupStrategy> {
    match cfg.dedup_mode {
        DedupMode::SetDifference => Box::new(SetDifference {
            max_items: cfg.max_items,
        }),
        DedupMode::BoundaryScan => Box::new(BoundaryScan { cap: cfg.scan_cap }),
    }
}
