// src/ingest/extract.rs
//! Cascading extraction of news entries from the landing page.
//!
//! The page markup is not a contract, so entry containers are located by
//! an ordered list of strategies, from the most specific (the timeline
//! container by id) to the most forgiving (clusters of news links). The
//! first strategy whose containers normalize into at least one item wins.
//! Extraction never fails: an exhausted cascade is an empty batch.

use std::collections::HashSet;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use scraper::Selector;

use crate::config::SiteLayout;
use crate::ingest::dom::{Document, Node};
use crate::ingest::normalize::{collapse_ws, normalize, NormalizeContext, RawFragments};
use crate::ingest::types::NewsItem;

/// Link text shorter than this is not trusted as a title.
const MIN_LINK_TITLE_CHARS: usize = 10;
/// How far above the section heading the heading-anchored fallback searches.
const HEADING_CLIMB: usize = 4;

type Strategy = for<'d> fn(&Extractor, &'d Document) -> Vec<Node<'d>>;

const CASCADE: [(&str, Strategy); 4] = [
    ("timeline", Extractor::timeline_entries),
    ("heading", Extractor::heading_anchored_entries),
    ("section", Extractor::section_entries),
    ("link_cluster", Extractor::link_cluster_entries),
];

/// Result of a full cascade run.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Document order, newest first. Ids are unique.
    pub items: Vec<NewsItem>,
    /// Name of the winning strategy, `None` when the cascade came up empty.
    pub strategy: Option<&'static str>,
}

/// Result of a boundary scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// Entries newer than the marker, newest first.
    pub items: Vec<NewsItem>,
    pub reached_marker: bool,
    /// Entry containers examined, skipped categories included.
    pub visited: usize,
}

struct Selectors {
    timeline: Selector,
    entry: Selector,
    headings: Selector,
    section: Selector,
    news_link: Selector,
    block: Selector,
    header_link: Selector,
    description: Selector,
    title_strip: Selector,
    date: Selector,
    image: Selector,
    skipped: Option<Selector>,
}

fn parse(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css:?}: {e:?}"))
}

fn class_list_selector(classes: &[String]) -> Result<Option<Selector>> {
    let parts: Vec<String> = classes
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| format!(".{c}"))
        .collect();
    if parts.is_empty() {
        return Ok(None);
    }
    parse(&parts.join(", ")).map(Some)
}

impl Selectors {
    fn from_layout(layout: &SiteLayout) -> Result<Self> {
        Ok(Self {
            timeline: parse(&format!("#{}", layout.timeline_id.trim()))?,
            entry: parse(&format!(".{}", layout.entry_class.trim()))?,
            headings: parse("h1, h2, h3, h4")?,
            section: parse(&format!(".{}", layout.section_class.trim()))?,
            news_link: parse(&format!("a[href*=\"{}\"]", layout.news_path.replace('"', "")))?,
            block: parse("div, article, li")?,
            header_link: parse("h3 a, h4 a, .title a, .timeline-title a")?,
            description: parse("p, .description, .content, .resume-news")?,
            title_strip: parse("h3, h4, .title, a")?,
            date: parse(".date, time")?,
            image: parse("img")?,
            skipped: class_list_selector(&layout.skipped_classes)?,
        })
    }
}

pub struct Extractor {
    base_origin: String,
    layout: SiteLayout,
    sel: Selectors,
}

impl Extractor {
    /// Fails only when the layout yields an unparsable selector.
    pub fn new(base_origin: &str, layout: SiteLayout) -> Result<Self> {
        let sel = Selectors::from_layout(&layout)?;
        Ok(Self {
            base_origin: base_origin.trim_end_matches('/').to_string(),
            layout,
            sel,
        })
    }

    pub fn base_origin(&self) -> &str {
        &self.base_origin
    }

    pub fn extract_html(&self, raw: &str, scraped_at: DateTime<Utc>) -> Extraction {
        self.extract(&Document::parse(raw), scraped_at)
    }

    pub fn extract(&self, doc: &Document, scraped_at: DateTime<Utc>) -> Extraction {
        let t0 = std::time::Instant::now();
        for (name, strategy) in CASCADE {
            let entries = strategy(self, doc);
            if entries.is_empty() {
                tracing::debug!(target: "newswatch", strategy = name, "no entry containers");
                continue;
            }
            let items = self.materialize(&entries, scraped_at);
            if items.is_empty() {
                tracing::debug!(
                    target: "newswatch",
                    strategy = name,
                    containers = entries.len(),
                    "containers found but none normalized"
                );
                continue;
            }

            histogram!("newswatch_extract_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
            counter!("newswatch_extract_strategy_total", "strategy" => name).increment(1);
            counter!("newswatch_extracted_total").increment(items.len() as u64);
            if name != "timeline" {
                tracing::warn!(target: "newswatch", strategy = name, "timeline container missing, used fallback");
            }
            return Extraction {
                items,
                strategy: Some(name),
            };
        }

        histogram!("newswatch_extract_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        tracing::warn!(target: "newswatch", "extraction cascade exhausted, page layout may have changed");
        Extraction::default()
    }

    /// Walk timeline entries newest-first, stopping at the entry titled
    /// `marker`. Entries past the marker are never normalized. With an empty
    /// marker every entry is new and the walk stops after `cap` items; a
    /// marker that is not on the page also reports at most `cap` items.
    pub fn scan_until(
        &self,
        doc: &Document,
        marker: &str,
        cap: usize,
        scraped_at: DateTime<Utc>,
    ) -> ScanOutcome {
        let marker = collapse_ws(marker);
        let mut out = ScanOutcome::default();
        let mut seen = HashSet::new();
        let ctx = self.context(scraped_at);

        for entry in doc.select(&self.sel.entry) {
            if marker.is_empty() && out.items.len() >= cap {
                break;
            }
            out.visited += 1;
            if self.is_skipped_category(entry) {
                continue;
            }
            let Some(link) = self.title_link(entry) else {
                continue;
            };
            let title = collapse_ws(&link.text());
            if title.is_empty() {
                continue;
            }
            if !marker.is_empty() && title == marker {
                out.reached_marker = true;
                break;
            }

            let raw = self.fragments(entry, Some(link));
            if let Some(item) = normalize(&raw, &ctx) {
                if seen.insert(item.id.clone()) {
                    out.items.push(item);
                }
            }
        }
        if !out.reached_marker {
            out.items.truncate(cap);
        }
        out
    }

    fn context(&self, scraped_at: DateTime<Utc>) -> NormalizeContext<'_> {
        NormalizeContext {
            base_origin: &self.base_origin,
            scraped_at,
        }
    }

    fn materialize(&self, entries: &[Node<'_>], scraped_at: DateTime<Utc>) -> Vec<NewsItem> {
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(entries.len());
        let ctx = self.context(scraped_at);
        for entry in entries {
            let raw = self.fragments(*entry, self.title_link(*entry));
            let Some(item) = normalize(&raw, &ctx) else {
                continue;
            };
            // same article linked twice in one page
            if seen.insert(item.id.clone()) {
                items.push(item);
            }
        }
        items
    }

    // --- strategies ---

    fn timeline_entries<'d>(&self, doc: &'d Document) -> Vec<Node<'d>> {
        doc.select_first(&self.sel.timeline)
            .map(|t| t.find(&self.sel.entry))
            .unwrap_or_default()
    }

    fn heading_anchored_entries<'d>(&self, doc: &'d Document) -> Vec<Node<'d>> {
        let wanted = collapse_ws(&self.layout.section_heading);
        if wanted.is_empty() {
            return Vec::new();
        }
        let headings = doc
            .select(&self.sel.headings)
            .into_iter()
            .filter(|h| collapse_ws(&h.text()).contains(&wanted));

        for heading in headings {
            for scope in heading.ancestors().take(HEADING_CLIMB) {
                let entries = match scope.find_first(&self.sel.timeline) {
                    Some(timeline) => timeline.find(&self.sel.entry),
                    None => scope.find(&self.sel.entry),
                };
                if !entries.is_empty() {
                    return entries;
                }
            }
        }
        Vec::new()
    }

    fn section_entries<'d>(&self, doc: &'d Document) -> Vec<Node<'d>> {
        let mut seen = HashSet::new();
        doc.select(&self.sel.section)
            .into_iter()
            .filter_map(|s| s.parent())
            .flat_map(|p| p.find(&self.sel.entry))
            .filter(|e| seen.insert(e.key()))
            .collect()
    }

    fn link_cluster_entries<'d>(&self, doc: &'d Document) -> Vec<Node<'d>> {
        let mut seen = HashSet::new();
        doc.select(&self.sel.news_link)
            .into_iter()
            .filter_map(|a| a.closest_ancestor(&self.sel.block))
            .filter(|c| !c.within_any_class(&self.layout.excluded_classes))
            .filter(|c| seen.insert(c.key()))
            .collect()
    }

    // --- field location ---

    /// Header-level link first, otherwise the first news link with a
    /// title-length text.
    fn title_link<'d>(&self, entry: Node<'d>) -> Option<Node<'d>> {
        entry.find_first(&self.sel.header_link).or_else(|| {
            entry
                .find(&self.sel.news_link)
                .into_iter()
                .find(|a| collapse_ws(&a.text()).chars().count() > MIN_LINK_TITLE_CHARS)
        })
    }

    fn is_skipped_category(&self, entry: Node<'_>) -> bool {
        entry.has_any_class(&self.layout.skipped_classes)
            || self
                .sel
                .skipped
                .as_ref()
                .is_some_and(|s| entry.find_first(s).is_some())
    }

    fn fragments(&self, entry: Node<'_>, link: Option<Node<'_>>) -> RawFragments {
        let description = entry
            .find(&self.sel.description)
            .into_iter()
            .map(|n| collapse_ws(&n.text()))
            .find(|t| !t.is_empty());
        let container_text = match description {
            Some(_) => None,
            None => Some(entry.text_excluding(&self.sel.title_strip)),
        };
        let image = entry
            .find_first(&self.sel.image)
            .map(|img| {
                (
                    img.attr("data-src").map(str::to_string),
                    img.attr("src").map(str::to_string),
                )
            })
            .unwrap_or_default();
        let date = entry
            .find(&self.sel.date)
            .into_iter()
            .map(|n| collapse_ws(&n.text()))
            .find(|t| !t.is_empty());

        RawFragments {
            title: link.map(|a| a.text()),
            href: link.and_then(|a| a.attr("href")).map(str::to_string),
            image,
            description,
            container_text,
            date,
        }
    }
}
