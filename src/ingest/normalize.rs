// src/ingest/normalize.rs
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::ingest::types::NewsItem;

pub const SNIPPET_WORD_CAP: usize = 50;
pub const TRUNCATION_SUFFIX: &str = "...";

/// Unprocessed pieces pulled out of one entry container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFragments {
    pub title: Option<String>,
    pub href: Option<String>,
    /// `(deferred, immediate)`: lazy-load `data-src` first, then `src`.
    pub image: (Option<String>, Option<String>),
    /// First non-empty description-like sub-element text.
    pub description: Option<String>,
    /// Container text with title/link sub-elements stripped.
    pub container_text: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct NormalizeContext<'a> {
    pub base_origin: &'a str,
    pub scraped_at: DateTime<Utc>,
}

/// Collapse whitespace runs (incl. nbsp) into single spaces and trim.
pub fn collapse_ws(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[\s\u{00A0}]+").unwrap());
    re_ws.replace_all(s, " ").trim().to_string()
}

fn has_scheme(href: &str) -> bool {
    static RE_SCHEME: OnceCell<Regex> = OnceCell::new();
    let re = RE_SCHEME.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap());
    re.is_match(href)
}

/// Root-relative hrefs are prefixed with the origin; absolute ones pass through.
pub fn resolve_url(base_origin: &str, href: &str) -> String {
    let href = href.trim();
    if has_scheme(href) {
        return href.to_string();
    }
    let base = base_origin.trim_end_matches('/');
    if let Some(rest) = href.strip_prefix("//") {
        let scheme = base.split_once("://").map(|(s, _)| s).unwrap_or("https");
        return format!("{scheme}://{rest}");
    }
    if href.starts_with('/') {
        format!("{base}{href}")
    } else {
        format!("{base}/{href}")
    }
}

/// Deferred source wins over the immediate one; empty string when neither is set.
pub fn resolve_image(base_origin: &str, deferred: Option<&str>, immediate: Option<&str>) -> String {
    deferred
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| immediate.map(str::trim).filter(|s| !s.is_empty()))
        .map(|src| resolve_url(base_origin, src))
        .unwrap_or_default()
}

/// Keep at most `max` whitespace-separated words, appending the suffix when cut.
pub fn cap_words(text: &str, max: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > max {
        let mut out = words[..max].join(" ");
        out.push_str(TRUNCATION_SUFFIX);
        out
    } else {
        words.join(" ")
    }
}

pub fn derive_snippet(description: Option<&str>, container_text: Option<&str>) -> String {
    let picked = description
        .map(collapse_ws)
        .filter(|s| !s.is_empty())
        .or_else(|| container_text.map(collapse_ws).filter(|s| !s.is_empty()))
        .unwrap_or_default();
    cap_words(&picked, SNIPPET_WORD_CAP)
}

/// Dedup key for a resolved url. `None` when the link only points back at
/// the site root (fragment links, `/`), so it cannot tell entries apart.
fn id_from_url(base_origin: &str, url: &str) -> Option<String> {
    let without_fragment = url.split('#').next().unwrap_or_default();
    let trimmed = without_fragment.trim_end_matches('/');
    if trimmed.is_empty() || trimmed == base_origin.trim_end_matches('/') {
        None
    } else {
        Some(without_fragment.to_string())
    }
}

/// Id for entries whose link does not identify them; keyed on the title,
/// never on page position.
fn title_id(base_origin: &str, title: &str) -> String {
    format!("{}#item-{}", base_origin.trim_end_matches('/'), title.to_lowercase())
}

/// Build a canonical item, or `None` when title or link is missing.
/// Pure: the same fragments and context always give the same item.
pub fn normalize(raw: &RawFragments, ctx: &NormalizeContext<'_>) -> Option<NewsItem> {
    let title = raw.title.as_deref().map(collapse_ws).filter(|t| !t.is_empty())?;
    let href = raw.href.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
    if href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }

    let url = resolve_url(ctx.base_origin, href);
    let id = id_from_url(ctx.base_origin, &url)
        .unwrap_or_else(|| title_id(ctx.base_origin, &title));

    let image_url = resolve_image(ctx.base_origin, raw.image.0.as_deref(), raw.image.1.as_deref());
    let snippet = derive_snippet(raw.description.as_deref(), raw.container_text.as_deref());
    let date = raw
        .date
        .as_deref()
        .map(collapse_ws)
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| ctx.scraped_at.to_rfc3339());

    Some(NewsItem {
        id,
        title,
        url,
        date,
        snippet,
        image_url,
        scraped_at: ctx.scraped_at,
    })
}
