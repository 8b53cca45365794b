// src/config/watch.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::ingest::dedup::DedupMode;

pub const ENV_CONFIG_PATH: &str = "NEWSWATCH_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/newswatch.toml";

const ENV_WEBHOOK: &str = "NEWS_WEBHOOK_URL";
const ENV_INTERVAL: &str = "NEWS_INTERVAL_SECS";
const ENV_STATE_PATH: &str = "NEWS_STATE_PATH";
const ENV_DEDUP_MODE: &str = "NEWS_DEDUP_MODE";
const ENV_LISTEN_ADDR: &str = "NEWS_LISTEN_ADDR";

/// Markup landmarks of the watched site. Every field defaults to the
/// layout the landing page uses today.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SiteLayout {
    /// `id` of the timeline container.
    pub timeline_id: String,
    /// Class carried by every news entry inside the timeline.
    pub entry_class: String,
    /// Heading text announcing the news section (substring match).
    pub section_heading: String,
    /// Class marking timeline sections, used when the container id moved.
    pub section_class: String,
    /// Path fragment every news link contains.
    pub news_path: String,
    /// Featured/contest blocks the generic fallback must ignore.
    pub excluded_classes: Vec<String>,
    /// Entry categories that are not news (events etc.).
    pub skipped_classes: Vec<String>,
}

impl Default for SiteLayout {
    fn default() -> Self {
        Self {
            timeline_id: "timeline".into(),
            entry_class: "timeline-news".into(),
            section_heading: "Les dernières actualités Pokémon".into(),
            section_class: "timeline-section".into(),
            news_path: "/news/".into(),
            excluded_classes: vec!["contest".into()],
            skipped_classes: vec!["timeline-event".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatchConfig {
    /// Site origin; root-relative links are prefixed with it.
    pub base_url: String,
    /// Sent as `User-Agent` on every fetch.
    pub user_agent: String,
    pub interval_secs: u64,
    pub fetch_timeout_secs: u64,
    /// Item-list mode retention bound.
    pub max_items: usize,
    /// Upper bound of items a boundary scan may report in one run.
    pub scan_cap: usize,
    pub dedup_mode: DedupMode,
    /// Defaults to a per-mode file under `state/`.
    pub state_path: Option<PathBuf>,
    /// Discord webhook of the target channel; `None` logs instead of posting.
    pub webhook_url: Option<String>,
    pub source_label: String,
    pub embed_color: u32,
    pub listen_addr: String,
    pub layout: SiteLayout,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.pokekalos.fr".into(),
            user_agent: "Mozilla/5.0 (compatible; newswatch/0.1)".into(),
            interval_secs: 900,
            fetch_timeout_secs: 10,
            max_items: 50,
            scan_cap: 10,
            dedup_mode: DedupMode::SetDifference,
            state_path: None,
            webhook_url: None,
            source_label: "Pokekalos".into(),
            embed_color: 0xFF6B35,
            listen_addr: "0.0.0.0:8080".into(),
            layout: SiteLayout::default(),
        }
    }
}

impl WatchConfig {
    /// Parse a TOML file. Does not apply env overrides.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: WatchConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        Ok(cfg)
    }

    /// Load config using env var + fallbacks, then env overrides:
    /// 1) $NEWSWATCH_CONFIG (must exist)
    /// 2) config/newswatch.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from_file(&default_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = env::var(ENV_WEBHOOK) {
            let url = url.trim();
            self.webhook_url = (!url.is_empty()).then(|| url.to_string());
        }
        if let Ok(v) = env::var(ENV_INTERVAL) {
            self.interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_INTERVAL} is not a number: {v}"))?;
        }
        if let Ok(p) = env::var(ENV_STATE_PATH) {
            self.state_path = Some(PathBuf::from(p));
        }
        if let Ok(m) = env::var(ENV_DEDUP_MODE) {
            self.dedup_mode = m.parse()?;
        }
        if let Ok(addr) = env::var(ENV_LISTEN_ADDR) {
            self.listen_addr = addr;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http") {
            bail!("base_url must be absolute, got {:?}", self.base_url);
        }
        if self.interval_secs == 0 {
            bail!("interval_secs must be > 0");
        }
        if self.max_items == 0 {
            bail!("max_items must be > 0");
        }
        if self.scan_cap == 0 {
            bail!("scan_cap must be > 0");
        }
        if self.layout.timeline_id.trim().is_empty() || self.layout.entry_class.trim().is_empty()
        {
            bail!("layout.timeline_id and layout.entry_class are required");
        }
        Ok(())
    }

    /// Base origin without a trailing slash, ready for prefixing root-relative hrefs.
    pub fn base_origin(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn state_path(&self) -> PathBuf {
        match (&self.state_path, self.dedup_mode) {
            (Some(p), _) => p.clone(),
            (None, DedupMode::SetDifference) => PathBuf::from("state/news_items.json"),
            (None, DedupMode::BoundaryScan) => PathBuf::from("state/latest_title.cache"),
        }
    }

    pub fn fetch_headers(&self) -> BTreeMap<String, String> {
        let mut h = BTreeMap::new();
        h.insert("User-Agent".to_string(), self.user_agent.clone());
        h
    }
}
