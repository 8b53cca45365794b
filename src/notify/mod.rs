pub mod discord;
pub mod log_sink;

use std::sync::Arc;

use crate::config::WatchConfig;
use crate::ingest::types::NewsItem;

pub use discord::DiscordNotifier;
pub use log_sink::LogNotifier;

const MESSAGE_LINE: &str = "🗒️ Une nouvelle actualité est en ligne";
const READ_MORE: &str = "🔗 [Lire l'article]";
const NO_SNIPPET: &str = "Nouvel article détecté";
const NO_DATE: &str = "Non disponible";

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("webhook request failed: {0}")]
    Request(String),

    #[error("webhook HTTP error {0}")]
    Status(u16),

    /// For sink implementations that refuse an item before sending it.
    #[error("sink rejected item: {0}")]
    Rejected(String),
}

/// One rendered notification per item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub content: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub image_url: Option<String>,
    pub source: String,
    pub date: String,
    pub footer: String,
    pub timestamp_iso: String,
    pub color: u32,
}

impl Announcement {
    pub fn render(item: &NewsItem, source_label: &str, color: u32) -> Self {
        let lead = if item.snippet.is_empty() {
            format!("{NO_SNIPPET} sur {source_label}")
        } else {
            item.snippet.clone()
        };
        Self {
            content: format!("{MESSAGE_LINE} sur {source_label}."),
            title: item.title.clone(),
            url: item.url.clone(),
            description: format!("{lead}\n{READ_MORE}({})", item.url),
            image_url: (!item.image_url.is_empty()).then(|| item.image_url.clone()),
            source: source_label.to_string(),
            date: if item.date.is_empty() {
                NO_DATE.to_string()
            } else {
                item.date.clone()
            },
            footer: format!("{source_label} watcher"),
            timestamp_iso: item.scraped_at.to_rfc3339(),
            color,
        }
    }
}

/// Fire-and-forget delivery of one item. No transactional guarantee back
/// to the pipeline.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, item: &NewsItem) -> Result<(), DeliveryError>;

    fn name(&self) -> &'static str;
}

/// Discord webhook when configured, log-only otherwise.
pub fn notifier_from_config(cfg: &WatchConfig) -> Arc<dyn Notifier> {
    match cfg.webhook_url.as_deref() {
        Some(url) => Arc::new(
            DiscordNotifier::new(url.to_string(), cfg.source_label.clone())
                .with_color(cfg.embed_color)
                .with_timeout(cfg.fetch_timeout_secs),
        ),
        None => {
            tracing::info!("no webhook configured, announcements go to the log");
            Arc::new(LogNotifier::new(cfg.source_label.clone()))
        }
    }
}
