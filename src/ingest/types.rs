// src/ingest/types.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

/// Canonical news record produced by the field normalizer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,    // resolved url sans fragment, or origin + title for root links
    pub title: String, // never empty
    pub url: String,   // absolute
    pub date: String,  // human-readable, best effort
    pub snippet: String,
    #[serde(default)]
    pub image_url: String, // absolute or ""
    pub scraped_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("reading body failed: {0}")]
    Body(String),
}

/// Fetches the raw landing-page markup.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<String, TransportError>;

    fn name(&self) -> &'static str;
}
