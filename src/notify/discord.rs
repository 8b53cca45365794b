use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{Announcement, DeliveryError, Notifier};
use crate::ingest::types::NewsItem;

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    source_label: String,
    color: u32,
    client: Client,
    timeout: Duration,
}

impl DiscordNotifier {
    pub fn new(webhook: String, source_label: String) -> Self {
        Self {
            webhook,
            source_label,
            color: 0xFF6B35,
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn payload(&self, item: &NewsItem) -> DiscordWebhookPayload {
        DiscordWebhookPayload::from(Announcement::render(item, &self.source_label, self.color))
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn deliver(&self, item: &NewsItem) -> Result<(), DeliveryError> {
        let payload = self.payload(item);

        // single attempt; a failed item is not retried within the run
        let rsp = self
            .client
            .post(&self.webhook)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = rsp.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[derive(Debug, Serialize)]
pub struct DiscordEmbedField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
pub struct DiscordUrl {
    url: String,
}

#[derive(Debug, Serialize)]
pub struct DiscordFooter {
    text: String,
}

#[derive(Debug, Serialize)]
pub struct DiscordEmbed {
    title: String,
    url: String,
    description: String,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<DiscordUrl>,
    fields: Vec<DiscordEmbedField>,
    footer: DiscordFooter,
    timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct DiscordWebhookPayload {
    content: Option<String>,
    embeds: Vec<DiscordEmbed>,
}

impl From<Announcement> for DiscordWebhookPayload {
    fn from(a: Announcement) -> Self {
        Self {
            content: Some(a.content),
            embeds: vec![DiscordEmbed {
                title: a.title,
                url: a.url,
                description: a.description,
                color: a.color,
                image: a.image_url.map(|url| DiscordUrl { url }),
                fields: vec![
                    DiscordEmbedField {
                        name: "Source".into(),
                        value: a.source,
                        inline: true,
                    },
                    DiscordEmbedField {
                        name: "Date".into(),
                        value: a.date,
                        inline: true,
                    },
                ],
                footer: DiscordFooter { text: a.footer },
                timestamp: a.timestamp_iso,
            }],
        }
    }
}
