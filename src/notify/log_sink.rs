use super::{Announcement, DeliveryError, Notifier};
use crate::ingest::types::NewsItem;

/// Writes announcements to the log; used when no webhook is configured.
pub struct LogNotifier {
    source_label: String,
}

impl LogNotifier {
    pub fn new(source_label: String) -> Self {
        Self { source_label }
    }
}

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, item: &NewsItem) -> Result<(), DeliveryError> {
        let a = Announcement::render(item, &self.source_label, 0);
        tracing::info!(
            target: "newswatch",
            title = %a.title,
            url = %a.url,
            date = %a.date,
            image = a.image_url.as_deref().unwrap_or(""),
            "{}",
            a.content
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
