// src/ingest/http.rs
use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;

use crate::ingest::types::{Transport, TransportError};

/// Live page fetch over reqwest, bounded by a per-request timeout.
pub struct HttpTransport {
    client: Client,
    timeout_secs: u64,
}

impl HttpTransport {
    pub fn new(timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.min(5)))
            .build()?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<String, TransportError> {
        let mut req = self.client.get(url);
        for (k, v) in headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let resp = req.send().await.map_err(|e| {
            counter!("newswatch_fetch_errors_total").increment(1);
            if e.is_timeout() {
                TransportError::Timeout(self.timeout_secs)
            } else {
                TransportError::Request(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            counter!("newswatch_fetch_errors_total").increment(1);
            return Err(TransportError::Status(status.as_u16()));
        }
        resp.text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Serves a fixed page; used for fixtures and offline runs.
pub struct StaticTransport {
    body: Option<String>,
}

impl StaticTransport {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            body: Some(body.to_string()),
        }
    }

    /// Every fetch fails as a transport error.
    pub fn failing() -> Self {
        Self { body: None }
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn fetch(
        &self,
        _url: &str,
        _headers: &BTreeMap<String, String>,
    ) -> Result<String, TransportError> {
        self.body
            .clone()
            .ok_or_else(|| TransportError::Request("static transport has no page".into()))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
