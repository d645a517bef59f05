//! Webhook delivery over HTTP.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use std::time::Duration;

/// Posts JSON payloads to chat webhooks.
pub struct WebhookPoster {
    client: Client,
}

impl Default for WebhookPoster {
    fn default() -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(25))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

impl WebhookPoster {
    /// POST the payload to a single webhook URL. Any non-2xx response is an
    /// error carrying the status and body.
    pub async fn post(&self, url: &str, payload: &serde_json::Value) -> Result<()> {
        let resp = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .context("sending webhook request")?;

        let status = resp.status();
        if status.as_u16() >= 300 {
            let body = resp.text().await.unwrap_or_default();
            bail!("webhook failed: {} {}", status, body);
        }
        Ok(())
    }

    /// Post to every configured webhook, stopping at the first failure.
    /// Returns the number of successful deliveries.
    pub async fn post_all(&self, urls: &[String], payload: &serde_json::Value) -> Result<usize> {
        let mut delivered = 0;
        for url in urls {
            self.post(url, payload)
                .await
                .with_context(|| format!("posting to webhook #{}", delivered + 1))?;
            delivered += 1;
            tracing::debug!(delivered, "webhook delivered");
        }
        Ok(delivered)
    }
}
