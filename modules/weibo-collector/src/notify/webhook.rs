use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::warn;

use super::backend::{NotifyBackend, PassReport};

/// Longest post excerpt put in a webhook message.
const EXCERPT_CHARS: usize = 140;

/// Slack-compatible incoming webhook backend.
pub struct WebhookBackend {
    webhook_url: String,
    http: reqwest::Client,
}

impl WebhookBackend {
    /// Every delivery is bounded by `timeout`.
    pub fn new(webhook_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { webhook_url, http })
    }

    fn message(report: &PassReport<'_>) -> String {
        let mut lines = vec![format!(
            ":mag: *{} new post(s)* ({} pass)",
            report.posts.len(),
            report.kind
        )];

        for collected in report.posts {
            let status = &collected.post.status;
            let text = status.text().replace('\n', " ");
            let mut excerpt: String = text.chars().take(EXCERPT_CHARS).collect();
            if text.chars().count() > EXCERPT_CHARS {
                excerpt.push_str("...");
            }
            lines.push(format!(
                "- https://weibo.com/{}/{} {}",
                status.author_id(),
                status.variant_id(),
                excerpt
            ));
        }

        lines.join("\n")
    }
}

#[async_trait]
impl NotifyBackend for WebhookBackend {
    async fn notify(&self, report: &PassReport<'_>) -> anyhow::Result<()> {
        if report.posts.is_empty() {
            return Ok(());
        }

        let payload = json!({
            "text": Self::message(report),
            "unfurl_links": false,
        });

        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Webhook returned non-success");
            anyhow::bail!("Webhook returned {status}");
        }

        Ok(())
    }
}
