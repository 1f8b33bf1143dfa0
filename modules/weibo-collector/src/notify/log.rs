use async_trait::async_trait;
use tracing::info;

use super::backend::{NotifyBackend, PassReport};

/// Writes one log line per new post. Default backend of the monitor.
pub struct LogBackend;

#[async_trait]
impl NotifyBackend for LogBackend {
    async fn notify(&self, report: &PassReport<'_>) -> anyhow::Result<()> {
        for collected in report.posts {
            let post = &collected.post;
            info!(
                kind = %report.kind,
                author = post.status.author_id(),
                post_id = post.status.id(),
                images = collected.images.len(),
                repost = post.repost.is_some(),
                "{}",
                post.status.text()
            );
        }
        Ok(())
    }
}
