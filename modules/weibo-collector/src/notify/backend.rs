use async_trait::async_trait;

use crate::collector::{CollectedPost, PassKind};

/// Outcome of one pass with new posts, handed to a [`NotifyBackend`].
#[derive(Debug, Clone, Copy)]
pub struct PassReport<'a> {
    pub kind: PassKind,
    pub posts: &'a [CollectedPost],
}

/// Pluggable delivery of "new posts found" events.
#[async_trait]
pub trait NotifyBackend: Send + Sync {
    async fn notify(&self, report: &PassReport<'_>) -> anyhow::Result<()>;
}
