use async_trait::async_trait;

use super::backend::{NotifyBackend, PassReport};

/// No-op notification backend for testing.
pub struct NoopBackend;

#[async_trait]
impl NotifyBackend for NoopBackend {
    async fn notify(&self, _report: &PassReport<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}
