use tracing::{debug, info};

use weibo_client::{Post, Status};

use crate::traits::FeedClient;

/// Fill in the full text of a truncated status.
///
/// Untruncated statuses make no upstream call. A `BadRequest` answer means the
/// full text is not available to this session: the status keeps its listed
/// text and `Ok(false)` is returned. Any other failure is returned as is.
pub async fn resolve_status(
    feed: &dyn FeedClient,
    status: &mut Status,
) -> weibo_client::Result<bool> {
    if !status.is_truncated() || status.resolved_text().is_some() {
        return Ok(false);
    }

    match feed.long_text(status.variant_id()).await {
        Ok(text) => {
            debug!(post_id = status.id(), chars = text.chars().count(), "Resolved long text");
            Ok(status.resolve_text(text))
        }
        Err(e) if e.is_bad_request() => {
            info!(
                post_id = status.id(),
                variant_id = status.variant_id(),
                "Long text unavailable, keeping truncated text"
            );
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Resolve a post and its repost as two independent lookups.
pub async fn resolve_post(feed: &dyn FeedClient, post: &mut Post) -> weibo_client::Result<()> {
    resolve_status(feed, &mut post.status).await?;
    if let Some(repost) = post.repost.as_mut() {
        resolve_status(feed, repost).await?;
    }
    Ok(())
}
