use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use weibo_client::{resolve_images, Post, ResolvedImages};
use weibo_store::PostRecord;

use crate::error::Result;
use crate::resolve;
use crate::traits::{DedupStore, FeedClient, ImageSink};

/// Last page read by a full backfill.
pub const FULL_BACKFILL_LAST_PAGE: u32 = 98;

/// Knobs for a [`Collector`]. Everything but the page range is shared by both
/// pass kinds.
#[derive(Debug, Clone, TypedBuilder)]
pub struct CollectorSettings {
    #[builder(default = 1)]
    pub start_page: u32,
    /// Fixed pause between two page fetches of the same pass.
    #[builder(default = Duration::from_secs(10))]
    pub page_delay: Duration,
    #[builder(default = true)]
    pub long_text: bool,
    #[builder(default = FULL_BACKFILL_LAST_PAGE)]
    pub backfill_last_page: u32,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Incremental,
    Backfill,
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PassKind::Incremental => "incremental",
            PassKind::Backfill => "backfill",
        })
    }
}

/// A post first seen (and stored) during a pass.
#[derive(Debug, Clone)]
pub struct CollectedPost {
    pub post: Post,
    pub images: ResolvedImages,
    pub repost_images: Option<ResolvedImages>,
}

/// Walks author pages, resolves each post and stores the ones not seen before.
pub struct Collector {
    feed: Arc<dyn FeedClient>,
    store: Arc<dyn DedupStore>,
    images: Option<Arc<dyn ImageSink>>,
    settings: CollectorSettings,
}

impl Collector {
    pub fn new(
        feed: Arc<dyn FeedClient>,
        store: Arc<dyn DedupStore>,
        settings: CollectorSettings,
    ) -> Self {
        Self {
            feed,
            store,
            images: None,
            settings,
        }
    }

    /// Download images of new posts into `sink` before they are stored.
    pub fn with_image_sink(mut self, sink: Arc<dyn ImageSink>) -> Self {
        self.images = Some(sink);
        self
    }

    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        self.store.ensure_schema().await?;
        Ok(())
    }

    /// Read the starting page of every author.
    pub async fn run_incremental_pass(&self, authors: &[String]) -> Result<Vec<CollectedPost>> {
        let start = self.settings.start_page;
        self.run_pass(PassKind::Incremental, authors, start, start)
            .await
    }

    /// Read every author from the starting page through the backfill limit.
    pub async fn run_full_backfill(&self, authors: &[String]) -> Result<Vec<CollectedPost>> {
        self.run_pass(
            PassKind::Backfill,
            authors,
            self.settings.start_page,
            self.settings.backfill_last_page,
        )
        .await
    }

    async fn run_pass(
        &self,
        kind: PassKind,
        authors: &[String],
        first_page: u32,
        last_page: u32,
    ) -> Result<Vec<CollectedPost>> {
        let run_id = Uuid::new_v4();
        let span = info_span!("pass", %run_id, %kind);

        async move {
            info!(authors = authors.len(), first_page, last_page, "Pass started");
            let mut collected = Vec::new();
            let mut fetched_any = false;

            for author in authors {
                for page in first_page..=last_page {
                    if fetched_any && !self.settings.page_delay.is_zero() {
                        tokio::time::sleep(self.settings.page_delay).await;
                    }
                    fetched_any = true;

                    let posts = self.feed.fetch_page(author, page).await?;
                    debug!(author = author.as_str(), page, posts = posts.len(), "Fetched page");

                    for post in posts {
                        if let Some(new) = self.collect_post(post).await? {
                            info!(
                                author = author.as_str(),
                                page,
                                post_id = new.post.status.id(),
                                "New post: {}",
                                new.post
                            );
                            collected.push(new);
                        }
                    }
                }
            }

            info!(new_posts = collected.len(), "Pass finished");
            Ok(collected)
        }
        .instrument(span)
        .await
    }

    /// Resolve, check and store one post. `None` when it was already stored.
    async fn collect_post(&self, mut post: Post) -> Result<Option<CollectedPost>> {
        if self.settings.long_text {
            resolve::resolve_post(self.feed.as_ref(), &mut post).await?;
        }
        let images = resolve_images(&post.status)?;
        let repost_images = post.repost.as_ref().map(resolve_images).transpose()?;

        let key = post.key();
        if self.store.exists(&key).await? {
            debug!(%key, "Already stored");
            return Ok(None);
        }

        if let Some(sink) = &self.images {
            self.download(sink.as_ref(), &images).await?;
            if let Some(repost_images) = &repost_images {
                self.download(sink.as_ref(), repost_images).await?;
            }
        }

        let record = PostRecord::from_post(&post, &images, repost_images.as_ref());
        match self.store.insert(&record).await {
            Ok(()) => {}
            Err(e) if e.is_duplicate() => {
                debug!(%key, "Stored concurrently, skipping");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Some(CollectedPost {
            post,
            images,
            repost_images,
        }))
    }

    async fn download(&self, sink: &dyn ImageSink, images: &ResolvedImages) -> Result<()> {
        for (id, url) in images.iter() {
            let Some(url) = url else {
                warn!(image_id = id, "Image has no URL, skipping download");
                continue;
            };
            if sink.contains(id).await? {
                continue;
            }
            let bytes = self.feed.download_image(url).await?;
            sink.write(id, &bytes).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_defaults() {
        let settings = CollectorSettings::default();
        assert_eq!(settings.start_page, 1);
        assert_eq!(settings.page_delay, Duration::from_secs(10));
        assert!(settings.long_text);
        assert_eq!(settings.backfill_last_page, FULL_BACKFILL_LAST_PAGE);
    }

    #[test]
    fn builder_overrides() {
        let settings = CollectorSettings::builder()
            .start_page(3)
            .page_delay(Duration::ZERO)
            .long_text(false)
            .build();
        assert_eq!(settings.start_page, 3);
        assert!(settings.page_delay.is_zero());
        assert!(!settings.long_text);
    }
}
