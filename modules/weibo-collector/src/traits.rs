// Seams between the collector and its collaborators.
//
// FeedClient covers every upstream call a pass makes; DedupStore and ImageSink
// cover persistence. Production impls wrap WeiboClient, PostStore and ImageDir;
// the in-memory mocks live in `testing`.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use weibo_client::{FeedSource, Post, PostKey, WeiboClient};
use weibo_store::{ImageDir, PostRecord, PostStore};

// ---------------------------------------------------------------------------
// FeedClient
// ---------------------------------------------------------------------------

#[async_trait]
pub trait FeedClient: Send + Sync {
    /// One listing page of an author. Exactly one upstream call.
    async fn fetch_page(&self, author: &str, page: u32) -> weibo_client::Result<Vec<Post>>;

    /// Full text of a truncated post.
    async fn long_text(&self, variant_id: &str) -> weibo_client::Result<String>;

    async fn download_image(&self, url: &str) -> weibo_client::Result<Bytes>;
}

/// [`WeiboClient`] bound to one listing surface.
#[derive(Clone)]
pub struct WeiboFeed {
    client: Arc<WeiboClient>,
    source: FeedSource,
}

impl WeiboFeed {
    pub fn new(client: Arc<WeiboClient>, source: FeedSource) -> Self {
        Self { client, source }
    }

    pub fn source(&self) -> FeedSource {
        self.source
    }
}

#[async_trait]
impl FeedClient for WeiboFeed {
    async fn fetch_page(&self, author: &str, page: u32) -> weibo_client::Result<Vec<Post>> {
        self.client.posts(self.source, author, page).await
    }

    async fn long_text(&self, variant_id: &str) -> weibo_client::Result<String> {
        self.client.long_text(variant_id).await
    }

    async fn download_image(&self, url: &str) -> weibo_client::Result<Bytes> {
        self.client.download_image(url).await
    }
}

// ---------------------------------------------------------------------------
// DedupStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Create the persisted layout if missing. Idempotent.
    async fn ensure_schema(&self) -> weibo_store::Result<()>;

    async fn exists(&self, key: &PostKey) -> weibo_store::Result<bool>;

    /// Insert a new row. A second insert of the same key must fail with
    /// `StoreError::DuplicateKey`.
    async fn insert(&self, record: &PostRecord) -> weibo_store::Result<()>;
}

#[async_trait]
impl DedupStore for PostStore {
    async fn ensure_schema(&self) -> weibo_store::Result<()> {
        self.migrate().await
    }

    async fn exists(&self, key: &PostKey) -> weibo_store::Result<bool> {
        PostStore::exists(self, key).await
    }

    async fn insert(&self, record: &PostRecord) -> weibo_store::Result<()> {
        PostStore::insert(self, record).await
    }
}

// ---------------------------------------------------------------------------
// ImageSink
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ImageSink: Send + Sync {
    async fn contains(&self, key: &str) -> weibo_store::Result<bool>;

    /// Persist `bytes` under `key` unless already present. Returns whether
    /// anything was written.
    async fn write(&self, key: &str, bytes: &[u8]) -> weibo_store::Result<bool>;
}

#[async_trait]
impl ImageSink for ImageDir {
    async fn contains(&self, key: &str) -> weibo_store::Result<bool> {
        ImageDir::contains(self, key).await
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> weibo_store::Result<bool> {
        ImageDir::write(self, key, bytes).await
    }
}
