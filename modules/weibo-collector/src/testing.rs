// Test mocks for the collector.
//
// One mock per trait boundary:
// - MockFeed (FeedClient): scripted pages and long texts, records every call
// - MemoryStore (DedupStore): in-memory key set with the duplicate-key contract
// - MemorySink (ImageSink): in-memory image map
//
// Plus helpers for building statuses and posts.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use weibo_client::{ImageLocation, PicInfo, Post, PostKey, Status, User, WeiboError};
use weibo_store::{PostRecord, StoreError};

use crate::traits::{DedupStore, FeedClient, ImageSink};

// ---------------------------------------------------------------------------
// Canned failures
// ---------------------------------------------------------------------------

/// Failure a mock should answer with. `WeiboError` is not `Clone`, so mocks
/// keep the kind and build a fresh error per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    BadRequest,
    Status,
    Network,
    Decode,
}

impl Failure {
    fn to_error(&self) -> WeiboError {
        match self {
            Failure::BadRequest => WeiboError::BadRequest,
            Failure::Status => WeiboError::Status {
                ok: -100,
                message: "mock envelope not ok".to_string(),
            },
            Failure::Network => WeiboError::Network("mock connection reset".to_string()),
            Failure::Decode => WeiboError::Decode("mock bad payload".to_string()),
        }
    }
}

/// Upstream call observed by [`MockFeed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCall {
    Page { author: String, page: u32 },
    LongText(String),
    Image(String),
}

// ---------------------------------------------------------------------------
// MockFeed
// ---------------------------------------------------------------------------

/// Scripted feed. Unregistered pages are empty; unregistered long texts and
/// images fail with a network error.
/// Builder pattern: `.on_page()`, `.fail_page()`, `.on_long_text()`, `.fail_long_text()`, `.on_image()`.
#[derive(Default)]
pub struct MockFeed {
    pages: HashMap<(String, u32), Vec<Post>>,
    page_failures: HashMap<(String, u32), Failure>,
    long_texts: HashMap<String, String>,
    long_text_failures: HashMap<String, Failure>,
    images: HashMap<String, Bytes>,
    calls: Mutex<Vec<FeedCall>>,
}

impl MockFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(mut self, author: &str, page: u32, posts: Vec<Post>) -> Self {
        self.pages.insert((author.to_string(), page), posts);
        self
    }

    pub fn fail_page(mut self, author: &str, page: u32, failure: Failure) -> Self {
        self.page_failures.insert((author.to_string(), page), failure);
        self
    }

    pub fn on_long_text(mut self, variant_id: &str, text: &str) -> Self {
        self.long_texts.insert(variant_id.to_string(), text.to_string());
        self
    }

    pub fn fail_long_text(mut self, variant_id: &str, failure: Failure) -> Self {
        self.long_text_failures.insert(variant_id.to_string(), failure);
        self
    }

    pub fn on_image(mut self, url: &str, bytes: &'static [u8]) -> Self {
        self.images.insert(url.to_string(), Bytes::from_static(bytes));
        self
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<FeedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Pages fetched so far as `(author, page)`.
    pub fn pages_fetched(&self) -> Vec<(String, u32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FeedCall::Page { author, page } => Some((author, page)),
                _ => None,
            })
            .collect()
    }

    pub fn long_text_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FeedCall::LongText(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn image_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                FeedCall::Image(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: FeedCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl FeedClient for MockFeed {
    async fn fetch_page(&self, author: &str, page: u32) -> weibo_client::Result<Vec<Post>> {
        self.record(FeedCall::Page {
            author: author.to_string(),
            page,
        });
        let key = (author.to_string(), page);
        if let Some(failure) = self.page_failures.get(&key) {
            return Err(failure.to_error());
        }
        Ok(self.pages.get(&key).cloned().unwrap_or_default())
    }

    async fn long_text(&self, variant_id: &str) -> weibo_client::Result<String> {
        self.record(FeedCall::LongText(variant_id.to_string()));
        if let Some(failure) = self.long_text_failures.get(variant_id) {
            return Err(failure.to_error());
        }
        self.long_texts.get(variant_id).cloned().ok_or_else(|| {
            WeiboError::Network(format!("MockFeed: no long text registered for {variant_id}"))
        })
    }

    async fn download_image(&self, url: &str) -> weibo_client::Result<Bytes> {
        self.record(FeedCall::Image(url.to_string()));
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| WeiboError::Network(format!("MockFeed: no image registered for {url}")))
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// In-memory dedup store. Rows are kept in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    keys: Mutex<HashSet<PostKey>>,
    rows: Mutex<Vec<PostRecord>>,
    schema_calls: Mutex<u32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate with already collected keys.
    pub fn with_keys(self, keys: impl IntoIterator<Item = PostKey>) -> Self {
        self.keys.lock().unwrap().extend(keys);
        self
    }

    pub fn rows(&self) -> Vec<PostRecord> {
        self.rows.lock().unwrap().clone()
    }

    pub fn row(&self, key: &PostKey) -> Option<PostRecord> {
        self.rows().into_iter().find(|r| &r.key() == key)
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn schema_calls(&self) -> u32 {
        *self.schema_calls.lock().unwrap()
    }
}

#[async_trait]
impl DedupStore for MemoryStore {
    async fn ensure_schema(&self) -> weibo_store::Result<()> {
        *self.schema_calls.lock().unwrap() += 1;
        Ok(())
    }

    async fn exists(&self, key: &PostKey) -> weibo_store::Result<bool> {
        Ok(self.keys.lock().unwrap().contains(key))
    }

    async fn insert(&self, record: &PostRecord) -> weibo_store::Result<()> {
        let key = record.key();
        if !self.keys.lock().unwrap().insert(key.clone()) {
            return Err(StoreError::DuplicateKey(key));
        }
        self.rows.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Store that reports nothing as seen but rejects every insert as a duplicate,
/// as if another collector won the race.
#[derive(Default)]
pub struct RacingStore;

#[async_trait]
impl DedupStore for RacingStore {
    async fn ensure_schema(&self) -> weibo_store::Result<()> {
        Ok(())
    }

    async fn exists(&self, _key: &PostKey) -> weibo_store::Result<bool> {
        Ok(false)
    }

    async fn insert(&self, record: &PostRecord) -> weibo_store::Result<()> {
        Err(StoreError::DuplicateKey(record.key()))
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySink {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, key: &str, bytes: &[u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        self
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ImageSink for MemorySink {
    async fn contains(&self, key: &str) -> weibo_store::Result<bool> {
        Ok(self.files.lock().unwrap().contains_key(key))
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> weibo_store::Result<bool> {
        let mut files = self.files.lock().unwrap();
        if files.contains_key(key) {
            return Ok(false);
        }
        files.insert(key.to_string(), bytes.to_vec());
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Untruncated status by `author` with the given id pair and text.
pub fn status(author: i64, id: i64, variant_id: &str, text: &str) -> Status {
    Status::new(Some(User::new(author, format!("user{author}"))), id, variant_id)
        .with_text(text)
        .with_created_at("Tue Oct 01 10:00:00 +0800 2024")
}

/// Truncated status whose full text must be looked up by `variant_id`.
pub fn truncated(author: i64, id: i64, variant_id: &str, text: &str) -> Status {
    status(author, id, variant_id, text).with_truncated(true)
}

/// Attach flat-map images (`id -> url`) to a status.
pub fn with_pictures(status: Status, pics: &[(&str, &str)]) -> Status {
    let ids = pics.iter().map(|(id, _)| id.to_string()).collect();
    let infos = pics
        .iter()
        .map(|(id, url)| {
            (
                id.to_string(),
                PicInfo {
                    largest: Some(url.to_string()),
                },
            )
        })
        .collect();
    status.with_images(ids, ImageLocation::FlatMap(infos))
}

pub fn post(status: Status) -> Post {
    Post::new(status)
}
