//! Collector behavior against in-memory mocks. No network, no database.

use std::sync::Arc;
use std::time::Duration;

use weibo_client::{ImageLocation, MediaItem, MediaKind, PostKey, Status, User, UNKNOWN_AUTHOR};
use weibo_collector::testing::{
    post, status, truncated, with_pictures, Failure, FeedCall, MemorySink, MemoryStore, MockFeed,
    RacingStore,
};
use weibo_collector::{CollectError, Collector, CollectorSettings, FULL_BACKFILL_LAST_PAGE};

fn settings() -> CollectorSettings {
    CollectorSettings::builder()
        .page_delay(Duration::ZERO)
        .build()
}

fn collector(feed: &Arc<MockFeed>, store: &Arc<MemoryStore>) -> Collector {
    Collector::new(feed.clone(), store.clone(), settings())
}

fn authors(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

fn key(author_id: i64, post_id: i64, variant_id: &str) -> PostKey {
    PostKey {
        author_id,
        post_id,
        variant_id: variant_id.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Dedup
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_pass_without_new_posts_is_empty() {
    let feed = Arc::new(MockFeed::new().on_page(
        "42",
        1,
        vec![post(status(42, 1, "A", "one")), post(status(42, 2, "B", "two"))],
    ));
    let store = Arc::new(MemoryStore::new());
    let collector = collector(&feed, &store);

    let first = collector.run_incremental_pass(&authors(&["42"])).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].post.status.id(), 1);
    assert_eq!(first[1].post.status.id(), 2);

    let second = collector.run_incremental_pass(&authors(&["42"])).await.unwrap();
    assert!(second.is_empty());
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn only_unseen_posts_are_returned() {
    let feed = Arc::new(MockFeed::new().on_page(
        "42",
        1,
        vec![post(status(42, 1, "A", "old")), post(status(42, 2, "B", "new"))],
    ));
    let store = Arc::new(MemoryStore::new().with_keys([key(42, 1, "A")]));

    let found = collector(&feed, &store)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].post.key(), key(42, 2, "B"));
}

#[tokio::test]
async fn duplicate_on_insert_counts_as_already_present() {
    let feed = Arc::new(MockFeed::new().on_page("42", 1, vec![post(status(42, 1, "A", "x"))]));
    let collector = Collector::new(feed, Arc::new(RacingStore), settings());

    let found = collector.run_incremental_pass(&authors(&["42"])).await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn no_new_posts_yields_empty_vec() {
    let feed = Arc::new(MockFeed::new());
    let store = Arc::new(MemoryStore::new());

    let found = collector(&feed, &store)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn ensure_schema_reaches_the_store() {
    let feed = Arc::new(MockFeed::new());
    let store = Arc::new(MemoryStore::new());
    let collector = collector(&feed, &store);

    collector.ensure_schema().await.unwrap();
    collector.ensure_schema().await.unwrap();
    assert_eq!(store.schema_calls(), 2);
}

// ---------------------------------------------------------------------------
// Long text
// ---------------------------------------------------------------------------

#[tokio::test]
async fn untruncated_posts_never_fetch_long_text() {
    let feed = Arc::new(MockFeed::new().on_page("42", 1, vec![post(status(42, 1, "A", "short"))]));
    let store = Arc::new(MemoryStore::new());

    let found = collector(&feed, &store)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap();

    assert!(feed.long_text_calls().is_empty());
    let status = &found[0].post.status;
    assert!(status.resolved_text().is_none());
    assert_eq!(status.text(), "short");
    assert_eq!(store.row(&key(42, 1, "A")).unwrap().text, "short");
}

#[tokio::test]
async fn truncated_post_is_stored_with_full_text() {
    let feed = Arc::new(
        MockFeed::new()
            .on_page("42", 1, vec![post(truncated(42, 1, "A", "preview..."))])
            .on_long_text("A", "the whole text"),
    );
    let store = Arc::new(MemoryStore::new());

    let found = collector(&feed, &store)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap();

    assert_eq!(feed.long_text_calls(), vec!["A"]);
    assert_eq!(found[0].post.status.text(), "the whole text");
    assert_eq!(store.row(&key(42, 1, "A")).unwrap().text, "the whole text");
}

#[tokio::test]
async fn long_text_lookup_can_be_disabled() {
    let feed = Arc::new(
        MockFeed::new().on_page("42", 1, vec![post(truncated(42, 1, "A", "preview..."))]),
    );
    let store = Arc::new(MemoryStore::new());
    let settings = CollectorSettings::builder()
        .page_delay(Duration::ZERO)
        .long_text(false)
        .build();

    let found = Collector::new(feed.clone(), store.clone(), settings)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap();

    assert!(feed.long_text_calls().is_empty());
    assert_eq!(found[0].post.status.text(), "preview...");
}

#[tokio::test]
async fn bad_request_keeps_truncated_text_and_pass_completes() {
    let feed = Arc::new(
        MockFeed::new()
            .on_page(
                "42",
                1,
                vec![
                    post(truncated(42, 1, "A", "preview...")),
                    post(status(42, 2, "B", "next")),
                ],
            )
            .fail_long_text("A", Failure::BadRequest),
    );
    let store = Arc::new(MemoryStore::new());

    let found = collector(&feed, &store)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap();

    assert_eq!(found.len(), 2);
    assert!(found[0].post.status.resolved_text().is_none());
    assert_eq!(store.row(&key(42, 1, "A")).unwrap().text, "preview...");
}

#[tokio::test]
async fn other_long_text_failures_abort_the_pass() {
    let feed = Arc::new(
        MockFeed::new()
            .on_page(
                "42",
                1,
                vec![
                    post(status(42, 1, "A", "stored first")),
                    post(truncated(42, 2, "B", "preview...")),
                    post(status(42, 3, "C", "never reached")),
                ],
            )
            .fail_long_text("B", Failure::Status),
    );
    let store = Arc::new(MemoryStore::new());

    let err = collector(&feed, &store)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Upstream(_)));
    // Rows stored before the failure stand.
    assert_eq!(store.len(), 1);
    assert!(store.row(&key(42, 1, "A")).is_some());
}

#[tokio::test]
async fn repost_bad_request_does_not_block_outer_text() {
    let outer = truncated(42, 1, "A", "outer preview...");
    let inner = truncated(7, 9, "R", "inner preview...");
    let feed = Arc::new(
        MockFeed::new()
            .on_page("42", 1, vec![post(outer).with_repost(inner)])
            .on_long_text("A", "outer full")
            .fail_long_text("R", Failure::BadRequest),
    );
    let store = Arc::new(MemoryStore::new());

    let found = collector(&feed, &store)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap();

    assert_eq!(feed.long_text_calls(), vec!["A", "R"]);
    let post = &found[0].post;
    assert_eq!(post.status.text(), "outer full");
    assert_eq!(post.repost.as_ref().unwrap().text(), "inner preview...");

    let row = store.row(&key(42, 1, "A")).unwrap();
    let repost = row.repost.unwrap();
    assert_eq!(row.text, "outer full");
    assert_eq!(repost.text, "inner preview...");
    assert_eq!(repost.post_id, 9);
}

#[tokio::test]
async fn outer_bad_request_still_resolves_repost() {
    let outer = truncated(42, 1, "A", "outer preview...");
    let inner = truncated(7, 9, "R", "inner preview...");
    let feed = Arc::new(
        MockFeed::new()
            .on_page("42", 1, vec![post(outer).with_repost(inner)])
            .fail_long_text("A", Failure::BadRequest)
            .on_long_text("R", "inner full"),
    );
    let store = Arc::new(MemoryStore::new());

    let found = collector(&feed, &store)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap();

    let post = &found[0].post;
    assert_eq!(post.status.text(), "outer preview...");
    assert_eq!(post.repost.as_ref().unwrap().text(), "inner full");
}

#[tokio::test]
async fn repost_without_author_is_stored_with_sentinel() {
    let inner = Status::new(None, 9, "R").with_text("inner");
    let feed = Arc::new(
        MockFeed::new().on_page("42", 1, vec![post(status(42, 1, "A", "outer")).with_repost(inner)]),
    );
    let store = Arc::new(MemoryStore::new());

    collector(&feed, &store)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap();

    let repost = store.row(&key(42, 1, "A")).unwrap().repost.unwrap();
    assert_eq!(repost.author_id, UNKNOWN_AUTHOR);
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[tokio::test]
async fn incremental_pass_reads_one_page_per_author() {
    let feed = Arc::new(
        MockFeed::new()
            .on_page("1", 1, vec![post(status(1, 10, "A", "a"))])
            .on_page("2", 1, vec![post(status(2, 20, "B", "b"))]),
    );
    let store = Arc::new(MemoryStore::new());

    let found = collector(&feed, &store)
        .run_incremental_pass(&authors(&["1", "2"]))
        .await
        .unwrap();

    assert_eq!(
        feed.pages_fetched(),
        vec![("1".to_string(), 1), ("2".to_string(), 1)]
    );
    let ids: Vec<i64> = found.iter().map(|c| c.post.status.id()).collect();
    assert_eq!(ids, vec![10, 20]);
}

#[tokio::test]
async fn incremental_pass_starts_at_configured_page() {
    let feed = Arc::new(MockFeed::new());
    let store = Arc::new(MemoryStore::new());
    let settings = CollectorSettings::builder()
        .page_delay(Duration::ZERO)
        .start_page(4)
        .build();

    Collector::new(feed.clone(), store, settings)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap();

    assert_eq!(feed.pages_fetched(), vec![("42".to_string(), 4)]);
}

#[tokio::test]
async fn full_backfill_walks_every_page() {
    let feed = Arc::new(
        MockFeed::new()
            .on_page("42", 1, vec![post(status(42, 1, "A", "newest"))])
            .on_page("42", FULL_BACKFILL_LAST_PAGE, vec![post(status(42, 2, "B", "oldest"))]),
    );
    let store = Arc::new(MemoryStore::new());

    let found = collector(&feed, &store)
        .run_full_backfill(&authors(&["42"]))
        .await
        .unwrap();

    let pages: Vec<u32> = feed.pages_fetched().into_iter().map(|(_, p)| p).collect();
    assert_eq!(pages, (1..=FULL_BACKFILL_LAST_PAGE).collect::<Vec<_>>());
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn page_failure_stops_all_further_fetches() {
    let feed = Arc::new(
        MockFeed::new()
            .on_page("1", 1, vec![post(status(1, 10, "A", "a"))])
            .fail_page("1", 3, Failure::Network),
    );
    let store = Arc::new(MemoryStore::new());

    let err = collector(&feed, &store)
        .run_full_backfill(&authors(&["1", "2"]))
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Upstream(_)));
    assert_eq!(
        feed.pages_fetched(),
        vec![
            ("1".to_string(), 1),
            ("1".to_string(), 2),
            ("1".to_string(), 3)
        ]
    );
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn bad_request_on_a_page_is_fatal() {
    let feed = Arc::new(MockFeed::new().fail_page("42", 1, Failure::BadRequest));
    let store = Arc::new(MemoryStore::new());

    let err = collector(&feed, &store)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Upstream(ref e) if e.is_bad_request()));
}

#[tokio::test(start_paused = true)]
async fn delay_is_applied_between_pages() {
    let feed = Arc::new(MockFeed::new());
    let store = Arc::new(MemoryStore::new());
    let settings = CollectorSettings::builder()
        .page_delay(Duration::from_secs(10))
        .backfill_last_page(3)
        .build();

    let started = tokio::time::Instant::now();
    Collector::new(feed.clone(), store, settings)
        .run_full_backfill(&authors(&["42"]))
        .await
        .unwrap();

    assert_eq!(feed.pages_fetched().len(), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(20));
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

#[tokio::test]
async fn images_are_resolved_from_either_shape() {
    let flat = with_pictures(status(42, 1, "A", "flat"), &[("i1", "u1")]);
    let list = status(42, 2, "B", "list").with_images(
        vec![],
        ImageLocation::ItemList(vec![
            MediaItem {
                id: "p1".to_string(),
                kind: MediaKind::Picture,
                largest: Some("u2".to_string()),
            },
            MediaItem {
                id: "v1".to_string(),
                kind: MediaKind::from_tag("video"),
                largest: None,
            },
        ]),
    );
    let feed = Arc::new(MockFeed::new().on_page("42", 1, vec![post(flat), post(list)]));
    let store = Arc::new(MemoryStore::new());

    let found = collector(&feed, &store)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap();

    assert_eq!(found[0].images.get("i1"), Some("u1"));
    assert_eq!(found[1].images.get("p1"), Some("u2"));
    assert_eq!(found[1].images.len(), 1);
    assert_eq!(
        store.row(&key(42, 2, "B")).unwrap().pics,
        serde_json::json!(["u2"])
    );
}

#[tokio::test]
async fn malformed_image_entry_aborts_the_pass() {
    let broken = status(42, 1, "A", "broken").with_images(
        vec!["i1".to_string()],
        ImageLocation::FlatMap(
            [("i1".to_string(), weibo_client::PicInfo { largest: None })]
                .into_iter()
                .collect(),
        ),
    );
    let feed = Arc::new(MockFeed::new().on_page("42", 1, vec![post(broken)]));
    let store = Arc::new(MemoryStore::new());

    let err = collector(&feed, &store)
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Upstream(_)));
    assert!(store.is_empty());
}

#[tokio::test]
async fn images_are_downloaded_before_insert_and_skipped_when_present() {
    let outer = with_pictures(status(42, 1, "A", "pics"), &[("i1", "https://img/1"), ("i2", "https://img/2")]);
    let inner = with_pictures(
        Status::new(Some(User::new(7, "other")), 9, "R"),
        &[("i3", "https://img/3")],
    );
    let feed = Arc::new(
        MockFeed::new()
            .on_page("42", 1, vec![post(outer).with_repost(inner)])
            .on_image("https://img/2", b"two")
            .on_image("https://img/3", b"three"),
    );
    let store = Arc::new(MemoryStore::new());
    let sink = Arc::new(MemorySink::new().with_file("i1", b"cached"));

    Collector::new(feed.clone(), store.clone(), settings())
        .with_image_sink(sink.clone())
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap();

    assert_eq!(feed.image_calls(), vec!["https://img/2", "https://img/3"]);
    assert_eq!(sink.get("i1").unwrap(), b"cached");
    assert_eq!(sink.get("i2").unwrap(), b"two");
    assert_eq!(sink.get("i3").unwrap(), b"three");
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn failed_download_leaves_post_unseen() {
    let outer = with_pictures(status(42, 1, "A", "pics"), &[("i1", "https://img/missing")]);
    let feed = Arc::new(MockFeed::new().on_page("42", 1, vec![post(outer)]));
    let store = Arc::new(MemoryStore::new());

    let err = Collector::new(feed.clone(), store.clone(), settings())
        .with_image_sink(Arc::new(MemorySink::new()))
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap_err();

    assert!(matches!(err, CollectError::Upstream(_)));
    assert!(store.is_empty());
}

#[tokio::test]
async fn known_posts_do_not_download_images() {
    let outer = with_pictures(status(42, 1, "A", "pics"), &[("i1", "https://img/1")]);
    let feed = Arc::new(MockFeed::new().on_page("42", 1, vec![post(outer)]));
    let store = Arc::new(MemoryStore::new().with_keys([key(42, 1, "A")]));

    Collector::new(feed.clone(), store, settings())
        .with_image_sink(Arc::new(MemorySink::new()))
        .run_incremental_pass(&authors(&["42"]))
        .await
        .unwrap();

    assert!(!feed
        .calls()
        .iter()
        .any(|call| matches!(call, FeedCall::Image(_))));
}
