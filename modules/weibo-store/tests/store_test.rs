//! Integration tests for PostStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.
//! Tests share the `posts` table, so each one writes under its own author ids.

use serde_json::json;
use sqlx::PgPool;
use weibo_client::{PostKey, UNKNOWN_AUTHOR};
use weibo_store::{PostRecord, PostStore, RepostColumns, StoreError};

/// Get a migrated store, or skip if no test DB is available.
async fn test_store() -> Option<PostStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;
    let store = PostStore::new(pool);

    store.migrate().await.ok()?;

    Some(store)
}

/// Author id no other test run writes under.
fn fresh_author() -> i64 {
    (uuid::Uuid::new_v4().as_u64_pair().0 >> 2) as i64
}

fn record(author_id: i64, post_id: i64, variant_id: &str) -> PostRecord {
    PostRecord {
        author_id,
        post_id,
        variant_id: variant_id.to_string(),
        text: "hello".to_string(),
        pics: json!(["https://img/1.jpg"]),
        created_at: "Tue Oct 01 10:00:00 +0800 2024".to_string(),
        repost: None,
    }
}

#[tokio::test]
async fn migrate_is_idempotent() {
    let Some(store) = test_store().await else {
        return;
    };
    store.migrate().await.unwrap();
    store.migrate().await.unwrap();
}

#[tokio::test]
async fn exists_after_insert() {
    let Some(store) = test_store().await else {
        return;
    };
    let rec = record(fresh_author(), 100, "A");

    assert!(!store.exists(&rec.key()).await.unwrap());
    store.insert(&rec).await.unwrap();
    assert!(store.exists(&rec.key()).await.unwrap());
}

#[tokio::test]
async fn second_insert_is_rejected_as_duplicate() {
    let Some(store) = test_store().await else {
        return;
    };
    let author = fresh_author();
    let rec = record(author, 100, "A");
    store.insert(&rec).await.unwrap();

    let mut changed = rec.clone();
    changed.text = "different".to_string();
    let err = store.insert(&changed).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey(ref key) if *key == rec.key()));

    assert_eq!(store.recent(author, 10).await.unwrap().len(), 1);
    let row = store.get(&rec.key()).await.unwrap().unwrap();
    assert_eq!(row.text, "hello");
}

#[tokio::test]
async fn key_triple_is_the_identity() {
    let Some(store) = test_store().await else {
        return;
    };
    let first = fresh_author();
    let second = first + 1;
    store.insert(&record(first, 100, "A")).await.unwrap();
    store.insert(&record(first, 100, "B")).await.unwrap();
    store.insert(&record(second, 100, "A")).await.unwrap();

    assert_eq!(store.recent(first, 10).await.unwrap().len(), 2);
    assert_eq!(store.recent(second, 10).await.unwrap().len(), 1);
    assert!(store.count().await.unwrap() >= 3);
    assert!(!store
        .exists(&PostKey {
            author_id: first,
            post_id: 101,
            variant_id: "A".to_string()
        })
        .await
        .unwrap());
}

#[tokio::test]
async fn repost_columns_round_trip() {
    let Some(store) = test_store().await else {
        return;
    };
    let author = fresh_author();
    let mut rec = record(author, 100, "A");
    rec.repost = Some(RepostColumns {
        author_id: UNKNOWN_AUTHOR,
        post_id: 50,
        variant_id: "R".to_string(),
        text: "inner".to_string(),
        pics: json!([]),
        created_at: "Mon Sep 30 08:00:00 +0800 2024".to_string(),
    });
    store.insert(&rec).await.unwrap();

    let row = store.get(&rec.key()).await.unwrap().unwrap();
    assert_eq!(row.repost_author_id, Some(UNKNOWN_AUTHOR));
    assert_eq!(row.repost_variant_id.as_deref(), Some("R"));
    assert_eq!(row.repost_pics, Some(json!([])));

    let plain = record(author, 101, "B");
    store.insert(&plain).await.unwrap();
    let row = store.get(&plain.key()).await.unwrap().unwrap();
    assert!(row.repost_id.is_none());

    let recent = store.recent(author, 10).await.unwrap();
    assert_eq!(recent.len(), 2);
}
