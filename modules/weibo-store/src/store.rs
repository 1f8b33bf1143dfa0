// Postgres persistence for seen posts.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};
use weibo_client::PostKey;

use crate::error::{Result, StoreError};
use crate::record::{PostRecord, StoredPost};

/// Set of already collected posts, one row per identity triple.
#[derive(Clone)]
pub struct PostStore {
    pool: PgPool,
}

impl PostStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;
        info!("Connected to post store");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations. Safe to call on every start.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn exists(&self, key: &PostKey) -> Result<bool> {
        let found = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM posts
                WHERE author_id = $1 AND post_id = $2 AND variant_id = $3
            )
            "#,
        )
        .bind(key.author_id)
        .bind(key.post_id)
        .bind(&key.variant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(found)
    }

    /// Record a post. A row with the same identity triple yields
    /// [`StoreError::DuplicateKey`] and leaves the existing row untouched.
    pub async fn insert(&self, record: &PostRecord) -> Result<()> {
        let repost = record.repost.as_ref();
        let result = sqlx::query(
            r#"
            INSERT INTO posts
                (author_id, post_id, variant_id, text, pics, created_at,
                 repost_author_id, repost_id, repost_variant_id,
                 repost_text, repost_pics, repost_created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.author_id)
        .bind(record.post_id)
        .bind(&record.variant_id)
        .bind(&record.text)
        .bind(&record.pics)
        .bind(&record.created_at)
        .bind(repost.map(|r| r.author_id))
        .bind(repost.map(|r| r.post_id))
        .bind(repost.map(|r| r.variant_id.as_str()))
        .bind(repost.map(|r| r.text.as_str()))
        .bind(repost.map(|r| &r.pics))
        .bind(repost.map(|r| r.created_at.as_str()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(key = %record.key(), "Recorded post");
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateKey(record.key()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, key: &PostKey) -> Result<Option<StoredPost>> {
        let row = sqlx::query_as::<_, StoredPost>(
            r#"
            SELECT * FROM posts
            WHERE author_id = $1 AND post_id = $2 AND variant_id = $3
            "#,
        )
        .bind(key.author_id)
        .bind(key.post_id)
        .bind(&key.variant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Most recently collected posts of an author.
    pub async fn recent(&self, author_id: i64, limit: i64) -> Result<Vec<StoredPost>> {
        let rows = sqlx::query_as::<_, StoredPost>(
            r#"
            SELECT * FROM posts
            WHERE author_id = $1
            ORDER BY collected_at DESC
            LIMIT $2
            "#,
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn count(&self) -> Result<i64> {
        let n = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Close the pool. Outstanding connections finish first.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
