use chrono::{DateTime, Utc};
use serde_json::Value;
use weibo_client::{Post, PostKey, ResolvedImages, Status};

/// Flat row written for a newly seen post.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub author_id: i64,
    pub post_id: i64,
    pub variant_id: String,
    pub text: String,
    pub pics: Value,
    pub created_at: String,
    pub repost: Option<RepostColumns>,
}

/// Repost columns of a [`PostRecord`]. `author_id` is -1 when unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct RepostColumns {
    pub author_id: i64,
    pub post_id: i64,
    pub variant_id: String,
    pub text: String,
    pub pics: Value,
    pub created_at: String,
}

impl PostRecord {
    /// Build the row for a post whose images (and repost images) are resolved.
    pub fn from_post(
        post: &Post,
        images: &ResolvedImages,
        repost_images: Option<&ResolvedImages>,
    ) -> Self {
        let status = &post.status;
        let repost = post.repost.as_ref().map(|r| {
            let empty = ResolvedImages::default();
            RepostColumns::from_status(r, repost_images.unwrap_or(&empty))
        });

        Self {
            author_id: status.author_id(),
            post_id: status.id(),
            variant_id: status.variant_id().to_string(),
            text: status.text().to_string(),
            pics: pics_json(images),
            created_at: status.created_at().to_string(),
            repost,
        }
    }

    pub fn key(&self) -> PostKey {
        PostKey {
            author_id: self.author_id,
            post_id: self.post_id,
            variant_id: self.variant_id.clone(),
        }
    }
}

impl RepostColumns {
    fn from_status(status: &Status, images: &ResolvedImages) -> Self {
        Self {
            author_id: status.author_id(),
            post_id: status.id(),
            variant_id: status.variant_id().to_string(),
            text: status.text().to_string(),
            pics: pics_json(images),
            created_at: status.created_at().to_string(),
        }
    }
}

/// Image URLs in listing order, as a JSON array.
fn pics_json(images: &ResolvedImages) -> Value {
    Value::from(
        images
            .urls()
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>(),
    )
}

/// A row read back from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredPost {
    pub author_id: i64,
    pub post_id: i64,
    pub variant_id: String,
    pub text: String,
    pub pics: Value,
    pub created_at: String,
    pub repost_author_id: Option<i64>,
    pub repost_id: Option<i64>,
    pub repost_variant_id: Option<String>,
    pub repost_text: Option<String>,
    pub repost_pics: Option<Value>,
    pub repost_created_at: Option<String>,
    pub collected_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use weibo_client::{resolve_images, ImageLocation, PicInfo, User, UNKNOWN_AUTHOR};

    #[test]
    fn record_uses_resolved_text_and_urls() {
        let mut infos = HashMap::new();
        infos.insert(
            "a".to_string(),
            PicInfo {
                largest: Some("https://img/a.jpg".to_string()),
            },
        );
        let mut status = Status::new(Some(User::new(9, "n")), 100, "V")
            .with_text("short")
            .with_truncated(true)
            .with_created_at("Tue Oct 01 10:00:00 +0800 2024")
            .with_images(vec!["a".to_string()], ImageLocation::FlatMap(infos));
        status.resolve_text("short but now long".to_string());
        let post = Post::new(status).with_repost(Status::new(None, 5, "R").with_text("inner"));

        let images = resolve_images(&post.status).unwrap();
        let record = PostRecord::from_post(&post, &images, None);

        assert_eq!(record.text, "short but now long");
        assert_eq!(record.pics, serde_json::json!(["https://img/a.jpg"]));
        let repost = record.repost.unwrap();
        assert_eq!(repost.author_id, UNKNOWN_AUTHOR);
        assert_eq!(repost.text, "inner");
        assert_eq!(repost.pics, serde_json::json!([]));
    }
}
