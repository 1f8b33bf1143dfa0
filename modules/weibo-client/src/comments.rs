// Comment threads under a status. Read-only; the collector does not use them.

use crate::post::User;
use crate::types::RawComment;

const BUILD_COMMENTS_URL: &str = "https://weibo.com/ajax/statuses/buildComments";

/// Page size requested from `buildComments`.
const COMMENT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentOrder {
    #[default]
    Hot,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentLevel {
    /// Comments directly under the status.
    #[default]
    Status,
    /// Replies under a comment.
    Replies,
}

/// Parameters for one `buildComments` page.
#[derive(Debug, Clone)]
pub struct CommentQuery {
    /// Status id, or the root comment id when fetching replies.
    pub id: i64,
    pub author_id: String,
    pub order: CommentOrder,
    pub level: CommentLevel,
    /// Cursor from the previous page. `None` requests the first page.
    pub max_id: Option<i64>,
}

impl CommentQuery {
    pub fn new(id: i64, author_id: impl Into<String>) -> Self {
        Self {
            id,
            author_id: author_id.into(),
            order: CommentOrder::default(),
            level: CommentLevel::default(),
            max_id: None,
        }
    }

    pub fn order(mut self, order: CommentOrder) -> Self {
        self.order = order;
        self
    }

    pub fn replies(mut self) -> Self {
        self.level = CommentLevel::Replies;
        self
    }

    pub fn after(mut self, max_id: i64) -> Self {
        self.max_id = Some(max_id);
        self
    }

    pub(crate) fn url(&self) -> String {
        let flow = match self.order {
            CommentOrder::Hot => 0,
            CommentOrder::Time => 1,
        };
        let fetch_level = match self.level {
            CommentLevel::Status => 0,
            CommentLevel::Replies => 1,
        };
        let is_mix = u8::from(self.max_id.is_some());
        format!(
            "{BUILD_COMMENTS_URL}?flow={flow}&is_reload=1&id={}&is_show_bulletin=2&is_mix={is_mix}&max_id={}&count={COMMENT_PAGE_SIZE}&type=1&uid={}&fetch_level={fetch_level}&locale=zh-CN",
            self.id,
            self.max_id.unwrap_or(0),
            self.author_id,
        )
    }
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: i64,
    pub root_id: i64,
    pub created_at: String,
    pub text: String,
    pub author: Option<User>,
    pub like_count: i64,
    pub replies: Vec<Comment>,
}

impl From<RawComment> for Comment {
    fn from(raw: RawComment) -> Self {
        let text = if raw.text_raw.is_empty() {
            crate::post::html_to_text(&raw.text)
        } else {
            raw.text_raw
        };
        Comment {
            id: raw.id,
            root_id: raw.rootid,
            created_at: raw.created_at,
            text,
            author: raw.user.map(User::from),
            like_count: raw.like_counts,
            replies: raw.comments.into_iter().map(Comment::from).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommentPage {
    pub comments: Vec<Comment>,
    /// Cursor for the next page; 0 when there is none.
    pub max_id: i64,
    pub total: i64,
}

impl CommentPage {
    /// Query for the page after this one, if there is one.
    pub fn next(&self, query: &CommentQuery) -> Option<CommentQuery> {
        if self.max_id == 0 || self.comments.is_empty() {
            return None;
        }
        Some(query.clone().after(self.max_id))
    }
}
