// Normalized post model. Both the desktop and the mobile surfaces decode into
// these types before anything leaves the client.

use std::fmt;

use crate::media::ImageLocation;

/// Author id stored for a repost whose author the upstream did not include.
pub const UNKNOWN_AUTHOR: i64 = -1;

/// Render width for mobile HTML. Wide enough that no post text is wrapped.
const TEXT_WIDTH: usize = 65_535;

/// Account that published a status. Read-only reference data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub screen_name: String,
    pub avatar: Option<String>,
    pub remark: Option<String>,
}

impl User {
    pub fn new(id: i64, screen_name: impl Into<String>) -> Self {
        Self {
            id,
            screen_name: screen_name.into(),
            avatar: None,
            remark: None,
        }
    }
}

/// Identity triple of a post within an author's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostKey {
    pub author_id: i64,
    pub post_id: i64,
    pub variant_id: String,
}

impl fmt::Display for PostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.author_id, self.post_id, self.variant_id)
    }
}

/// A single status update without its repost.
///
/// Identity fields are fixed at construction. The resolved long text can be
/// set once and never reverts.
#[derive(Debug, Clone)]
pub struct Status {
    author: Option<User>,
    id: i64,
    variant_id: String,
    created_at: String,
    raw_text: String,
    resolved_text: Option<String>,
    truncated: bool,
    image_ids: Vec<String>,
    images: ImageLocation,
}

impl Status {
    pub fn new(author: Option<User>, id: i64, variant_id: impl Into<String>) -> Self {
        Self {
            author,
            id,
            variant_id: variant_id.into(),
            created_at: String::new(),
            raw_text: String::new(),
            resolved_text: None,
            truncated: false,
            image_ids: Vec::new(),
            images: ImageLocation::None,
        }
    }

    pub fn with_text(mut self, raw_text: impl Into<String>) -> Self {
        self.raw_text = raw_text.into();
        self
    }

    pub fn with_created_at(mut self, created_at: impl Into<String>) -> Self {
        self.created_at = created_at.into();
        self
    }

    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    pub fn with_images(mut self, image_ids: Vec<String>, images: ImageLocation) -> Self {
        self.image_ids = image_ids;
        self.images = images;
        self
    }

    pub fn author(&self) -> Option<&User> {
        self.author.as_ref()
    }

    /// Author id, or [`UNKNOWN_AUTHOR`] when the upstream omitted the user.
    pub fn author_id(&self) -> i64 {
        self.author.as_ref().map_or(UNKNOWN_AUTHOR, |u| u.id)
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn resolved_text(&self) -> Option<&str> {
        self.resolved_text.as_deref()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn image_ids(&self) -> &[String] {
        &self.image_ids
    }

    pub fn images(&self) -> &ImageLocation {
        &self.images
    }

    pub fn key(&self) -> PostKey {
        PostKey {
            author_id: self.author_id(),
            post_id: self.id,
            variant_id: self.variant_id.clone(),
        }
    }

    /// Full text when it was resolved, otherwise the text as listed.
    pub fn text(&self) -> &str {
        match &self.resolved_text {
            Some(text) if !text.is_empty() => text,
            _ => &self.raw_text,
        }
    }

    /// Store the full text. Returns `false` if a text was already resolved.
    pub fn resolve_text(&mut self, text: String) -> bool {
        if self.resolved_text.is_some() {
            return false;
        }
        self.resolved_text = Some(text);
        true
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.raw_text.replace('\n', "\\n");
        let preview: String = if text.chars().count() > 50 {
            text.chars().take(50).chain("...".chars()).collect()
        } else {
            text
        };
        write!(
            f,
            "{} | {} | {} | {} | {}",
            self.id,
            self.variant_id,
            self.truncated,
            self.resolved_text.as_deref().is_some_and(|t| !t.is_empty()),
            preview
        )
    }
}

/// A listed post and, at most, the one status it reposts.
#[derive(Debug, Clone)]
pub struct Post {
    pub status: Status,
    pub repost: Option<Status>,
}

impl Post {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            repost: None,
        }
    }

    pub fn with_repost(mut self, repost: Status) -> Self {
        self.repost = Some(repost);
        self
    }

    pub fn key(&self) -> PostKey {
        self.status.key()
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.status.fmt(f)
    }
}

/// Convert mobile HTML text to plain text: line breaks become newlines,
/// entities are decoded and every other tag is dropped.
pub fn html_to_text(html: &str) -> String {
    match html2text::config::plain_no_decorate()
        .link_footnotes(false)
        .string_from_read(html.as_bytes(), TEXT_WIDTH)
    {
        Ok(text) => text.trim_end_matches('\n').to_string(),
        Err(_) => html.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> Status {
        Status::new(Some(User::new(42, "someone")), 1001, "Nabc")
    }

    #[test]
    fn text_falls_back_to_raw() {
        let s = status().with_text("short");
        assert_eq!(s.text(), "short");
        assert!(s.resolved_text().is_none());
    }

    #[test]
    fn resolved_text_is_set_once() {
        let mut s = status().with_text("trunc").with_truncated(true);
        assert!(s.resolve_text("full body".to_string()));
        assert!(!s.resolve_text("other".to_string()));
        assert_eq!(s.text(), "full body");
    }

    #[test]
    fn key_uses_unknown_author_sentinel() {
        let s = Status::new(None, 7, "Q");
        assert_eq!(
            s.key(),
            PostKey {
                author_id: UNKNOWN_AUTHOR,
                post_id: 7,
                variant_id: "Q".to_string()
            }
        );
    }

    #[test]
    fn display_truncates_preview() {
        let s = status().with_text(format!("line\n{}", "x".repeat(80)));
        let rendered = s.to_string();
        assert!(rendered.starts_with("1001 | Nabc | false | false | line\\n"));
        assert!(rendered.ends_with("..."));
    }

    #[test]
    fn html_to_text_handles_breaks_and_links() {
        let html = r#"first<br />second <a href="/n/x">@x</a><br>third"#;
        assert_eq!(html_to_text(html), "first\nsecond @x\nthird");
    }

    #[test]
    fn html_to_text_decodes_entities() {
        assert_eq!(
            html_to_text("Tom &amp; Jerry &quot;hi&quot; 1&lt;2<br />next"),
            "Tom & Jerry \"hi\" 1<2\nnext"
        );
        assert_eq!(html_to_text("a 1<2 and 3>1 b"), "a 1<2 and 3>1 b");
    }
}
