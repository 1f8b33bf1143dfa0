use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::{Result, WeiboError};
use crate::media::{ImageLocation, MediaItem, MediaKind, PicInfo};
use crate::post::{html_to_text, Post, Status, User};

// --- Envelopes ---

/// The `ok`/`msg` head every JSON envelope starts with. Read on its own first
/// so a failed envelope is reported as such even when `data` is malformed.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EnvelopeHead {
    #[serde(default)]
    pub ok: i64,
    #[serde(default)]
    pub msg: Option<String>,
}

/// Wrapper for `{ok, data}` responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

// --- Desktop (weibo.com/ajax) ---

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MymblogData {
    #[serde(default)]
    pub list: Vec<RawStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LongTextData {
    #[serde(default, rename = "longTextContent")]
    pub long_text_content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawUser {
    pub id: i64,
    #[serde(default)]
    pub screen_name: String,
    pub avatar_large: Option<String>,
    pub remark: Option<String>,
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        User {
            id: raw.id,
            screen_name: raw.screen_name,
            avatar: raw.avatar_large.filter(|s| !s.is_empty()),
            remark: raw.remark.filter(|s| !s.is_empty()),
        }
    }
}

/// URL of one size variant.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawPicVariant {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawPicInfo {
    pub largest: Option<RawPicVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawMixMedia {
    #[serde(default)]
    pub items: Vec<RawMediaItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawMediaItem {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    pub data: Option<RawMediaData>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawMediaData {
    pub largest: Option<RawPicVariant>,
}

/// A status as listed by `statuses/mymblog`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawStatus {
    pub user: Option<RawUser>,
    #[serde(default)]
    pub created_at: String,
    pub id: i64,
    #[serde(default)]
    pub mblogid: String,
    #[serde(default)]
    pub text_raw: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "isLongText")]
    pub is_long_text: bool,
    #[serde(default)]
    pub pic_ids: Vec<String>,
    pub pic_infos: Option<HashMap<String, RawPicInfo>>,
    pub mix_media_info: Option<RawMixMedia>,
    pub retweeted_status: Option<Box<RawStatus>>,
}

impl RawStatus {
    fn image_location(&mut self) -> ImageLocation {
        if let Some(infos) = self.pic_infos.take().filter(|m| !m.is_empty()) {
            let infos = infos
                .into_iter()
                .map(|(id, info)| {
                    let largest = info.largest.and_then(|v| v.url);
                    (id, PicInfo { largest })
                })
                .collect();
            return ImageLocation::FlatMap(infos);
        }
        if let Some(mix) = self.mix_media_info.take() {
            let items = mix
                .items
                .into_iter()
                .map(|item| MediaItem {
                    id: item.id,
                    kind: MediaKind::from_tag(&item.kind),
                    largest: item.data.and_then(|d| d.largest).and_then(|v| v.url),
                })
                .collect();
            return ImageLocation::ItemList(items);
        }
        ImageLocation::None
    }

    fn into_status(mut self) -> Status {
        let images = self.image_location();
        let text = if self.text_raw.is_empty() {
            html_to_text(&self.text)
        } else {
            self.text_raw
        };
        Status::new(self.user.map(User::from), self.id, self.mblogid)
            .with_text(text)
            .with_created_at(self.created_at)
            .with_truncated(self.is_long_text)
            .with_images(self.pic_ids, images)
    }

    /// Convert a listed status into a [`Post`]. A listed post must name its
    /// author; the repost may not.
    pub(crate) fn into_post(mut self) -> Result<Post> {
        if self.user.is_none() {
            return Err(WeiboError::Decode(format!("status {} has no user", self.id)));
        }
        let repost = self.retweeted_status.take().map(|mut inner| {
            if inner.retweeted_status.take().is_some() {
                warn!(id = inner.id, "Dropping nested repost below the first level");
            }
            inner.into_status()
        });
        Ok(Post {
            status: self.into_status(),
            repost,
        })
    }
}

// --- Mobile (m.weibo.cn/api/container) ---

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CardsData {
    #[serde(default)]
    pub cards: Vec<RawCard>,
}

/// Card type carrying a status directly.
pub(crate) const CARD_STATUS: i64 = 9;
/// Card type carrying a group whose first entry holds the status.
pub(crate) const CARD_GROUP: i64 = 11;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawCard {
    #[serde(default)]
    pub card_type: i64,
    #[serde(default)]
    pub skip_group_title: bool,
    #[serde(default)]
    pub card_group: Vec<RawCardGroup>,
    pub mblog: Option<RawMobileStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawCardGroup {
    pub mblog: Option<RawMobileStatus>,
}

impl RawCard {
    /// The status this card carries, if it is a status card.
    pub(crate) fn into_status(self) -> Option<RawMobileStatus> {
        match self.card_type {
            CARD_STATUS => self.mblog,
            CARD_GROUP => {
                if self.skip_group_title {
                    return None;
                }
                self.card_group.into_iter().next().and_then(|g| g.mblog)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawMobilePic {
    #[serde(default)]
    pub pid: String,
    pub url: Option<String>,
    pub large: Option<RawPicVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawMobileStatus {
    #[serde(default)]
    pub created_at: String,
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub pic_ids: Vec<String>,
    pub user: Option<RawUser>,
    #[serde(default, rename = "isLongText")]
    pub is_long_text: bool,
    #[serde(default)]
    pub bid: String,
    #[serde(default)]
    pub pics: Vec<RawMobilePic>,
    pub retweeted_status: Option<Box<RawMobileStatus>>,
}

impl RawMobileStatus {
    fn into_status(self) -> Result<Status> {
        let id: i64 = self
            .id
            .parse()
            .map_err(|_| WeiboError::Decode(format!("mobile status id {:?} is not numeric", self.id)))?;

        let items: Vec<MediaItem> = self
            .pics
            .into_iter()
            .map(|pic| MediaItem {
                largest: pic.large.and_then(|l| l.url).or(pic.url),
                id: pic.pid,
                kind: MediaKind::Picture,
            })
            .collect();
        let mut image_ids = self.pic_ids;
        if image_ids.is_empty() {
            image_ids = items.iter().map(|i| i.id.clone()).collect();
        }
        let images = if items.is_empty() {
            ImageLocation::None
        } else {
            ImageLocation::ItemList(items)
        };

        Ok(Status::new(self.user.map(User::from), id, self.bid)
            .with_text(html_to_text(&self.text))
            .with_created_at(self.created_at)
            .with_truncated(self.is_long_text)
            .with_images(image_ids, images))
    }

    pub(crate) fn into_post(mut self) -> Result<Post> {
        if self.user.is_none() {
            return Err(WeiboError::Decode(format!(
                "mobile status {} has no user",
                self.id
            )));
        }
        let repost = match self.retweeted_status.take() {
            Some(mut inner) => {
                if inner.retweeted_status.take().is_some() {
                    warn!(id = %inner.id, "Dropping nested repost below the first level");
                }
                Some(inner.into_status()?)
            }
            None => None,
        };
        Ok(Post {
            status: self.into_status()?,
            repost,
        })
    }
}

// --- Comments (weibo.com/ajax/statuses/buildComments) ---

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CommentsBody {
    #[serde(default)]
    pub data: Vec<RawComment>,
    #[serde(default)]
    pub max_id: i64,
    #[serde(default)]
    pub total_number: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawComment {
    pub id: i64,
    #[serde(default)]
    pub rootid: i64,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub text_raw: String,
    pub user: Option<RawUser>,
    #[serde(default)]
    pub like_counts: i64,
    #[serde(default, deserialize_with = "list_or_false")]
    pub comments: Vec<RawComment>,
}

// --- Requests ---

/// Body of `friendships/create`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct FollowInput<'a> {
    pub friend_uid: &'a str,
    pub lpage: &'a str,
    pub page: &'a str,
}

// --- Helpers ---

/// Accept an id given either as a JSON number or a string.
fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(i64),
        Str(String),
    }
    Ok(match Repr::deserialize(deserializer)? {
        Repr::Num(n) => n.to_string(),
        Repr::Str(s) => s,
    })
}

/// Nested comment lists come back as `false` when there are none.
fn list_or_false<'de, D>(deserializer: D) -> std::result::Result<Vec<RawComment>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        List(Vec<RawComment>),
        Other(serde::de::IgnoredAny),
    }
    Ok(match Repr::deserialize(deserializer)? {
        Repr::List(list) => list,
        Repr::Other(_) => Vec::new(),
    })
}
