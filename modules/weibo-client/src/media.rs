// Image locations. The desktop surface reports images either as a flat
// `pic_infos` map or as a `mix_media_info` item list; mobile `pics` are
// normalized to the item list at decode time.

use std::collections::HashMap;

use crate::error::{Result, WeiboError};
use crate::post::Status;

/// Size variants recorded for one image in the flat shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PicInfo {
    /// URL of the "largest" variant, if the entry carried one.
    pub largest: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaKind {
    Picture,
    Other(String),
}

impl MediaKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "pic" => MediaKind::Picture,
            other => MediaKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub id: String,
    pub kind: MediaKind,
    pub largest: Option<String>,
}

/// Where a status keeps its image URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageLocation {
    #[default]
    None,
    FlatMap(HashMap<String, PicInfo>),
    ItemList(Vec<MediaItem>),
}

/// Image id to download URL, in listing order. An id whose URL the upstream
/// did not provide is kept with `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedImages(Vec<(String, Option<String>)>);

impl ResolvedImages {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == id)
            .and_then(|(_, url)| url.as_deref())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|(key, _)| key == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(id, _)| id.as_str())
    }

    /// Present URLs in order.
    pub fn urls(&self) -> Vec<&str> {
        self.0.iter().filter_map(|(_, url)| url.as_deref()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(id, url)| (id.as_str(), url.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, id: &str, url: Option<String>) {
        if !self.contains(id) {
            self.0.push((id.to_string(), url));
        }
    }
}

/// Resolve a status's image ids to URLs. No network access.
///
/// An entry that exists but lacks its largest URL is a [`WeiboError::Decode`]:
/// the upstream shape changed and the caller should hear about it. An id that
/// has no entry at all maps to `None`.
pub fn resolve_images(status: &Status) -> Result<ResolvedImages> {
    let mut resolved = ResolvedImages::default();

    match status.images() {
        ImageLocation::None => {}
        ImageLocation::FlatMap(infos) => {
            for id in status.image_ids() {
                let url = match infos.get(id) {
                    Some(info) => Some(info.largest.clone().ok_or_else(|| {
                        WeiboError::Decode(format!(
                            "pic_infos entry {id} of status {} has no largest url",
                            status.id()
                        ))
                    })?),
                    None => None,
                };
                resolved.push(id, url);
            }
        }
        ImageLocation::ItemList(items) => {
            for item in items.iter().filter(|i| i.kind == MediaKind::Picture) {
                let url = item.largest.clone().ok_or_else(|| {
                    WeiboError::Decode(format!(
                        "media item {} of status {} has no largest url",
                        item.id,
                        status.id()
                    ))
                })?;
                resolved.push(&item.id, Some(url));
            }
        }
    }

    for id in status.image_ids() {
        resolved.push(id, None);
    }

    Ok(resolved)
}
