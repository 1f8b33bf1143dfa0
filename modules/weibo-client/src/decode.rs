// Response body decoding, kept apart from the HTTP calls so it can be tested
// against captured payloads.

use serde::de::DeserializeOwned;

use crate::comments::{Comment, CommentPage};
use crate::error::{Result, WeiboError};
use crate::post::Post;
use crate::types::{CardsData, CommentsBody, Envelope, EnvelopeHead, LongTextData, MymblogData};

/// Fail with [`WeiboError::Status`] unless the envelope's `ok` flag is 1.
fn check_ok(body: &[u8]) -> Result<()> {
    let head: EnvelopeHead = serde_json::from_slice(body)?;
    if head.ok != 1 {
        return Err(WeiboError::Status {
            ok: head.ok,
            message: head.msg.unwrap_or_else(|| "body not ok".to_string()),
        });
    }
    Ok(())
}

fn open<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    check_ok(body)?;
    Ok(serde_json::from_slice(body)?)
}

/// Decode a `statuses/mymblog` page.
pub fn decode_mymblog(body: &[u8]) -> Result<Vec<Post>> {
    let envelope: Envelope<MymblogData> = open(body)?;
    envelope
        .data
        .list
        .into_iter()
        .map(|raw| raw.into_post())
        .collect()
}

/// Decode a mobile `container/getIndex` page.
pub fn decode_container(body: &[u8]) -> Result<Vec<Post>> {
    let envelope: Envelope<CardsData> = open(body)?;
    envelope
        .data
        .cards
        .into_iter()
        .filter_map(|card| card.into_status())
        .map(|raw| raw.into_post())
        .collect()
}

/// Decode a `statuses/longtext` response.
pub fn decode_long_text(body: &[u8]) -> Result<String> {
    let envelope: Envelope<LongTextData> = open(body)?;
    Ok(envelope.data.long_text_content)
}

/// Decode a `statuses/buildComments` page.
pub fn decode_comments(body: &[u8]) -> Result<CommentPage> {
    let raw: CommentsBody = open(body)?;
    Ok(CommentPage {
        comments: raw.data.into_iter().map(Comment::from).collect(),
        max_id: raw.max_id,
        total: raw.total_number,
    })
}
