pub mod comments;
pub mod decode;
pub mod error;
pub mod media;
pub mod post;
mod types;

pub use comments::{Comment, CommentLevel, CommentOrder, CommentPage, CommentQuery};
pub use error::{Result, WeiboError};
pub use media::{resolve_images, ImageLocation, MediaItem, MediaKind, PicInfo, ResolvedImages};
pub use post::{Post, PostKey, Status, User, UNKNOWN_AUTHOR};

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use bytes::Bytes;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, ORIGIN, REFERER};
use reqwest::StatusCode;

use types::FollowInput;

const DESKTOP_URL: &str = "https://weibo.com/ajax";
const MOBILE_URL: &str = "https://m.weibo.cn/api/container/getIndex";

const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:107.0) Gecko/20100101 Firefox/107.0";

/// Container prefix of a user's full mobile timeline.
const MOBILE_PROFILE_CONTAINER: &str = "230413";
/// Container prefix of the posts a user interacted with (comments).
const MOBILE_INTERACTION_CONTAINER: &str = "230869";

static RE_XSRF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"XSRF-TOKEN=(.*?);").expect("valid regex"));

/// Which listing surface pages are fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedSource {
    /// `weibo.com/ajax/statuses/mymblog`.
    #[default]
    Desktop,
    /// The mobile profile timeline container.
    Mobile,
    /// The mobile container of posts the user commented on.
    Interaction,
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeedSource::Desktop => "desktop",
            FeedSource::Mobile => "mobile",
            FeedSource::Interaction => "interaction",
        })
    }
}

impl FromStr for FeedSource {
    type Err = WeiboError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Ok(FeedSource::Desktop),
            "mobile" => Ok(FeedSource::Mobile),
            "interaction" => Ok(FeedSource::Interaction),
            other => Err(WeiboError::InvalidInput(format!(
                "unknown feed source {other:?} (expected desktop, mobile or interaction)"
            ))),
        }
    }
}

/// Check used to tell whether a cookie belongs to a logged-in session: a
/// restricted post whose long text only shows a marker once the checking account
/// is followed.
#[derive(Debug, Clone)]
pub struct CookieCheck {
    pub user_id: String,
    pub variant_id: String,
    pub marker: String,
}

impl Default for CookieCheck {
    fn default() -> Self {
        Self {
            user_id: "6874180501".to_string(),
            variant_id: "OfKCwyf4P".to_string(),
            marker: "live".to_string(),
        }
    }
}

/// Connection settings for [`WeiboClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub cookie: String,
    pub proxy: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(cookie: impl Into<String>) -> Self {
        Self {
            cookie: cookie.into(),
            proxy: None,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct WeiboClient {
    client: reqwest::Client,
    xsrf_token: Option<String>,
}

impl WeiboClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&config.cookie)
                .map_err(|e| WeiboError::InvalidInput(format!("cookie is not a valid header: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(config.timeout);
        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| WeiboError::InvalidInput(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| WeiboError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            xsrf_token: xsrf_token(&config.cookie),
        })
    }

    /// GET a URL and return the body. 400 maps to [`WeiboError::BadRequest`].
    async fn get(&self, url: &str) -> Result<Bytes> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if status == StatusCode::BAD_REQUEST {
            return Err(WeiboError::BadRequest);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WeiboError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.bytes().await?)
    }

    /// Fetch one page of an author's posts from the given surface.
    pub async fn posts(&self, source: FeedSource, uid: &str, page: u32) -> Result<Vec<Post>> {
        match source {
            FeedSource::Desktop => self.user_posts(uid, page).await,
            FeedSource::Mobile => self.mobile_posts(uid, page).await,
            FeedSource::Interaction => self.interaction_posts(uid, page).await,
        }
    }

    /// One page of `statuses/mymblog`.
    pub async fn user_posts(&self, uid: &str, page: u32) -> Result<Vec<Post>> {
        validate_page_request(uid, page)?;
        let url = format!("{DESKTOP_URL}/statuses/mymblog?uid={uid}&page={page}&feature=0");
        tracing::debug!(uid, page, "Fetching desktop timeline page");
        let body = self.get(&url).await?;
        decode::decode_mymblog(&body)
    }

    /// One page of the mobile profile timeline. Needs a logged-in cookie.
    pub async fn mobile_posts(&self, uid: &str, page: u32) -> Result<Vec<Post>> {
        validate_page_request(uid, page)?;
        let url = format!(
            "{MOBILE_URL}?containerid={MOBILE_PROFILE_CONTAINER}{uid}_-_WEIBO_SECOND_PROFILE_WEIBO&page_type=01&page={page}"
        );
        tracing::debug!(uid, page, "Fetching mobile timeline page");
        let body = self.get(&url).await?;
        decode::decode_container(&body)
    }

    /// One page of the posts an author commented on. Needs a logged-in cookie.
    pub async fn interaction_posts(&self, uid: &str, page: u32) -> Result<Vec<Post>> {
        validate_page_request(uid, page)?;
        let url = format!(
            "{MOBILE_URL}?containerid={MOBILE_INTERACTION_CONTAINER}{uid}_-_comment&page_type=03&page={page}"
        );
        tracing::debug!(uid, page, "Fetching mobile interaction page");
        let body = self.get(&url).await?;
        decode::decode_container(&body)
    }

    /// Full text of a truncated post, looked up by its variant id.
    pub async fn long_text(&self, variant_id: &str) -> Result<String> {
        let url = format!("{DESKTOP_URL}/statuses/longtext?id={variant_id}");
        let body = self.get(&url).await?;
        decode::decode_long_text(&body)
    }

    /// One page of comments (or replies) under a status.
    pub async fn comments(&self, query: &CommentQuery) -> Result<CommentPage> {
        let body = self.get(&query.url()).await?;
        decode::decode_comments(&body)
    }

    /// Follow an account.
    pub async fn follow(&self, uid: &str) -> Result<()> {
        let url = format!("{DESKTOP_URL}/friendships/create");
        let input = FollowInput {
            friend_uid: uid,
            lpage: "profile",
            page: "profile",
        };

        let mut req = self
            .client
            .post(&url)
            .header(ORIGIN, "https://weibo.com")
            .json(&input);
        if let Some(token) = &self.xsrf_token {
            req = req.header("X-Xsrf-Token", token);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if status == StatusCode::BAD_REQUEST {
            return Err(WeiboError::BadRequest);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WeiboError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        tracing::info!(uid, "Followed account");
        Ok(())
    }

    /// Returns whether the cookie can read the check post's restricted long text.
    pub async fn check_cookie(&self, check: &CookieCheck) -> Result<bool> {
        self.follow(&check.user_id).await?;
        let text = self.long_text(&check.variant_id).await?;
        let active = text.contains(&check.marker);
        tracing::info!(active, "Cookie check finished");
        Ok(active)
    }

    /// Download an image body.
    pub async fn download_image(&self, url: &str) -> Result<Bytes> {
        let resp = self
            .client
            .get(url)
            .header(REFERER, "https://weibo.com/")
            .header(ACCEPT, "*/*")
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::BAD_REQUEST {
            return Err(WeiboError::BadRequest);
        }
        if !status.is_success() {
            return Err(WeiboError::Api {
                status: status.as_u16(),
                message: format!("image download failed: {url}"),
            });
        }

        Ok(resp.bytes().await?)
    }
}

fn validate_page_request(uid: &str, page: u32) -> Result<()> {
    if uid.trim().is_empty() {
        return Err(WeiboError::InvalidInput("author id is empty".to_string()));
    }
    if page == 0 {
        return Err(WeiboError::InvalidInput("page numbers start at 1".to_string()));
    }
    Ok(())
}

fn xsrf_token(cookie: &str) -> Option<String> {
    RE_XSRF
        .captures(cookie)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|t| !t.is_empty())
}
