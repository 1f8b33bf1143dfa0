use thiserror::Error;

pub type Result<T> = std::result::Result<T, WeiboError>;

#[derive(Debug, Error)]
pub enum WeiboError {
    /// Upstream answered HTTP 400. Long-text lookup treats this as "not available".
    #[error("Bad request")]
    BadRequest,

    /// The envelope decoded but its `ok` flag is not 1.
    #[error("Envelope not ok (ok={ok}): {message}")]
    Status { ok: i64, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl WeiboError {
    pub fn is_bad_request(&self) -> bool {
        matches!(self, WeiboError::BadRequest)
    }
}

impl From<reqwest::Error> for WeiboError {
    fn from(err: reqwest::Error) -> Self {
        WeiboError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for WeiboError {
    fn from(err: serde_json::Error) -> Self {
        WeiboError::Decode(err.to_string())
    }
}
