use thiserror::Error;
use weibo_client::WeiboError;
use weibo_store::StoreError;

pub type Result<T> = std::result::Result<T, CollectError>;

/// Anything that aborts a pass or prevents the monitor from starting.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("Upstream error: {0}")]
    Upstream(#[from] WeiboError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}
