pub mod collector;
pub mod config;
pub mod error;
pub mod notify;
pub mod resolve;
pub mod scheduler;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use collector::{CollectedPost, Collector, CollectorSettings, PassKind, FULL_BACKFILL_LAST_PAGE};
pub use config::Config;
pub use error::{CollectError, Result};
pub use scheduler::{CronSchedule, Monitor};
pub use traits::{DedupStore, FeedClient, ImageSink, WeiboFeed};
