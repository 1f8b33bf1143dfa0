use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use weibo_client::{ClientConfig, FeedSource};

use crate::collector::CollectorSettings;
use crate::error::{CollectError, Result};

/// Monitor configuration. Every flag also reads from the environment
/// (and from `.env`, loaded by the binary before parsing).
#[derive(Debug, Clone, Parser)]
#[command(name = "weibo-monitor", about = "Collect new Weibo posts on a cron schedule")]
pub struct Config {
    /// Session cookie sent with every request
    #[arg(short = 'c', long, env = "WEIBO_COLLECTOR_COOKIE")]
    pub cookie: String,

    /// Outbound proxy URL
    #[arg(long, env = "WEIBO_COLLECTOR_PROXY")]
    pub proxy: Option<String>,

    /// Comma separated author ids
    #[arg(short = 'u', long = "userid", env = "WEIBO_COLLECTOR_USERID")]
    pub authors: String,

    /// First page read by each pass
    #[arg(
        short = 'p',
        long,
        env = "WEIBO_COLLECTOR_PAGE",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub page: u32,

    /// Seconds to wait between two page fetches
    #[arg(short = 's', long = "sleep", env = "WEIBO_COLLECTOR_SLEEP", default_value_t = 10)]
    pub sleep_secs: u64,

    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Run a full backfill before the first scheduled pass
    #[arg(short = 'f', long, env = "WEIBO_COLLECTOR_FULL")]
    pub full: bool,

    /// Cron expression (5 fields, or 6/7 with seconds)
    #[arg(long = "cron", env = "WEIBO_COLLECTOR_SPEC", default_value = "*/1 * * * *")]
    pub cron: String,

    /// IANA time zone the cron expression is evaluated in
    #[arg(short = 't', long = "tz", env = "WEIBO_COLLECTOR_TZ", default_value = "UTC")]
    pub tz: String,

    /// Listing surface: desktop, mobile or interaction
    #[arg(long, env = "WEIBO_COLLECTOR_SOURCE", default_value = "desktop")]
    pub source: FeedSource,

    /// Keep listed text instead of fetching the full text of truncated posts
    #[arg(long, env = "WEIBO_COLLECTOR_NO_LONG_TEXT")]
    pub no_long_text: bool,

    /// Download images of new posts into this directory
    #[arg(long, env = "WEIBO_COLLECTOR_IMAGE_DIR")]
    pub image_dir: Option<PathBuf>,

    /// Slack-compatible incoming webhook for new post notifications
    #[arg(long, env = "WEIBO_COLLECTOR_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Verify the cookie against a restricted check post at start-up
    #[arg(long, env = "WEIBO_COLLECTOR_CHECK_COOKIE")]
    pub check_cookie: bool,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", env = "WEIBO_COLLECTOR_TIMEOUT", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Config {
    /// Author ids, trimmed, empties dropped. An empty list is an error.
    pub fn author_ids(&self) -> Result<Vec<String>> {
        let authors: Vec<String> = self
            .authors
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(String::from)
            .collect();
        if authors.is_empty() {
            return Err(CollectError::Config("no author ids configured".to_string()));
        }
        Ok(authors)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            cookie: self.cookie.clone(),
            proxy: self.proxy.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn collector_settings(&self) -> CollectorSettings {
        CollectorSettings::builder()
            .start_page(self.page)
            .page_delay(Duration::from_secs(self.sleep_secs))
            .long_text(!self.no_long_text)
            .build()
    }

    /// Log the configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            cookie = %redact(&self.cookie),
            proxy = self.proxy.is_some(),
            authors = self.authors.as_str(),
            page = self.page,
            sleep_secs = self.sleep_secs,
            full = self.full,
            cron = self.cron.as_str(),
            tz = self.tz.as_str(),
            source = %self.source,
            long_text = !self.no_long_text,
            image_dir = ?self.image_dir,
            webhook = self.webhook_url.is_some(),
            timeout_secs = self.timeout_secs,
            "Configuration loaded"
        );
    }
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        return "(empty)".to_string();
    }
    format!("*** ({} chars)", secret.chars().count())
}
