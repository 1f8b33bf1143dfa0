use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use futures::FutureExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use weibo_client::{CookieCheck, WeiboClient};
use weibo_collector::notify::{LogBackend, NotifyBackend, WebhookBackend};
use weibo_collector::scheduler::parse_time_zone;
use weibo_collector::{Collector, Config, CronSchedule, Monitor, WeiboFeed};
use weibo_store::{ImageDir, PostStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("weibo=info".parse()?))
        .init();

    let config = Config::parse();
    config.log_redacted();

    let authors = config.author_ids()?;
    let schedule = CronSchedule::parse(&config.cron, parse_time_zone(&config.tz))?;

    let client = Arc::new(WeiboClient::new(config.client_config())?);
    if config.check_cookie {
        match client.check_cookie(&CookieCheck::default()).await {
            Ok(true) => info!("Cookie check passed"),
            Ok(false) => warn!("Cookie check failed: restricted text not visible"),
            Err(e) => warn!(error = %e, "Cookie check could not run"),
        }
    }

    let store = PostStore::connect(&config.database_url).await?;
    let feed = WeiboFeed::new(client, config.source);
    let mut collector = Collector::new(
        Arc::new(feed),
        Arc::new(store.clone()),
        config.collector_settings(),
    );
    if let Some(dir) = &config.image_dir {
        info!(dir = %dir.display(), "Downloading images of new posts");
        collector = collector.with_image_sink(Arc::new(ImageDir::new(dir)));
    }
    collector.ensure_schema().await?;

    let notifier: Arc<dyn NotifyBackend> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookBackend::new(
            url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?),
        None => Arc::new(LogBackend),
    };
    let monitor = Monitor::new(Arc::new(collector), notifier, authors);

    if config.full {
        info!("Running full backfill before scheduling");
        let found = monitor.backfill().await?;
        info!(new_posts = found, "Full backfill complete");
    }

    monitor
        .run(&schedule, tokio::signal::ctrl_c().map(|_| ()))
        .await;

    store.close().await;
    info!("Weibo monitor stopped");
    Ok(())
}
