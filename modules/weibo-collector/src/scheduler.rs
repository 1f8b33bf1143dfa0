// Cron-driven monitor: one optional backfill at start, then an incremental
// pass per trigger. A trigger that fires while a pass is in flight is dropped.

use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::collector::{CollectedPost, Collector, PassKind};
use crate::error::{CollectError, Result};
use crate::notify::{NotifyBackend, PassReport};

/// Accept classic 5-field expressions by prepending a seconds field.
/// 6 and 7 field expressions pass through with whitespace collapsed.
pub fn normalize_cron(expr: &str) -> String {
    let fields: Vec<&str> = expr.split_whitespace().collect();
    if fields.len() == 5 {
        format!("0 {}", fields.join(" "))
    } else {
        fields.join(" ")
    }
}

/// IANA zone by name. `Local`, empty and unknown names fall back to UTC.
pub fn parse_time_zone(name: &str) -> Tz {
    let name = name.trim();
    if name.is_empty() || name.eq_ignore_ascii_case("local") {
        warn!(tz = name, "Local time zone is not supported, using UTC");
        return chrono_tz::UTC;
    }
    match name.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            warn!(tz = name, "Unknown time zone, using UTC");
            chrono_tz::UTC
        }
    }
}

#[derive(Debug, Clone)]
pub struct CronSchedule {
    schedule: cron::Schedule,
    tz: Tz,
}

impl CronSchedule {
    pub fn parse(expr: &str, tz: Tz) -> Result<Self> {
        let normalized = normalize_cron(expr);
        let schedule = cron::Schedule::from_str(&normalized)
            .map_err(|e| CollectError::Config(format!("invalid cron expression {expr:?}: {e}")))?;
        Ok(Self { schedule, tz })
    }

    pub fn time_zone(&self) -> Tz {
        self.tz
    }

    /// First trigger strictly after `now`, evaluated in the schedule's zone.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule
            .after(&now.with_timezone(&self.tz))
            .next()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Single-flight flag for incremental passes.
#[derive(Debug, Clone, Default)]
pub struct RunLock(Arc<AtomicBool>);

impl RunLock {
    pub fn try_acquire(&self) -> Option<RunGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(self.0.clone()))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the [`RunLock`] on drop, including when the pass panics.
pub struct RunGuard(Arc<AtomicBool>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Monitor {
    collector: Arc<Collector>,
    notifier: Arc<dyn NotifyBackend>,
    authors: Arc<Vec<String>>,
    lock: RunLock,
}

impl Monitor {
    pub fn new(
        collector: Arc<Collector>,
        notifier: Arc<dyn NotifyBackend>,
        authors: Vec<String>,
    ) -> Self {
        Self {
            collector,
            notifier,
            authors: Arc::new(authors),
            lock: RunLock::default(),
        }
    }

    /// Run the full backfill to completion. Errors are returned so start-up
    /// can abort.
    pub async fn backfill(&self) -> Result<usize> {
        let posts = self.collector.run_full_backfill(&self.authors).await?;
        notify(self.notifier.as_ref(), PassKind::Backfill, &posts).await;
        Ok(posts.len())
    }

    /// Start an incremental pass in the background unless one is in flight.
    pub fn trigger(&self) -> Option<JoinHandle<()>> {
        let Some(guard) = self.lock.try_acquire() else {
            info!("Previous pass still running, skipping trigger");
            return None;
        };

        let collector = self.collector.clone();
        let notifier = self.notifier.clone();
        let authors = self.authors.clone();

        Some(tokio::spawn(async move {
            let result = collector.run_incremental_pass(&authors).await;
            // The next trigger may start while notifications are delivered.
            drop(guard);
            match result {
                Ok(posts) => notify(notifier.as_ref(), PassKind::Incremental, &posts).await,
                Err(e) => error!(error = %e, "Incremental pass failed"),
            }
        }))
    }

    /// Trigger passes on `schedule` until `shutdown` resolves, then wait for
    /// the pass in flight.
    pub async fn run<F>(&self, schedule: &CronSchedule, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut in_flight: Option<JoinHandle<()>> = None;

        info!(tz = %schedule.time_zone(), authors = self.authors.len(), "Scheduler started");
        loop {
            let now = Utc::now();
            let Some(next) = schedule.next_after(now) else {
                warn!("Cron schedule has no upcoming trigger, stopping");
                break;
            };
            let wait = (next - now).to_std().unwrap_or_default();
            debug!(next = %next, "Next pass scheduled");

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    if let Some(handle) = self.trigger() {
                        in_flight = Some(handle);
                    }
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping scheduler");
                    break;
                }
            }
        }

        if let Some(handle) = in_flight {
            if !handle.is_finished() {
                info!("Waiting for in-flight pass");
            }
            if let Err(e) = handle.await {
                error!(error = %e, "Pass task did not complete");
            }
        }
    }
}

async fn notify(backend: &dyn NotifyBackend, kind: PassKind, posts: &[CollectedPost]) {
    if posts.is_empty() {
        return;
    }
    let report = PassReport { kind, posts };
    if let Err(e) = backend.notify(&report).await {
        warn!(error = %e, %kind, "Failed to send notification");
    }
}
