use anyhow::Result;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::constants::rate_limit;
use crate::db::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupReport {
    pub cache_entries: u64,
    pub rate_limit_windows: u64,
}

/// Deletes expired cached results and rate-limit windows older than the
/// retention period.
pub async fn run_cleanup(store: &Store, retention_minutes: i64) -> Result<CleanupReport> {
    let cutoff = Utc::now().timestamp() - retention_minutes.max(1) * rate_limit::WINDOW_SECONDS;

    let cache_entries = store.prune_cache().await?;
    let rate_limit_windows = store.prune_rate_limits(cutoff).await?;

    Ok(CleanupReport {
        cache_entries,
        rate_limit_windows,
    })
}

pub struct Scheduler {
    store: Store,
    config: SchedulerConfig,
}

impl Scheduler {
    #[must_use]
    pub const fn new(store: Store, config: SchedulerConfig) -> Self {
        Self { store, config }
    }

    /// Registers the cleanup job and starts the scheduler. The returned handle
    /// must be kept alive for the jobs to keep running.
    pub async fn start(&self) -> Result<Option<JobScheduler>> {
        if !self.config.enabled {
            info!("Scheduler is disabled in config");
            return Ok(None);
        }

        let sched = JobScheduler::new().await?;

        let store = self.store.clone();
        let retention = self.config.rate_limit_retention_minutes;
        let job = Job::new_async(self.config.cleanup_cron.as_str(), move |_uuid, _lock| {
            let store = store.clone();
            Box::pin(async move {
                let start = std::time::Instant::now();
                info!(event = "job_started", job_name = "cleanup", "Starting scheduled cleanup");

                match run_cleanup(&store, retention).await {
                    Ok(report) => info!(
                        event = "job_finished",
                        job_name = "cleanup",
                        cache_entries = report.cache_entries,
                        rate_limit_windows = report.rate_limit_windows,
                        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "Scheduled cleanup finished"
                    ),
                    Err(e) => {
                        error!(event = "job_failed", job_name = "cleanup", error = %e, "Scheduled cleanup failed");
                    }
                }
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Cleanup scheduled: {}", self.config.cleanup_cron);
        Ok(Some(sched))
    }
}
