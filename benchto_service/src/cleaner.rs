use std::{sync::Arc, time::Duration};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::{
    sync::watch::Receiver,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::{error::Result, model::Status, repo::BenchmarkRunRepo};

/// Runs still started after this many hours are considered abandoned.
pub const BENCHMARK_TIMEOUT_HOURS: i64 = 24;
pub const CLEANUP_PERIOD: Duration = Duration::from_secs(60 * 60);

/// Fails benchmark runs whose driver went away without finishing them.
pub struct CleanerService<R: BenchmarkRunRepo> {
    repo: Arc<R>,
    period: Duration,
}

impl<R: BenchmarkRunRepo + 'static> CleanerService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            period: CLEANUP_PERIOD,
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Marks every run started more than [`BENCHMARK_TIMEOUT_HOURS`] before `now` as
    /// failed, ending it at `now`. Returns how many runs were failed.
    pub async fn clean_up_stale_benchmarks(&self, now: DateTime<Utc>) -> Result<usize> {
        tracing::info!("Cleaning up stale benchmarks");
        let stale = self
            .repo
            .find_started_before(now - TimeDelta::hours(BENCHMARK_TIMEOUT_HOURS))
            .await?;
        let count = stale.len();
        for mut run in stale {
            tracing::info!("Failing stale benchmark - {}", run.key());
            run.status = Status::Failed;
            run.ended = Some(now);
            for execution in run
                .executions
                .iter_mut()
                .filter(|e| !e.status.is_finished())
            {
                execution.status = Status::Failed;
                execution.ended = Some(now);
            }
            self.repo.save(run).await?;
        }
        Ok(count)
    }

    /// Sweeps once per period, starting immediately, until `shutdown` turns `true` or
    /// its sender is dropped.
    pub fn spawn(self, mut shutdown: Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = async { let _ = shutdown.wait_for(|b| *b).await; } => {
                        tracing::debug!("Cleaner shutting down.");
                        break;
                    }
                }
                if let Err(e) = self.clean_up_stale_benchmarks(Utc::now()).await {
                    tracing::error!("Stale benchmark cleanup failed: {e}");
                }
            }
        })
    }
}
