//! Keeps benchmark runs in step with the sampling resolution of the metrics backend.
//!
//! Graphite stores one data point per `resolution` seconds and needs some extra time
//! before the last point of an interval is flushed and can be queried. The driver
//! therefore has to pause at three places:
//!
//! 1. After every query of a **serial** benchmark, so consecutive queries do not share
//!    a sampling window.
//! 2. After a whole **concurrent** benchmark, for the same reason one level up.
//! 3. Before reading back the metrics of a finished interval, so the interval's last
//!    data point is stored.
//!
//! # Wait arithmetic
//!
//! ```text
//! wait_between_runs = resolution * 2.0
//! cut_off           = trunc(resolution * 1.3)           (whole seconds)
//! loading_wait      = max(cut_off - (now - utc_end), 0)  (milliseconds)
//! ```
//!
//! The two multipliers are calibrated against observed backend behaviour and must not
//! be changed. `cut_off` is also used to extend the end of the time range that is
//! sent to Graphite (see [`crate::graphite`]).
//!
//! # Scheduling
//!
//! Every wait suspends the calling task only; nothing is spawned and no state is
//! mutated. A wait can be aborted through an optional shutdown signal, in which case
//! it returns [`Error::Cancelled`].
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch::Receiver;
use tokio::time::Instant;
use typed_builder::TypedBuilder;

use crate::{
    config::GraphiteProperties,
    error::{Error, Result},
    execution::{BenchmarkExecutionResult, QueryExecutionResult},
    measurable::Measurable,
};

/// Number of resolutions to wait between two measured runs.
pub const WAIT_BETWEEN_RUNS_RESOLUTION_MULTIPLIER: f64 = 2.0;
/// Number of resolutions after which the metrics of a finished run are queryable.
pub const CUT_OFF_THRESHOLD_RESOLUTION_MULTIPLIER: f64 = 1.3;

/// Computes and performs the waits needed for accurate Graphite measurements.
///
/// Configuration is read on every call, so the synchronizer can be cloned freely and
/// shared between worker tasks.
#[derive(Debug, Clone, TypedBuilder)]
pub struct ExecutionSynchronizer {
    properties: GraphiteProperties,
    /// Flipping this to `true` aborts pending waits.
    #[builder(default, setter(strip_option))]
    shutdown: Option<Receiver<bool>>,
}

impl ExecutionSynchronizer {
    pub fn new(properties: GraphiteProperties) -> Self {
        Self::builder().properties(properties).build()
    }

    pub fn properties(&self) -> &GraphiteProperties {
        &self.properties
    }

    /// Waits between queries of a serial benchmark when metrics collection is enabled.
    pub async fn await_after_query_execution(&self, result: &QueryExecutionResult) -> Result<()> {
        if self.properties.metrics_collection_enabled && result.run_mode.is_serial() {
            let wait = self.wait_between_runs()?;
            tracing::debug!(
                "Waiting {}s between queries - thread ({})",
                wait.as_secs_f64(),
                current_thread_name()
            );
            self.pause(wait).await?;
        }
        Ok(())
    }

    /// Waits between concurrent benchmarks when metrics collection is enabled.
    pub async fn await_after_benchmark_execution(
        &self,
        result: &BenchmarkExecutionResult,
    ) -> Result<()> {
        if self.properties.metrics_collection_enabled && result.run_mode.is_concurrent() {
            let wait = self.wait_between_runs()?;
            tracing::debug!(
                "Waiting {}s between benchmarks - thread ({})",
                wait.as_secs_f64(),
                current_thread_name()
            );
            self.pause(wait).await?;
        }
        Ok(())
    }

    /// Waits until the metrics of `measurable` are guaranteed to be stored.
    pub async fn await_measurement_loading<M>(&self, measurable: &M) -> Result<()>
    where
        M: Measurable + ?Sized,
    {
        let wait = self.measurement_loading_wait(measurable.utc_end(), Utc::now())?;
        tracing::debug!(
            "Waiting {}ms before graphite measurement loading - thread ({})",
            wait.as_millis(),
            current_thread_name()
        );
        if !wait.is_zero() {
            self.pause(wait).await?;
        }
        Ok(())
    }

    /// Seconds that must pass after a run before its metrics are complete.
    ///
    /// Also the margin added to the end of a metrics query range.
    pub fn cut_off_threshold_seconds(&self) -> Result<u64> {
        Ok((self.resolution()? * CUT_OFF_THRESHOLD_RESOLUTION_MULTIPLIER) as u64)
    }

    pub fn wait_between_runs(&self) -> Result<Duration> {
        let wait = self.resolution()? * WAIT_BETWEEN_RUNS_RESOLUTION_MULTIPLIER;
        Duration::try_from_secs_f64(wait).map_err(|e| Error::invalid_configuration(e.to_string()))
    }

    /// Remaining wait before loading the metrics of an interval that ended at
    /// `utc_end`, as seen at `now`. Zero once the cut-off has passed.
    pub fn measurement_loading_wait(
        &self,
        utc_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Duration> {
        let cut_off_millis = (self.cut_off_threshold_seconds()? as i64).saturating_mul(1000);
        let elapsed_millis = (now - utc_end).num_milliseconds();
        let wait_millis = cut_off_millis.saturating_sub(elapsed_millis).max(0);
        Ok(Duration::from_millis(wait_millis as u64))
    }

    fn resolution(&self) -> Result<f64> {
        let resolution = self.properties.resolution_seconds()?;
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(Error::invalid_configuration(format!(
                "graphite.resolution_seconds must be positive, got {resolution}"
            )));
        }
        Ok(resolution)
    }

    async fn pause(&self, wait: Duration) -> Result<()> {
        let deadline = Instant::now() + wait;
        let Some(mut shutdown) = self.shutdown.clone() else {
            tokio::time::sleep_until(deadline).await;
            return Ok(());
        };

        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => Ok(()),
            stopped = shutdown.wait_for(|stop| *stop) => match stopped {
                Ok(_) => {
                    tracing::debug!("Wait cancelled - thread ({})", current_thread_name());
                    Err(Error::Cancelled)
                }
                // The sender is gone, nothing can cancel this wait anymore.
                Err(_) => {
                    tokio::time::sleep_until(deadline).await;
                    Ok(())
                }
            },
        }
    }
}

fn current_thread_name() -> String {
    let thread = std::thread::current();
    thread
        .name()
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{:?}", thread.id()))
}
