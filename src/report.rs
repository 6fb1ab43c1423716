use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::{
    error::Result,
    execution::{BenchmarkExecutionResult, QueryExecutionResult},
    measurable::{Measurement, RunMode},
};

/// The processed form of a [`BenchmarkExecutionResult`].
///
/// Reports are pure data: they derive summary statistics (durations, failure ratio)
/// and keep the per-run details needed by sinks that persist results. A report is
/// built with `From` and handed to one or more [`Reporter`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub name: String,
    pub sequence_id: String,
    pub run_mode: RunMode,
    pub started: DateTime<Utc>,
    pub ended: DateTime<Utc>,
    pub count: usize,
    pub failures: usize,
    /// Percentage of successful runs.
    pub success_ratio: f64,
    pub min_duration: Duration,
    pub mean_duration: Duration,
    pub max_duration: Duration,
    pub executions: Vec<ExecutionReport>,
    pub measurements: Vec<Measurement>,
}

impl BenchmarkReport {
    pub fn is_successful(&self) -> bool {
        self.failures == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub run: usize,
    pub started: DateTime<Utc>,
    pub ended: DateTime<Utc>,
    pub duration: Duration,
    pub rows: u64,
    pub error: Option<String>,
    pub measurements: Vec<Measurement>,
}

impl From<&QueryExecutionResult> for ExecutionReport {
    fn from(value: &QueryExecutionResult) -> Self {
        Self {
            run: value.run,
            started: value.utc_start,
            ended: value.utc_end,
            duration: value.duration(),
            rows: value.rows,
            error: value.error.clone(),
            measurements: value.measurements.clone(),
        }
    }
}

impl From<&BenchmarkExecutionResult> for BenchmarkReport {
    fn from(value: &BenchmarkExecutionResult) -> Self {
        let executions: Vec<ExecutionReport> =
            value.executions.iter().map(ExecutionReport::from).collect();
        let count = executions.len();
        let failures = value.failures();

        let durations = executions.iter().map(|e| e.duration);
        let min_duration = durations.clone().min().unwrap_or_default();
        let max_duration = durations.clone().max().unwrap_or_default();
        let (mean_duration, success_ratio) = if count == 0 {
            (Duration::ZERO, 0.0)
        } else {
            (
                durations.sum::<Duration>().div_f64(count as f64),
                ((count - failures) as f64 / count as f64) * 100.0,
            )
        };

        Self {
            name: value.name.clone(),
            sequence_id: value.sequence_id.clone(),
            run_mode: value.run_mode,
            started: value.utc_start,
            ended: value.utc_end,
            count,
            failures,
            success_ratio,
            min_duration,
            mean_duration,
            max_duration,
            executions,
            measurements: value.measurements.clone(),
        }
    }
}

impl From<BenchmarkExecutionResult> for BenchmarkReport {
    fn from(value: BenchmarkExecutionResult) -> Self {
        Self::from(&value)
    }
}

/// A [`Reporter`] consumes a report and performs side effects: displaying it,
/// sending it to a service, or persisting it somewhere.
///
/// # Example
/// ```rust
/// use benchto::{error::Result, report::{BenchmarkReport, Reporter}};
///
/// struct Count;
///
/// impl Reporter<BenchmarkReport> for Count {
///     async fn report(&self, report: &BenchmarkReport) -> Result<()> {
///         println!("{} runs", report.count);
///         Ok(())
///     }
/// }
/// ```
pub trait Reporter<R> {
    fn report(&self, report: &R) -> impl Future<Output = Result<()>> + Send;
}

/// Prints reports as pretty JSON.
pub struct StdoutReporter;

impl Reporter<BenchmarkReport> for StdoutReporter {
    async fn report(&self, report: &BenchmarkReport) -> Result<()> {
        let value = serde_json::to_string_pretty(report)?;
        println!("{value}");
        Ok(())
    }
}
