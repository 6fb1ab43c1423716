//! Benchmark driver: runs benchmark queries against the engine under test.
//!
//! A [`BenchmarkExecution`] runs one query `runs` times. Its concurrency decides the
//! [`RunMode`]:
//!
//! - **Serial** (`concurrency == 1`): runs execute one after another on the calling task.
//!   Each run gets its own measurements, followed by the between-queries wait of the
//!   [`ExecutionSynchronizer`].
//! - **Concurrent** (`concurrency > 1`): `concurrency` worker tasks are spawned and claim
//!   run indices from a shared counter until all runs are taken. Only the benchmark as a
//!   whole is measured, followed by the between-benchmarks wait.
//!
//! # High-level flow
//! 1. Record the benchmark start and execute the runs as described above.
//! 2. Collect per-run results, ordered by run index. A failing query is recorded on its
//!    result and does not stop the benchmark; a panicking worker is logged and
//!    contributes no results.
//! 3. Record the benchmark end and let the synchronizer wait if the run mode requires it.
//! 4. If a [`MeasurementProvider`] is configured and metrics collection is enabled, wait
//!    until the metrics backend holds the whole interval and read the benchmark measurements back.
//!
//! Synchronizer failures (missing configuration, cancellation) abort the benchmark.
//! Measurement loading failures are logged and leave the measurements empty.
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio::task::JoinHandle;
use typed_builder::TypedBuilder;

use crate::{
    config::BenchmarkProperties,
    engine::SqlEngine,
    error::Result,
    execution::{BenchmarkExecution, BenchmarkExecutionResult, QueryExecutionResult},
    graphite::MeasurementProvider,
    loader::BenchmarkQuery,
    measurable::{Measurable, Measurement, RunMode},
    synchronizer::ExecutionSynchronizer,
};
use internals::*;

#[derive(TypedBuilder)]
pub struct BenchmarkDriver<E: SqlEngine> {
    /// The engine under test, shared with worker tasks.
    pub engine: Arc<E>,
    pub synchronizer: ExecutionSynchronizer,
    /// Where measurements are read back from. Without one, no measurements are loaded.
    #[builder(default, setter(strip_option))]
    pub measurements: Option<Arc<dyn MeasurementProvider>>,
}

impl<E: SqlEngine> BenchmarkDriver<E> {
    /// Runs every benchmark in order. Stops at the first benchmark that fails to
    /// synchronize.
    pub async fn run_all(
        &self,
        benchmarks: &[BenchmarkExecution],
    ) -> Result<Vec<BenchmarkExecutionResult>> {
        let mut results = Vec::with_capacity(benchmarks.len());
        for (i, benchmark) in benchmarks.iter().enumerate() {
            tracing::info!("Starting benchmark: {}/{}", i + 1, benchmarks.len());
            results.push(self.run(benchmark).await?);
        }
        Ok(results)
    }

    pub async fn run(&self, benchmark: &BenchmarkExecution) -> Result<BenchmarkExecutionResult> {
        let run_mode = benchmark.run_mode();
        tracing::info!(
            "Running benchmark {} ({} runs, concurrency {}, {:?})",
            benchmark.name,
            benchmark.runs,
            benchmark.concurrency,
            run_mode
        );

        let utc_start = Utc::now();
        let mut executions = match run_mode {
            RunMode::Serial => self.run_serial(benchmark).await?,
            RunMode::Concurrent => self.run_concurrent(benchmark).await,
        };
        executions.sort_by_key(|e| e.run);
        let utc_end = Utc::now();

        let mut result = BenchmarkExecutionResult {
            name: benchmark.name.clone(),
            sequence_id: benchmark.sequence_id.clone(),
            run_mode,
            utc_start,
            utc_end,
            executions,
            measurements: vec![],
        };
        let failures = result.failures();
        if failures > 0 {
            tracing::warn!(
                "Benchmark {}: {failures}/{} runs failed",
                result.name,
                result.executions.len()
            );
        }

        self.synchronizer
            .await_after_benchmark_execution(&result)
            .await?;
        result.measurements = self.load_measurements(&result).await?;

        tracing::info!("Done running benchmark: {}!", result.name);
        Ok(result)
    }

    async fn run_serial(&self, benchmark: &BenchmarkExecution) -> Result<Vec<QueryExecutionResult>> {
        let mut executions = Vec::with_capacity(benchmark.runs);
        for run in 0..benchmark.runs {
            let mut result =
                execute_query(self.engine.as_ref(), &benchmark.query, run, RunMode::Serial).await;
            result.measurements = self.load_measurements(&result).await?;
            self.synchronizer.await_after_query_execution(&result).await?;
            executions.push(result);
        }
        Ok(executions)
    }

    async fn run_concurrent(&self, benchmark: &BenchmarkExecution) -> Vec<QueryExecutionResult> {
        tracing::info!("Spawning {} workers...", benchmark.concurrency);
        let handles = spawn_workers(
            self.engine.clone(),
            Arc::new(benchmark.query.clone()),
            benchmark.runs,
            benchmark.concurrency,
        );

        join_all(handles)
            .await
            .into_iter()
            .flat_map(|res| match res {
                Ok(r) => r,
                Err(e) => {
                    tracing::error!("Worker panicked with error: {e}");
                    // keep the results of the other workers
                    vec![]
                }
            })
            .collect()
    }

    async fn load_measurements<M: Measurable>(&self, measurable: &M) -> Result<Vec<Measurement>> {
        let Some(provider) = &self.measurements else {
            return Ok(vec![]);
        };
        if !self.synchronizer.properties().metrics_collection_enabled {
            return Ok(vec![]);
        }
        self.synchronizer.await_measurement_loading(measurable).await?;
        let cut_off = self.synchronizer.cut_off_threshold_seconds()?;
        match provider.load_measurements(measurable, cut_off).await {
            Ok(measurements) => Ok(measurements),
            Err(e) => {
                tracing::error!("Could not load measurements: {e}");
                Ok(vec![])
            }
        }
    }
}

/// One benchmark per query, using the configured runs, concurrency and sequence id.
pub fn benchmark_executions(
    queries: Vec<BenchmarkQuery>,
    properties: &BenchmarkProperties,
) -> Vec<BenchmarkExecution> {
    queries
        .into_iter()
        .map(|query| {
            BenchmarkExecution::new(query, properties.sequence_id.clone())
                .with_runs(properties.runs)
                .with_concurrency(properties.concurrency)
        })
        .collect()
}

#[cfg(feature = "internals")]
pub use internals::*;

/// Building blocks of the driver.
/// Encapsulated in a module to allow conditional exposure via `#[cfg(feature = "internals")]`.
mod internals {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Executes one run of `query`. Engine errors end up on the result.
    pub async fn execute_query<E: SqlEngine>(
        engine: &E,
        query: &BenchmarkQuery,
        run: usize,
        run_mode: RunMode,
    ) -> QueryExecutionResult {
        let utc_start = Utc::now();
        let outcome = engine.execute(&query.sql).await;
        let utc_end = Utc::now();

        let (rows, error) = match outcome {
            Ok(rows) => (rows, None),
            Err(e) => {
                tracing::warn!("Query {} (run {run}) failed: {e}", query.name);
                (0, Some(e.to_string()))
            }
        };
        QueryExecutionResult {
            query_name: query.name.clone(),
            run,
            run_mode,
            utc_start,
            utc_end,
            rows,
            error,
            measurements: vec![],
        }
    }

    /// Spawns `workers` Tokio tasks sharing `runs` runs of `query`.
    ///
    /// Each worker claims the next run index until all runs are taken and returns the
    /// results of the runs it executed.
    pub fn spawn_workers<E: SqlEngine>(
        engine: Arc<E>,
        query: Arc<BenchmarkQuery>,
        runs: usize,
        workers: usize,
    ) -> Vec<JoinHandle<Vec<QueryExecutionResult>>> {
        let next_run = Arc::new(AtomicUsize::new(0));
        (0..workers)
            .map(|i| {
                let engine = engine.clone();
                let query = query.clone();
                let next_run = next_run.clone();
                tokio::spawn(async move {
                    tracing::debug!("Worker {i} started.");
                    let mut results = Vec::new();
                    loop {
                        let run = next_run.fetch_add(1, Ordering::Relaxed);
                        if run >= runs {
                            break;
                        }
                        results.push(
                            execute_query(engine.as_ref(), &query, run, RunMode::Concurrent).await,
                        );
                    }
                    tracing::debug!("Worker {i} shutting down after {} runs.", results.len());
                    results
                })
            })
            .collect()
    }
}
