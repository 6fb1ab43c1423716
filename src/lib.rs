//! Benchto, a SQL benchmark driver that keeps query runs in step with a Graphite
//! metrics backend.
//!
//! Benchmark queries are loaded from `*.sql` files, executed against the engine under
//! test either serially or concurrently, and the metrics the backend recorded during
//! each run are read back afterwards. Because Graphite samples at a fixed resolution
//! and stores points with some delay, the driver has to pace itself: runs must not
//! share a sampling window, and metrics may only be read once the last window of a
//! run has been flushed. That pacing lives in the [`ExecutionSynchronizer`].
//!
//! # Architecture
//!
//! - [`QueryLoader`]: turns a directory of `*.sql` files into [`BenchmarkQuery`]s.
//! - [`SqlEngine`]: the engine under test. The crate only defines the seam.
//! - [`BenchmarkDriver`]: runs [`BenchmarkExecution`]s and produces
//!   [`BenchmarkExecutionResult`]s.
//! - [`ExecutionSynchronizer`]: computes and performs the waits between runs and
//!   before measurement loading.
//! - [`MeasurementProvider`]: reads measurements of a finished interval back, with a
//!   Graphite render API implementation.
//! - [`BenchmarkReport`]: summary derived from a result, handed to [`Reporter`]s.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use benchto::{
//!     BenchmarkDriver, DriverProperties, ExecutionSynchronizer, QueryLoader,
//!     driver::benchmark_executions,
//!     engine::{EngineError, SqlEngine},
//!     report::{BenchmarkReport, Reporter, StdoutReporter},
//! };
//!
//! struct Noop;
//!
//! impl SqlEngine for Noop {
//!     async fn execute(&self, _sql: &str) -> Result<u64, EngineError> {
//!         Ok(0)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> benchto::Result<()> {
//!     let properties = DriverProperties::from_json_file("benchmark.json")?;
//!     let queries = QueryLoader::from_properties(&properties.benchmark).load_benchmark_queries()?;
//!
//!     let driver = BenchmarkDriver::builder()
//!         .engine(Arc::new(Noop))
//!         .synchronizer(ExecutionSynchronizer::new(properties.graphite.clone()))
//!         .build();
//!
//!     for result in driver
//!         .run_all(&benchmark_executions(queries, &properties.benchmark))
//!         .await?
//!     {
//!         StdoutReporter.report(&BenchmarkReport::from(result)).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Feature flags
//! - `internals`: exposes the driver's building blocks (`execute_query`, `spawn_workers`).

/// Driver configuration
pub mod config;
/// Runs benchmarks against the engine under test
pub mod driver;
/// The engine under test
pub mod engine;
pub mod error;
/// Benchmark definitions and results
pub mod execution;
/// Graphite measurement loading
pub mod graphite;
/// SQL query loading
pub mod loader;
pub mod measurable;
/// Reports and Reporters
pub mod report;
/// Pacing against the metrics backend resolution
pub mod synchronizer;

pub use config::{BenchmarkProperties, DriverProperties, GraphiteMetric, GraphiteProperties};
pub use driver::BenchmarkDriver;
pub use engine::SqlEngine;
pub use error::{Error, Result};
pub use execution::{BenchmarkExecution, BenchmarkExecutionResult, QueryExecutionResult};
pub use graphite::{GraphiteMeasurementProvider, MeasurementProvider};
pub use loader::{BenchmarkQuery, QueryLoader};
pub use measurable::{Measurable, Measurement, RunMode};
pub use report::{BenchmarkReport, Reporter};
pub use synchronizer::ExecutionSynchronizer;
