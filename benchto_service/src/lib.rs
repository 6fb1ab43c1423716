//! Results service for the benchto driver.
//!
//! Stores benchmark runs with their executions and measurements, enforces the run
//! lifecycle (`STARTED` then `ENDED` or `FAILED`, once) and fails runs whose driver
//! disappeared. Reports produced by the driver are persisted through
//! [`ServiceReporter`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use benchto_service::{BenchmarkService, CleanerService, InMemoryBenchmarkRunRepo, ServiceReporter};
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() {
//!     let repo = Arc::new(InMemoryBenchmarkRunRepo::new());
//!     let (shutdown, rx) = watch::channel(false);
//!     let cleaner = CleanerService::new(repo.clone()).spawn(rx);
//!
//!     let reporter = ServiceReporter::new(BenchmarkService::new(repo));
//!     // hand `reporter` to the driver loop...
//!
//!     shutdown.send(true).ok();
//!     cleaner.await.ok();
//! }
//! ```

pub mod cleaner;
pub mod error;
pub mod model;
/// Benchmark run storage
pub mod repo;
pub mod reporter;
pub mod service;

pub use cleaner::CleanerService;
pub use error::{Result, ServiceError};
pub use model::{BenchmarkRun, BenchmarkRunKey, Execution, Status};
pub use repo::{BenchmarkRunRepo, InMemoryBenchmarkRunRepo};
pub use reporter::ServiceReporter;
pub use service::BenchmarkService;
