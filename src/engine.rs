use std::future::Future;

/// Error type reported by a [`SqlEngine`]. Failures are recorded on the query result
/// rather than aborting the benchmark.
pub type EngineError = Box<dyn std::error::Error + Send + Sync>;

/// The database under test.
///
/// The driver only needs to submit a statement and learn how many rows came back;
/// connection handling, sessions and result streaming belong to the implementation.
///
/// # Example
/// ```rust
/// use benchto::engine::{EngineError, SqlEngine};
///
/// struct Noop;
///
/// impl SqlEngine for Noop {
///     async fn execute(&self, _sql: &str) -> Result<u64, EngineError> {
///         Ok(0)
///     }
/// }
/// ```
pub trait SqlEngine: Send + Sync + 'static {
    /// Executes `sql` to completion and returns the number of rows produced.
    fn execute(&self, sql: &str) -> impl Future<Output = Result<u64, EngineError>> + Send;
}
