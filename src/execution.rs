//! Benchmark definitions and the records produced by running them.
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    loader::BenchmarkQuery,
    measurable::{Measurable, Measurement, RunMode},
};

/// One benchmark: a query executed `runs` times with a given concurrency.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkExecution {
    pub name: String,
    pub sequence_id: String,
    pub query: BenchmarkQuery,
    pub runs: usize,
    pub concurrency: usize,
}

impl BenchmarkExecution {
    pub fn new(query: BenchmarkQuery, sequence_id: impl Into<String>) -> Self {
        Self {
            name: query.name.clone(),
            sequence_id: sequence_id.into(),
            query,
            runs: 1,
            concurrency: 1,
        }
    }

    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn run_mode(&self) -> RunMode {
        RunMode::from_concurrency(self.concurrency)
    }
}

/// Outcome of a single query run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryExecutionResult {
    pub query_name: String,
    /// Zero based index of the run within its benchmark.
    pub run: usize,
    pub run_mode: RunMode,
    pub utc_start: DateTime<Utc>,
    pub utc_end: DateTime<Utc>,
    pub rows: u64,
    pub error: Option<String>,
    pub measurements: Vec<Measurement>,
}

impl QueryExecutionResult {
    pub fn is_successful(&self) -> bool {
        self.error.is_none()
    }

    pub fn duration(&self) -> Duration {
        (self.utc_end - self.utc_start).to_std().unwrap_or_default()
    }
}

impl Measurable for QueryExecutionResult {
    fn utc_start(&self) -> DateTime<Utc> {
        self.utc_start
    }

    fn utc_end(&self) -> DateTime<Utc> {
        self.utc_end
    }

    fn run_mode(&self) -> RunMode {
        self.run_mode
    }
}

/// Outcome of a whole benchmark, collecting every query run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkExecutionResult {
    pub name: String,
    pub sequence_id: String,
    pub run_mode: RunMode,
    pub utc_start: DateTime<Utc>,
    pub utc_end: DateTime<Utc>,
    pub executions: Vec<QueryExecutionResult>,
    pub measurements: Vec<Measurement>,
}

impl BenchmarkExecutionResult {
    pub fn is_successful(&self) -> bool {
        self.executions.iter().all(QueryExecutionResult::is_successful)
    }

    pub fn failures(&self) -> usize {
        self.executions.iter().filter(|e| !e.is_successful()).count()
    }
}

impl Measurable for BenchmarkExecutionResult {
    fn utc_start(&self) -> DateTime<Utc> {
        self.utc_start
    }

    fn utc_end(&self) -> DateTime<Utc> {
        self.utc_end
    }

    fn run_mode(&self) -> RunMode {
        self.run_mode
    }
}
