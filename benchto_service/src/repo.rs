use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::Result,
    model::{BenchmarkRun, BenchmarkRunKey, Status},
};

/// Durable store of benchmark runs.
///
/// Runs are saved whole, including executions and measurements, and keyed by
/// [`BenchmarkRunKey`]. Saving a run with an existing key replaces it.
#[async_trait]
pub trait BenchmarkRunRepo: Send + Sync {
    async fn save(&self, run: BenchmarkRun) -> Result<BenchmarkRun>;

    async fn find(&self, key: &BenchmarkRunKey) -> Result<Option<BenchmarkRun>>;

    /// Runs still in [`Status::Started`] that started before `date`, oldest first.
    async fn find_started_before(&self, date: DateTime<Utc>) -> Result<Vec<BenchmarkRun>>;
}

/// Keeps runs in memory. Useful for tests and single-process setups.
#[derive(Debug, Default)]
pub struct InMemoryBenchmarkRunRepo {
    runs: RwLock<HashMap<BenchmarkRunKey, BenchmarkRun>>,
}

impl InMemoryBenchmarkRunRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

#[async_trait]
impl BenchmarkRunRepo for InMemoryBenchmarkRunRepo {
    async fn save(&self, run: BenchmarkRun) -> Result<BenchmarkRun> {
        self.runs.write().await.insert(run.key(), run.clone());
        Ok(run)
    }

    async fn find(&self, key: &BenchmarkRunKey) -> Result<Option<BenchmarkRun>> {
        Ok(self.runs.read().await.get(key).cloned())
    }

    async fn find_started_before(&self, date: DateTime<Utc>) -> Result<Vec<BenchmarkRun>> {
        let mut runs: Vec<BenchmarkRun> = self
            .runs
            .read()
            .await
            .values()
            .filter(|run| run.status == Status::Started && run.started < date)
            .cloned()
            .collect();
        runs.sort_by_key(|run| run.started);
        Ok(runs)
    }
}
