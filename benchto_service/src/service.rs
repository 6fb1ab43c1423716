use std::sync::Arc;

use benchto::Measurement;
use chrono::{DateTime, Utc};

use crate::{
    error::{Result, ServiceError},
    model::{BenchmarkRun, BenchmarkRunKey, Execution, Status},
    repo::BenchmarkRunRepo,
};

/// Records the lifecycle of benchmark runs and their executions.
///
/// A run is started once, collects executions while it is [`Status::Started`] and is
/// finished exactly once, either [`Status::Ended`] or [`Status::Failed`].
pub struct BenchmarkService<R: BenchmarkRunRepo> {
    repo: Arc<R>,
}

impl<R: BenchmarkRunRepo> Clone for BenchmarkService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
        }
    }
}

impl<R: BenchmarkRunRepo> BenchmarkService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub fn repo(&self) -> &Arc<R> {
        &self.repo
    }

    pub async fn start_benchmark_run(
        &self,
        key: BenchmarkRunKey,
        started: DateTime<Utc>,
    ) -> Result<BenchmarkRun> {
        if self.repo.find(&key).await?.is_some() {
            return Err(ServiceError::AlreadyExists(key.to_string()));
        }
        tracing::info!("Starting {key}");
        self.repo.save(BenchmarkRun::new(key, started)).await
    }

    pub async fn finish_benchmark_run(
        &self,
        key: &BenchmarkRunKey,
        ended: DateTime<Utc>,
        status: Status,
        measurements: Vec<Measurement>,
    ) -> Result<BenchmarkRun> {
        ensure_finished(status)?;
        let mut run = self.started_run(key).await?;
        tracing::info!("Finishing {key} as {status:?}");
        run.status = status;
        run.ended = Some(ended);
        run.measurements.extend(measurements);
        self.repo.save(run).await
    }

    pub async fn start_execution(
        &self,
        key: &BenchmarkRunKey,
        execution_sequence_id: &str,
        started: DateTime<Utc>,
    ) -> Result<BenchmarkRun> {
        let mut run = self.started_run(key).await?;
        if run.execution(execution_sequence_id).is_some() {
            return Err(ServiceError::AlreadyExists(format!(
                "execution {execution_sequence_id} of {key}"
            )));
        }
        tracing::debug!("Starting execution {execution_sequence_id} of {key}");
        run.executions.push(Execution {
            sequence_id: execution_sequence_id.to_string(),
            status: Status::Started,
            started,
            ended: None,
            measurements: vec![],
        });
        self.repo.save(run).await
    }

    pub async fn finish_execution(
        &self,
        key: &BenchmarkRunKey,
        execution_sequence_id: &str,
        ended: DateTime<Utc>,
        status: Status,
        measurements: Vec<Measurement>,
    ) -> Result<BenchmarkRun> {
        ensure_finished(status)?;
        let mut run = self.started_run(key).await?;
        let execution = run.execution_mut(execution_sequence_id).ok_or_else(|| {
            ServiceError::NotFound(format!("execution {execution_sequence_id} of {key}"))
        })?;
        if execution.status.is_finished() {
            return Err(ServiceError::InvalidState(format!(
                "execution {execution_sequence_id} of {key} is already {:?}",
                execution.status
            )));
        }
        tracing::debug!("Finishing execution {execution_sequence_id} of {key} as {status:?}");
        execution.status = status;
        execution.ended = Some(ended);
        execution.measurements.extend(measurements);
        self.repo.save(run).await
    }

    pub async fn find_benchmark_run(&self, key: &BenchmarkRunKey) -> Result<BenchmarkRun> {
        self.repo
            .find(key)
            .await?
            .ok_or_else(|| ServiceError::NotFound(key.to_string()))
    }

    async fn started_run(&self, key: &BenchmarkRunKey) -> Result<BenchmarkRun> {
        let run = self.find_benchmark_run(key).await?;
        if run.status.is_finished() {
            return Err(ServiceError::InvalidState(format!(
                "{key} is already {:?}",
                run.status
            )));
        }
        Ok(run)
    }
}

fn ensure_finished(status: Status) -> Result<()> {
    if status.is_finished() {
        Ok(())
    } else {
        Err(ServiceError::InvalidState(
            "a run can only be finished as ENDED or FAILED".to_string(),
        ))
    }
}
