use benchto::{report::ExecutionReport, BenchmarkReport, Measurement, Reporter};

use crate::{
    model::{BenchmarkRunKey, Status},
    repo::BenchmarkRunRepo,
    service::BenchmarkService,
};

/// Persists benchmark reports as runs through a [`BenchmarkService`].
///
/// Each report becomes one run keyed by its name and sequence id, with one execution
/// per query run. Runs with failed queries are stored as [`Status::Failed`].
pub struct ServiceReporter<R: BenchmarkRunRepo> {
    service: BenchmarkService<R>,
}

impl<R: BenchmarkRunRepo> ServiceReporter<R> {
    pub fn new(service: BenchmarkService<R>) -> Self {
        Self { service }
    }

    async fn store(&self, report: &BenchmarkReport) -> crate::Result<()> {
        let key = BenchmarkRunKey::new(&report.name, &report.sequence_id);
        self.service
            .start_benchmark_run(key.clone(), report.started)
            .await?;

        for execution in &report.executions {
            let sequence_id = execution.run.to_string();
            self.service
                .start_execution(&key, &sequence_id, execution.started)
                .await?;
            self.service
                .finish_execution(
                    &key,
                    &sequence_id,
                    execution.ended,
                    execution_status(execution),
                    execution_measurements(execution),
                )
                .await?;
        }

        let status = if report.is_successful() {
            Status::Ended
        } else {
            Status::Failed
        };
        self.service
            .finish_benchmark_run(&key, report.ended, status, report.measurements.clone())
            .await?;
        Ok(())
    }
}

fn execution_status(execution: &ExecutionReport) -> Status {
    match execution.error {
        Some(_) => Status::Failed,
        None => Status::Ended,
    }
}

fn execution_measurements(execution: &ExecutionReport) -> Vec<Measurement> {
    let mut measurements = vec![Measurement::new(
        "duration",
        "MILLISECONDS",
        execution.duration.as_secs_f64() * 1000.0,
    )];
    measurements.extend(execution.measurements.iter().cloned());
    measurements
}

impl<R: BenchmarkRunRepo> Reporter<BenchmarkReport> for ServiceReporter<R> {
    async fn report(&self, report: &BenchmarkReport) -> benchto::Result<()> {
        self.store(report)
            .await
            .map_err(|e| benchto::Error::report(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use benchto::RunMode;
    use chrono::{DateTime, TimeDelta};

    use super::*;
    use crate::repo::InMemoryBenchmarkRunRepo;

    fn report(errors: &[Option<&str>]) -> BenchmarkReport {
        let start = DateTime::from_timestamp(1_000, 0).unwrap();
        let executions: Vec<ExecutionReport> = errors
            .iter()
            .enumerate()
            .map(|(run, error)| ExecutionReport {
                run,
                started: start + TimeDelta::seconds(run as i64),
                ended: start + TimeDelta::seconds(run as i64) + TimeDelta::milliseconds(250),
                duration: Duration::from_millis(250),
                rows: 3,
                error: error.map(str::to_owned),
                measurements: vec![Measurement::new("cpu_mean", "PERCENT", 12.0)],
            })
            .collect();
        let failures = executions.iter().filter(|e| e.error.is_some()).count();
        BenchmarkReport {
            name: "q1".into(),
            sequence_id: "nightly".into(),
            run_mode: RunMode::Serial,
            started: start,
            ended: start + TimeDelta::seconds(10),
            count: executions.len(),
            failures,
            success_ratio: 0.0,
            min_duration: Duration::from_millis(250),
            mean_duration: Duration::from_millis(250),
            max_duration: Duration::from_millis(250),
            executions,
            measurements: vec![Measurement::new("cpu_max", "PERCENT", 90.0)],
        }
    }

    fn reporter() -> (Arc<InMemoryBenchmarkRunRepo>, ServiceReporter<InMemoryBenchmarkRunRepo>) {
        let repo = Arc::new(InMemoryBenchmarkRunRepo::new());
        let reporter = ServiceReporter::new(BenchmarkService::new(repo.clone()));
        (repo, reporter)
    }

    #[tokio::test]
    async fn stores_run_with_executions() {
        let (repo, reporter) = reporter();
        reporter.report(&report(&[None, None])).await.unwrap();

        let run = repo
            .find(&BenchmarkRunKey::new("q1", "nightly"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(run.status, Status::Ended);
        assert_eq!(run.executions.len(), 2);
        assert_eq!(run.measurements[0].name, "cpu_max");

        let second = run.execution("1").unwrap();
        assert_eq!(second.status, Status::Ended);
        assert_eq!(second.measurements[0].name, "duration");
        assert_eq!(second.measurements[0].value, 250.0);
        assert_eq!(second.measurements[1].name, "cpu_mean");
    }

    #[tokio::test]
    async fn failed_queries_fail_the_run() {
        let (repo, reporter) = reporter();
        reporter
            .report(&report(&[None, Some("syntax error")]))
            .await
            .unwrap();

        let run = repo
            .find(&BenchmarkRunKey::new("q1", "nightly"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(run.status, Status::Failed);
        assert_eq!(run.execution("0").unwrap().status, Status::Ended);
        assert_eq!(run.execution("1").unwrap().status, Status::Failed);
    }

    #[tokio::test]
    async fn reporting_twice_is_a_report_error() {
        let (_, reporter) = reporter();
        reporter.report(&report(&[None])).await.unwrap();

        assert!(matches!(
            reporter.report(&report(&[None])).await,
            Err(benchto::Error::Report(_))
        ));
    }
}
