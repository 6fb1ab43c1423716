use std::{fs, sync::Arc, time::Duration};

use benchto::{
    driver::benchmark_executions,
    engine::{EngineError, SqlEngine},
    BenchmarkDriver, BenchmarkProperties, BenchmarkReport, ExecutionSynchronizer,
    GraphiteProperties, QueryLoader, Reporter,
};
use benchto_service::{
    BenchmarkRunKey, BenchmarkRunRepo, BenchmarkService, InMemoryBenchmarkRunRepo,
    ServiceReporter, Status,
};
use tokio::time::Instant;

/// Fails every query touching `missing_table`.
struct Engine;

impl SqlEngine for Engine {
    async fn execute(&self, sql: &str) -> Result<u64, EngineError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if sql.contains("missing_table") {
            return Err("relation missing_table does not exist".into());
        }
        Ok(1)
    }
}

#[tokio::test(start_paused = true)]
async fn loaded_queries_are_run_paced_and_stored() {
    let sql_dir = tempfile::tempdir().unwrap();
    fs::write(sql_dir.path().join("a_count.sql"), "SELECT count(*)\nFROM lineitem;\n").unwrap();
    fs::write(sql_dir.path().join("b_broken.sql"), "SELECT * FROM missing_table;").unwrap();
    fs::write(sql_dir.path().join("notes.txt"), "not a query").unwrap();

    let properties = BenchmarkProperties::builder()
        .sql_dir(sql_dir.path())
        .runs(2)
        .sequence_id("it")
        .build();
    let queries = QueryLoader::from_properties(&properties)
        .load_benchmark_queries()
        .unwrap();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].sql, "SELECT count(*) FROM lineitem");

    let driver = BenchmarkDriver::builder()
        .engine(Arc::new(Engine))
        .synchronizer(ExecutionSynchronizer::new(
            GraphiteProperties::builder()
                .resolution_seconds(1.0)
                .metrics_collection_enabled(true)
                .build(),
        ))
        .build();

    let start = Instant::now();
    let results = driver
        .run_all(&benchmark_executions(queries, &properties))
        .await
        .unwrap();
    // 2 benchmarks x 2 serial runs x (100ms query + 2s pause)
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(8400), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(8500), "{elapsed:?}");

    let repo = Arc::new(InMemoryBenchmarkRunRepo::new());
    let reporter = ServiceReporter::new(BenchmarkService::new(repo.clone()));
    for result in results {
        reporter.report(&BenchmarkReport::from(result)).await.unwrap();
    }

    let count = repo
        .find(&BenchmarkRunKey::new("a_count", "it"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(count.status, Status::Ended);
    assert_eq!(count.executions.len(), 2);
    assert!(count.executions.iter().all(|e| e.status == Status::Ended));

    let broken = repo
        .find(&BenchmarkRunKey::new("b_broken", "it"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(broken.status, Status::Failed);
    assert!(broken.executions.iter().all(|e| e.status == Status::Failed));
}
