use std::{fs, sync::Arc, time::Duration};

use benchto::{
    BenchmarkDriver, BenchmarkReport, DriverProperties, ExecutionSynchronizer, QueryLoader,
    Reporter,
    driver::benchmark_executions,
    engine::{EngineError, SqlEngine},
    report::StdoutReporter,
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Pretends to be a database. Swap in a real client here.
struct SleepyEngine;

impl SqlEngine for SleepyEngine {
    async fn execute(&self, sql: &str) -> Result<u64, EngineError> {
        tokio::time::sleep(Duration::from_millis(50 + sql.len() as u64)).await;
        Ok(1)
    }
}

#[tokio::main]
async fn main() -> benchto::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "debug".into()))
        .init();

    let sql_dir = tempfile::tempdir()?;
    fs::write(sql_dir.path().join("q01.sql"), "SELECT count(*)\nFROM nation;\n")?;
    fs::write(sql_dir.path().join("q02.sql"), "SELECT * FROM region;")?;

    // No graphite url: pacing still happens, measurements are just not read back
    let properties = DriverProperties::from_json_str(&format!(
        r#"{{
            "benchmark": {{ "sql_dir": {:?}, "runs": 3, "sequence_id": "demo" }},
            "graphite": {{ "resolution_seconds": 1, "metrics_collection_enabled": true }}
        }}"#,
        sql_dir.path()
    ))?;

    // Ctrl-C cancels whatever wait is in progress
    let (shutdown, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.send(true).ok();
        }
    });

    let driver = BenchmarkDriver::builder()
        .engine(Arc::new(SleepyEngine))
        .synchronizer(
            ExecutionSynchronizer::builder()
                .properties(properties.graphite.clone())
                .shutdown(rx)
                .build(),
        )
        .build();

    let queries = QueryLoader::from_properties(&properties.benchmark).load_benchmark_queries()?;
    for result in driver
        .run_all(&benchmark_executions(queries, &properties.benchmark))
        .await?
    {
        StdoutReporter.report(&BenchmarkReport::from(result)).await?;
    }
    Ok(())
}
