//! Reads measurements of finished runs back from Graphite.
//!
//! Each configured [`GraphiteMetric`] is fetched through the render API as JSON:
//!
//! ```text
//! GET {url}/render?target={target}&from={start}&until={end + cut_off}&format=json
//! ```
//!
//! The range starts at the run's start and ends `cut_off` seconds after its end, so the
//! last sampling window touching the run is included. Null datapoints (windows without
//! samples) are skipped; the rest are reduced to a `<name>_mean` and a `<name>_max`
//! measurement.
use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    config::{GraphiteMetric, GraphiteProperties},
    error::Result,
    measurable::{Measurable, Measurement},
};

/// Source of measurements for a finished interval.
#[async_trait]
pub trait MeasurementProvider: Send + Sync {
    /// Loads the measurements covering `measurable`, extending the end of the queried
    /// range by `cut_off_seconds`.
    async fn load_measurements(
        &self,
        measurable: &dyn Measurable,
        cut_off_seconds: u64,
    ) -> Result<Vec<Measurement>>;
}

/// One series of a render API response.
#[derive(Debug, Deserialize)]
struct Series {
    datapoints: Vec<(Option<f64>, i64)>,
}

#[derive(Debug, Clone)]
pub struct GraphiteMeasurementProvider {
    client: reqwest::Client,
    url: String,
    metrics: Vec<GraphiteMetric>,
}

impl GraphiteMeasurementProvider {
    pub fn new(properties: &GraphiteProperties) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            url: properties.url()?.trim_end_matches('/').to_string(),
            metrics: properties.metrics.clone(),
        })
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn load_metric(
        &self,
        metric: &GraphiteMetric,
        (from, until): (i64, i64),
    ) -> Result<Vec<Measurement>> {
        let (from, until) = (from.to_string(), until.to_string());
        let body = self
            .client
            .get(format!("{}/render", self.url))
            .query(&[
                ("target", metric.target.as_str()),
                ("from", from.as_str()),
                ("until", until.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        measurements_from_render(metric, &body)
    }
}

#[async_trait]
impl MeasurementProvider for GraphiteMeasurementProvider {
    async fn load_measurements(
        &self,
        measurable: &dyn Measurable,
        cut_off_seconds: u64,
    ) -> Result<Vec<Measurement>> {
        let range = render_range(measurable, cut_off_seconds);
        let mut measurements = Vec::with_capacity(self.metrics.len() * 2);
        for metric in &self.metrics {
            tracing::debug!(
                "Loading graphite metric {} ({}) for range {:?}",
                metric.name,
                metric.target,
                range
            );
            measurements.extend(self.load_metric(metric, range).await?);
        }
        Ok(measurements)
    }
}

/// `from`/`until` epoch seconds for the render API.
pub fn render_range(measurable: &dyn Measurable, cut_off_seconds: u64) -> (i64, i64) {
    let cut_off = i64::try_from(cut_off_seconds).unwrap_or(i64::MAX);
    (
        measurable.utc_start().timestamp(),
        measurable.utc_end().timestamp().saturating_add(cut_off),
    )
}

/// Reduces a render API JSON body to the mean and max of all non-null datapoints.
pub fn measurements_from_render(metric: &GraphiteMetric, body: &[u8]) -> Result<Vec<Measurement>> {
    let series: Vec<Series> = serde_json::from_slice(body)?;
    let values: Vec<f64> = series
        .iter()
        .flat_map(|s| s.datapoints.iter().filter_map(|(value, _)| *value))
        .filter(|value| value.is_finite())
        .collect();

    if values.is_empty() {
        tracing::warn!("No datapoints for graphite metric {}", metric.name);
        return Ok(vec![]);
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Ok(vec![
        Measurement::new(format!("{}_mean", metric.name), metric.unit.clone(), mean),
        Measurement::new(format!("{}_max", metric.name), metric.unit.clone(), max),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, execution::QueryExecutionResult, measurable::RunMode};
    use chrono::{DateTime, TimeDelta, Utc};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    fn cpu() -> GraphiteMetric {
        GraphiteMetric::builder()
            .name("cpu")
            .target("cluster.cpu")
            .unit("PERCENT")
            .build()
    }

    fn result(utc_start: DateTime<Utc>, utc_end: DateTime<Utc>) -> QueryExecutionResult {
        QueryExecutionResult {
            query_name: "q".into(),
            run: 0,
            run_mode: RunMode::Serial,
            utc_start,
            utc_end,
            rows: 0,
            error: None,
            measurements: vec![],
        }
    }

    #[test]
    fn reduces_datapoints_skipping_nulls() {
        let body = br#"[
            {"target": "a", "datapoints": [[10.0, 100], [null, 110], [30.0, 120]]},
            {"target": "b", "datapoints": [[20.0, 100]]}
        ]"#;

        let measurements = measurements_from_render(&cpu(), body).unwrap();

        assert_eq!(
            measurements,
            vec![
                Measurement::new("cpu_mean", "PERCENT", 20.0),
                Measurement::new("cpu_max", "PERCENT", 30.0),
            ]
        );
    }

    #[test]
    fn empty_series_yield_nothing() {
        let body = br#"[{"target": "a", "datapoints": [[null, 100]]}]"#;
        assert!(measurements_from_render(&cpu(), body).unwrap().is_empty());
        assert!(measurements_from_render(&cpu(), b"[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_a_json_error() {
        assert!(matches!(
            measurements_from_render(&cpu(), b"<html>"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn range_extends_end_by_cut_off() {
        let start = DateTime::from_timestamp(1_000, 0).unwrap();
        let end = start + TimeDelta::seconds(30);
        assert_eq!(render_range(&result(start, end), 13), (1_000, 1_043));
    }

    #[test]
    fn missing_url_is_a_configuration_error() {
        assert!(matches!(
            GraphiteMeasurementProvider::new(&GraphiteProperties::default()),
            Err(Error::ConfigurationMissing("graphite.url"))
        ));
    }

    #[tokio::test]
    async fn queries_render_api() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).into_owned();
            let body = r#"[{"target": "cluster.cpu", "datapoints": [[1.0, 1000], [3.0, 1010]]}]"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            request
        });

        let properties = GraphiteProperties::builder()
            .url(format!("http://{addr}/"))
            .metrics(vec![cpu()])
            .build();
        let provider = GraphiteMeasurementProvider::new(&properties)
            .unwrap()
            .with_client(reqwest::Client::builder().no_proxy().build().unwrap());
        let start = DateTime::from_timestamp(1_000, 0).unwrap();

        let measurements = provider
            .load_measurements(&result(start, start + TimeDelta::seconds(10)), 13)
            .await
            .unwrap();

        let request = server.await.unwrap();
        let request_line = request.lines().next().unwrap();
        assert!(request_line.starts_with("GET /render?"), "{request_line}");
        assert!(request_line.contains("target=cluster.cpu"), "{request_line}");
        assert!(request_line.contains("from=1000"), "{request_line}");
        assert!(request_line.contains("until=1023"), "{request_line}");
        assert!(request_line.contains("format=json"), "{request_line}");
        assert_eq!(
            measurements,
            vec![
                Measurement::new("cpu_mean", "PERCENT", 2.0),
                Measurement::new("cpu_max", "PERCENT", 3.0),
            ]
        );
    }
}
