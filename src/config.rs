//! Driver configuration.
//!
//! Properties are plain values handed to the components that need them. They can be
//! assembled in code through their builders or deserialized from a JSON document:
//!
//! ```json
//! {
//!   "benchmark": { "sql_dir": "sql", "runs": 3, "concurrency": 1 },
//!   "graphite": {
//!     "url": "http://graphite:8080",
//!     "resolution_seconds": 10.0,
//!     "metrics_collection_enabled": true,
//!     "metrics": [{ "name": "cpu", "target": "cluster.cpu", "unit": "PERCENT" }]
//!   }
//! }
//! ```
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Deserializer};
use typed_builder::TypedBuilder;

use crate::error::{Error, Result};

/// A single Graphite series read back after every measured run.
#[derive(Debug, Clone, PartialEq, Deserialize, TypedBuilder)]
pub struct GraphiteMetric {
    /// Prefix of the measurement names produced from this series.
    #[builder(setter(into))]
    pub name: String,
    /// Graphite target expression, e.g. `sumSeries(cluster.*.cpu)`.
    #[builder(setter(into))]
    pub target: String,
    #[builder(default, setter(into))]
    #[serde(default)]
    pub unit: String,
}

/// Connection to the metrics backend and the resolution it samples at.
#[derive(Debug, Clone, PartialEq, Deserialize, TypedBuilder)]
pub struct GraphiteProperties {
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub url: Option<String>,
    /// Sampling interval of the backend in seconds.
    #[builder(default, setter(strip_option))]
    #[serde(default, deserialize_with = "positive_f64")]
    pub resolution_seconds: Option<f64>,
    #[builder(default)]
    #[serde(default)]
    pub metrics_collection_enabled: bool,
    #[builder(default)]
    #[serde(default)]
    pub metrics: Vec<GraphiteMetric>,
}

impl Default for GraphiteProperties {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GraphiteProperties {
    pub fn resolution_seconds(&self) -> Result<f64> {
        self.resolution_seconds
            .ok_or(Error::ConfigurationMissing("graphite.resolution_seconds"))
    }

    pub fn url(&self) -> Result<&str> {
        self.url
            .as_deref()
            .ok_or(Error::ConfigurationMissing("graphite.url"))
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(resolution) = self.resolution_seconds {
            if !(resolution.is_finite() && resolution > 0.0) {
                return Err(Error::invalid_configuration(format!(
                    "graphite.resolution_seconds must be positive, got {resolution}"
                )));
            }
        }
        Ok(())
    }
}

/// What to run and how.
#[derive(Debug, Clone, PartialEq, Deserialize, TypedBuilder)]
pub struct BenchmarkProperties {
    /// Directory holding one `*.sql` file per benchmark query.
    #[builder(setter(into))]
    pub sql_dir: PathBuf,
    /// How many times each query is executed within one benchmark.
    #[builder(default = 1)]
    #[serde(default = "one", deserialize_with = "positive_usize")]
    pub runs: usize,
    /// Number of queries in flight at once. `1` means a serial benchmark.
    #[builder(default = 1)]
    #[serde(default = "one", deserialize_with = "positive_usize")]
    pub concurrency: usize,
    #[builder(default = default_sequence_id(), setter(into))]
    #[serde(default = "default_sequence_id")]
    pub sequence_id: String,
    /// Only run the queries with these names. Empty runs everything.
    #[builder(default)]
    #[serde(default)]
    pub benchmark_names: Vec<String>,
}

impl BenchmarkProperties {
    pub fn validate(&self) -> Result<()> {
        if self.runs == 0 {
            return Err(Error::invalid_configuration("benchmark.runs must be positive"));
        }
        if self.concurrency == 0 {
            return Err(Error::invalid_configuration(
                "benchmark.concurrency must be positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, TypedBuilder)]
pub struct DriverProperties {
    pub benchmark: BenchmarkProperties,
    #[builder(default)]
    #[serde(default)]
    pub graphite: GraphiteProperties,
}

impl DriverProperties {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let properties: Self = serde_json::from_str(json)?;
        properties.validate()?;
        Ok(properties)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        self.benchmark.validate()?;
        self.graphite.validate()
    }
}

fn one() -> usize {
    1
}

fn default_sequence_id() -> String {
    Utc::now().format("%Y%m%d%H%M%S").to_string()
}

fn positive_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        Some(value) if !(value.is_finite() && value > 0.0) => {
            Err(serde::de::Error::custom("value must be positive"))
        }
        value => Ok(value),
    }
}

fn positive_usize<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = usize::deserialize(deserializer)?;
    if value > 0 {
        Ok(value)
    } else {
        Err(serde::de::Error::custom("value must be positive"))
    }
}
