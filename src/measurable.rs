use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the queries of one benchmark are scheduled.
///
/// A benchmark is either serial or concurrent, never both, so the wait that
/// separates measured runs fires either after every query or after the whole
/// benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// One query at a time.
    Serial,
    /// Several queries in parallel.
    Concurrent,
}

impl RunMode {
    pub fn from_concurrency(concurrency: usize) -> Self {
        if concurrency > 1 {
            Self::Concurrent
        } else {
            Self::Serial
        }
    }

    pub fn is_serial(self) -> bool {
        self == Self::Serial
    }

    pub fn is_concurrent(self) -> bool {
        self == Self::Concurrent
    }
}

/// An execution interval whose metrics are read back from the metrics backend
/// once it has ended.
///
/// Implemented by both a single query run and a whole benchmark.
pub trait Measurable: Send + Sync {
    fn utc_start(&self) -> DateTime<Utc>;

    fn utc_end(&self) -> DateTime<Utc>;

    /// Run mode of the benchmark this interval belongs to.
    fn run_mode(&self) -> RunMode;
}

/// A single named value recorded for a query run or a benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub unit: String,
    pub value: f64,
}

impl Measurement {
    pub fn new(name: impl Into<String>, unit: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            unit: unit.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_follows_concurrency() {
        assert_eq!(RunMode::from_concurrency(0), RunMode::Serial);
        assert_eq!(RunMode::from_concurrency(1), RunMode::Serial);
        assert_eq!(RunMode::from_concurrency(2), RunMode::Concurrent);
        assert!(RunMode::Serial.is_serial() && !RunMode::Serial.is_concurrent());
        assert!(RunMode::Concurrent.is_concurrent() && !RunMode::Concurrent.is_serial());
    }
}
