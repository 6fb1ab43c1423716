use std::fmt;

use benchto::Measurement;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Started,
    Ended,
    Failed,
}

impl Status {
    pub fn is_finished(self) -> bool {
        self != Self::Started
    }
}

/// Identity of a benchmark run. Unique across the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BenchmarkRunKey {
    pub name: String,
    pub sequence_id: String,
}

impl BenchmarkRunKey {
    pub fn new(name: impl Into<String>, sequence_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequence_id: sequence_id.into(),
        }
    }
}

impl fmt::Display for BenchmarkRunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "benchmark run {} ({})", self.name, self.sequence_id)
    }
}

/// One execution of a benchmark's query within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub sequence_id: String,
    pub status: Status,
    pub started: DateTime<Utc>,
    pub ended: Option<DateTime<Utc>>,
    pub measurements: Vec<Measurement>,
}

/// A benchmark run with its executions and benchmark level measurements.
///
/// Two runs are equal when they share the same name and sequence id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkRun {
    pub name: String,
    pub sequence_id: String,
    pub status: Status,
    pub started: DateTime<Utc>,
    pub ended: Option<DateTime<Utc>>,
    pub executions: Vec<Execution>,
    pub measurements: Vec<Measurement>,
}

impl BenchmarkRun {
    pub fn new(key: BenchmarkRunKey, started: DateTime<Utc>) -> Self {
        Self {
            name: key.name,
            sequence_id: key.sequence_id,
            status: Status::Started,
            started,
            ended: None,
            executions: vec![],
            measurements: vec![],
        }
    }

    pub fn key(&self) -> BenchmarkRunKey {
        BenchmarkRunKey::new(&self.name, &self.sequence_id)
    }

    pub fn execution(&self, sequence_id: &str) -> Option<&Execution> {
        self.executions.iter().find(|e| e.sequence_id == sequence_id)
    }

    pub fn execution_mut(&mut self, sequence_id: &str) -> Option<&mut Execution> {
        self.executions
            .iter_mut()
            .find(|e| e.sequence_id == sequence_id)
    }
}

impl PartialEq for BenchmarkRun {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.sequence_id == other.sequence_id
    }
}

impl Eq for BenchmarkRun {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_are_identified_by_name_and_sequence_id() {
        let now = Utc::now();
        let mut a = BenchmarkRun::new(BenchmarkRunKey::new("q1", "1"), now);
        let b = BenchmarkRun::new(BenchmarkRunKey::new("q1", "1"), now);
        a.status = Status::Failed;

        assert_eq!(a, b);
        assert_ne!(a, BenchmarkRun::new(BenchmarkRunKey::new("q1", "2"), now));
        assert_eq!(a.key().to_string(), "benchmark run q1 (1)");
    }

    #[test]
    fn status_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Status::Failed).unwrap(), "\"FAILED\"");
        assert!(!Status::Started.is_finished());
        assert!(Status::Ended.is_finished());
    }
}
