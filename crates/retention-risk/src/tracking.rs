//! Experiment tracking.
//!
//! Trackers are fire-and-forget: a failing sink is logged with
//! `tracing::warn!` and never fails training.

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One training run as seen by a tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_name: String,
    pub timestamp: DateTime<Utc>,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    pub tags: BTreeMap<String, String>,
}

impl RunRecord {
    /// Empty record named `<prefix>_<YYYYmmdd_HHMMSS>`.
    pub fn new(prefix: &str) -> Self {
        let timestamp = Utc::now();
        Self {
            run_name: format!("{prefix}_{}", timestamp.format("%Y%m%d_%H%M%S")),
            timestamp,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            tags: BTreeMap::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    /// Non-finite values are dropped.
    pub fn metric(mut self, key: &str, value: f64) -> Self {
        if value.is_finite() {
            self.metrics.insert(key.to_string(), value);
        }
        self
    }

    pub fn tag(mut self, key: &str, value: impl ToString) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }
}

/// A sink for run records.
pub trait ExperimentTracker: Send + Sync {
    /// Record a run. Must not panic; failures are logged, not returned.
    fn record(&self, run: &RunRecord);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

impl ExperimentTracker for NoopTracker {
    fn record(&self, _run: &RunRecord) {}
}

/// Appends one JSON object per run to a file.
#[derive(Debug, Clone)]
pub struct JsonlTracker {
    path: PathBuf,
}

impl JsonlTracker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, run: &RunRecord) -> std::io::Result<()> {
        let mut line = serde_json::to_string(run)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

impl ExperimentTracker for JsonlTracker {
    fn record(&self, run: &RunRecord) {
        if let Err(error) = self.append(run) {
            warn!(
                path = %self.path.display(),
                %error,
                run = %run.run_name,
                "experiment tracking failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> RunRecord {
        RunRecord::new("retention")
            .param("n_trees", 100)
            .metric("auc", 0.81)
            .metric("bad", f64::NAN)
            .tag("demo", false)
    }

    #[test]
    fn jsonl_appends_one_line_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = JsonlTracker::new(dir.path().join("runs.jsonl"));
        tracker.record(&run());
        tracker.record(&run());

        let text = std::fs::read_to_string(tracker.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: RunRecord = serde_json::from_str(lines[0]).unwrap();
        assert!(parsed.run_name.starts_with("retention_"));
        assert_eq!(parsed.params["n_trees"], "100");
        assert_eq!(parsed.metrics.get("auc"), Some(&0.81));
        assert!(!parsed.metrics.contains_key("bad"));
    }

    #[test]
    fn unwritable_sink_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending.
        JsonlTracker::new(dir.path()).record(&run());
    }
}
