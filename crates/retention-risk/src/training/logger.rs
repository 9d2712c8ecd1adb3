//! Training progress logging on top of `tracing`.
//!
//! [`Verbosity`] gates what a training run emits; [`TrainingLogger`] maps
//! each level onto the corresponding `tracing` macro so the subscriber
//! installed by the application decides where output goes.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// How much a training run reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Nothing.
    Silent,
    /// Warnings only.
    #[default]
    Warning,
    /// Stage summaries.
    Info,
    /// Per-round metrics.
    Debug,
}

/// Verbosity-gated logger for one training run.
#[derive(Debug)]
pub struct TrainingLogger {
    verbosity: Verbosity,
    started: Option<Instant>,
}

impl TrainingLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            started: None,
        }
    }

    #[inline]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn start_training(&mut self, n_trees: usize, n_rows: usize) {
        self.started = Some(Instant::now());
        if self.verbosity >= Verbosity::Info {
            tracing::info!(n_trees, n_rows, "boosting started");
        }
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= Verbosity::Warning {
            tracing::warn!("{message}");
        }
    }

    /// Per-round metrics, at `Debug`.
    pub fn log_round(&self, round: usize, metrics: &[(&'static str, f64)]) {
        if self.verbosity >= Verbosity::Debug {
            let rendered: Vec<String> = metrics
                .iter()
                .map(|(name, v)| format!("{name}={v:.5}"))
                .collect();
            tracing::debug!(round, metrics = %rendered.join(" "), "boosting round");
        }
    }

    pub fn finish_training(&self, n_trees: usize) {
        if self.verbosity >= Verbosity::Info {
            let elapsed_ms = self.started.map(|s| s.elapsed().as_millis()).unwrap_or(0);
            tracing::info!(n_trees, elapsed_ms, "boosting complete");
        }
    }
}
