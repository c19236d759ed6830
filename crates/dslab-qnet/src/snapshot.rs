//! Read-only views of the model state for reporting.

use serde::Serialize;
use serde_json::json;

use crate::{log_debug, log_info};

/// Structured view of a value, consumed uniformly by reporting code.
pub trait Snapshot {
    /// Returns the current state as a JSON value.
    fn snapshot(&self) -> serde_json::Value;
}

/// Result of a named evaluation function.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Evaluation name.
    pub name: String,
    /// Computed value.
    pub result: f64,
}

/// Snapshot of the whole model at some simulation time.
#[derive(Clone, Debug, Serialize)]
pub struct ModelSnapshot {
    /// Model name.
    pub name: String,
    /// Model clock.
    pub time: f64,
    /// State of each node in firing order.
    pub nodes: Vec<serde_json::Value>,
    /// Names of the nodes fired at this time.
    pub updated_nodes: Vec<String>,
    /// Aggregate model metrics.
    pub model_metrics: serde_json::Value,
    /// Metrics of each node in firing order.
    pub node_metrics: Vec<serde_json::Value>,
    /// Results of the evaluation functions, filled in final snapshots only.
    pub evaluations: Vec<EvaluationReport>,
}

impl ModelSnapshot {
    /// Returns the model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the snapshot time.
    pub fn time(&self) -> f64 {
        self.time
    }
}

/// Receives snapshots while the model is simulated.
pub trait Reporter {
    /// Called after each simulation step which fired at least one node.
    fn on_step(&mut self, _snapshot: &ModelSnapshot) {}

    /// Called once when the simulation reaches its horizon.
    fn on_finish(&mut self, _snapshot: &ModelSnapshot) {}
}

/// Reporter which ignores everything.
pub struct NoReporter;

impl Reporter for NoReporter {}

/// Reporter writing snapshots to the log: node states at debug level, final metrics at info level.
pub struct LogReporter;

impl Reporter for LogReporter {
    fn on_step(&mut self, snapshot: &ModelSnapshot) {
        log_debug!(
            snapshot,
            json!({"updated": snapshot.updated_nodes, "nodes": snapshot.nodes})
        );
    }

    fn on_finish(&mut self, snapshot: &ModelSnapshot) {
        log_info!(snapshot, json!({"model": snapshot.model_metrics}));
        for metrics in &snapshot.node_metrics {
            log_info!(snapshot, metrics);
        }
        for report in &snapshot.evaluations {
            log_info!(snapshot, "{} = {:.6}", report.name, report.result);
        }
    }
}
