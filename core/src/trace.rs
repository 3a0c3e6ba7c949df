//! Per-task calculation trace.
//!
//! Every factor the pipeline applies is recorded here, so a reviewer can
//! read back how a task's hours were obtained. Anomalies that do not abort
//! the calculation (unresolvable task, missing ratio) land in `warnings`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Computed,
    /// Excluded state or excluded role; contributes zero.
    Excluded,
    /// No mapping rule matched; contributes zero.
    Unresolvable,
    /// The task references a flux/sens/segment id absent from the catalogue.
    ReferenceMissing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    pub step: String,
    pub detail: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub steps: Vec<TraceStep>,
    pub warnings: Vec<String>,
}

impl Trace {
    pub fn record(&mut self, step: &str, detail: impl Into<String>, value: f64) {
        self.steps.push(TraceStep {
            step: step.to_string(),
            detail: detail.into(),
            value,
        });
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.warnings.push(message);
    }

    /// Value recorded by the last occurrence of `step`, if any.
    pub fn value_of(&self, step: &str) -> Option<f64> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.step == step)
            .map(|s| s.value)
    }

    pub fn has_step(&self, step: &str) -> bool {
        self.steps.iter().any(|s| s.step == step)
    }

    /// Human readable formula, one clause per step.
    pub fn formula(&self) -> String {
        self.steps
            .iter()
            .map(|s| s.detail.as_str())
            .collect::<Vec<_>>()
            .join(" | ")
    }
}
