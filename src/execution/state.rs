//! Run State
//!
//! Results recorded so far in one workflow run. The state is owned by the
//! run that creates it and is only read by the expressions of later steps;
//! nothing outlives the run.

use indexmap::IndexMap;
use log::debug;

use super::result::{RunResult, StepResult};
use crate::expression::{Dict, Value};

/// Step results of an in-progress workflow run.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    /// Recorded results, in execution order
    steps: IndexMap<String, StepResult>,

    /// ID of the step that failed (if any)
    failed_step: Option<String>,
}

impl RunState {
    /// Creates a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the result of a step.
    pub fn record(&mut self, step_id: &str, result: StepResult) {
        if result.succeeded() == Some(false) {
            debug!("Marking step '{}' as failed", step_id);
            self.failed_step = Some(step_id.to_string());
        }
        self.steps.insert(step_id.to_string(), result);
    }

    /// Returns the recorded result for a step.
    pub fn get(&self, step_id: &str) -> Option<&StepResult> {
        self.steps.get(step_id)
    }

    /// ID of the failed step, if the run has failed.
    pub fn failed_step(&self) -> Option<&str> {
        self.failed_step.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.failed_step.is_some()
    }

    /// True if the step ran and reported a truthy `changed`.
    pub fn changed(&self, step_id: &str) -> bool {
        self.get(step_id).map_or(false, StepResult::changed)
    }

    /// True if the step was recorded as skipped.
    pub fn skipped(&self, step_id: &str) -> bool {
        self.get(step_id).map_or(false, StepResult::is_skipped)
    }

    /// Recorded results as an expression value, bound to `steps`.
    pub fn to_value(&self) -> Value {
        let steps: Dict = self
            .steps
            .iter()
            .map(|(id, result)| (id.clone(), Value::from_json(&result.to_json())))
            .collect();
        Value::Dict(steps)
    }

    /// Finishes the run.
    pub fn into_result(self) -> RunResult {
        RunResult {
            succeeded: self.failed_step.is_none(),
            steps: self.steps,
        }
    }
}
