//! Step and Run Results
//!
//! Every step kind reports its own shape of result, but all of them share a
//! `succeeded` entry that is `true`, `false` or `null` (skipped). Results are
//! kept typed while a run is in progress and turned into JSON mappings when
//! they are exposed to expressions or serialized.

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value as JsonValue};

/// Result of a `run` step or a `run(...)` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellOutcome {
    pub succeeded: bool,
    /// Concatenated stdout of every command that ran
    pub output: String,
    /// Concatenated stderr of every command that ran
    pub error: String,
    /// Exit code of the last command that ran
    pub returncode: i32,
}

/// Result of a `do` step: the mapping the script wrote, plus captured
/// streams.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOutcome {
    /// Always contains `succeeded`
    pub fields: Map<String, JsonValue>,
    pub output: Option<String>,
    pub error: Option<String>,
}

/// Result of a `py` step.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineOutcome {
    pub succeeded: bool,
    /// Contents of `outputs`; empty when the step failed
    pub outputs: Map<String, JsonValue>,
    pub output: Option<String>,
    pub error: Option<String>,
}

/// Result recorded for one step.
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    /// The step's condition was falsy
    Skipped,
    Shell(ShellOutcome),
    Script(ScriptOutcome),
    Inline(InlineOutcome),
    /// A nested workflow's run, recorded as-is
    Workflow(RunResult),
}

/// Result of a whole workflow run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub succeeded: bool,
    pub steps: IndexMap<String, StepResult>,
}

fn insert_text(map: &mut Map<String, JsonValue>, key: &str, text: &Option<String>) {
    if let Some(text) = text {
        map.insert(key.to_string(), JsonValue::String(text.clone()));
    }
}

impl StepResult {
    /// `Some(true)` or `Some(false)` for steps that ran, `None` when skipped.
    pub fn succeeded(&self) -> Option<bool> {
        match self {
            StepResult::Skipped => None,
            StepResult::Shell(outcome) => Some(outcome.succeeded),
            StepResult::Script(outcome) => {
                Some(outcome.fields.get("succeeded").and_then(JsonValue::as_bool) == Some(true))
            }
            StepResult::Inline(outcome) => Some(outcome.succeeded),
            StepResult::Workflow(run) => Some(run.succeeded),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StepResult::Skipped)
    }

    /// True if the result carries a truthy `changed` entry.
    pub fn changed(&self) -> bool {
        let value = match self {
            StepResult::Script(outcome) => outcome.fields.get("changed"),
            StepResult::Inline(outcome) => outcome.outputs.get("changed"),
            _ => None,
        };
        value.map_or(false, is_truthy)
    }

    /// The result as a JSON mapping.
    pub fn to_json(&self) -> JsonValue {
        match self {
            StepResult::Skipped => json!({ "succeeded": null }),
            StepResult::Shell(outcome) => json!({
                "succeeded": outcome.succeeded,
                "output": outcome.output,
                "error": outcome.error,
                "returncode": outcome.returncode,
            }),
            StepResult::Script(outcome) => {
                let mut map = outcome.fields.clone();
                insert_text(&mut map, "output", &outcome.output);
                insert_text(&mut map, "error", &outcome.error);
                JsonValue::Object(map)
            }
            StepResult::Inline(outcome) => {
                let mut map = Map::new();
                map.insert("succeeded".into(), JsonValue::Bool(outcome.succeeded));
                for (key, value) in &outcome.outputs {
                    map.insert(key.clone(), value.clone());
                }
                insert_text(&mut map, "output", &outcome.output);
                insert_text(&mut map, "error", &outcome.error);
                JsonValue::Object(map)
            }
            StepResult::Workflow(run) => run.to_json(),
        }
    }
}

impl Serialize for StepResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl RunResult {
    pub fn to_json(&self) -> JsonValue {
        let steps: Map<String, JsonValue> = self
            .steps
            .iter()
            .map(|(id, result)| (id.clone(), result.to_json()))
            .collect();
        json!({ "succeeded": self.succeeded, "steps": steps })
    }
}

/// JSON truthiness, matching the expression language.
pub(crate) fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(items) => !items.is_empty(),
        JsonValue::Object(map) => !map.is_empty(),
    }
}
