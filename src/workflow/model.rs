//! Workflow Data Model
//!
//! Core data structures representing workflows, their steps and the input
//! schemas attached to workflows, scripts and inline code steps.
//!
//! # Example YAML Format
//!
//! ```yaml
//! inputs:
//!   target:
//!     type: str
//!   retries:
//!     type: int
//!     default: 3
//!
//! steps:
//!   - name: check
//!     run: test -d ${inputs['target']}
//!
//!   - name: install
//!     do: install_packages
//!     with:
//!       packages: [git, curl]
//!
//!   - name: report
//!     if: changed('install')
//!     py: |
//!       outputs['summary'] = 'installed on ' + platform
//! ```

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::error::EngineError;
use crate::workflow::condition::Condition;

/// Declared type of an input.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Int,
    Float,
    Bool,
    #[default]
    Str,
    List,
    Dict,
}

/// Declaration of a single input (or output) value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct InputSpec {
    /// Expected type of the value
    #[serde(rename = "type", default)]
    pub kind: InputType,

    /// Whether the caller must provide the value when no default exists
    #[serde(default = "default_required")]
    pub required: bool,

    /// Value used when the caller provides none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_required() -> bool {
    true
}

impl InputSpec {
    pub fn new(kind: InputType) -> Self {
        Self {
            kind,
            required: true,
            default: None,
            description: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// Named input declarations, in declaration order.
pub type InputSchema = IndexMap<String, InputSpec>;

/// What a step does.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// `do:` run a script from the scripts directory
    Script(String),
    /// `run:` one or more shell command lines
    Shell(Vec<String>),
    /// `py:` inline code
    Inline(String),
    /// `workflow:` a nested workflow
    Workflow(String),
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Script(_) => "do",
            Action::Shell(_) => "run",
            Action::Inline(_) => "py",
            Action::Workflow(_) => "workflow",
        }
    }
}

/// Represents a single step in a workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Identifier used in the run state (`id`, else `name`, else position)
    pub id: String,

    /// Optional display name
    pub name: Option<String>,

    pub action: Action,

    /// Gate evaluated before the step runs
    pub condition: Option<Condition>,

    /// Parameters, substituted before use
    pub with: Map<String, JsonValue>,

    /// Input schema for inline code steps
    pub inputs: Option<InputSchema>,
}

/// Accepts a single command line or a list of them.
fn single_or_vec<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Option::<JsonValue>::deserialize(deserializer)?;
    match val {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(vec![s])),
        Some(JsonValue::Array(arr)) => arr
            .into_iter()
            .map(|v| match v {
                JsonValue::String(s) => Ok(s),
                _ => Err(de::Error::custom("Expected string in command list")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(_) => Err(de::Error::custom("Expected string or list of strings")),
    }
}

/// Step definition as written in YAML.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct StepDefinition {
    #[serde(default)]
    id: Option<JsonValue>,
    #[serde(default)]
    name: Option<JsonValue>,
    #[serde(rename = "if", default)]
    condition: Option<JsonValue>,
    #[serde(default)]
    with: Option<Map<String, JsonValue>>,
    #[serde(default)]
    inputs: Option<InputSchema>,
    #[serde(rename = "do", default)]
    script: Option<String>,
    #[serde(default, deserialize_with = "single_or_vec")]
    run: Option<Vec<String>>,
    #[serde(default)]
    py: Option<String>,
    #[serde(default)]
    workflow: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<JsonValue>,
}

fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl Step {
    /// Creates a step with the given id and action.
    ///
    /// # Example
    ///
    /// ```
    /// use runway::workflow::{Action, Step};
    ///
    /// let step = Step::new("greet", Action::Shell(vec!["echo hello".into()]))
    ///     .with_param("env", serde_json::json!({"GREETING": "hi"}));
    /// assert_eq!(step.action.kind(), "run");
    /// ```
    pub fn new(id: impl Into<String>, action: Action) -> Self {
        Self {
            id: id.into(),
            name: None,
            action,
            condition: None,
            with: Map::new(),
            inputs: None,
        }
    }

    /// Sets the step's condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Adds a `with` parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.with.insert(key.into(), value);
        self
    }

    /// Builds a step from its YAML definition.
    ///
    /// # Arguments
    ///
    /// * `index` - Position of the step in the workflow, used as its id when
    ///   neither `id` nor `name` is given
    /// * `definition` - The step mapping
    pub fn from_definition(index: usize, definition: JsonValue) -> Result<Self, EngineError> {
        let fallback_id = index.to_string();
        if !definition.is_object() {
            return Err(EngineError::invalid_step(
                &fallback_id,
                "a step must be a mapping",
            ));
        }

        let raw: StepDefinition = serde_json::from_value(definition)
            .map_err(|e| EngineError::invalid_step(&fallback_id, e.to_string()))?;

        let name = raw.name.as_ref().and_then(scalar_to_string);
        let id = raw
            .id
            .as_ref()
            .and_then(scalar_to_string)
            .or_else(|| name.clone())
            .unwrap_or(fallback_id);

        if raw.kind.is_some() {
            return Err(EngineError::invalid_step(
                &id,
                "`type` is derived from the action key and cannot be set",
            ));
        }

        let mut actions = Vec::new();
        if let Some(script) = raw.script {
            actions.push(Action::Script(script));
        }
        if let Some(commands) = raw.run {
            actions.push(Action::Shell(commands));
        }
        if let Some(code) = raw.py {
            actions.push(Action::Inline(code));
        }
        if let Some(workflow) = raw.workflow {
            actions.push(Action::Workflow(workflow));
        }

        let action = match actions.len() {
            1 => actions.remove(0),
            0 => {
                return Err(EngineError::invalid_step(
                    &id,
                    "one of `do`, `run`, `py` or `workflow` is required",
                ))
            }
            _ => {
                let kinds: Vec<&str> = actions.iter().map(Action::kind).collect();
                return Err(EngineError::invalid_step(
                    &id,
                    format!("only one action may be given, found `{}`", kinds.join("`, `")),
                ));
            }
        };

        if raw.inputs.is_some() && !matches!(action, Action::Inline(_)) {
            return Err(EngineError::invalid_step(
                &id,
                "`inputs` is only allowed on inline code steps",
            ));
        }

        let condition = match raw.condition {
            None => None,
            Some(value) => Condition::from_json(&value)?,
        };

        Ok(Self {
            id,
            name,
            action,
            condition,
            with: raw.with.unwrap_or_default(),
            inputs: raw.inputs,
        })
    }
}

/// Represents a complete workflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workflow {
    /// Name the workflow was loaded under
    pub name: String,

    /// Declared inputs
    pub inputs: InputSchema,

    /// Steps in execution order
    pub steps: Vec<Step>,
}

/// Top-level workflow document.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct WorkflowDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub inputs: Option<JsonValue>,
    #[serde(default)]
    pub steps: Option<Vec<JsonValue>>,
}

impl Workflow {
    /// Creates a new empty workflow.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: InputSchema::new(),
            steps: Vec::new(),
        }
    }

    /// Adds a step to the workflow.
    pub fn add_step(&mut self, step: Step) -> Result<(), EngineError> {
        if self.get_step(&step.id).is_some() {
            return Err(EngineError::DuplicateStep(step.id));
        }
        self.steps.push(step);
        Ok(())
    }

    /// Gets a step by ID.
    pub fn get_step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Returns the number of steps in the workflow.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if the workflow has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Metadata declared in a script's header block.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScriptMetadata {
    #[serde(default)]
    pub inputs: InputSchema,

    /// Documentary only; outputs are not validated
    #[serde(default)]
    pub outputs: InputSchema,
}

/// A script located in the scripts directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub name: String,
    pub path: PathBuf,
    pub metadata: ScriptMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_step_from_definition_with_run_string() {
        let step = Step::from_definition(0, json!({"name": "hello", "run": "echo hi"})).unwrap();
        assert_eq!(step.id, "hello");
        assert_eq!(step.action, Action::Shell(vec!["echo hi".into()]));
        assert!(step.condition.is_none());
    }

    #[test]
    fn test_step_id_precedence() {
        let step = Step::from_definition(4, json!({"id": "a", "name": "b", "py": "x = 1"})).unwrap();
        assert_eq!(step.id, "a");
        assert_eq!(step.name.as_deref(), Some("b"));

        let step = Step::from_definition(4, json!({"workflow": "nested"})).unwrap();
        assert_eq!(step.id, "4");

        let step = Step::from_definition(0, json!({"id": 7, "do": "script"})).unwrap();
        assert_eq!(step.id, "7");
    }

    #[test]
    fn test_step_requires_exactly_one_action() {
        let err = Step::from_definition(0, json!({"name": "none"})).unwrap_err();
        assert!(err.to_string().contains("is required"));

        let err = Step::from_definition(0, json!({"do": "a", "run": "b"})).unwrap_err();
        assert!(err.to_string().contains("`do`, `run`"));
    }

    #[test]
    fn test_step_rejects_type_and_unknown_keys() {
        assert!(Step::from_definition(0, json!({"run": "x", "type": "shell"})).is_err());
        assert!(Step::from_definition(0, json!({"run": "x", "bogus": 1})).is_err());
        assert!(Step::from_definition(0, json!("run: x")).is_err());
    }

    #[test]
    fn test_step_inputs_only_on_inline_steps() {
        let schema = json!({"count": {"type": "int"}});
        assert!(Step::from_definition(0, json!({"py": "x = 1", "inputs": schema.clone()})).is_ok());
        assert!(Step::from_definition(0, json!({"run": "ls", "inputs": schema})).is_err());
    }

    #[test]
    fn test_step_condition_types() {
        let step = Step::from_definition(0, json!({"run": "x", "if": false})).unwrap();
        assert_eq!(step.condition, Some(Condition::Literal(false)));

        let err = Step::from_definition(0, json!({"run": "x", "if": 3})).unwrap_err();
        assert_eq!(err.to_string(), "Invalid condition type: int");
    }

    #[test]
    fn test_input_spec_defaults() {
        let spec: InputSpec = serde_json::from_value(json!({"type": "float"})).unwrap();
        assert_eq!(spec.kind, InputType::Float);
        assert!(spec.required);
        assert!(spec.default.is_none());

        assert!(serde_json::from_value::<InputSpec>(json!({"type": "complex"})).is_err());
    }

    #[test]
    fn test_workflow_add_step() {
        let mut workflow = Workflow::new("test");
        let step = Step::new("step1", Action::Inline("pass".into()));

        assert!(workflow.add_step(step.clone()).is_ok());
        assert!(workflow.add_step(step).is_err());
        assert_eq!(workflow.len(), 1);
    }
}
