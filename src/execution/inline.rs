//! Inline Code Step Execution
//!
//! Runs a `py` step's code in the step scope with two extra bindings:
//! `inputs` (the step inputs) and `outputs` (an empty mapping the code fills
//! in). Text printed by the code becomes the result's `output` and `error`.

use log::debug;
use serde_json::{Map, Value as JsonValue};

use super::result::InlineOutcome;
use crate::expression::{self, Dict, EvalError, Scope, Value};

/// How `with` parameters of inline code steps are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InlineInputPolicy {
    /// Validated only when the step declares `inputs`
    #[default]
    Unchecked,
    /// Always validated; a step without `inputs` accepts none
    Strict,
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Runs inline code.
///
/// Errors raised by the code never escape: they fail the step, any partial
/// `outputs` are discarded and the rendered error is reported instead.
/// An `outputs['succeeded']` entry is dropped; the outcome decides it.
pub fn run_inline(code: &str, inputs: &Map<String, JsonValue>, mut scope: Scope<'_>) -> InlineOutcome {
    scope.set("inputs", Value::from_json_map(inputs));
    scope.set("outputs", Value::Dict(Dict::new()));

    let result = expression::execute(code, &mut scope).and_then(|()| match scope.get("outputs") {
        Some(Value::Dict(outputs)) => Ok(outputs
            .iter()
            .filter(|(key, _)| key.as_str() != "succeeded")
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect::<Map<String, JsonValue>>()),
        Some(other) => Err(EvalError::type_error(format!(
            "outputs must be a dict, not {}",
            other.type_name()
        ))),
        None => Err(EvalError::name("outputs")),
    });

    let output = non_empty(scope.stdout());
    match result {
        Ok(outputs) => InlineOutcome {
            succeeded: true,
            outputs,
            output,
            error: non_empty(scope.stderr()),
        },
        Err(e) => {
            debug!("Inline code failed: {}", e);
            InlineOutcome {
                succeeded: false,
                outputs: Map::new(),
                output,
                error: Some(e.render()),
            }
        }
    }
}
