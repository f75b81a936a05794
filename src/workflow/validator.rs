//! Workflow Validation
//!
//! Provides validation for:
//! - Step identifiers (no duplicates within one workflow)
//! - Provided inputs against an input schema, applying defaults and
//!   coercing values to the declared type

use std::collections::HashSet;

use log::debug;
use serde_json::{Map, Number, Value as JsonValue};

use super::model::{InputSchema, InputType, Workflow};
use crate::error::EngineError;

/// Validates the workflow structure.
///
/// Step shape is checked while parsing; this rejects workflows whose steps
/// share an identifier.
pub fn validate_workflow(workflow: &Workflow) -> Result<(), EngineError> {
    let mut seen = HashSet::new();
    for step in &workflow.steps {
        if !seen.insert(step.id.as_str()) {
            return Err(EngineError::DuplicateStep(step.id.clone()));
        }
    }

    debug!(
        "Workflow '{}' validated ({} steps)",
        workflow.name,
        workflow.steps.len()
    );
    Ok(())
}

/// Resolves provided inputs against a schema.
///
/// # Arguments
///
/// * `schema` - Declared inputs
/// * `provided` - Values supplied by the caller
///
/// # Returns
///
/// The resolved inputs in schema order: provided values coerced to their
/// declared type, defaults for absent ones. Optional inputs with no default
/// are omitted.
///
/// # Example
///
/// ```
/// use runway::workflow::{validate_inputs, InputSchema, InputSpec, InputType};
/// use serde_json::json;
///
/// let mut schema = InputSchema::new();
/// schema.insert("ratio".into(), InputSpec::new(InputType::Float));
/// schema.insert("verbose".into(), InputSpec::new(InputType::Bool).with_default(json!(false)));
///
/// let provided = json!({"ratio": 2}).as_object().cloned().unwrap();
/// let resolved = validate_inputs(&schema, &provided).unwrap();
/// assert_eq!(resolved["ratio"], json!(2.0));
/// assert_eq!(resolved["verbose"], json!(false));
/// ```
pub fn validate_inputs(
    schema: &InputSchema,
    provided: &Map<String, JsonValue>,
) -> Result<Map<String, JsonValue>, EngineError> {
    if let Some(unknown) = provided.keys().find(|key| !schema.contains_key(*key)) {
        return Err(EngineError::UnknownInput(unknown.clone()));
    }

    let mut resolved = Map::new();
    for (name, spec) in schema {
        match provided.get(name) {
            Some(value) => {
                resolved.insert(name.clone(), coerce(name, spec.kind, value)?);
            }
            None => match &spec.default {
                Some(default) => {
                    resolved.insert(name.clone(), default.clone());
                }
                None if spec.required => return Err(EngineError::MissingInput(name.clone())),
                None => {}
            },
        }
    }

    Ok(resolved)
}

/// Checks a single value against its declared type.
fn coerce(name: &str, kind: InputType, value: &JsonValue) -> Result<JsonValue, EngineError> {
    let invalid = |expected: &'static str| EngineError::InvalidInput {
        name: name.to_string(),
        expected,
    };

    match kind {
        InputType::Str => Ok(value.clone()),
        InputType::Int => match value {
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
            _ => Err(invalid("an integer")),
        },
        InputType::Float => value
            .as_f64()
            .and_then(Number::from_f64)
            .map(JsonValue::Number)
            .ok_or_else(|| invalid("a float")),
        InputType::Bool => match value {
            JsonValue::Bool(_) => Ok(value.clone()),
            JsonValue::String(s) if s == "True" => Ok(JsonValue::Bool(true)),
            JsonValue::String(s) if s == "False" => Ok(JsonValue::Bool(false)),
            _ => Err(invalid("a boolean")),
        },
        InputType::List => match value {
            JsonValue::Array(_) => Ok(value.clone()),
            _ => Err(invalid("a list")),
        },
        InputType::Dict => match value {
            JsonValue::Object(_) => Ok(value.clone()),
            _ => Err(invalid("a dict")),
        },
    }
}
