//! Step Conditions
//!
//! A step's `if` field is either a boolean literal, used as-is, or an
//! expression evaluated against the step scope. The scope used for
//! conditions is extended with the filesystem predicates and the host
//! `platform` identifier.

use serde_json::Value as JsonValue;

use crate::error::EngineError;
use crate::expression::{self, EvalError, Function, Scope, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Literal(bool),
    Expression(String),
}

impl Condition {
    /// Reads an `if` field. `null` is treated as an absent condition.
    pub fn from_json(value: &JsonValue) -> Result<Option<Self>, EngineError> {
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::Bool(b) => Ok(Some(Condition::Literal(*b))),
            JsonValue::String(s) => Ok(Some(Condition::Expression(s.clone()))),
            other => Err(EngineError::InvalidCondition(
                Value::from_json(other).type_name().to_string(),
            )),
        }
    }
}

/// Identifier of the host platform as seen by conditions.
pub fn platform() -> &'static str {
    match std::env::consts::OS {
        "linux" => "linux",
        "macos" => "darwin",
        "windows" => "win32",
        other => other,
    }
}

/// Adds the condition namespace to a scope.
pub fn extend_scope(scope: &mut Scope<'_>) {
    scope.install(Function::FILESYSTEM);
    scope.set("platform", Value::from(platform()));
}

/// Decides whether a step should run.
///
/// # Returns
///
/// * `Ok(true)` - No condition, a `true` literal or a truthy expression
/// * `Ok(false)` - A `false` literal or a falsy expression
/// * `Err` - The expression failed to parse or evaluate
pub fn should_run(condition: Option<&Condition>, scope: &mut Scope<'_>) -> Result<bool, EvalError> {
    match condition {
        None => Ok(true),
        Some(Condition::Literal(value)) => Ok(*value),
        Some(Condition::Expression(source)) => {
            expression::evaluate(source, scope).map(|value| value.is_truthy())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn scope() -> Scope<'static> {
        let mut scope = Scope::new();
        extend_scope(&mut scope);
        scope
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Condition::from_json(&json!(null)).unwrap(), None);
        assert_eq!(
            Condition::from_json(&json!(true)).unwrap(),
            Some(Condition::Literal(true))
        );
        assert_eq!(
            Condition::from_json(&json!("1 < 2")).unwrap(),
            Some(Condition::Expression("1 < 2".into()))
        );

        let err = Condition::from_json(&json!([true])).unwrap_err();
        assert_eq!(err.to_string(), "Invalid condition type: list");
        let err = Condition::from_json(&json!(1.5)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid condition type: float");
    }

    #[test]
    fn test_literals_are_not_evaluated() {
        let mut scope = Scope::new();
        assert!(should_run(None, &mut scope).unwrap());
        assert!(!should_run(Some(&Condition::Literal(false)), &mut scope).unwrap());
    }

    #[test]
    fn test_truthiness() {
        let mut scope = scope();
        for (source, expected) in [("0", false), ("''", false), ("None", false), ("[]", false), ("'x'", true), ("2 > 1", true)] {
            let condition = Condition::Expression(source.into());
            assert_eq!(should_run(Some(&condition), &mut scope).unwrap(), expected, "{}", source);
        }
    }

    #[test]
    fn test_filesystem_predicates() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("file.txt"), "data").unwrap();

        let mut scope = scope();
        scope.set("root", Value::from(dir.path().display().to_string()));

        fn check(source: &str, scope: &mut Scope<'_>) -> bool {
            should_run(Some(&Condition::Expression(source.into())), scope).unwrap()
        }
        assert!(check("isfile(root + '/file.txt')", &mut scope));
        assert!(check("isdir(root)", &mut scope));
        assert!(!check("exists(root + '/missing')", &mut scope));
        assert!(!check("isfile(root)", &mut scope));
    }

    #[test]
    fn test_platform_is_bound() {
        let mut scope = scope();
        let condition = Condition::Expression(format!("platform == '{}'", platform()));
        assert!(should_run(Some(&condition), &mut scope).unwrap());
    }

    #[test]
    fn test_errors_propagate() {
        let mut scope = scope();
        let condition = Condition::Expression("undefined_name".into());
        let err = should_run(Some(&condition), &mut scope).unwrap_err();
        assert_eq!(err.kind, expression::ErrorKind::Name);
    }
}
