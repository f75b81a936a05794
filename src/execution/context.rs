//! Step Scope
//!
//! Builds the expression scope a step sees. Besides the builtins it holds:
//!
//! - `inputs`: the resolved workflow inputs
//! - `steps`: results recorded so far in this run
//! - `platform` and the filesystem predicates
//! - `changed`, `skipped` and `run`, answered by [`StepContext`]

use serde_json::{Map, Value as JsonValue};

use super::result::StepResult;
use super::shell::{self, ShellConfig};
use super::state::RunState;
use crate::expression::{Host, Scope, Value};
use crate::workflow::condition;

/// Borrowed view of a run, shared by the expressions of one step.
pub struct StepContext<'a> {
    state: &'a RunState,
    shell: &'a ShellConfig,
    inputs: &'a Map<String, JsonValue>,
}

impl<'a> StepContext<'a> {
    pub fn new(state: &'a RunState, shell: &'a ShellConfig, inputs: &'a Map<String, JsonValue>) -> Self {
        Self { state, shell, inputs }
    }

    /// A fresh scope bound to this context.
    pub fn scope(&self) -> Scope<'_> {
        let mut scope = Scope::with_host(self);
        condition::extend_scope(&mut scope);
        scope.set("inputs", Value::from_json_map(self.inputs));
        scope.set("steps", self.state.to_value());
        scope
    }
}

impl Host for StepContext<'_> {
    fn changed(&self, step_id: &str) -> bool {
        self.state.changed(step_id)
    }

    fn skipped(&self, step_id: &str) -> bool {
        self.state.skipped(step_id)
    }

    fn run(&self, command: &str) -> Value {
        let outcome = shell::run_command(command, self.shell);
        Value::from_json(&StepResult::Shell(outcome).to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::result::ScriptOutcome;
    use crate::expression::evaluate;
    use serde_json::json;

    fn changed_result() -> StepResult {
        StepResult::Script(ScriptOutcome {
            fields: json!({"succeeded": true, "changed": true}).as_object().cloned().unwrap(),
            output: None,
            error: None,
        })
    }

    #[test]
    fn test_host_functions_read_the_run_state() {
        let mut state = RunState::new();
        state.record("install", changed_result());
        state.record("optional", StepResult::Skipped);

        let shell = ShellConfig::new(".");
        let inputs = Map::new();
        let context = StepContext::new(&state, &shell, &inputs);
        let mut scope = context.scope();

        fn check(source: &str, scope: &mut Scope<'_>) -> Value {
            evaluate(source, scope).unwrap()
        }
        assert_eq!(check("changed('install')", &mut scope), Value::Bool(true));
        assert_eq!(check("changed('optional')", &mut scope), Value::Bool(false));
        assert_eq!(check("changed('nonexistent')", &mut scope), Value::Bool(false));
        assert_eq!(check("skipped('optional')", &mut scope), Value::Bool(true));
        assert_eq!(check("skipped('install')", &mut scope), Value::Bool(false));
        assert_eq!(check("steps['install']['changed']", &mut scope), Value::Bool(true));
    }

    #[test]
    fn test_inputs_are_bound() {
        let state = RunState::new();
        let shell = ShellConfig::new(".");
        let inputs = json!({"target": "prod"}).as_object().cloned().unwrap();
        let context = StepContext::new(&state, &shell, &inputs);

        let mut scope = context.scope();
        assert_eq!(evaluate("inputs.target", &mut scope).unwrap(), Value::from("prod"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_returns_a_result_mapping() {
        let state = RunState::new();
        let mut shell = ShellConfig::new(".");
        shell.set_program("sh");
        let inputs = Map::new();
        let context = StepContext::new(&state, &shell, &inputs);

        let mut scope = context.scope();
        assert_eq!(evaluate("run('true').succeeded", &mut scope).unwrap(), Value::Bool(true));
        assert_eq!(evaluate("run('exit 4')['returncode']", &mut scope).unwrap(), Value::Int(4));
        assert_eq!(evaluate("run('echo hi').output", &mut scope).unwrap(), Value::from("hi\n"));
    }
}
