//! Workflow Execution Engine
//!
//! The [`Runner`] runs workflows and scripts found under a base path. A
//! workflow run visits its steps strictly in order:
//!
//! 1. evaluate the step's `if`; a falsy condition records a skipped result
//! 2. substitute `${...}` markers in the step's `with` mapping
//! 3. dispatch to the shell, script, inline code or nested workflow executor
//! 4. record the result; the first failed step ends the run
//!
//! Definition errors (unknown workflow, bad inputs, broken expressions in
//! `if`/`with`) abort the whole invocation. Failures of the work a step does
//! are recorded in its result instead.

use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, error, info};
use serde_json::{Map, Value as JsonValue};

use super::context::StepContext;
use super::inline::{run_inline, InlineInputPolicy};
use super::result::{RunResult, StepResult};
use super::script::{default_interpreters, run_script, Interpreters};
use super::shell::{run_commands, ShellConfig, ShellParams};
use super::state::RunState;
use crate::error::EngineError;
use crate::workflow::{
    load_script, load_workflow, should_run, substitute, validate_inputs, Action, InputSchema,
    Step, Workflow,
};

/// Workflow and script runner.
///
/// # Example
///
/// ```rust,no_run
/// use runway::execution::{InlineInputPolicy, Runner};
/// use serde_json::Map;
///
/// fn main() -> Result<(), runway::EngineError> {
///     let mut runner = Runner::new("/srv/automation");
///     runner.set_inline_input_policy(InlineInputPolicy::Strict);
///
///     let result = runner.execute_workflow("deploy", &Map::new())?;
///     println!("succeeded: {}", result.succeeded);
///     Ok(())
/// }
/// ```
pub struct Runner {
    base_path: PathBuf,
    shell: ShellConfig,
    interpreters: Interpreters,
    inline_policy: InlineInputPolicy,
}

impl Runner {
    /// Creates a runner for the workflows and scripts under `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        let base_path = base_path.into();
        Self {
            shell: ShellConfig::new(&base_path),
            base_path,
            interpreters: default_interpreters(),
            inline_policy: InlineInputPolicy::default(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Sets the shell used for `run` steps and `run(...)` calls.
    pub fn set_shell(&mut self, program: impl Into<PathBuf>) {
        self.shell.set_program(program);
    }

    /// Registers (or replaces) the interpreter for a script extension.
    pub fn set_interpreter(&mut self, extension: impl Into<String>, program: impl Into<PathBuf>) {
        self.interpreters.insert(extension.into(), program.into());
    }

    /// Sets how inline code step inputs are checked.
    pub fn set_inline_input_policy(&mut self, policy: InlineInputPolicy) {
        self.inline_policy = policy;
    }

    /// Loads and runs a workflow by name.
    ///
    /// # Arguments
    ///
    /// * `name` - Workflow name, resolved under `workflows/`
    /// * `inputs` - Values for the workflow's declared inputs
    ///
    /// # Returns
    ///
    /// * `Ok(RunResult)` - The run finished; `succeeded` tells whether every
    ///   step that ran succeeded
    /// * `Err` - The workflow or one of its steps is malformed
    pub fn execute_workflow(
        &self,
        name: &str,
        inputs: &Map<String, JsonValue>,
    ) -> Result<RunResult, EngineError> {
        let workflow = load_workflow(&self.base_path, name)?;
        self.run_workflow(&workflow, inputs)
    }

    /// Loads and runs a script by name.
    ///
    /// Inputs are validated against the script's header before it starts.
    pub fn execute_script(
        &self,
        name: &str,
        inputs: &Map<String, JsonValue>,
    ) -> Result<StepResult, EngineError> {
        let extensions = self.interpreters.keys().map(String::as_str);
        let script = load_script(&self.base_path, name, extensions)?;
        let inputs = validate_inputs(&script.metadata.inputs, inputs)?;

        let outcome = run_script(&script, &inputs, &self.interpreters, &self.base_path)?;
        Ok(StepResult::Script(outcome))
    }

    /// Runs an already loaded workflow.
    pub fn run_workflow(
        &self,
        workflow: &Workflow,
        inputs: &Map<String, JsonValue>,
    ) -> Result<RunResult, EngineError> {
        let start_time = Instant::now();
        info!(
            "Starting workflow: {} ({} steps)",
            workflow.name,
            workflow.steps.len()
        );

        let inputs = validate_inputs(&workflow.inputs, inputs)?;
        let mut state = RunState::new();

        for step in &workflow.steps {
            let step_start = Instant::now();
            info!("Starting step: {}", step.id);

            let result = self.run_step(step, &inputs, &state)?;
            match result.succeeded() {
                None => info!("Step '{}' skipped", step.id),
                Some(true) => info!(
                    "Step '{}' completed successfully in {:.2?}",
                    step.id,
                    step_start.elapsed()
                ),
                Some(false) => error!(
                    "Step '{}' failed after {:.2?}",
                    step.id,
                    step_start.elapsed()
                ),
            }

            state.record(&step.id, result);
            if state.is_failed() {
                break;
            }
        }

        let result = state.into_result();
        info!(
            "Workflow {} {} in {:.2?}",
            workflow.name,
            if result.succeeded { "completed" } else { "failed" },
            start_time.elapsed()
        );
        Ok(result)
    }

    /// Runs one step against the current run state.
    fn run_step(
        &self,
        step: &Step,
        inputs: &Map<String, JsonValue>,
        state: &RunState,
    ) -> Result<StepResult, EngineError> {
        let context = StepContext::new(state, &self.shell, inputs);
        let mut scope = context.scope();

        let run = should_run(step.condition.as_ref(), &mut scope)
            .map_err(|e| EngineError::expression(&step.id, e))?;
        if !run {
            return Ok(StepResult::Skipped);
        }

        let with = match substitute(&JsonValue::Object(step.with.clone()), &mut scope)
            .map_err(|e| EngineError::expression(&step.id, e))?
        {
            JsonValue::Object(with) => with,
            _ => Map::new(),
        };
        debug!("Step '{}' parameters: {}", step.id, JsonValue::Object(with.clone()));

        match &step.action {
            Action::Shell(commands) => {
                let params = ShellParams::from_with(&with)?;
                Ok(StepResult::Shell(run_commands(commands, &params, &self.shell)?))
            }
            Action::Script(name) => self.execute_script(name, &with),
            Action::Inline(code) => {
                let inputs = match (&step.inputs, self.inline_policy) {
                    (Some(schema), _) => validate_inputs(schema, &with)?,
                    (None, InlineInputPolicy::Strict) => validate_inputs(&InputSchema::new(), &with)?,
                    (None, InlineInputPolicy::Unchecked) => with,
                };
                Ok(StepResult::Inline(run_inline(code, &inputs, context.scope())))
            }
            Action::Workflow(name) => Ok(StepResult::Workflow(self.execute_workflow(name, &with)?)),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            fs::create_dir(dir.path().join("workflows")).unwrap();
            fs::create_dir(dir.path().join("scripts")).unwrap();
            Self { dir }
        }

        fn workflow(&self, name: &str, yaml: &str) -> &Self {
            fs::write(self.dir.path().join(format!("workflows/{}.yml", name)), yaml).unwrap();
            self
        }

        fn script(&self, name: &str, body: &str) -> &Self {
            fs::write(self.dir.path().join(format!("scripts/{}.sh", name)), body).unwrap();
            self
        }

        fn runner(&self) -> Runner {
            let mut runner = Runner::new(self.dir.path());
            runner.set_shell("sh");
            runner
        }

        fn run(&self, name: &str, inputs: JsonValue) -> Result<JsonValue, EngineError> {
            self.runner()
                .execute_workflow(name, inputs.as_object().unwrap())
                .map(|result| result.to_json())
        }
    }

    #[test]
    fn test_run_empty_workflow() {
        let ws = Workspace::new();
        ws.workflow("empty", "");
        assert_eq!(ws.run("empty", json!({})).unwrap(), json!({"steps": {}, "succeeded": true}));
    }

    #[test]
    fn test_run_nonexistent() {
        let ws = Workspace::new();
        let runner = ws.runner();

        let err = runner.execute_workflow("nonexistent", &Map::new()).unwrap_err();
        assert_eq!(err.to_string(), "Workflow nonexistent not found");
        let err = runner.execute_script("nonexistent", &Map::new()).unwrap_err();
        assert_eq!(err.to_string(), "Script nonexistent not found");
    }

    #[test]
    fn test_shell_steps() {
        let ws = Workspace::new();
        ws.workflow(
            "shell",
            r#"
steps:
  - id: piped
    run: [cat, echo hi, cat]
    with:
      stdin: "X\n"
  - id: env
    run: echo "Hi. $TEST_ENV"
    with:
      env:
        TEST_ENV: This is a test. ${" ".join(["Hello", "World"])}
"#,
        );

        let result = ws.run("shell", json!({})).unwrap();
        assert_eq!(result["succeeded"], json!(true));
        assert_eq!(
            result["steps"]["piped"],
            json!({"succeeded": true, "output": "X\nhi\n", "error": "", "returncode": 0})
        );
        assert_eq!(
            result["steps"]["env"]["output"],
            json!("Hi. This is a test. Hello World\n")
        );
    }

    #[test]
    fn test_first_failure_short_circuits() {
        let ws = Workspace::new();
        ws.workflow(
            "failing",
            "steps:\n  - id: step1\n    run: exit 1\n  - id: step2\n    run: echo hi\n",
        );

        let result = ws.run("failing", json!({})).unwrap();
        assert_eq!(result["succeeded"], json!(false));
        assert_eq!(
            result["steps"],
            json!({"step1": {"succeeded": false, "output": "", "error": "", "returncode": 1}})
        );
    }

    #[test]
    fn test_skipped_steps_and_changed() {
        let ws = Workspace::new();
        ws.script(
            "mark",
            r#"echo '{"changed": true}' > "$RUNWAY_OUTPUTS_FILE""#,
        );
        ws.workflow(
            "conditions",
            r#"
steps:
  - id: mark
    do: mark
  - id: never
    if: false
    run: exit 1
  - id: after_change
    if: changed('mark') and skipped('never')
    py: outputs['seen'] = steps['mark']['changed']
  - id: unknown
    if: changed('nonexistent')
    run: exit 1
"#,
        );

        let result = ws.run("conditions", json!({})).unwrap();
        assert_eq!(result["succeeded"], json!(true));
        assert_eq!(result["steps"]["never"], json!({"succeeded": null}));
        assert_eq!(result["steps"]["after_change"], json!({"succeeded": true, "seen": true}));
        assert_eq!(result["steps"]["unknown"], json!({"succeeded": null}));
    }

    #[test]
    fn test_script_inputs_and_substitution() {
        let ws = Workspace::new();
        ws.script(
            "echo_inputs",
            "# /// runway\n# inputs:\n#   items:\n#     type: list\n#   count:\n#     type: int\n#     default: 1\n# ///\ncp \"$RUNWAY_INPUTS_FILE\" \"$RUNWAY_OUTPUTS_FILE\"\n",
        );
        ws.workflow(
            "subst",
            r#"
steps:
  - id: copy
    do: echo_inputs
    with:
      items:
        - ${"Hello"}
        - world: ["${'nested'}", "$${literal}"]
"#,
        );

        let result = ws.run("subst", json!({})).unwrap();
        assert_eq!(
            result["steps"]["copy"],
            json!({
                "items": ["Hello", {"world": ["nested", "${literal}"]}],
                "count": 1,
                "succeeded": true
            })
        );
    }

    #[test]
    fn test_script_input_errors_abort() {
        let ws = Workspace::new();
        ws.script("strict", "# /// runway\n# inputs:\n#   name:\n#     type: str\n# ///\n");
        let runner = ws.runner();

        let err = runner.execute_script("strict", &Map::new()).unwrap_err();
        assert_eq!(err.to_string(), "Missing required input: name");

        let inputs = json!({"name": "a", "extra": 1});
        let err = runner.execute_script("strict", inputs.as_object().unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown input: extra");
    }

    #[test]
    fn test_workflow_inputs() {
        let ws = Workspace::new();
        ws.workflow(
            "greet",
            r#"
inputs:
  name:
    type: str
  loud:
    type: bool
    default: false
steps:
  - id: greet
    py: |
      greeting = 'hello ' + inputs['name']
      if inputs['loud']:
          greeting = greeting.upper()
      outputs['greeting'] = greeting
"#,
        );

        let result = ws.run("greet", json!({"name": "ada", "loud": "True"})).unwrap();
        assert_eq!(result["steps"]["greet"]["greeting"], json!("HELLO ADA"));

        let err = ws.run("greet", json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Missing required input: name");
    }

    #[test]
    fn test_inline_input_policy() {
        let ws = Workspace::new();
        ws.workflow(
            "inline",
            r#"
steps:
  - id: free
    py: outputs['value'] = inputs['anything']
    with:
      anything: 5
"#,
        );
        ws.workflow(
            "typed",
            r#"
steps:
  - id: typed
    py: outputs['value'] = inputs['count'] * 2
    inputs:
      count:
        type: int
    with:
      count: 2.5
"#,
        );

        let result = ws.run("inline", json!({})).unwrap();
        assert_eq!(result["steps"]["free"]["value"], json!(5));

        let mut runner = ws.runner();
        runner.set_inline_input_policy(InlineInputPolicy::Strict);
        let err = runner.execute_workflow("inline", &Map::new()).unwrap_err();
        assert_eq!(err.to_string(), "Unknown input: anything");

        let err = ws.run("typed", json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Input count must be an integer");
    }

    #[test]
    fn test_inline_failure_short_circuits() {
        let ws = Workspace::new();
        ws.workflow(
            "inline_fail",
            "steps:\n  - id: boom\n    py: fail('stop here')\n  - id: later\n    run: echo never\n",
        );

        let result = ws.run("inline_fail", json!({})).unwrap();
        assert_eq!(result["succeeded"], json!(false));
        assert_eq!(result["steps"], json!({"boom": {"succeeded": false, "error": "stop here"}}));
    }

    #[test]
    fn test_inline_outputs_cannot_override_succeeded() {
        let ws = Workspace::new();
        ws.workflow(
            "override",
            "steps:\n  - id: a\n    py: outputs['succeeded'] = False\n  - id: b\n    run: echo after\n",
        );

        let result = ws.run("override", json!({})).unwrap();
        assert_eq!(result["succeeded"], json!(true));
        assert_eq!(result["steps"]["a"], json!({"succeeded": true}));
        assert_eq!(result["steps"]["b"]["output"], json!("after\n"));
    }

    #[test]
    fn test_nested_workflow() {
        let ws = Workspace::new();
        ws.workflow(
            "child",
            "inputs:\n  who:\n    type: str\nsteps:\n  - id: inner\n    py: outputs['who'] = inputs['who']\n",
        );
        ws.workflow(
            "parent",
            "steps:\n  - id: outer\n    workflow: child\n    with:\n      who: ${'nested'}\n",
        );

        let result = ws.run("parent", json!({})).unwrap();
        assert_eq!(
            result,
            json!({
                "succeeded": true,
                "steps": {
                    "outer": {
                        "succeeded": true,
                        "steps": {"inner": {"succeeded": true, "who": "nested"}}
                    }
                }
            })
        );
    }

    #[test]
    fn test_definition_errors_abort() {
        let ws = Workspace::new();
        ws.workflow("bad_if", "steps:\n  - run: echo hi\n    if: 3\n");
        ws.workflow("bad_expr", "steps:\n  - run: echo hi\n    if: missing_name\n");
        ws.workflow("bad_shell", "steps:\n  - run: echo hi\n    with:\n      cwd: /tmp\n");

        assert_eq!(
            ws.run("bad_if", json!({})).unwrap_err().to_string(),
            "Invalid condition type: int"
        );
        assert!(matches!(
            ws.run("bad_expr", json!({})).unwrap_err(),
            EngineError::Expression { .. }
        ));
        assert_eq!(
            ws.run("bad_shell", json!({})).unwrap_err().to_string(),
            "Invalid input for shell script: cwd"
        );
    }

    #[test]
    fn test_run_function_in_condition() {
        let ws = Workspace::new();
        ws.workflow(
            "probe",
            "steps:\n  - id: probe\n    if: run('exit 1').succeeded\n    run: echo never\n  - id: go\n    if: run('true')['succeeded']\n    run: echo yes\n",
        );

        let result = ws.run("probe", json!({})).unwrap();
        assert_eq!(result["steps"]["probe"], json!({"succeeded": null}));
        assert_eq!(result["steps"]["go"]["output"], json!("yes\n"));
    }
}
