//! Engine Errors
//!
//! Definition errors abort an invocation: a workflow or script that cannot
//! be found, a malformed step, inputs that fail validation, or an expression
//! that fails while a condition or `with` mapping is being resolved. Failures
//! of the work a step performs are never errors; they are recorded in the
//! step result instead.

use thiserror::Error;

use crate::expression::EvalError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Workflow {0} not found")]
    WorkflowNotFound(String),

    #[error("Script {0} not found")]
    ScriptNotFound(String),

    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Unknown input: {0}")]
    UnknownInput(String),

    #[error("Input {name} must be {expected}")]
    InvalidInput { name: String, expected: &'static str },

    #[error("Invalid condition type: {0}")]
    InvalidCondition(String),

    #[error("Invalid step {step}: {reason}")]
    InvalidStep { step: String, reason: String },

    #[error("Duplicate step ID: {0}")]
    DuplicateStep(String),

    #[error("Invalid input for shell script: {0}")]
    InvalidShellInput(String),

    #[error("Invalid workflow {name}: {message}")]
    InvalidWorkflow { name: String, message: String },

    #[error("Invalid metadata in script {name}: {message}")]
    InvalidScriptMetadata { name: String, message: String },

    #[error("Failed to evaluate expression in step {step}: {source}")]
    Expression {
        step: String,
        #[source]
        source: EvalError,
    },

    #[error("Failed to render output: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn expression(step: &str, source: EvalError) -> Self {
        Self::Expression {
            step: step.to_string(),
            source,
        }
    }

    pub fn invalid_step(step: &str, reason: impl Into<String>) -> Self {
        Self::InvalidStep {
            step: step.to_string(),
            reason: reason.into(),
        }
    }
}
