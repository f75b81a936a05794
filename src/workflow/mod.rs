//! Workflow Definition Module
//!
//! Provides data structures and utilities for defining, parsing, and
//! validating workflows and the scripts they call.
//!
//! # Structure
//!
//! - [`model`]: Core data structures (Step, Workflow, InputSchema)
//! - [`parser`]: YAML parsing, workflow/script lookup, script headers
//! - [`validator`]: Step id checks and input validation
//! - [`condition`]: Step `if` handling
//! - [`substitution`]: `${...}` markers in step parameters

pub mod condition;
pub mod model;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use condition::{should_run, Condition};
pub use model::{Action, InputSchema, InputSpec, InputType, Script, ScriptMetadata, Step, Workflow};
pub use parser::{load_script, load_workflow, parse_script_metadata, parse_workflow};
pub use substitution::substitute;
pub use validator::{validate_inputs, validate_workflow};
