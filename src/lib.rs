//! Runway - Local Task Automation Engine
//!
//! Runs declarative YAML workflows whose steps are shell commands, scripts,
//! inline code or other workflows. Steps can be gated with `if` conditions,
//! read the results of earlier steps, and embed `${...}` expressions in
//! their parameters.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`workflow`]: Workflow and script definitions, parsing and validation
//! - [`execution`]: The [`Runner`] and one executor per step kind
//! - [`expression`]: The sandboxed expression language used by conditions,
//!   substitution and inline code
//! - [`output`]: Result rendering for the command line
//!
//! # Example
//!
//! ```rust,no_run
//! use runway::Runner;
//! use serde_json::{json, Map};
//!
//! fn main() -> Result<(), runway::EngineError> {
//!     let runner = Runner::new("/srv/automation");
//!
//!     let mut inputs = Map::new();
//!     inputs.insert("target".into(), json!("prod"));
//!
//!     let result = runner.execute_workflow("deploy", &inputs)?;
//!     println!("{}", result.to_json());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod execution;
pub mod expression;
pub mod output;
pub mod workflow;

// Re-export commonly used types
pub use error::EngineError;
pub use execution::{RunResult, Runner, StepResult};
pub use workflow::model::{Step, Workflow};
pub use workflow::parser::load_workflow;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "Runway";
