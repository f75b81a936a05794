//! Workflow Execution Module
//!
//! Runs workflows step by step and records what each step did.
//!
//! # Architecture
//!
//! - [`engine`]: The [`Runner`] orchestrating workflow and script runs
//! - [`context`]: Expression scope and host functions for one step
//! - [`state`]: Results recorded during a run
//! - [`result`]: Step and run result types
//! - [`shell`], [`script`], [`inline`]: One executor per step kind

pub mod context;
pub mod engine;
pub mod inline;
pub mod result;
pub mod script;
pub mod shell;
pub mod state;

pub use engine::Runner;
pub use inline::InlineInputPolicy;
pub use result::{InlineOutcome, RunResult, ScriptOutcome, ShellOutcome, StepResult};
pub use state::RunState;
