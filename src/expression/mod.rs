//! Expression Language
//!
//! A small, sandboxed, Python-flavoured language used in three places:
//!
//! - `${...}` substitution markers
//! - step `if` conditions
//! - inline code steps (`py:`)
//!
//! Programs only see what their [`Scope`] holds. Builtins are a closed set
//! (see [`Function`]); there is no import mechanism and no access to the
//! process except through the filesystem predicates and a [`Host`].
//!
//! # Example
//!
//! ```
//! use runway::expression::{evaluate, Scope, Value};
//!
//! let mut scope = Scope::new();
//! scope.set("name", Value::from("world"));
//! let value = evaluate("'hello ' + name.upper()", &mut scope).unwrap();
//! assert_eq!(value.to_string(), "hello WORLD");
//! ```

pub mod ast;
pub mod builtins;
pub mod error;
pub mod eval;
pub mod ops;
pub mod parser;
pub mod program;
pub mod value;

pub use builtins::Function;
pub use error::{ErrorKind, EvalError};
pub use eval::{Host, Scope};
pub use parser::parse_expression;
pub use program::Program;
pub use value::{Dict, Value};

/// Parses and evaluates a single expression.
pub fn evaluate(source: &str, scope: &mut Scope<'_>) -> Result<Value, EvalError> {
    let expr = parse_expression(source)?;
    scope.evaluate(&expr)
}

/// Parses and runs a block of inline code.
pub fn execute(source: &str, scope: &mut Scope<'_>) -> Result<(), EvalError> {
    let program = Program::parse(source)?;
    scope.execute(&program)
}
