//! Expression Language Errors
//!
//! Errors are kept structured (kind, message, source location) while they
//! travel through the interpreter and are only flattened into text by
//! [`EvalError::render`] when they end up in a step result.

use std::fmt;

use thiserror::Error;

/// Category of an evaluation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Name,
    Type,
    Key,
    Index,
    Value,
    ZeroDivision,
    Attribute,
    /// Raised deliberately through `fail(...)`
    Failure,
    /// Raised through a `raise` statement
    Raised,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Syntax => "SyntaxError",
            Self::Name => "NameError",
            Self::Type => "TypeError",
            Self::Key => "KeyError",
            Self::Index => "IndexError",
            Self::Value => "ValueError",
            Self::ZeroDivision => "ZeroDivisionError",
            Self::Attribute => "AttributeError",
            Self::Failure => "Failure",
            Self::Raised => "Error",
        };
        f.write_str(name)
    }
}

/// Statement that was executing when an error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub source: String,
}

/// An error raised while parsing or evaluating an expression or program.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
    pub location: Option<Location>,
}

impl EvalError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, message)
    }

    pub fn name(name: &str) -> Self {
        Self::new(ErrorKind::Name, format!("name '{}' is not defined", name))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message)
    }

    pub fn key(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Key, message)
    }

    pub fn index(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Index, message)
    }

    pub fn value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Value, message)
    }

    pub fn zero_division(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ZeroDivision, message)
    }

    pub fn attribute(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Attribute, message)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Failure, message)
    }

    pub fn raised(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Raised, message)
    }

    /// Attaches the statement location unless an inner statement already did.
    pub fn at_line(mut self, line: usize, source: &str) -> Self {
        if self.location.is_none() {
            self.location = Some(Location {
                line,
                source: source.to_string(),
            });
        }
        self
    }

    /// True for the intentional-failure signal raised by `fail(...)`.
    pub fn is_failure(&self) -> bool {
        self.kind == ErrorKind::Failure
    }

    /// Renders the error as the multi-line text stored in step results.
    ///
    /// Intentional failures render as the bare message.
    pub fn render(&self) -> String {
        if self.is_failure() {
            return self.message.clone();
        }

        match &self.location {
            Some(location) => format!(
                "Error on line {}: {}\n{}: {}",
                location.line, location.source, self.kind, self.message
            ),
            None => format!("{}: {}", self.kind, self.message),
        }
    }
}
