//! Runtime Values
//!
//! The interpreter works on its own [`Value`] type rather than on
//! `serde_json::Value` so that integers and floats stay distinct and builtin
//! functions can be stored in the scope. Conversion to and from JSON happens
//! at the engine boundary.

use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value as JsonValue};

use super::builtins::Function;
use super::error::EvalError;

/// Insertion-ordered mapping with string keys.
pub type Dict = IndexMap<String, Value>;

/// A value produced by evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Dict(Dict),
    Function(Function),
}

impl Value {
    /// Name of the value's type as shown in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Function(_) => "builtin_function",
        }
    }

    /// Truthiness: empty containers, zero, empty strings and `None` are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Dict(map) => !map.is_empty(),
            Value::Function(_) => true,
        }
    }

    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Value::None,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::Str(s.clone()),
            JsonValue::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(map) => Value::from_json_map(map),
        }
    }

    pub fn from_json_map(map: &Map<String, JsonValue>) -> Self {
        Value::Dict(
            map.iter()
                .map(|(key, value)| (key.clone(), Value::from_json(value)))
                .collect(),
        )
    }

    /// Converts into JSON. Non-finite floats become `null` and functions
    /// become their display string.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::None => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Float(f) => Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::Str(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Dict(map) => JsonValue::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Function(function) => JsonValue::String(function_display(*function)),
        }
    }

    /// Elements visited when iterating: list items, string characters or
    /// dictionary keys.
    pub fn iterate(&self) -> Result<Vec<Value>, EvalError> {
        match self {
            Value::List(items) => Ok(items.clone()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            Value::Dict(map) => Ok(map.keys().cloned().map(Value::Str).collect()),
            other => Err(EvalError::type_error(format!(
                "'{}' object is not iterable",
                other.type_name()
            ))),
        }
    }

    /// Converts a value into a dictionary key. Only strings are accepted.
    pub fn into_key(self) -> Result<String, EvalError> {
        match self {
            Value::Str(s) => Ok(s),
            other => Err(EvalError::type_error(format!(
                "dict keys must be strings, not {}",
                other.type_name()
            ))),
        }
    }

    /// Quoted, unambiguous representation used inside containers.
    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => quote(s),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::repr).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Dict(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(key, value)| format!("{}: {}", quote(key), value.repr()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Function(function) => function_display(*function),
        }
    }
}

fn function_display(function: Function) -> String {
    format!("<built-in function {}>", function.name())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            other => f.write_str(&other.repr()),
        }
    }
}

impl From<&JsonValue> for Value {
    fn from(value: &JsonValue) -> Self {
        Value::from_json(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

/// Formats a float the way the language prints it: whole numbers keep a
/// trailing `.0` and very large or small magnitudes use exponent notation.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let formatted = format!("{:e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => formatted,
        };
    }

    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Quotes a string, preferring single quotes.
fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push(delimiter);
    for c in s.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c == delimiter => {
                quoted.push('\\');
                quoted.push(c);
            }
            c if c.is_control() => quoted.push_str(&format!("\\x{:02x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push(delimiter);
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_scalars() {
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Str("plain".into()).to_string(), "plain");
    }

    #[test]
    fn test_display_containers_use_repr() {
        let list = Value::List(vec![Value::from("a"), Value::Int(1), Value::None]);
        assert_eq!(list.to_string(), "['a', 1, None]");

        let mut dict = Dict::new();
        dict.insert("k".into(), Value::from("it's"));
        assert_eq!(Value::Dict(dict).to_string(), "{'k': \"it's\"}");
    }

    #[test]
    fn test_format_float_exponents() {
        assert_eq!(format_float(1e20), "1e+20");
        assert_eq!(format_float(1.5e-7), "1.5e-07");
        assert_eq!(format_float(f64::INFINITY), "inf");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::Float(0.1).is_truthy());
        assert!(Value::from("x").is_truthy());
    }

    #[test]
    fn test_json_conversion_preserves_order_and_types() {
        let json = json!({"b": 1, "a": [1.5, null, "s"], "c": {"d": true}});
        let value = Value::from_json(&json);

        match &value {
            Value::Dict(map) => {
                let keys: Vec<&String> = map.keys().collect();
                assert_eq!(keys, vec!["b", "a", "c"]);
                assert_eq!(map["b"], Value::Int(1));
            }
            other => panic!("expected dict, got {:?}", other),
        }
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        assert_eq!(Value::Float(f64::NAN).to_json(), JsonValue::Null);
    }

    #[test]
    fn test_iterate() {
        assert_eq!(
            Value::from("ab").iterate().unwrap(),
            vec![Value::from("a"), Value::from("b")]
        );
        assert!(Value::Int(3).iterate().is_err());
    }
}
