//! `${...}` Substitution
//!
//! Walks parameter data and replaces `${expr}` markers inside strings with
//! the value of `expr`. A run of `n` dollar signs before `{` is halved:
//!
//! - `n` odd: the marker is evaluated and `(n - 1) / 2` literal `$` precede it
//! - `n` even: `n / 2` literal `$` are followed by the `{...}` text as written
//!
//! A string consisting of exactly one `${expr}` marker keeps the evaluated
//! value's type; anywhere else the value is converted to text.
//!
//! # Example
//!
//! ```
//! use runway::expression::Scope;
//! use runway::workflow::substitute;
//! use serde_json::json;
//!
//! let mut scope = Scope::new();
//! let value = substitute(&json!({"list": "${[1, 2]}", "text": "n=${1 + 1} $${x}"}), &mut scope).unwrap();
//! assert_eq!(value, json!({"list": [1, 2], "text": "n=2 ${x}"}));
//! ```

use serde_json::Value as JsonValue;

use crate::expression::{self, EvalError, Scope};

/// Substitutes every string inside `value`. Mapping keys are left untouched.
pub fn substitute(value: &JsonValue, scope: &mut Scope<'_>) -> Result<JsonValue, EvalError> {
    match value {
        JsonValue::String(s) => substitute_str(s, scope),
        JsonValue::Array(items) => items
            .iter()
            .map(|item| substitute(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        JsonValue::Object(map) => {
            let mut result = serde_json::Map::with_capacity(map.len());
            for (key, item) in map {
                result.insert(key.clone(), substitute(item, scope)?);
            }
            Ok(JsonValue::Object(result))
        }
        other => Ok(other.clone()),
    }
}

/// Finds the `}` balancing the `{` at `open`.
fn matching_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, byte) in bytes[open..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn substitute_str(text: &str, scope: &mut Scope<'_>) -> Result<JsonValue, EvalError> {
    let bytes = text.as_bytes();
    let mut result = String::with_capacity(text.len());
    let mut copied = 0;
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('$') {
        let start = cursor + offset;
        let mut open = start;
        while open < bytes.len() && bytes[open] == b'$' {
            open += 1;
        }

        if open >= bytes.len() || bytes[open] != b'{' {
            cursor = open;
            continue;
        }
        let close = match matching_brace(bytes, open) {
            Some(close) => close,
            None => break,
        };

        let dollars = open - start;
        result.push_str(&text[copied..start]);
        result.push_str(&"$".repeat(dollars / 2));

        if dollars % 2 == 0 {
            result.push_str(&text[open..=close]);
        } else {
            let value = expression::evaluate(&text[open + 1..close], scope)?;
            if dollars == 1 && start == 0 && close == bytes.len() - 1 {
                return Ok(value.to_json());
            }
            result.push_str(&value.to_string());
        }

        copied = close + 1;
        cursor = copied;
    }

    result.push_str(&text[copied..]);
    Ok(JsonValue::String(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Value;
    use serde_json::json;

    fn sub(value: JsonValue) -> JsonValue {
        let mut scope = Scope::new();
        scope.set("name", Value::from("world"));
        substitute(&value, &mut scope).unwrap()
    }

    #[test]
    fn test_text_without_markers_is_unchanged() {
        assert_eq!(sub(json!("plain text")), json!("plain text"));
        assert_eq!(sub(json!("cost: $5 {x}")), json!("cost: $5 {x}"));
        assert_eq!(sub(json!("trailing $")), json!("trailing $"));
    }

    #[test]
    fn test_whole_string_keeps_type() {
        assert_eq!(sub(json!("${[1, 2, 3]}")), json!([1, 2, 3]));
        assert_eq!(sub(json!("${ {'a': 1} }")), json!({"a": 1}));
        assert_eq!(sub(json!("${1 + 1}")), json!(2));
        assert_eq!(sub(json!("${None}")), json!(null));
    }

    #[test]
    fn test_partial_substitution_stringifies() {
        assert_eq!(sub(json!("x=${1}")), json!("x=1"));
        assert_eq!(sub(json!("hello ${name}!")), json!("hello world!"));
        assert_eq!(sub(json!("${1}${2}")), json!("12"));
        assert_eq!(sub(json!(" ${[1, 'a']}")), json!(" [1, 'a']"));
        assert_eq!(sub(json!("${True} ")), json!("True "));
    }

    #[test]
    fn test_dollar_escaping() {
        assert_eq!(sub(json!("$${name}")), json!("${name}"));
        assert_eq!(sub(json!("$$${name}")), json!("$world"));
        assert_eq!(sub(json!("$$$${name}")), json!("$${name}"));
        assert_eq!(sub(json!("$$$$${name}")), json!("$$world"));
    }

    #[test]
    fn test_escaped_span_is_not_evaluated() {
        assert_eq!(sub(json!("$${undefined + }")), json!("${undefined + }"));
    }

    #[test]
    fn test_nested_braces() {
        assert_eq!(sub(json!("${ {'k': 'v'}['k'] }")), json!("v"));
        assert_eq!(sub(json!("a${ {'k': 1} }b")), json!("a{'k': 1}b"));
    }

    #[test]
    fn test_unterminated_marker_leaves_rest() {
        assert_eq!(sub(json!("${name} and ${oops")), json!("world and ${oops"));
    }

    #[test]
    fn test_result_is_not_rescanned() {
        let mut scope = Scope::new();
        scope.set("marker", Value::from("${name}"));
        let value = substitute(&json!("-${marker}"), &mut scope).unwrap();
        assert_eq!(value, json!("-${name}"));
    }

    #[test]
    fn test_recurses_into_values_not_keys() {
        let value = sub(json!({"${name}": ["${name}", 3, true, null], "n": {"m": "${2 * 3}"}}));
        assert_eq!(value, json!({"${name}": ["world", 3, true, null], "n": {"m": 6}}));
    }

    #[test]
    fn test_errors_propagate() {
        let mut scope = Scope::new();
        assert!(substitute(&json!("${missing}"), &mut scope).is_err());
        assert!(substitute(&json!("${1 +}"), &mut scope).is_err());
    }
}
