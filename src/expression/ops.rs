//! Operators: arithmetic, comparison, membership, indexing and slicing.

use std::cmp::Ordering;

use super::ast::{BinaryOp, CompareOp, UnaryOp};
use super::error::EvalError;
use super::value::Value;

type Result<T> = std::result::Result<T, EvalError>;

/// Longest string or list `seq * n` may produce.
const MAX_SEQUENCE_LEN: usize = 10_000_000;

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &Value) -> Option<Number> {
        match value {
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

fn overflow() -> EvalError {
    EvalError::value("integer result too large")
}

fn unsupported(op: &str, left: &Value, right: &Value) -> EvalError {
    EvalError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op,
        left.type_name(),
        right.type_name()
    ))
}

pub fn unary(op: UnaryOp, operand: Value) -> Result<Value> {
    match (op, Number::of(&operand)) {
        (UnaryOp::Neg, Some(Number::Int(i))) => i.checked_neg().map(Value::Int).ok_or_else(overflow),
        (UnaryOp::Neg, Some(Number::Float(f))) => Ok(Value::Float(-f)),
        (UnaryOp::Pos, Some(Number::Int(i))) => Ok(Value::Int(i)),
        (UnaryOp::Pos, Some(Number::Float(f))) => Ok(Value::Float(f)),
        (_, None) => Err(EvalError::type_error(format!(
            "bad operand type for unary {}: '{}'",
            if op == UnaryOp::Neg { "-" } else { "+" },
            operand.type_name()
        ))),
    }
}

pub fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    match (op, &left, &right) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => return Ok(Value::Str(format!("{}{}", a, b))),
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            let mut joined = a.clone();
            joined.extend(b.iter().cloned());
            return Ok(Value::List(joined));
        }
        (BinaryOp::Mul, Value::Str(s), Value::Int(n)) | (BinaryOp::Mul, Value::Int(n), Value::Str(s)) => {
            let count = repeat_count(s.len(), *n)?;
            return Ok(Value::Str(s.repeat(count)));
        }
        (BinaryOp::Mul, Value::List(items), Value::Int(n))
        | (BinaryOp::Mul, Value::Int(n), Value::List(items)) => {
            let count = repeat_count(items.len(), *n)?;
            let mut repeated = Vec::with_capacity(items.len() * count);
            for _ in 0..count {
                repeated.extend(items.iter().cloned());
            }
            return Ok(Value::List(repeated));
        }
        _ => {}
    }

    let (a, b) = match (Number::of(&left), Number::of(&right)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(unsupported(op.symbol(), &left, &right)),
    };

    match (a, b) {
        (Number::Int(x), Number::Int(y)) => int_arithmetic(op, x, y),
        _ => float_arithmetic(op, a.as_f64(), b.as_f64()),
    }
}

/// Number of copies for `seq * n`, capped at [`MAX_SEQUENCE_LEN`] elements.
fn repeat_count(len: usize, n: i64) -> Result<usize> {
    let count = usize::try_from(n.max(0)).unwrap_or(0);
    if len == 0 {
        return Ok(0);
    }
    match len.checked_mul(count) {
        Some(total) if total <= MAX_SEQUENCE_LEN => Ok(count),
        _ => Err(EvalError::value("repeated sequence is too large")),
    }
}

fn int_arithmetic(op: BinaryOp, x: i64, y: i64) -> Result<Value> {
    let result = match op {
        BinaryOp::Add => x.checked_add(y),
        BinaryOp::Sub => x.checked_sub(y),
        BinaryOp::Mul => x.checked_mul(y),
        BinaryOp::Div => {
            if y == 0 {
                return Err(EvalError::zero_division("division by zero"));
            }
            return Ok(Value::Float(x as f64 / y as f64));
        }
        BinaryOp::FloorDiv => {
            if y == 0 {
                return Err(EvalError::zero_division("integer division or modulo by zero"));
            }
            x.checked_div(y).map(|q| {
                if x % y != 0 && ((x < 0) != (y < 0)) {
                    q - 1
                } else {
                    q
                }
            })
        }
        BinaryOp::Mod => {
            if y == 0 {
                return Err(EvalError::zero_division("integer division or modulo by zero"));
            }
            x.checked_rem(y).map(|r| if r != 0 && ((r < 0) != (y < 0)) { r + y } else { r })
        }
        BinaryOp::Pow => {
            if y < 0 {
                return float_arithmetic(op, x as f64, y as f64);
            }
            u32::try_from(y).ok().and_then(|exp| x.checked_pow(exp))
        }
    };

    result.map(Value::Int).ok_or_else(overflow)
}

fn float_arithmetic(op: BinaryOp, x: f64, y: f64) -> Result<Value> {
    let value = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => {
            if y == 0.0 {
                return Err(EvalError::zero_division("float division by zero"));
            }
            x / y
        }
        BinaryOp::FloorDiv => {
            if y == 0.0 {
                return Err(EvalError::zero_division("float floor division by zero"));
            }
            (x / y).floor()
        }
        BinaryOp::Mod => {
            if y == 0.0 {
                return Err(EvalError::zero_division("float modulo"));
            }
            x - y * (x / y).floor()
        }
        BinaryOp::Pow => {
            if x == 0.0 && y < 0.0 {
                return Err(EvalError::zero_division(
                    "0.0 cannot be raised to a negative power",
                ));
            }
            x.powf(y)
        }
    };
    Ok(Value::Float(value))
}

/// Equality with numeric coercion between ints, floats and bools.
pub fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::List(a), Value::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| equals(x, y))
        }
        (Value::Dict(a), Value::Dict(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, value)| b.get(key).map_or(false, |other| equals(value, other)))
        }
        (Value::Function(a), Value::Function(b)) => a == b,
        _ => match (Number::of(left), Number::of(right)) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => a == b,
            (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
            _ => false,
        },
    }
}

/// Ordering used by `<`, `sorted`, `min` and `max`.
pub fn order(left: &Value, right: &Value) -> Result<Ordering> {
    let ordering = match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::List(a), Value::List(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                match order(x, y)? {
                    Ordering::Equal => continue,
                    other => return Ok(other),
                }
            }
            Some(a.len().cmp(&b.len()))
        }
        _ => match (Number::of(left), Number::of(right)) {
            (Some(Number::Int(a)), Some(Number::Int(b))) => Some(a.cmp(&b)),
            (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
            _ => {
                return Err(EvalError::type_error(format!(
                    "'<' not supported between instances of '{}' and '{}'",
                    left.type_name(),
                    right.type_name()
                )))
            }
        },
    };

    // NaN compares as unordered; treat it as equal so sorting stays total.
    Ok(ordering.unwrap_or(Ordering::Equal))
}

pub fn compare(op: CompareOp, left: &Value, right: &Value) -> Result<bool> {
    match op {
        CompareOp::Eq => Ok(equals(left, right)),
        CompareOp::NotEq => Ok(!equals(left, right)),
        CompareOp::Lt => Ok(order(left, right)? == Ordering::Less),
        CompareOp::LtE => Ok(order(left, right)? != Ordering::Greater),
        CompareOp::Gt => Ok(order(left, right)? == Ordering::Greater),
        CompareOp::GtE => Ok(order(left, right)? != Ordering::Less),
        CompareOp::In => contains(right, left),
        CompareOp::NotIn => contains(right, left).map(|found| !found),
        CompareOp::Is => Ok(identical(left, right)),
        CompareOp::IsNot => Ok(!identical(left, right)),
    }
}

/// Identity is only observable for singletons (`None`, `True`, `False`).
fn identical(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::None, Value::None) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Function(a), Value::Function(b)) => a == b,
        _ => false,
    }
}

pub fn contains(container: &Value, item: &Value) -> Result<bool> {
    match (container, item) {
        (Value::Str(haystack), Value::Str(needle)) => Ok(haystack.contains(needle.as_str())),
        (Value::Str(_), other) => Err(EvalError::type_error(format!(
            "'in <string>' requires string as left operand, not {}",
            other.type_name()
        ))),
        (Value::List(items), _) => Ok(items.iter().any(|x| equals(x, item))),
        (Value::Dict(map), Value::Str(key)) => Ok(map.contains_key(key)),
        (Value::Dict(_), _) => Ok(false),
        (other, _) => Err(EvalError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

/// Resolves a possibly negative index against a sequence length.
pub fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

fn as_index(value: &Value, container: &str) -> Result<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(EvalError::type_error(format!(
            "{} indices must be integers, not {}",
            container,
            other.type_name()
        ))),
    }
}

pub fn index(object: &Value, key: &Value) -> Result<Value> {
    match object {
        Value::List(items) => {
            let i = as_index(key, "list")?;
            normalize_index(i, items.len())
                .map(|i| items[i].clone())
                .ok_or_else(|| EvalError::index("list index out of range"))
        }
        Value::Str(s) => {
            let i = as_index(key, "string")?;
            let chars: Vec<char> = s.chars().collect();
            normalize_index(i, chars.len())
                .map(|i| Value::Str(chars[i].to_string()))
                .ok_or_else(|| EvalError::index("string index out of range"))
        }
        Value::Dict(map) => match key {
            Value::Str(k) => map.get(k).cloned().ok_or_else(|| EvalError::key(key.repr())),
            _ => Err(EvalError::key(key.repr())),
        },
        other => Err(EvalError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

fn slice_bound(bound: Option<&Value>, len: usize, default: usize) -> Result<usize> {
    let bound = match bound {
        None | Some(Value::None) => return Ok(default),
        Some(value) => as_index(value, "slice")?,
    };
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if bound < 0 { (bound + len_i).max(0) } else { bound.min(len_i) };
    Ok(usize::try_from(resolved).unwrap_or(0))
}

pub fn slice(object: &Value, lower: Option<&Value>, upper: Option<&Value>) -> Result<Value> {
    match object {
        Value::List(items) => {
            let start = slice_bound(lower, items.len(), 0)?;
            let end = slice_bound(upper, items.len(), items.len())?;
            Ok(Value::List(if start < end {
                items[start..end].to_vec()
            } else {
                Vec::new()
            }))
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let start = slice_bound(lower, chars.len(), 0)?;
            let end = slice_bound(upper, chars.len(), chars.len())?;
            Ok(Value::Str(if start < end {
                chars[start..end].iter().collect()
            } else {
                String::new()
            }))
        }
        other => Err(EvalError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// Stores `value` under `key` in a list or dict.
pub fn set_item(container: &mut Value, key: Value, value: Value) -> Result<()> {
    match container {
        Value::List(items) => {
            let i = as_index(&key, "list")?;
            let slot = normalize_index(i, items.len())
                .ok_or_else(|| EvalError::index("list assignment index out of range"))?;
            items[slot] = value;
            Ok(())
        }
        Value::Dict(map) => {
            map.insert(key.into_key()?, value);
            Ok(())
        }
        other => Err(EvalError::type_error(format!(
            "'{}' object does not support item assignment",
            other.type_name()
        ))),
    }
}
