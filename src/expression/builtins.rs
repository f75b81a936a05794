//! Builtin Functions and Methods
//!
//! The set of callables is closed: every function a program can reach is a
//! variant of [`Function`], and methods are dispatched by name on the
//! receiver's type. Nothing here touches the process environment except the
//! filesystem predicates and the host-bound functions, which go through
//! [`Host`](super::eval::Host).

use std::cmp::Ordering;
use std::path::Path;

use super::error::EvalError;
use super::eval::Scope;
use super::ops;
use super::value::{Dict, Value};

type Result<T> = std::result::Result<T, EvalError>;

/// Keyword arguments as passed at a call site.
pub type Kwargs = Vec<(String, Value)>;

/// Largest list `range()` will materialise.
const MAX_RANGE_LEN: i64 = 10_000_000;

/// Builtin functions available to expressions and inline code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Len,
    Str,
    Int,
    Float,
    Bool,
    List,
    Dict,
    Range,
    Sorted,
    Reversed,
    Min,
    Max,
    Sum,
    Abs,
    Round,
    Any,
    All,
    Enumerate,
    Zip,
    Print,
    Eprint,
    Fail,
    Exists,
    IsFile,
    IsDir,
    Changed,
    Skipped,
    Run,
}

impl Function {
    /// Functions installed in every scope.
    pub const CORE: &'static [Function] = &[
        Function::Len,
        Function::Str,
        Function::Int,
        Function::Float,
        Function::Bool,
        Function::List,
        Function::Dict,
        Function::Range,
        Function::Sorted,
        Function::Reversed,
        Function::Min,
        Function::Max,
        Function::Sum,
        Function::Abs,
        Function::Round,
        Function::Any,
        Function::All,
        Function::Enumerate,
        Function::Zip,
        Function::Print,
        Function::Eprint,
        Function::Fail,
    ];

    /// Filesystem predicates.
    pub const FILESYSTEM: &'static [Function] =
        &[Function::Exists, Function::IsFile, Function::IsDir];

    /// Functions that need a host to answer.
    pub const HOST: &'static [Function] = &[Function::Changed, Function::Skipped, Function::Run];

    pub fn name(self) -> &'static str {
        match self {
            Function::Len => "len",
            Function::Str => "str",
            Function::Int => "int",
            Function::Float => "float",
            Function::Bool => "bool",
            Function::List => "list",
            Function::Dict => "dict",
            Function::Range => "range",
            Function::Sorted => "sorted",
            Function::Reversed => "reversed",
            Function::Min => "min",
            Function::Max => "max",
            Function::Sum => "sum",
            Function::Abs => "abs",
            Function::Round => "round",
            Function::Any => "any",
            Function::All => "all",
            Function::Enumerate => "enumerate",
            Function::Zip => "zip",
            Function::Print => "print",
            Function::Eprint => "eprint",
            Function::Fail => "fail",
            Function::Exists => "exists",
            Function::IsFile => "isfile",
            Function::IsDir => "isdir",
            Function::Changed => "changed",
            Function::Skipped => "skipped",
            Function::Run => "run",
        }
    }
}

// ---------------------------------------------------------------------------
// Argument helpers
// ---------------------------------------------------------------------------

struct Args<'a> {
    name: &'a str,
    positional: Vec<Value>,
    keywords: Kwargs,
}

impl<'a> Args<'a> {
    fn new(name: &'a str, positional: Vec<Value>, keywords: Kwargs) -> Self {
        Self {
            name,
            positional,
            keywords,
        }
    }

    fn arity(&self, min: usize, max: usize) -> Result<()> {
        let given = self.positional.len();
        if given < min || given > max {
            let expected = if min == max {
                format!("exactly {}", min)
            } else if given < min {
                format!("at least {}", min)
            } else {
                format!("at most {}", max)
            };
            return Err(EvalError::type_error(format!(
                "{}() takes {} argument{} ({} given)",
                self.name,
                expected,
                if max == 1 && min == max { "" } else { "s" },
                given
            )));
        }
        Ok(())
    }

    fn keyword(&mut self, key: &str) -> Option<Value> {
        let position = self.keywords.iter().position(|(name, _)| name == key)?;
        Some(self.keywords.remove(position).1)
    }

    /// Fails on any keyword argument that was not consumed.
    fn finish(&self) -> Result<()> {
        match self.keywords.first() {
            Some((key, _)) => Err(EvalError::type_error(format!(
                "{}() got an unexpected keyword argument '{}'",
                self.name, key
            ))),
            None => Ok(()),
        }
    }

    fn take(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.positional)
    }
}

fn expect_str<'v>(function: &str, value: &'v Value) -> Result<&'v str> {
    match value {
        Value::Str(s) => Ok(s),
        other => Err(EvalError::type_error(format!(
            "{}() argument must be str, not {}",
            function,
            other.type_name()
        ))),
    }
}

fn expect_int(function: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(i64::from(*b)),
        other => Err(EvalError::type_error(format!(
            "{}() argument must be int, not {}",
            function,
            other.type_name()
        ))),
    }
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

/// Calls a builtin function.
pub fn call(function: Function, positional: Vec<Value>, keywords: Kwargs, scope: &mut Scope<'_>) -> Result<Value> {
    let mut args = Args::new(function.name(), positional, keywords);

    let result = match function {
        Function::Len => {
            args.arity(1, 1)?;
            let value = &args.positional[0];
            let len = match value {
                Value::Str(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Dict(map) => map.len(),
                other => {
                    return Err(EvalError::type_error(format!(
                        "object of type '{}' has no len()",
                        other.type_name()
                    )))
                }
            };
            Value::Int(i64::try_from(len).unwrap_or(i64::MAX))
        }
        Function::Str => {
            args.arity(0, 1)?;
            Value::Str(args.positional.first().map(|v| v.to_string()).unwrap_or_default())
        }
        Function::Int => {
            args.arity(0, 1)?;
            match args.take().into_iter().next() {
                None => Value::Int(0),
                Some(value) => to_int(value)?,
            }
        }
        Function::Float => {
            args.arity(0, 1)?;
            match args.take().into_iter().next() {
                None => Value::Float(0.0),
                Some(value) => to_float(value)?,
            }
        }
        Function::Bool => {
            args.arity(0, 1)?;
            Value::Bool(args.positional.first().map_or(false, Value::is_truthy))
        }
        Function::List => {
            args.arity(0, 1)?;
            match args.positional.first() {
                None => Value::List(Vec::new()),
                Some(value) => Value::List(value.iterate()?),
            }
        }
        Function::Dict => {
            args.arity(0, 1)?;
            let mut map = match args.take().into_iter().next() {
                None => Dict::new(),
                Some(Value::Dict(map)) => map,
                Some(other) => pairs_to_dict(other)?,
            };
            for (key, value) in std::mem::take(&mut args.keywords) {
                map.insert(key, value);
            }
            Value::Dict(map)
        }
        Function::Range => {
            args.arity(1, 3)?;
            let bounds: Vec<i64> = args
                .positional
                .iter()
                .map(|v| expect_int("range", v))
                .collect::<Result<_>>()?;
            range(&bounds)?
        }
        Function::Sorted => {
            args.arity(1, 1)?;
            let reverse = args.keyword("reverse").map_or(false, |v| v.is_truthy());
            let mut items = args.positional[0].iterate()?;
            sort_values(&mut items)?;
            if reverse {
                items.reverse();
            }
            Value::List(items)
        }
        Function::Reversed => {
            args.arity(1, 1)?;
            let mut items = args.positional[0].iterate()?;
            items.reverse();
            Value::List(items)
        }
        Function::Min | Function::Max => {
            args.arity(1, usize::MAX)?;
            let items = if args.positional.len() == 1 {
                args.positional[0].iterate()?
            } else {
                args.take()
            };
            extreme(function, items, args.keyword("default"))?
        }
        Function::Sum => {
            args.arity(1, 2)?;
            let start = args.positional.get(1).cloned().unwrap_or(Value::Int(0));
            let start = args.keyword("start").unwrap_or(start);
            args.positional[0]
                .iterate()?
                .into_iter()
                .try_fold(start, |total, item| ops::binary(super::ast::BinaryOp::Add, total, item))?
        }
        Function::Abs => {
            args.arity(1, 1)?;
            match &args.positional[0] {
                Value::Int(i) => Value::Int(
                    i.checked_abs()
                        .ok_or_else(|| EvalError::value("integer result too large"))?,
                ),
                Value::Float(f) => Value::Float(f.abs()),
                Value::Bool(b) => Value::Int(i64::from(*b)),
                other => {
                    return Err(EvalError::type_error(format!(
                        "bad operand type for abs(): '{}'",
                        other.type_name()
                    )))
                }
            }
        }
        Function::Round => {
            args.arity(1, 2)?;
            let digits = match args.positional.get(1).cloned().or_else(|| args.keyword("ndigits")) {
                None | Some(Value::None) => None,
                Some(value) => Some(expect_int("round", &value)?),
            };
            round(&args.positional[0], digits)?
        }
        Function::Any => {
            args.arity(1, 1)?;
            Value::Bool(args.positional[0].iterate()?.iter().any(Value::is_truthy))
        }
        Function::All => {
            args.arity(1, 1)?;
            Value::Bool(args.positional[0].iterate()?.iter().all(Value::is_truthy))
        }
        Function::Enumerate => {
            args.arity(1, 2)?;
            let start = match args.positional.get(1).cloned().or_else(|| args.keyword("start")) {
                None => 0,
                Some(value) => expect_int("enumerate", &value)?,
            };
            let items = args.positional[0].iterate()?;
            Value::List(
                items
                    .into_iter()
                    .zip(start..)
                    .map(|(item, i)| Value::List(vec![Value::Int(i), item]))
                    .collect(),
            )
        }
        Function::Zip => {
            let columns: Vec<Vec<Value>> = args
                .positional
                .iter()
                .map(Value::iterate)
                .collect::<Result<_>>()?;
            let len = columns.iter().map(Vec::len).min().unwrap_or(0);
            Value::List(
                (0..len)
                    .map(|i| Value::List(columns.iter().map(|column| column[i].clone()).collect()))
                    .collect(),
            )
        }
        Function::Print | Function::Eprint => {
            let sep = args.keyword("sep").map_or(" ".to_string(), |v| v.to_string());
            let end = args.keyword("end").map_or("\n".to_string(), |v| v.to_string());
            let parts: Vec<String> = args.positional.iter().map(Value::to_string).collect();
            let text = format!("{}{}", parts.join(&sep), end);
            if function == Function::Print {
                scope.write_stdout(&text);
            } else {
                scope.write_stderr(&text);
            }
            Value::None
        }
        Function::Fail => {
            args.arity(0, 1)?;
            let message = args
                .positional
                .first()
                .map_or_else(|| "Step failed".to_string(), Value::to_string);
            return Err(EvalError::failure(message));
        }
        Function::Exists | Function::IsFile | Function::IsDir => {
            args.arity(1, 1)?;
            let path = Path::new(expect_str(function.name(), &args.positional[0])?);
            Value::Bool(match function {
                Function::Exists => path.exists(),
                Function::IsFile => path.is_file(),
                _ => path.is_dir(),
            })
        }
        Function::Changed | Function::Skipped | Function::Run => {
            args.arity(1, 1)?;
            let host = scope
                .host()
                .ok_or_else(|| EvalError::name(function.name()))?;
            let argument = args.positional[0].to_string();
            match function {
                Function::Changed => Value::Bool(host.changed(&argument)),
                Function::Skipped => Value::Bool(host.skipped(&argument)),
                _ => host.run(&argument),
            }
        }
    };

    args.finish()?;
    Ok(result)
}

fn to_int(value: Value) -> Result<Value> {
    match value {
        Value::Int(i) => Ok(Value::Int(i)),
        Value::Bool(b) => Ok(Value::Int(i64::from(b))),
        Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
        Value::Float(f) => Err(EvalError::value(format!(
            "cannot convert float {} to integer",
            Value::Float(f)
        ))),
        Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
            EvalError::value(format!(
                "invalid literal for int() with base 10: {}",
                Value::Str(s.clone()).repr()
            ))
        }),
        other => Err(EvalError::type_error(format!(
            "int() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn to_float(value: Value) -> Result<Value> {
    match value {
        Value::Int(i) => Ok(Value::Float(i as f64)),
        Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
        Value::Float(f) => Ok(Value::Float(f)),
        Value::Str(s) => {
            let trimmed = s.trim();
            let parsed = match trimmed.to_ascii_lowercase().as_str() {
                "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
                "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
                "nan" => Some(f64::NAN),
                _ => trimmed.parse::<f64>().ok(),
            };
            parsed.map(Value::Float).ok_or_else(|| {
                EvalError::value(format!(
                    "could not convert string to float: {}",
                    Value::Str(s.clone()).repr()
                ))
            })
        }
        other => Err(EvalError::type_error(format!(
            "float() argument must be a string or a number, not '{}'",
            other.type_name()
        ))),
    }
}

fn pairs_to_dict(value: Value) -> Result<Dict> {
    let mut map = Dict::new();
    for pair in value.iterate()? {
        let mut items = pair.iterate()?.into_iter();
        match (items.next(), items.next(), items.next()) {
            (Some(key), Some(value), None) => {
                map.insert(key.into_key()?, value);
            }
            _ => {
                return Err(EvalError::value(
                    "dictionary update sequence element has wrong length; 2 is required",
                ))
            }
        }
    }
    Ok(map)
}

fn range(bounds: &[i64]) -> Result<Value> {
    let (start, stop, step) = match *bounds {
        [stop] => (0, stop, 1),
        [start, stop] => (start, stop, 1),
        [start, stop, step] => (start, stop, step),
        _ => return Err(EvalError::type_error("range expected at most 3 arguments")),
    };
    if step == 0 {
        return Err(EvalError::value("range() arg 3 must not be zero"));
    }

    let span = if step > 0 {
        stop.saturating_sub(start)
    } else {
        start.saturating_sub(stop)
    };
    let len = if span <= 0 {
        0
    } else {
        (span - 1) / step.saturating_abs() + 1
    };
    if len > MAX_RANGE_LEN {
        return Err(EvalError::value("range() result is too large"));
    }

    Ok(Value::List(
        (0..len).map(|i| Value::Int(start + i * step)).collect(),
    ))
}

fn sort_values(items: &mut [Value]) -> Result<()> {
    let mut failure = None;
    items.sort_by(|a, b| match ops::order(a, b) {
        Ok(ordering) => ordering,
        Err(err) => {
            failure.get_or_insert(err);
            Ordering::Equal
        }
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn extreme(function: Function, items: Vec<Value>, default: Option<Value>) -> Result<Value> {
    let mut iter = items.into_iter();
    let mut best = match iter.next() {
        Some(first) => first,
        None => {
            return default.ok_or_else(|| {
                EvalError::value(format!("{}() arg is an empty sequence", function.name()))
            })
        }
    };

    let wanted = if function == Function::Min {
        Ordering::Less
    } else {
        Ordering::Greater
    };
    for item in iter {
        if ops::order(&item, &best)? == wanted {
            best = item;
        }
    }
    Ok(best)
}

fn round(value: &Value, digits: Option<i64>) -> Result<Value> {
    let number = match value {
        Value::Int(i) => match digits {
            None => return Ok(Value::Int(*i)),
            Some(d) if d >= 0 => return Ok(Value::Int(*i)),
            Some(_) => *i as f64,
        },
        Value::Bool(b) => return Ok(Value::Int(i64::from(*b))),
        Value::Float(f) => *f,
        other => {
            return Err(EvalError::type_error(format!(
                "type {} doesn't define __round__ method",
                other.type_name()
            )))
        }
    };

    match digits {
        None => {
            if !number.is_finite() {
                return Err(EvalError::value("cannot round a non-finite float to an integer"));
            }
            Ok(Value::Int(number.round_ties_even() as i64))
        }
        Some(d) => {
            let exponent = i32::try_from(d).unwrap_or(if d > 0 { i32::MAX } else { i32::MIN });
            let factor = 10f64.powi(exponent);
            let rounded = (number * factor).round_ties_even() / factor;
            match value {
                Value::Int(_) => Ok(Value::Int(rounded as i64)),
                _ => Ok(Value::Float(if rounded.is_finite() { rounded } else { number })),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

/// Methods that modify their receiver in place.
pub fn is_mutating(method: &str) -> bool {
    matches!(
        method,
        "append" | "extend" | "insert" | "pop" | "update" | "clear" | "setdefault"
    )
}

fn no_attribute(type_name: &str, method: &str) -> EvalError {
    EvalError::attribute(format!(
        "'{}' object has no attribute '{}'",
        type_name, method
    ))
}

/// Calls a method that does not modify its receiver.
pub fn call_method(receiver: &Value, method: &str, positional: Vec<Value>, keywords: Kwargs) -> Result<Value> {
    let mut args = Args::new(method, positional, keywords);
    let type_name = receiver.type_name();

    let result = match receiver {
        Value::Str(s) => string_method(s, method, &mut args)?,
        Value::Dict(map) => match method {
            "get" => {
                args.arity(1, 2)?;
                let default = args.positional.get(1).cloned().unwrap_or(Value::None);
                match &args.positional[0] {
                    Value::Str(key) => map.get(key).cloned().unwrap_or(default),
                    _ => default,
                }
            }
            "keys" => {
                args.arity(0, 0)?;
                Value::List(map.keys().cloned().map(Value::Str).collect())
            }
            "values" => {
                args.arity(0, 0)?;
                Value::List(map.values().cloned().collect())
            }
            "items" => {
                args.arity(0, 0)?;
                Value::List(
                    map.iter()
                        .map(|(key, value)| Value::List(vec![Value::Str(key.clone()), value.clone()]))
                        .collect(),
                )
            }
            _ => return Err(no_attribute(type_name, method)),
        },
        Value::List(items) => match method {
            "index" => {
                args.arity(1, 1)?;
                let needle = &args.positional[0];
                let position = items
                    .iter()
                    .position(|item| ops::equals(item, needle))
                    .ok_or_else(|| EvalError::value(format!("{} is not in list", needle.repr())))?;
                Value::Int(i64::try_from(position).unwrap_or(i64::MAX))
            }
            "count" => {
                args.arity(1, 1)?;
                let needle = &args.positional[0];
                let count = items.iter().filter(|item| ops::equals(item, needle)).count();
                Value::Int(i64::try_from(count).unwrap_or(i64::MAX))
            }
            _ => return Err(no_attribute(type_name, method)),
        },
        _ => return Err(no_attribute(type_name, method)),
    };

    args.finish()?;
    Ok(result)
}

fn string_method(s: &str, method: &str, args: &mut Args<'_>) -> Result<Value> {
    match method {
        "join" => {
            args.arity(1, 1)?;
            let parts = args.positional[0]
                .iterate()?
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Str(part) => Ok(part),
                    other => Err(EvalError::type_error(format!(
                        "sequence item {}: expected str instance, {} found",
                        i,
                        other.type_name()
                    ))),
                })
                .collect::<Result<Vec<String>>>()?;
            Ok(Value::Str(parts.join(s)))
        }
        "upper" => {
            args.arity(0, 0)?;
            Ok(Value::Str(s.to_uppercase()))
        }
        "lower" => {
            args.arity(0, 0)?;
            Ok(Value::Str(s.to_lowercase()))
        }
        "strip" | "lstrip" | "rstrip" => {
            args.arity(0, 1)?;
            let chars: Option<Vec<char>> = match args.positional.first() {
                None | Some(Value::None) => None,
                Some(value) => Some(expect_str(method, value)?.chars().collect()),
            };
            let matches = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            let stripped = match method {
                "strip" => s.trim_matches(matches),
                "lstrip" => s.trim_start_matches(matches),
                _ => s.trim_end_matches(matches),
            };
            Ok(Value::Str(stripped.to_string()))
        }
        "split" => {
            args.arity(0, 2)?;
            let separator = match args.positional.first().cloned().or_else(|| args.keyword("sep")) {
                None | Some(Value::None) => None,
                Some(value) => Some(expect_str("split", &value)?.to_string()),
            };
            let max_split = match args.positional.get(1).cloned().or_else(|| args.keyword("maxsplit")) {
                None => None,
                Some(value) => Some(expect_int("split", &value)?).filter(|n| *n >= 0),
            };
            split(s, separator.as_deref(), max_split)
        }
        "startswith" | "endswith" => {
            args.arity(1, 1)?;
            let affixes = match &args.positional[0] {
                Value::List(items) => items.clone(),
                other => vec![other.clone()],
            };
            let mut found = false;
            for affix in &affixes {
                let affix = expect_str(method, affix)?;
                found |= if method == "startswith" {
                    s.starts_with(affix)
                } else {
                    s.ends_with(affix)
                };
            }
            Ok(Value::Bool(found))
        }
        "replace" => {
            args.arity(2, 2)?;
            let old = expect_str("replace", &args.positional[0])?;
            let new = expect_str("replace", &args.positional[1])?;
            Ok(Value::Str(s.replace(old, new)))
        }
        _ => Err(no_attribute("str", method)),
    }
}

fn split(s: &str, separator: Option<&str>, max_split: Option<i64>) -> Result<Value> {
    let limit = max_split.and_then(|n| usize::try_from(n).ok());
    let parts: Vec<Value> = match separator {
        Some("") => return Err(EvalError::value("empty separator")),
        Some(sep) => match limit {
            Some(n) => s.splitn(n + 1, sep).map(Value::from).collect(),
            None => s.split(sep).map(Value::from).collect(),
        },
        None => {
            let mut parts = Vec::new();
            let mut rest = s.trim_start();
            while !rest.is_empty() {
                if limit.map_or(false, |n| parts.len() == n) {
                    parts.push(Value::from(rest.trim_end()));
                    break;
                }
                let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                parts.push(Value::from(&rest[..end]));
                rest = rest[end..].trim_start();
            }
            parts
        }
    };
    Ok(Value::List(parts))
}

/// Calls a method that modifies its receiver in place.
pub fn call_mutating_method(receiver: &mut Value, method: &str, positional: Vec<Value>, keywords: Kwargs) -> Result<Value> {
    let mut args = Args::new(method, positional, keywords);
    let type_name = receiver.type_name();

    let result = match receiver {
        Value::List(items) => match method {
            "append" => {
                args.arity(1, 1)?;
                items.extend(args.take());
                Value::None
            }
            "extend" => {
                args.arity(1, 1)?;
                items.extend(args.positional[0].iterate()?);
                Value::None
            }
            "insert" => {
                args.arity(2, 2)?;
                let mut values = args.take().into_iter();
                let index = expect_int("insert", &values.next().unwrap_or(Value::None))?;
                let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
                let position = if index < 0 {
                    (index + len).max(0)
                } else {
                    index.min(len)
                };
                items.insert(usize::try_from(position).unwrap_or(0), values.next().unwrap_or(Value::None));
                Value::None
            }
            "pop" => {
                args.arity(0, 1)?;
                if items.is_empty() {
                    return Err(EvalError::index("pop from empty list"));
                }
                let index = match args.positional.first() {
                    None => -1,
                    Some(value) => expect_int("pop", value)?,
                };
                let position = ops::normalize_index(index, items.len())
                    .ok_or_else(|| EvalError::index("pop index out of range"))?;
                items.remove(position)
            }
            "clear" => {
                args.arity(0, 0)?;
                items.clear();
                Value::None
            }
            _ => return Err(no_attribute(type_name, method)),
        },
        Value::Dict(map) => match method {
            "update" => {
                args.arity(0, 1)?;
                if let Some(other) = args.take().into_iter().next() {
                    let entries = match other {
                        Value::Dict(entries) => entries,
                        other => pairs_to_dict(other)?,
                    };
                    map.extend(entries);
                }
                for (key, value) in std::mem::take(&mut args.keywords) {
                    map.insert(key, value);
                }
                Value::None
            }
            "pop" => {
                args.arity(1, 2)?;
                let mut values = args.take().into_iter();
                let key = values.next().unwrap_or(Value::None);
                let default = values.next();
                let removed = match &key {
                    Value::Str(k) => map.shift_remove(k),
                    _ => None,
                };
                match (removed, default) {
                    (Some(value), _) => value,
                    (None, Some(default)) => default,
                    (None, None) => return Err(EvalError::key(key.repr())),
                }
            }
            "setdefault" => {
                args.arity(1, 2)?;
                let mut values = args.take().into_iter();
                let key = values.next().unwrap_or(Value::None).into_key()?;
                let default = values.next().unwrap_or(Value::None);
                map.entry(key).or_insert(default).clone()
            }
            "clear" => {
                args.arity(0, 0)?;
                map.clear();
                Value::None
            }
            _ => return Err(no_attribute(type_name, method)),
        },
        _ => return Err(no_attribute(type_name, method)),
    };

    args.finish()?;
    Ok(result)
}
