//! Evaluator
//!
//! A [`Scope`] owns the variables visible to one evaluation and the text
//! written by `print`/`eprint`. Everything a program can reach comes from the
//! scope: there is no module system, no attribute access beyond dictionary
//! keys and the methods in [`super::builtins`], and no way to touch the
//! process except through the [`Host`] the scope was built with.

use indexmap::IndexMap;

use super::ast::{Comprehension, Expr, Statement, StmtKind, Target};
use super::builtins::{self, Function, Kwargs};
use super::error::EvalError;
use super::ops;
use super::program::Program;
use super::value::{Dict, Value};

type Result<T> = std::result::Result<T, EvalError>;

/// Services a running workflow exposes to expressions.
pub trait Host {
    /// True if the named step's result carries a truthy `changed` entry.
    fn changed(&self, step_id: &str) -> bool;

    /// True if the named step was skipped.
    fn skipped(&self, step_id: &str) -> bool;

    /// Runs a shell command line and returns a result mapping with
    /// `succeeded`, `output`, `error` and `returncode`.
    fn run(&self, command: &str) -> Value;
}

/// Control flow signal produced by a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Normal,
    Break,
    Continue,
}

/// A location that can be read and written: a variable followed by a path of
/// subscripts and attribute keys.
struct Place {
    root: String,
    path: Vec<Value>,
}

/// Variables, output buffers and host binding for one evaluation.
pub struct Scope<'h> {
    globals: IndexMap<String, Value>,
    frames: Vec<IndexMap<String, Value>>,
    host: Option<&'h dyn Host>,
    stdout: String,
    stderr: String,
}

impl Default for Scope<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'h> Scope<'h> {
    /// Creates a scope holding the core builtins and nothing else.
    pub fn new() -> Self {
        let mut scope = Self {
            globals: IndexMap::new(),
            frames: Vec::new(),
            host: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        scope.install(Function::CORE);
        scope
    }

    /// Creates a scope whose `changed`, `skipped` and `run` answer through
    /// `host`.
    pub fn with_host(host: &'h dyn Host) -> Self {
        let mut scope = Self::new();
        scope.host = Some(host);
        scope.install(Function::HOST);
        scope
    }

    /// Binds each function under its own name.
    pub fn install(&mut self, functions: &[Function]) {
        for function in functions {
            self.globals
                .insert(function.name().to_string(), Value::Function(*function));
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.globals.shift_remove(name)
    }

    /// Text written by `print`.
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Text written by `eprint`.
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub(crate) fn host(&self) -> Option<&'h dyn Host> {
        self.host
    }

    pub(crate) fn write_stdout(&mut self, text: &str) {
        self.stdout.push_str(text);
    }

    pub(crate) fn write_stderr(&mut self, text: &str) {
        self.stderr.push_str(text);
    }

    /// Runs every statement of a program.
    pub fn execute(&mut self, program: &Program) -> Result<()> {
        match self.exec_block(&program.body)? {
            Flow::Normal => Ok(()),
            Flow::Break => Err(EvalError::syntax("'break' outside loop")),
            Flow::Continue => Err(EvalError::syntax("'continue' not properly in loop")),
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn exec_block(&mut self, body: &[Statement]) -> Result<Flow> {
        for statement in body {
            let flow = self
                .exec_statement(statement)
                .map_err(|err| err.at_line(statement.line, &statement.source))?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_statement(&mut self, statement: &Statement) -> Result<Flow> {
        match &statement.kind {
            StmtKind::Expr(expr) => {
                self.evaluate(expr)?;
            }
            StmtKind::Assign { target, value } => {
                let value = self.evaluate(value)?;
                self.assign(target, value)?;
            }
            StmtKind::AugAssign { target, op, value } => {
                let current_expr = target
                    .to_expr()
                    .ok_or_else(|| EvalError::syntax("illegal expression for augmented assignment"))?;
                let current = self.evaluate(&current_expr)?;
                let operand = self.evaluate(value)?;
                let updated = ops::binary(*op, current, operand)?;
                self.assign(target, updated)?;
            }
            StmtKind::Pass => {}
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
            StmtKind::Raise(expr) => {
                let value = self.evaluate(expr)?;
                return Err(EvalError::raised(value.to_string()));
            }
            StmtKind::If { branches, otherwise } => {
                for (condition, body) in branches {
                    if self.evaluate(condition)?.is_truthy() {
                        return self.exec_block(body);
                    }
                }
                return self.exec_block(otherwise);
            }
            StmtKind::For { target, iter, body } => {
                for item in self.evaluate(iter)?.iterate()? {
                    self.assign(target, item)?;
                    match self.exec_block(body)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                    }
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn assign(&mut self, target: &Target, value: Value) -> Result<()> {
        match target {
            Target::Name(name) => {
                self.store(name, value);
                Ok(())
            }
            Target::Unpack(targets) => {
                let items = value.iterate()?;
                if items.len() < targets.len() {
                    return Err(EvalError::value(format!(
                        "not enough values to unpack (expected {}, got {})",
                        targets.len(),
                        items.len()
                    )));
                }
                if items.len() > targets.len() {
                    return Err(EvalError::value(format!(
                        "too many values to unpack (expected {})",
                        targets.len()
                    )));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.assign(target, item)?;
                }
                Ok(())
            }
            Target::Index { object, index } => {
                let place = self.place(object)?;
                let key = self.evaluate(index)?;
                let container = self.place_mut(&place)?;
                ops::set_item(container, key, value)
            }
            Target::Attribute { object, name } => {
                let place = self.place(object)?;
                match self.place_mut(&place)? {
                    Value::Dict(map) => {
                        map.insert(name.clone(), value);
                        Ok(())
                    }
                    other => Err(EvalError::attribute(format!(
                        "'{}' object has no attribute '{}'",
                        other.type_name(),
                        name
                    ))),
                }
            }
        }
    }

    /// Writes a variable into the innermost frame that already holds it, or
    /// into the globals.
    fn store(&mut self, name: &str, value: Value) {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.get_mut(name) {
                *slot = value;
                return;
            }
        }
        self.globals.insert(name.to_string(), value);
    }

    /// Resolves an expression to an assignable place.
    fn place(&mut self, expr: &Expr) -> Result<Place> {
        self.try_place(expr)?
            .ok_or_else(|| EvalError::syntax("cannot assign to expression"))
    }

    fn try_place(&mut self, expr: &Expr) -> Result<Option<Place>> {
        match expr {
            Expr::Name(name) => Ok(Some(Place {
                root: name.clone(),
                path: Vec::new(),
            })),
            Expr::Index { object, index } => match self.try_place(object)? {
                Some(mut place) => {
                    place.path.push(self.evaluate(index)?);
                    Ok(Some(place))
                }
                None => Ok(None),
            },
            Expr::Attribute { object, name } => match self.try_place(object)? {
                Some(mut place) => {
                    place.path.push(Value::Str(name.clone()));
                    Ok(Some(place))
                }
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    fn place_mut(&mut self, place: &Place) -> Result<&mut Value> {
        let mut current = match self
            .frames
            .iter_mut()
            .rev()
            .find_map(|frame| frame.get_mut(&place.root))
        {
            Some(value) => value,
            None => self
                .globals
                .get_mut(&place.root)
                .ok_or_else(|| EvalError::name(&place.root))?,
        };

        for key in &place.path {
            current = match current {
                Value::List(items) => {
                    let i = match key {
                        Value::Int(i) => *i,
                        Value::Bool(b) => i64::from(*b),
                        other => {
                            return Err(EvalError::type_error(format!(
                                "list indices must be integers, not {}",
                                other.type_name()
                            )))
                        }
                    };
                    let slot = ops::normalize_index(i, items.len())
                        .ok_or_else(|| EvalError::index("list index out of range"))?;
                    &mut items[slot]
                }
                Value::Dict(map) => match key {
                    Value::Str(k) => map.get_mut(k).ok_or_else(|| EvalError::key(key.repr()))?,
                    _ => return Err(EvalError::key(key.repr())),
                },
                other => {
                    return Err(EvalError::type_error(format!(
                        "'{}' object is not subscriptable",
                        other.type_name()
                    )))
                }
            };
        }

        Ok(current)
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    /// Evaluates an expression.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Name(name) => self.get(name).cloned().ok_or_else(|| EvalError::name(name)),
            Expr::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.evaluate(item))
                    .collect::<Result<Vec<_>>>()?,
            )),
            Expr::Dict(entries) => {
                let mut map = Dict::new();
                for (key, value) in entries {
                    let key = self.evaluate(key)?.into_key()?;
                    let value = self.evaluate(value)?;
                    map.insert(key, value);
                }
                Ok(Value::Dict(map))
            }
            Expr::ListComp { element, clauses } => {
                let mut items = Vec::new();
                self.comprehend(clauses, &mut |scope| {
                    items.push(scope.evaluate(element)?);
                    Ok(())
                })?;
                Ok(Value::List(items))
            }
            Expr::DictComp {
                key,
                value,
                clauses,
            } => {
                let mut map = Dict::new();
                self.comprehend(clauses, &mut |scope| {
                    let k = scope.evaluate(key)?.into_key()?;
                    let v = scope.evaluate(value)?;
                    map.insert(k, v);
                    Ok(())
                })?;
                Ok(Value::Dict(map))
            }
            Expr::Attribute { object, name } => match self.evaluate(object)? {
                Value::Dict(map) => map.get(name).cloned().ok_or_else(|| {
                    EvalError::attribute(format!("'dict' object has no attribute '{}'", name))
                }),
                other => Err(EvalError::attribute(format!(
                    "'{}' object has no attribute '{}'",
                    other.type_name(),
                    name
                ))),
            },
            Expr::Index { object, index } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                ops::index(&object, &index)
            }
            Expr::Slice {
                object,
                lower,
                upper,
            } => {
                let object = self.evaluate(object)?;
                let lower = lower.as_ref().map(|e| self.evaluate(e)).transpose()?;
                let upper = upper.as_ref().map(|e| self.evaluate(e)).transpose()?;
                ops::slice(&object, lower.as_ref(), upper.as_ref())
            }
            Expr::Call {
                callee,
                args,
                kwargs,
            } => {
                let positional = args
                    .iter()
                    .map(|arg| self.evaluate(arg))
                    .collect::<Result<Vec<_>>>()?;
                let mut keywords = Kwargs::new();
                for (name, arg) in kwargs {
                    keywords.push((name.clone(), self.evaluate(arg)?));
                }

                match callee.as_ref() {
                    Expr::Attribute { object, name } => {
                        self.call_method(object, name, positional, keywords)
                    }
                    other => {
                        let function = self.evaluate(other)?;
                        self.call_value(function, positional, keywords)
                    }
                }
            }
            Expr::Unary { op, operand } => {
                let operand = self.evaluate(operand)?;
                ops::unary(*op, operand)
            }
            Expr::Binary { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                ops::binary(*op, left, right)
            }
            Expr::Compare { first, rest } => {
                let mut left = self.evaluate(first)?;
                for (op, right) in rest {
                    let right = self.evaluate(right)?;
                    if !ops::compare(*op, &left, &right)? {
                        return Ok(Value::Bool(false));
                    }
                    left = right;
                }
                Ok(Value::Bool(true))
            }
            Expr::And(left, right) => {
                let left = self.evaluate(left)?;
                if left.is_truthy() {
                    self.evaluate(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Or(left, right) => {
                let left = self.evaluate(left)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expr::Not(operand) => Ok(Value::Bool(!self.evaluate(operand)?.is_truthy())),
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then)
                } else {
                    self.evaluate(otherwise)
                }
            }
        }
    }

    fn call_value(&mut self, callee: Value, positional: Vec<Value>, keywords: Kwargs) -> Result<Value> {
        match callee {
            Value::Function(function) => builtins::call(function, positional, keywords, self),
            other => Err(EvalError::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    /// Dispatches `object.name(...)`. Mutating methods update the receiver in
    /// place when it is an assignable location.
    fn call_method(&mut self, object: &Expr, name: &str, positional: Vec<Value>, keywords: Kwargs) -> Result<Value> {
        if builtins::is_mutating(name) {
            if let Some(place) = self.try_place(object)? {
                let receiver = self.place_mut(&place)?;
                return builtins::call_mutating_method(receiver, name, positional, keywords);
            }
        }

        let receiver = self.evaluate(object)?;
        if let Value::Dict(map) = &receiver {
            if let Some(Value::Function(function)) = map.get(name) {
                let function = *function;
                return builtins::call(function, positional, keywords, self);
            }
        }

        if builtins::is_mutating(name) {
            let mut temporary = receiver;
            return builtins::call_mutating_method(&mut temporary, name, positional, keywords);
        }
        builtins::call_method(&receiver, name, positional, keywords)
    }

    fn comprehend(
        &mut self,
        clauses: &[Comprehension],
        emit: &mut dyn FnMut(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.frames.push(IndexMap::new());
        let result = self.comprehend_clauses(clauses, emit);
        self.frames.pop();
        result
    }

    fn comprehend_clauses(
        &mut self,
        clauses: &[Comprehension],
        emit: &mut dyn FnMut(&mut Self) -> Result<()>,
    ) -> Result<()> {
        let (clause, rest) = match clauses.split_first() {
            Some(split) => split,
            None => return emit(self),
        };

        for item in self.evaluate(&clause.iter)?.iterate()? {
            self.bind_local(&clause.target, item)?;

            let mut keep = true;
            for condition in &clause.conditions {
                if !self.evaluate(condition)?.is_truthy() {
                    keep = false;
                    break;
                }
            }
            if keep {
                self.comprehend_clauses(rest, emit)?;
            }
        }
        Ok(())
    }

    /// Binds a comprehension variable in the innermost frame.
    fn bind_local(&mut self, target: &Target, value: Value) -> Result<()> {
        match target {
            Target::Name(name) => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.insert(name.clone(), value);
                }
                Ok(())
            }
            Target::Unpack(targets) => {
                let items = value.iterate()?;
                if items.len() != targets.len() {
                    return Err(EvalError::value(format!(
                        "cannot unpack {} values into {} targets",
                        items.len(),
                        targets.len()
                    )));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.bind_local(target, item)?;
                }
                Ok(())
            }
            other => self.assign(other, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::error::ErrorKind;
    use crate::expression::parser::parse_expression;

    fn eval(source: &str) -> Result<Value> {
        let mut scope = Scope::new();
        scope.evaluate(&parse_expression(source)?)
    }

    fn run(source: &str) -> Scope<'static> {
        let mut scope = Scope::new();
        let program = Program::parse(source).unwrap();
        scope.execute(&program).unwrap();
        scope
    }

    struct FakeHost;

    impl Host for FakeHost {
        fn changed(&self, step_id: &str) -> bool {
            step_id == "build"
        }

        fn skipped(&self, step_id: &str) -> bool {
            step_id == "deploy"
        }

        fn run(&self, command: &str) -> Value {
            let mut map = Dict::new();
            map.insert("succeeded".into(), Value::Bool(true));
            map.insert("output".into(), Value::from(format!("ran {}", command)));
            Value::Dict(map)
        }
    }

    #[test]
    fn test_arithmetic_and_logic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Value::Int(7));
        assert_eq!(eval("not 0 and 'yes' or 'no'").unwrap(), Value::from("yes"));
        assert_eq!(eval("1 < 2 < 3").unwrap(), Value::Bool(true));
        assert_eq!(eval("3 > 2 > 2").unwrap(), Value::Bool(false));
        assert_eq!(eval("'a' if None else 'b'").unwrap(), Value::from("b"));
    }

    #[test]
    fn test_short_circuit_skips_errors() {
        assert_eq!(eval("False and undefined_name").unwrap(), Value::Bool(false));
        assert_eq!(eval("1 or undefined_name").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_unknown_name() {
        let err = eval("nope + 1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Name);
    }

    #[test]
    fn test_comprehensions_do_not_leak_variables() {
        let mut scope = Scope::new();
        let value = scope
            .evaluate(&parse_expression("[x * x for x in range(4) if x % 2 == 0]").unwrap())
            .unwrap();
        assert_eq!(value, Value::List(vec![Value::Int(0), Value::Int(4)]));
        assert!(scope.get("x").is_none());

        let pairs = eval("{k: v for k, v in [['a', 1], ['b', 2]]}").unwrap();
        assert_eq!(pairs.to_string(), "{'a': 1, 'b': 2}");
    }

    #[test]
    fn test_attribute_access_reads_dictionary_keys() {
        let mut scope = Scope::new();
        let mut map = Dict::new();
        map.insert("succeeded".into(), Value::Bool(true));
        scope.set("result", Value::Dict(map));

        let value = scope.evaluate(&parse_expression("result.succeeded").unwrap()).unwrap();
        assert_eq!(value, Value::Bool(true));

        let err = scope.evaluate(&parse_expression("result.missing").unwrap()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Attribute);
    }

    #[test]
    fn test_program_loops_and_branches() {
        let scope = run(
            "total = 0\n\
             for i in range(10):\n\
             \x20   if i == 5:\n\
             \x20       break\n\
             \x20   elif i % 2:\n\
             \x20       continue\n\
             \x20   total += i\n",
        );
        assert_eq!(scope.get("total"), Some(&Value::Int(6)));
        assert_eq!(scope.get("i"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_nested_assignment_and_mutating_methods() {
        let scope = run(
            "data = {'items': []}\n\
             data['items'].append(1)\n\
             data['items'] += [2]\n\
             data.count = len(data['items'])\n\
             a, b = data['items']\n",
        );
        assert_eq!(
            scope.get("data").unwrap().to_string(),
            "{'items': [1, 2], 'count': 2}"
        );
        assert_eq!(scope.get("b"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_errors_carry_the_failing_line() {
        let mut scope = Scope::new();
        let program = Program::parse("x = 1\ny = {}\nz = y['missing']").unwrap();
        let err = scope.execute(&program).unwrap_err();
        assert_eq!(
            err.render(),
            "Error on line 3: z = y['missing']\nKeyError: 'missing'"
        );
    }

    #[test]
    fn test_raise_statement() {
        let mut scope = Scope::new();
        let program = Program::parse("raise 'boom'").unwrap();
        let err = scope.execute(&program).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Raised);
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_break_outside_loop() {
        let mut scope = Scope::new();
        let program = Program::parse("break").unwrap();
        assert!(scope.execute(&program).is_err());
    }

    #[test]
    fn test_host_functions() {
        let host = FakeHost;
        let mut scope = Scope::with_host(&host);

        let expr = parse_expression("changed('build') and not skipped('build')").unwrap();
        assert_eq!(scope.evaluate(&expr).unwrap(), Value::Bool(true));

        let expr = parse_expression("run('ls').output").unwrap();
        assert_eq!(scope.evaluate(&expr).unwrap(), Value::from("ran ls"));
    }

    #[test]
    fn test_core_scope_has_no_host_functions() {
        assert_eq!(eval("changed('x')").unwrap_err().kind, ErrorKind::Name);
    }

    #[test]
    fn test_print_is_captured() {
        let scope = run("print('hello', 42)\neprint('warn')");
        assert_eq!(scope.stdout(), "hello 42\n");
        assert_eq!(scope.stderr(), "warn\n");
    }
}
