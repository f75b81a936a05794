//! Expression Parser
//!
//! Turns source text into the syntax tree defined in [`super::ast`] using the
//! pest grammar in `grammar.pest`. Two entry points exist:
//!
//! - [`parse_expression`] for a single expression (`${...}` markers and
//!   `if` conditions)
//! - [`parse_line`] for one logical line of inline code, used by the program
//!   builder which takes care of indentation

use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::ast::{BinaryOp, CompareOp, Comprehension, Expr, StmtKind, Target, UnaryOp};
use super::error::EvalError;
use super::value::Value;

#[derive(Parser)]
#[grammar = "expression/grammar.pest"]
struct ExpressionParser;

type Result<T> = std::result::Result<T, EvalError>;

/// Header of a compound statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Header {
    If(Expr),
    Elif(Expr),
    Else,
    For(Target, Expr),
}

/// A single logical line of inline code.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParsedLine {
    Simple(Vec<StmtKind>),
    /// A header with any statements written after its colon on the same line.
    Compound(Header, Vec<StmtKind>),
}

/// Parses a complete expression.
pub fn parse_expression(source: &str) -> Result<Expr> {
    let input = ExpressionParser::parse(Rule::expression_input, source)
        .map_err(syntax_error)?
        .next()
        .ok_or_else(|| EvalError::syntax("empty expression"))?;

    build_expr(first_child(input)?)
}

/// Parses one logical line of inline code.
pub(crate) fn parse_line(source: &str) -> Result<ParsedLine> {
    let input = ExpressionParser::parse(Rule::line_input, source)
        .map_err(syntax_error)?
        .next()
        .ok_or_else(|| EvalError::syntax("empty line"))?;
    let line = first_child(input)?;

    match line.as_rule() {
        Rule::simple_stmts => Ok(ParsedLine::Simple(build_simple_stmts(line)?)),
        Rule::if_header | Rule::elif_header | Rule::else_header | Rule::for_header => {
            build_header(line)
        }
        rule => Err(unexpected(rule)),
    }
}

fn syntax_error(err: pest::error::Error<Rule>) -> EvalError {
    let column = match err.line_col {
        LineColLocation::Pos((_, col)) => col,
        LineColLocation::Span((_, col), _) => col,
    };
    EvalError::syntax(format!(
        "invalid syntax at column {}: {}",
        column,
        err.variant.message()
    ))
}

fn unexpected(rule: Rule) -> EvalError {
    EvalError::syntax(format!("unexpected {:?}", rule))
}

/// Keyword tokens and end-of-input carry no information once the rule that
/// contains them has matched.
fn is_marker(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_and
            | Rule::kw_or
            | Rule::kw_not
            | Rule::kw_in
            | Rule::kw_is
            | Rule::kw_if
            | Rule::kw_elif
            | Rule::kw_else
            | Rule::kw_for
            | Rule::kw_pass
            | Rule::kw_break
            | Rule::kw_continue
            | Rule::kw_raise
            | Rule::EOI
    )
}

fn children(pair: Pair<'_, Rule>) -> impl Iterator<Item = Pair<'_, Rule>> {
    pair.into_inner().filter(|p| !is_marker(p.as_rule()))
}

fn first_child(pair: Pair<'_, Rule>) -> Result<Pair<'_, Rule>> {
    let rule = pair.as_rule();
    children(pair).next().ok_or_else(|| unexpected(rule))
}

fn next_pair<'i>(iter: &mut impl Iterator<Item = Pair<'i, Rule>>) -> Result<Pair<'i, Rule>> {
    iter.next()
        .ok_or_else(|| EvalError::syntax("incomplete expression"))
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

fn build_header(pair: Pair<'_, Rule>) -> Result<ParsedLine> {
    let rule = pair.as_rule();
    let mut inner = children(pair);

    let header = match rule {
        Rule::if_header => Header::If(build_expr(next_pair(&mut inner)?)?),
        Rule::elif_header => Header::Elif(build_expr(next_pair(&mut inner)?)?),
        Rule::else_header => Header::Else,
        Rule::for_header => {
            let target = build_targets(next_pair(&mut inner)?)?;
            let iter = build_expr_list(next_pair(&mut inner)?)?;
            Header::For(target, iter)
        }
        other => return Err(unexpected(other)),
    };

    let body = match inner.next() {
        Some(stmts) => build_simple_stmts(stmts)?,
        None => Vec::new(),
    };

    Ok(ParsedLine::Compound(header, body))
}

fn build_simple_stmts(pair: Pair<'_, Rule>) -> Result<Vec<StmtKind>> {
    children(pair).map(build_simple_stmt).collect()
}

fn build_simple_stmt(pair: Pair<'_, Rule>) -> Result<StmtKind> {
    match pair.as_rule() {
        Rule::pass_stmt => Ok(StmtKind::Pass),
        Rule::break_stmt => Ok(StmtKind::Break),
        Rule::continue_stmt => Ok(StmtKind::Continue),
        Rule::raise_stmt => Ok(StmtKind::Raise(build_expr(first_child(pair)?)?)),
        Rule::assign_stmt => {
            let mut inner = children(pair);
            let target = build_targets(next_pair(&mut inner)?)?;
            let value = build_expr_list(next_pair(&mut inner)?)?;
            Ok(StmtKind::Assign { target, value })
        }
        Rule::aug_assign_stmt => {
            let mut inner = children(pair);
            let target = build_target(next_pair(&mut inner)?)?;
            let op = match next_pair(&mut inner)?.as_str() {
                "+=" => BinaryOp::Add,
                "-=" => BinaryOp::Sub,
                "*=" => BinaryOp::Mul,
                "/=" => BinaryOp::Div,
                "//=" => BinaryOp::FloorDiv,
                "%=" => BinaryOp::Mod,
                other => return Err(EvalError::syntax(format!("unknown operator {}", other))),
            };
            let value = build_expr(next_pair(&mut inner)?)?;
            Ok(StmtKind::AugAssign { target, op, value })
        }
        Rule::expr_stmt => Ok(StmtKind::Expr(build_expr_list(first_child(pair)?)?)),
        rule => Err(unexpected(rule)),
    }
}

/// A comma-separated expression list is a tuple unless it holds exactly one
/// expression without a trailing comma.
fn build_expr_list(pair: Pair<'_, Rule>) -> Result<Expr> {
    let mut items = Vec::new();
    let mut trailing_comma = false;
    for child in children(pair) {
        match child.as_rule() {
            Rule::trailing_comma => trailing_comma = true,
            _ => items.push(build_expr(child)?),
        }
    }

    if items.len() == 1 && !trailing_comma {
        Ok(items.remove(0))
    } else {
        Ok(Expr::List(items))
    }
}

fn build_targets(pair: Pair<'_, Rule>) -> Result<Target> {
    let mut targets = Vec::new();
    let mut trailing_comma = false;
    for child in children(pair) {
        match child.as_rule() {
            Rule::trailing_comma => trailing_comma = true,
            _ => targets.push(build_target(child)?),
        }
    }

    if targets.len() == 1 && !trailing_comma {
        Ok(targets.remove(0))
    } else {
        Ok(Target::Unpack(targets))
    }
}

fn build_target(pair: Pair<'_, Rule>) -> Result<Target> {
    expr_to_target(build_expr(first_child(pair)?)?)
}

fn expr_to_target(expr: Expr) -> Result<Target> {
    match expr {
        Expr::Name(name) => Ok(Target::Name(name)),
        Expr::Index { object, index } => Ok(Target::Index {
            object: *object,
            index: *index,
        }),
        Expr::Attribute { object, name } => Ok(Target::Attribute {
            object: *object,
            name,
        }),
        Expr::List(items) => Ok(Target::Unpack(
            items
                .into_iter()
                .map(expr_to_target)
                .collect::<Result<Vec<_>>>()?,
        )),
        Expr::Call { .. } => Err(EvalError::syntax("cannot assign to function call")),
        Expr::Literal(_) => Err(EvalError::syntax("cannot assign to literal")),
        _ => Err(EvalError::syntax("cannot assign to expression")),
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

fn build_expr(pair: Pair<'_, Rule>) -> Result<Expr> {
    match pair.as_rule() {
        Rule::expression => {
            let mut inner = children(pair);
            let first = build_expr(next_pair(&mut inner)?)?;
            match inner.next() {
                None => Ok(first),
                Some(condition) => {
                    let condition = build_expr(condition)?;
                    let otherwise = build_expr(next_pair(&mut inner)?)?;
                    Ok(Expr::Conditional {
                        condition: Box::new(condition),
                        then: Box::new(first),
                        otherwise: Box::new(otherwise),
                    })
                }
            }
        }
        Rule::disjunction => fold_boolean(pair, Expr::Or),
        Rule::conjunction => fold_boolean(pair, Expr::And),
        Rule::inversion => {
            let inner = first_child(pair)?;
            match inner.as_rule() {
                Rule::inversion => Ok(Expr::Not(Box::new(build_expr(inner)?))),
                _ => build_expr(inner),
            }
        }
        Rule::comparison => build_comparison(pair),
        Rule::sum | Rule::term => build_arithmetic(pair),
        Rule::factor => {
            let mut inner = pair.into_inner();
            let first = next_pair(&mut inner)?;
            match first.as_rule() {
                Rule::unary_op => {
                    let op = if first.as_str() == "-" {
                        UnaryOp::Neg
                    } else {
                        UnaryOp::Pos
                    };
                    let operand = build_expr(next_pair(&mut inner)?)?;
                    Ok(Expr::Unary {
                        op,
                        operand: Box::new(operand),
                    })
                }
                _ => build_expr(first),
            }
        }
        Rule::power => {
            let mut inner = pair.into_inner();
            let base = build_expr(next_pair(&mut inner)?)?;
            match inner.next() {
                None => Ok(base),
                Some(exponent) => Ok(Expr::Binary {
                    op: BinaryOp::Pow,
                    left: Box::new(base),
                    right: Box::new(build_expr(exponent)?),
                }),
            }
        }
        Rule::postfix => {
            let mut inner = pair.into_inner();
            let mut expr = build_atom(next_pair(&mut inner)?)?;
            for trailer in inner {
                expr = build_trailer(expr, trailer)?;
            }
            Ok(expr)
        }
        _ => build_atom(pair),
    }
}

fn fold_boolean(pair: Pair<'_, Rule>, combine: fn(Box<Expr>, Box<Expr>) -> Expr) -> Result<Expr> {
    let mut inner = children(pair);
    let mut expr = build_expr(next_pair(&mut inner)?)?;
    for operand in inner {
        expr = combine(Box::new(expr), Box::new(build_expr(operand)?));
    }
    Ok(expr)
}

fn build_comparison(pair: Pair<'_, Rule>) -> Result<Expr> {
    let mut inner = pair.into_inner();
    let first = build_expr(next_pair(&mut inner)?)?;

    let mut rest = Vec::new();
    while let Some(op) = inner.next() {
        let op = build_compare_op(op)?;
        let right = build_expr(next_pair(&mut inner)?)?;
        rest.push((op, right));
    }

    if rest.is_empty() {
        Ok(first)
    } else {
        Ok(Expr::Compare {
            first: Box::new(first),
            rest,
        })
    }
}

fn build_compare_op(pair: Pair<'_, Rule>) -> Result<CompareOp> {
    let text = pair.as_str();
    if let Some(inner) = pair.into_inner().next() {
        return match inner.as_rule() {
            Rule::not_in => Ok(CompareOp::NotIn),
            Rule::kw_in => Ok(CompareOp::In),
            Rule::is_not => Ok(CompareOp::IsNot),
            Rule::kw_is => Ok(CompareOp::Is),
            rule => Err(unexpected(rule)),
        };
    }

    match text {
        "==" => Ok(CompareOp::Eq),
        "!=" => Ok(CompareOp::NotEq),
        "<" => Ok(CompareOp::Lt),
        "<=" => Ok(CompareOp::LtE),
        ">" => Ok(CompareOp::Gt),
        ">=" => Ok(CompareOp::GtE),
        other => Err(EvalError::syntax(format!("unknown comparison {}", other))),
    }
}

fn build_arithmetic(pair: Pair<'_, Rule>) -> Result<Expr> {
    let mut inner = pair.into_inner();
    let mut expr = build_expr(next_pair(&mut inner)?)?;

    while let Some(op) = inner.next() {
        let op = match op.as_str() {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "//" => BinaryOp::FloorDiv,
            "%" => BinaryOp::Mod,
            other => return Err(EvalError::syntax(format!("unknown operator {}", other))),
        };
        let right = build_expr(next_pair(&mut inner)?)?;
        expr = Expr::Binary {
            op,
            left: Box::new(expr),
            right: Box::new(right),
        };
    }

    Ok(expr)
}

fn build_trailer(object: Expr, pair: Pair<'_, Rule>) -> Result<Expr> {
    match pair.as_rule() {
        Rule::call => {
            let mut args = Vec::new();
            let mut kwargs = Vec::new();
            for arg in pair.into_inner() {
                match arg.as_rule() {
                    Rule::kwarg => {
                        let mut inner = arg.into_inner();
                        let name = next_pair(&mut inner)?.as_str().to_string();
                        let value = build_expr(next_pair(&mut inner)?)?;
                        kwargs.push((name, value));
                    }
                    Rule::generator_arg => args.push(build_comprehension_list(arg)?),
                    _ => {
                        if !kwargs.is_empty() {
                            return Err(EvalError::syntax(
                                "positional argument follows keyword argument",
                            ));
                        }
                        args.push(build_expr(arg)?);
                    }
                }
            }
            Ok(Expr::Call {
                callee: Box::new(object),
                args,
                kwargs,
            })
        }
        Rule::index => {
            let inner = first_child(pair)?;
            match inner.as_rule() {
                Rule::slice => {
                    let mut lower = None;
                    let mut upper = None;
                    for bound in inner.into_inner() {
                        let expr = Box::new(build_expr(first_child(bound.clone())?)?);
                        match bound.as_rule() {
                            Rule::slice_lower => lower = Some(expr),
                            _ => upper = Some(expr),
                        }
                    }
                    Ok(Expr::Slice {
                        object: Box::new(object),
                        lower,
                        upper,
                    })
                }
                _ => Ok(Expr::Index {
                    object: Box::new(object),
                    index: Box::new(build_expr(inner)?),
                }),
            }
        }
        Rule::attribute => Ok(Expr::Attribute {
            object: Box::new(object),
            name: first_child(pair)?.as_str().to_string(),
        }),
        rule => Err(unexpected(rule)),
    }
}

fn build_atom(pair: Pair<'_, Rule>) -> Result<Expr> {
    match pair.as_rule() {
        Rule::none_lit => Ok(Expr::Literal(Value::None)),
        Rule::true_lit => Ok(Expr::Literal(Value::Bool(true))),
        Rule::false_lit => Ok(Expr::Literal(Value::Bool(false))),
        Rule::int => pair
            .as_str()
            .parse::<i64>()
            .map(|i| Expr::Literal(Value::Int(i)))
            .map_err(|_| EvalError::syntax(format!("integer literal too large: {}", pair.as_str()))),
        Rule::float => pair
            .as_str()
            .parse::<f64>()
            .map(|f| Expr::Literal(Value::Float(f)))
            .map_err(|_| EvalError::syntax(format!("invalid float literal: {}", pair.as_str()))),
        Rule::string => {
            let body = first_child(pair)?;
            Ok(Expr::Literal(Value::Str(unescape(body.as_str()))))
        }
        Rule::ident => Ok(Expr::Name(pair.as_str().to_string())),
        Rule::list_lit | Rule::tuple_lit => Ok(Expr::List(
            children(pair).map(build_expr).collect::<Result<Vec<_>>>()?,
        )),
        Rule::list_comp | Rule::paren_gen => build_comprehension_list(pair),
        Rule::dict_lit => {
            let mut entries = Vec::new();
            for entry in children(pair) {
                entries.push(build_dict_entry(entry)?);
            }
            Ok(Expr::Dict(entries))
        }
        Rule::dict_comp => {
            let mut inner = children(pair);
            let (key, value) = build_dict_entry(next_pair(&mut inner)?)?;
            let clauses = inner.map(build_clause).collect::<Result<Vec<_>>>()?;
            Ok(Expr::DictComp {
                key: Box::new(key),
                value: Box::new(value),
                clauses,
            })
        }
        Rule::paren_expr => build_expr(first_child(pair)?),
        Rule::expression
        | Rule::disjunction
        | Rule::conjunction
        | Rule::inversion
        | Rule::comparison
        | Rule::sum
        | Rule::term
        | Rule::factor
        | Rule::power
        | Rule::postfix => build_expr(pair),
        rule => Err(unexpected(rule)),
    }
}

/// Builds `[element for ...]`, `(element for ...)` and generator arguments,
/// which all evaluate to lists.
fn build_comprehension_list(pair: Pair<'_, Rule>) -> Result<Expr> {
    let mut inner = children(pair);
    let element = build_expr(next_pair(&mut inner)?)?;
    let clauses = inner.map(build_clause).collect::<Result<Vec<_>>>()?;
    Ok(Expr::ListComp {
        element: Box::new(element),
        clauses,
    })
}

fn build_dict_entry(pair: Pair<'_, Rule>) -> Result<(Expr, Expr)> {
    let mut inner = children(pair);
    let key = build_expr(next_pair(&mut inner)?)?;
    let value = build_expr(next_pair(&mut inner)?)?;
    Ok((key, value))
}

fn build_clause(pair: Pair<'_, Rule>) -> Result<Comprehension> {
    let mut inner = children(pair);
    let target = build_targets(next_pair(&mut inner)?)?;
    let iter = build_expr(next_pair(&mut inner)?)?;
    let conditions = inner
        .map(|condition| build_expr(first_child(condition)?))
        .collect::<Result<Vec<_>>>()?;
    Ok(Comprehension {
        target,
        iter,
        conditions,
    })
}

/// Resolves backslash escapes in a string literal body.
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some('x') => push_code_point(&mut out, &mut chars, 2, 'x'),
            Some('u') => push_code_point(&mut out, &mut chars, 4, 'u'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

fn push_code_point(out: &mut String, chars: &mut std::str::Chars<'_>, width: usize, marker: char) {
    let digits: String = chars.clone().take(width).collect();
    let decoded = if digits.len() == width {
        u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32)
    } else {
        None
    };

    match decoded {
        Some(c) => {
            out.push(c);
            for _ in 0..width {
                chars.next();
            }
        }
        None => {
            out.push('\\');
            out.push(marker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Expr {
        Expr::Name(n.to_string())
    }

    fn int(i: i64) -> Expr {
        Expr::Literal(Value::Int(i))
    }

    #[test]
    fn test_parse_precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(int(1)),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: Box::new(int(2)),
                    right: Box::new(int(3)),
                }),
            }
        );
    }

    #[test]
    fn test_parse_power_binds_tighter_than_unary() {
        let expr = parse_expression("-2 ** 2").unwrap();
        assert!(matches!(expr, Expr::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn test_parse_keywords_are_not_identifiers() {
        assert_eq!(parse_expression("index").unwrap(), name("index"));
        assert_eq!(parse_expression("None").unwrap(), Expr::Literal(Value::None));
        assert!(parse_expression("in").is_err());
    }

    #[test]
    fn test_parse_chained_comparison() {
        match parse_expression("a < b not in c").unwrap() {
            Expr::Compare { rest, .. } => {
                let ops: Vec<CompareOp> = rest.iter().map(|(op, _)| *op).collect();
                assert_eq!(ops, vec![CompareOp::Lt, CompareOp::NotIn]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_call_with_kwargs_and_trailers() {
        match parse_expression("run('ls').output.split(sep='\\n')").unwrap() {
            Expr::Call { callee, kwargs, .. } => {
                assert_eq!(kwargs.len(), 1);
                assert_eq!(kwargs[0].0, "sep");
                assert!(matches!(*callee, Expr::Attribute { ref name, .. } if name == "split"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_comprehension_and_generator_argument() {
        assert!(matches!(
            parse_expression("[x * 2 for x in items if x]").unwrap(),
            Expr::ListComp { .. }
        ));
        assert!(matches!(
            parse_expression("{k: v for k, v in d.items()}").unwrap(),
            Expr::DictComp { .. }
        ));
        match parse_expression("sum(x for x in range(3))").unwrap() {
            Expr::Call { args, .. } => assert!(matches!(args[0], Expr::ListComp { .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_slices() {
        match parse_expression("s[1:]").unwrap() {
            Expr::Slice { lower, upper, .. } => {
                assert_eq!(lower, Some(Box::new(int(1))));
                assert_eq!(upper, None);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_string_escapes() {
        assert_eq!(
            parse_expression(r#""a\tb\"c""#).unwrap(),
            Expr::Literal(Value::Str("a\tb\"c".into()))
        );
        assert_eq!(
            parse_expression(r"'\x41é'").unwrap(),
            Expr::Literal(Value::Str("Aé".into()))
        );
    }

    #[test]
    fn test_parse_tuple_and_parenthesised_expression() {
        assert_eq!(
            parse_expression("(1, 2)").unwrap(),
            Expr::List(vec![int(1), int(2)])
        );
        assert_eq!(parse_expression("(1)").unwrap(), int(1));
    }

    #[test]
    fn test_parse_line_assignments() {
        match parse_line("outputs['x'] = 1").unwrap() {
            ParsedLine::Simple(stmts) => {
                assert!(matches!(stmts[0], StmtKind::Assign { target: Target::Index { .. }, .. }))
            }
            other => panic!("unexpected {:?}", other),
        }

        match parse_line("a, b = b, a").unwrap() {
            ParsedLine::Simple(stmts) => {
                assert!(matches!(stmts[0], StmtKind::Assign { target: Target::Unpack(_), .. }))
            }
            other => panic!("unexpected {:?}", other),
        }

        match parse_line("total += 1; count -= 1").unwrap() {
            ParsedLine::Simple(stmts) => assert_eq!(stmts.len(), 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_line_equality_is_not_assignment() {
        match parse_line("a == b").unwrap() {
            ParsedLine::Simple(stmts) => assert!(matches!(stmts[0], StmtKind::Expr(_))),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_line_headers() {
        assert!(matches!(
            parse_line("if x > 1:").unwrap(),
            ParsedLine::Compound(Header::If(_), ref body) if body.is_empty()
        ));
        assert!(matches!(
            parse_line("else: pass").unwrap(),
            ParsedLine::Compound(Header::Else, ref body) if body.len() == 1
        ));
        assert!(matches!(
            parse_line("for k, v in d.items():").unwrap(),
            ParsedLine::Compound(Header::For(Target::Unpack(_), _), _)
        ));
    }

    #[test]
    fn test_parse_rejects_invalid_targets() {
        assert!(parse_line("f() = 1").is_err());
        assert!(parse_line("1 = x").is_err());
    }

    #[test]
    fn test_syntax_error_kind() {
        let err = parse_expression("1 +").unwrap_err();
        assert_eq!(err.kind, super::super::error::ErrorKind::Syntax);
    }
}
