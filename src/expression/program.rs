//! Inline Programs
//!
//! Splits inline code into logical lines and assembles indented blocks.
//! Each logical line is parsed on its own by [`parse_line`]; this module
//! only deals with line structure:
//!
//! - blank and comment-only lines are ignored
//! - lines are joined while brackets are open or a line ends in `\`
//! - a header ending in `:` opens a block that must be indented deeper
//!
//! # Example
//!
//! ```
//! use runway::expression::{Program, Scope};
//!
//! let program = Program::parse("total = 0\nfor n in [1, 2, 3]:\n    total += n").unwrap();
//! let mut scope = Scope::new();
//! scope.execute(&program).unwrap();
//! assert_eq!(scope.get("total").unwrap().to_string(), "6");
//! ```

use super::ast::{Statement, StmtKind};
use super::error::EvalError;
use super::parser::{parse_line, Header, ParsedLine};

type Result<T> = std::result::Result<T, EvalError>;

/// A parsed block of inline code.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone)]
struct LogicalLine {
    number: usize,
    indent: usize,
    text: String,
}

impl LogicalLine {
    fn statement(&self, kind: StmtKind) -> Statement {
        Statement {
            line: self.number,
            source: self.text.clone(),
            kind,
        }
    }

    fn parse(&self) -> Result<ParsedLine> {
        parse_line(&self.text).map_err(|err| err.at_line(self.number, &self.text))
    }

    fn error(&self, message: &str) -> EvalError {
        EvalError::syntax(message).at_line(self.number, &self.text)
    }
}

impl Program {
    pub fn parse(source: &str) -> Result<Self> {
        let lines = logical_lines(source)?;
        let indent = lines.first().map_or(0, |line| line.indent);

        let mut pos = 0;
        let body = parse_block(&lines, &mut pos, indent)?;
        match lines.get(pos) {
            Some(line) => Err(line.error("unindent does not match any outer indentation level")),
            None => Ok(Self { body }),
        }
    }
}

/// Result of scanning one physical line.
struct LineScan {
    depth_change: i32,
    continued: bool,
}

fn scan_line(line: &str) -> LineScan {
    let mut depth_change = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut last_significant = None;

    for c in line.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            last_significant = Some(c);
            continue;
        }

        match c {
            '#' => break,
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth_change += 1,
            ')' | ']' | '}' => depth_change -= 1,
            _ => {}
        }
        if !c.is_whitespace() {
            last_significant = Some(c);
        }
    }

    LineScan {
        depth_change,
        continued: quote.is_none() && last_significant == Some('\\'),
    }
}

fn logical_lines(source: &str) -> Result<Vec<LogicalLine>> {
    let mut lines = Vec::new();
    let mut pending: Option<LogicalLine> = None;
    let mut depth = 0;

    for (index, raw) in source.lines().enumerate() {
        let mut current = match pending.take() {
            Some(mut line) => {
                line.text.push('\n');
                line.text.push_str(raw.trim_end());
                line
            }
            None => {
                let trimmed = raw.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                LogicalLine {
                    number: index + 1,
                    indent: raw.len() - raw.trim_start().len(),
                    text: trimmed.to_string(),
                }
            }
        };

        let scan = scan_line(raw);
        depth += scan.depth_change;

        if scan.continued {
            current.text.pop();
            pending = Some(current);
        } else if depth > 0 {
            pending = Some(current);
        } else {
            depth = 0;
            lines.push(current);
        }
    }

    match pending {
        Some(line) => Err(line.error("unexpected end of input")),
        None => Ok(lines),
    }
}

fn parse_block(lines: &[LogicalLine], pos: &mut usize, indent: usize) -> Result<Vec<Statement>> {
    let mut body = Vec::new();

    while let Some(line) = lines.get(*pos) {
        if line.indent < indent {
            break;
        }
        if line.indent > indent {
            return Err(line.error("unexpected indent"));
        }
        *pos += 1;

        match line.parse()? {
            ParsedLine::Simple(kinds) => {
                body.extend(kinds.into_iter().map(|kind| line.statement(kind)));
            }
            ParsedLine::Compound(Header::If(condition), inline) => {
                let mut branches = vec![(condition, parse_suite(lines, pos, line, inline)?)];
                let mut otherwise = Vec::new();

                while let Some(next) = lines.get(*pos) {
                    if next.indent != indent {
                        break;
                    }
                    match next.parse()? {
                        ParsedLine::Compound(Header::Elif(condition), inline) => {
                            *pos += 1;
                            branches.push((condition, parse_suite(lines, pos, next, inline)?));
                        }
                        ParsedLine::Compound(Header::Else, inline) => {
                            *pos += 1;
                            otherwise = parse_suite(lines, pos, next, inline)?;
                            break;
                        }
                        _ => break,
                    }
                }

                body.push(line.statement(StmtKind::If {
                    branches,
                    otherwise,
                }));
            }
            ParsedLine::Compound(Header::For(target, iter), inline) => {
                let loop_body = parse_suite(lines, pos, line, inline)?;
                body.push(line.statement(StmtKind::For {
                    target,
                    iter,
                    body: loop_body,
                }));
            }
            ParsedLine::Compound(Header::Elif(_), _) | ParsedLine::Compound(Header::Else, _) => {
                return Err(line.error("'elif' or 'else' without a matching 'if'"));
            }
        }
    }

    Ok(body)
}

/// Body of a compound statement: either the statements after the colon or
/// the indented block that follows.
fn parse_suite(
    lines: &[LogicalLine],
    pos: &mut usize,
    header: &LogicalLine,
    inline: Vec<StmtKind>,
) -> Result<Vec<Statement>> {
    if !inline.is_empty() {
        return Ok(inline.into_iter().map(|kind| header.statement(kind)).collect());
    }

    let block_indent = match lines.get(*pos) {
        Some(next) if next.indent > header.indent => next.indent,
        _ => return Err(header.error("expected an indented block")),
    };

    let body = parse_block(lines, pos, block_indent)?;
    match lines.get(*pos) {
        Some(next) if next.indent > header.indent => {
            Err(next.error("unindent does not match any outer indentation level"))
        }
        _ => Ok(body),
    }
}
