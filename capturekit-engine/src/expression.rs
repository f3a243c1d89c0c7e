//! Sandboxed expression evaluation
//!
//! Configuration strings may embed small call chains such as
//! `date.now('HH:mm')` or `Array.of('a', 'b').join(' ')`. They are evaluated
//! by an [`ExpressionEvaluator`]; nothing in a configuration file can run
//! arbitrary code.
//!
//! Grammar of the built-in evaluator:
//!
//! ```text
//! chain   := call ( "." call )*
//! call    := ident ( "." ident )* "(" [ literal ( "," literal )* ] ")"
//! literal := 'text' | "text" | number | true | false
//! ```
//!
//! Only the last two segments of a call path are significant, so
//! `quickAddApi.date.now()` and `date.now()` are the same call.

use crate::{
    dates::{format_moment, Clock},
    ExpressionError,
};
use chrono::{DateTime, FixedOffset, TimeDelta};
use std::sync::Arc;

/// Capability that turns an expression into text
pub trait ExpressionEvaluator: Send + Sync {
    /// `Ok(None)` when the expression is not one this evaluator knows
    fn evaluate(&self, expression: &str) -> Result<Option<String>, ExpressionError>;
}

/// Evaluator that recognises nothing; every expression stays as written
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExpressions;

impl ExpressionEvaluator for NoExpressions {
    fn evaluate(&self, _expression: &str) -> Result<Option<String>, ExpressionError> {
        Ok(None)
    }
}

const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";
const ISO_FORMAT: &str = "YYYY-MM-DDTHH:mm:ssZ";
/// Upper bound for any text produced along a chain
pub const MAX_TEXT_LEN: usize = 64 * 1024;

/// Date, list and string helpers
pub struct BuiltinEvaluator {
    clock: Arc<dyn Clock>,
}

impl BuiltinEvaluator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl std::fmt::Debug for BuiltinEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinEvaluator").finish_non_exhaustive()
    }
}

impl ExpressionEvaluator for BuiltinEvaluator {
    fn evaluate(&self, expression: &str) -> Result<Option<String>, ExpressionError> {
        let chain = Parser::new(expression).parse_chain()?;
        let Some(mut value) = self.call_function(&chain.head)? else {
            return Ok(None);
        };
        value = bounded(value, &chain.head)?;
        for method in &chain.methods {
            value = bounded(self.call_method(value, method)?, method)?;
        }
        Ok(Some(value.into_text()))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Text(String),
    Number(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
struct Call {
    path: Vec<String>,
    args: Vec<Literal>,
}

impl Call {
    fn name(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }

    fn owner(&self) -> Option<&str> {
        self.path
            .len()
            .checked_sub(2)
            .and_then(|i| self.path.get(i))
            .map(String::as_str)
    }

    fn text_arg(&self, index: usize) -> Option<String> {
        self.args
            .get(index)
            .map(|arg| Value::from(arg.clone()).into_text())
    }

    fn int_arg(&self, index: usize) -> Result<Option<i64>, ExpressionError> {
        match self.args.get(index) {
            None => Ok(None),
            Some(Literal::Number(n)) if n.fract() == 0.0 && n.abs() < 1e12 => Ok(Some(*n as i64)),
            Some(Literal::Text(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| {
                ExpressionError::invalid_argument(self.name(), format!("'{s}' is not a whole number"))
            }),
            Some(other) => Err(ExpressionError::invalid_argument(
                self.name(),
                format!("{other:?} is not a whole number"),
            )),
        }
    }

    fn all_text(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| Value::from(a.clone()).into_text())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Chain {
    head: Call,
    methods: Vec<Call>,
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Text(String),
    Number(f64),
    Bool(bool),
    List(Vec<Value>),
    Date(DateTime<FixedOffset>),
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        match literal {
            Literal::Text(s) => Value::Text(s),
            Literal::Number(n) => Value::Number(n),
            Literal::Bool(b) => Value::Bool(b),
        }
    }
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::List(_) => "list",
            Value::Date(_) => "date",
        }
    }

    fn into_text(self) -> String {
        match self {
            Value::Text(s) => s,
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", n as i64),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::List(items) => items
                .into_iter()
                .map(Value::into_text)
                .collect::<Vec<_>>()
                .join(","),
            Value::Date(d) => format_moment(&d, DEFAULT_DATE_FORMAT),
        }
    }
}

impl BuiltinEvaluator {
    fn call_function(&self, call: &Call) -> Result<Option<Value>, ExpressionError> {
        let value = match (call.owner(), call.name()) {
            (Some("date"), "now") => {
                let format = call.text_arg(0);
                let offset = call.int_arg(1)?.unwrap_or(0);
                let at = shift(self.clock.now(), offset, "days", call)?;
                Value::Text(format_moment(&at, &non_empty(format, DEFAULT_DATE_FORMAT)))
            }
            (Some("date"), "tomorrow") => {
                let at = shift(self.clock.now(), 1, "days", call)?;
                Value::Text(format_moment(&at, &non_empty(call.text_arg(0), DEFAULT_DATE_FORMAT)))
            }
            (Some("date"), "yesterday") => {
                let at = shift(self.clock.now(), -1, "days", call)?;
                Value::Text(format_moment(&at, &non_empty(call.text_arg(0), DEFAULT_DATE_FORMAT)))
            }
            (Some("date"), "today") | (None, "moment") => Value::Date(self.clock.now()),
            (Some("Array"), "of") | (None, "list") => {
                Value::List(call.args.iter().cloned().map(Value::from).collect())
            }
            (None, "concat") => Value::Text(call.all_text().concat()),
            (None, "join") => {
                let mut parts = call.all_text();
                if parts.is_empty() {
                    return Err(ExpressionError::invalid_argument("join", "missing separator"));
                }
                let separator = parts.remove(0);
                Value::Text(parts.join(&separator))
            }
            (None, "upper") => Value::Text(single_text(call)?.to_uppercase()),
            (None, "lower") => Value::Text(single_text(call)?.to_lowercase()),
            (None, "trim") => Value::Text(single_text(call)?.trim().to_string()),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    fn call_method(&self, target: Value, method: &Call) -> Result<Value, ExpressionError> {
        let name = method.name();
        let unknown = |target: &Value| ExpressionError::UnknownMethod {
            method: name.to_string(),
            target: target.kind().to_string(),
        };

        match target {
            Value::Date(at) => match name {
                "format" => Ok(Value::Text(format_moment(
                    &at,
                    &non_empty(method.text_arg(0), ISO_FORMAT),
                ))),
                "add" | "subtract" => {
                    let amount = method.int_arg(0)?.unwrap_or(0);
                    let amount = if name == "subtract" { -amount } else { amount };
                    let unit = method.text_arg(1).unwrap_or_else(|| "days".to_string());
                    Ok(Value::Date(shift(at, amount, &unit, method)?))
                }
                _ => Err(unknown(&Value::Date(at))),
            },
            Value::List(items) => match name {
                "join" => {
                    let separator = method.text_arg(0).unwrap_or_else(|| ",".to_string());
                    let parts: Vec<String> = items.into_iter().map(Value::into_text).collect();
                    Ok(Value::Text(parts.join(&separator)))
                }
                _ => Err(unknown(&Value::List(items))),
            },
            Value::Text(text) => match name {
                "concat" => Ok(Value::Text(text + &method.all_text().concat())),
                "toUpperCase" => Ok(Value::Text(text.to_uppercase())),
                "toLowerCase" => Ok(Value::Text(text.to_lowercase())),
                "trim" => Ok(Value::Text(text.trim().to_string())),
                "repeat" => {
                    let count = method.int_arg(0)?.unwrap_or(0);
                    let count = usize::try_from(count)
                        .ok()
                        .filter(|c| *c <= 1024)
                        .ok_or_else(|| {
                            ExpressionError::invalid_argument("repeat", "count must be 0..=1024")
                        })?;
                    match text.len().checked_mul(count) {
                        Some(len) if len <= MAX_TEXT_LEN => Ok(Value::Text(text.repeat(count))),
                        _ => Err(too_long(name)),
                    }
                }
                _ => Err(unknown(&Value::Text(text))),
            },
            other => Err(unknown(&other)),
        }
    }
}

fn too_long(function: &str) -> ExpressionError {
    ExpressionError::TooLong {
        function: function.to_string(),
        limit: MAX_TEXT_LEN,
    }
}

/// Reject text values (or list items) past [`MAX_TEXT_LEN`]
fn bounded(value: Value, call: &Call) -> Result<Value, ExpressionError> {
    let len = match &value {
        Value::Text(text) => text.len(),
        Value::List(items) => items
            .iter()
            .map(|item| match item {
                Value::Text(text) => text.len(),
                _ => 0,
            })
            .sum(),
        _ => 0,
    };
    if len > MAX_TEXT_LEN {
        return Err(too_long(call.name()));
    }
    Ok(value)
}

fn non_empty(format: Option<String>, fallback: &str) -> String {
    format
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn single_text(call: &Call) -> Result<String, ExpressionError> {
    call.text_arg(0)
        .ok_or_else(|| ExpressionError::invalid_argument(call.name(), "missing argument"))
}

fn shift(
    at: DateTime<FixedOffset>,
    amount: i64,
    unit: &str,
    call: &Call,
) -> Result<DateTime<FixedOffset>, ExpressionError> {
    let delta = match unit.trim() {
        "d" | "day" | "days" => TimeDelta::try_days(amount),
        "w" | "week" | "weeks" => TimeDelta::try_weeks(amount),
        "h" | "hour" | "hours" => TimeDelta::try_hours(amount),
        "m" | "minute" | "minutes" => TimeDelta::try_minutes(amount),
        other => {
            return Err(ExpressionError::invalid_argument(
                call.name(),
                format!("unsupported unit '{other}'"),
            ))
        }
    };
    delta
        .and_then(|d| at.checked_add_signed(d))
        .ok_or_else(|| ExpressionError::invalid_argument(call.name(), "date out of range"))
}

struct Parser<'a> {
    source: &'a str,
    rest: &'a str,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            rest: source.trim(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ExpressionError {
        ExpressionError::syntax(self.source, message)
    }

    fn parse_chain(&mut self) -> Result<Chain, ExpressionError> {
        let head = self.parse_call()?;
        let mut methods = Vec::new();
        while self.eat('.') {
            methods.push(self.parse_call()?);
        }
        self.skip_whitespace();
        if !self.rest.is_empty() {
            return Err(self.error(format!("unexpected '{}'", self.rest)));
        }
        Ok(Chain { head, methods })
    }

    fn parse_call(&mut self) -> Result<Call, ExpressionError> {
        let mut path = vec![self.parse_ident()?];
        while self.eat('.') {
            path.push(self.parse_ident()?);
        }
        if !self.eat('(') {
            return Err(self.error("expected '('"));
        }
        let mut args = Vec::new();
        self.skip_whitespace();
        if !self.eat(')') {
            loop {
                args.push(self.parse_literal()?);
                self.skip_whitespace();
                if self.eat(')') {
                    break;
                }
                if !self.eat(',') {
                    return Err(self.error("expected ',' or ')'"));
                }
            }
        }
        Ok(Call { path, args })
    }

    fn parse_ident(&mut self) -> Result<String, ExpressionError> {
        let end = self
            .rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(self.rest.len());
        if end == 0 {
            return Err(self.error("expected a name"));
        }
        let (ident, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(ident.to_string())
    }

    fn parse_literal(&mut self) -> Result<Literal, ExpressionError> {
        self.skip_whitespace();
        match self.rest.chars().next() {
            Some(quote @ ('\'' | '"')) => self.parse_string(quote),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '.' => self.parse_number(),
            Some(_) => {
                let word = self.parse_ident()?;
                match word.as_str() {
                    "true" => Ok(Literal::Bool(true)),
                    "false" => Ok(Literal::Bool(false)),
                    _ => Err(self.error(format!("'{word}' is not a literal"))),
                }
            }
            None => Err(self.error("unexpected end")),
        }
    }

    fn parse_string(&mut self, quote: char) -> Result<Literal, ExpressionError> {
        let rest = self.rest;
        let mut out = String::new();
        let mut chars = rest.char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, escaped)) => out.push(escaped),
                    None => break,
                },
                c if c == quote => {
                    self.rest = &rest[i + c.len_utf8()..];
                    return Ok(Literal::Text(out));
                }
                c => out.push(c),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn parse_number(&mut self) -> Result<Literal, ExpressionError> {
        let end = self
            .rest
            .char_indices()
            .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-')))
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (number, rest) = self.rest.split_at(end);
        let parsed = number
            .parse::<f64>()
            .map_err(|_| self.error(format!("'{number}' is not a number")))?;
        self.rest = rest;
        Ok(Literal::Number(parsed))
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        match self.rest.strip_prefix(expected) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }
}
