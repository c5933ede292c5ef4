//! Parser for the method-call expressions carried by `callMethod` actions.
//!
//! Accepted forms:
//! - `save`, `$refresh` (bare names, optionally `$`-prefixed and dotted)
//! - `save(1, 'two', force=True)` (positional then keyword arguments)
//!
//! Arguments are literals only: quoted strings, numbers, `True`/`False`/
//! `None` (or their JSON spellings), lists, tuples and dicts. Anything that is
//! not a name and contains no parenthesis, such as the setter form
//! `count=5`, is returned verbatim as the name so the dispatcher can decide
//! what to do with it.

use ordered_float::OrderedFloat;
use thiserror::Error;

use crate::value::{Mapping, Value};

const MAX_NESTING: usize = 32;

/// A parsed method invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodCall {
    pub name: String,
    pub args: Vec<Value>,
    pub kwargs: Mapping,
}

impl MethodCall {
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            kwargs: Mapping::new(),
        }
    }

    /// Names starting with `$` are reserved for built-in component methods.
    pub fn is_special(&self) -> bool {
        self.name.starts_with('$')
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message} at byte {offset}")]
pub struct CallParseError {
    pub message: String,
    pub offset: usize,
}

pub fn parse_call_method_name(expr: &str) -> Result<MethodCall, CallParseError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(CallParseError {
            message: "empty method name".into(),
            offset: 0,
        });
    }

    let mut parser = CallParser::new(trimmed);
    let Some(name) = parser.parse_name() else {
        if !trimmed.contains('(') {
            return Ok(MethodCall::bare(trimmed));
        }
        return Err(parser.error("expected method name"));
    };

    parser.skip_ws();
    match parser.peek() {
        None => Ok(MethodCall::bare(name)),
        Some('(') => {
            let (args, kwargs) = parser.parse_arguments()?;
            parser.skip_ws();
            if !parser.is_eof() {
                return Err(parser.error("unexpected input after closing ')'"));
            }
            Ok(MethodCall { name, args, kwargs })
        }
        Some(_) if !trimmed.contains('(') => Ok(MethodCall::bare(trimmed)),
        Some(ch) => Err(parser.error(format!("unexpected character '{ch}'"))),
    }
}

struct CallParser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> CallParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn parse_name(&mut self) -> Option<String> {
        let start = self.pos;
        if self.peek() == Some('$') {
            self.bump();
        }
        loop {
            if self.parse_identifier().is_none() {
                self.pos = start;
                return None;
            }
            if self.peek() == Some('.') {
                self.bump();
                continue;
            }
            break;
        }
        Some(self.input[start..self.pos].to_string())
    }

    fn parse_arguments(&mut self) -> Result<(Vec<Value>, Mapping), CallParseError> {
        self.expect('(')?;
        let mut args = Vec::new();
        let mut kwargs = Mapping::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(')') {
                self.bump();
                break;
            }

            let start = self.pos;
            let keyword = self.parse_identifier().and_then(|ident| {
                self.skip_ws();
                if self.peek() == Some('=') && !self.lookahead("==") {
                    self.bump();
                    Some(ident)
                } else {
                    None
                }
            });

            match keyword {
                Some(keyword) => {
                    let value = self.parse_value()?;
                    if kwargs.insert(keyword.clone(), value).is_some() {
                        self.pos = start;
                        return Err(self.error(format!("keyword argument '{keyword}' repeated")));
                    }
                }
                None => {
                    self.pos = start;
                    if !kwargs.is_empty() {
                        return Err(self.error("positional argument follows keyword argument"));
                    }
                    args.push(self.parse_value()?);
                }
            }

            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(')') => {}
                Some(ch) => {
                    return Err(self.error(format!("expected ',' or ')' in arguments, found '{ch}'")))
                }
                None => return Err(self.error("unterminated argument list")),
            }
        }
        Ok((args, kwargs))
    }

    fn parse_value(&mut self) -> Result<Value, CallParseError> {
        self.skip_ws();
        let Some(ch) = self.peek() else {
            return Err(self.error("expected a value, found end of input"));
        };
        match ch {
            '\'' | '"' => self.parse_string(ch).map(Value::String),
            '[' => self.parse_items('[', ']').map(Value::Sequence),
            '(' => self.parse_items('(', ')').map(Value::Sequence),
            '{' => self.parse_dict(),
            '-' | '+' | '0'..='9' | '.' => self.parse_number(),
            _ => {
                let start = self.pos;
                let Some(ident) = self.parse_identifier() else {
                    return Err(self.error(format!("unexpected character '{ch}'")));
                };
                match ident.as_str() {
                    "True" | "true" => Ok(Value::Bool(true)),
                    "False" | "false" => Ok(Value::Bool(false)),
                    "None" | "null" => Ok(Value::Null),
                    other => {
                        self.pos = start;
                        Err(self.error(format!("unsupported argument '{other}'")))
                    }
                }
            }
        }
    }

    fn parse_items(&mut self, open: char, close: char) -> Result<Vec<Value>, CallParseError> {
        self.enter()?;
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) {
                self.bump();
                break;
            }
            items.push(self.parse_value()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(ch) if ch == close => {}
                Some(ch) => {
                    return Err(self.error(format!("expected ',' or '{close}', found '{ch}'")))
                }
                None => return Err(self.error(format!("unterminated '{open}'"))),
            }
        }
        self.depth -= 1;
        Ok(items)
    }

    fn parse_dict(&mut self) -> Result<Value, CallParseError> {
        self.enter()?;
        self.expect('{')?;
        let mut entries = Mapping::new();
        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                break;
            }
            let key_start = self.pos;
            let key = match self.parse_value()? {
                Value::String(key) => key,
                other => match other.scalar_text() {
                    Some(text) if !matches!(other, Value::Bool(_)) => text,
                    _ => {
                        self.pos = key_start;
                        return Err(self.error("dict keys must be strings or numbers"));
                    }
                },
            };
            self.skip_ws();
            self.expect(':')?;
            let value = self.parse_value()?;
            entries.insert(key, value);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {}
                Some(ch) => return Err(self.error(format!("expected ',' or '}}', found '{ch}'"))),
                None => return Err(self.error("unterminated '{'")),
            }
        }
        self.depth -= 1;
        Ok(Value::Mapping(entries))
    }

    fn parse_string(&mut self, quote: char) -> Result<String, CallParseError> {
        self.expect(quote)?;
        let mut out = String::new();
        while let Some(ch) = self.bump() {
            match ch {
                c if c == quote => return Ok(out),
                '\\' => {
                    let escape = self
                        .bump()
                        .ok_or_else(|| self.error("unterminated escape"))?;
                    let resolved = match escape {
                        '\\' => '\\',
                        '\'' => '\'',
                        '"' => '"',
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        other => return Err(self.error(format!("unsupported escape \\{other}"))),
                    };
                    out.push(resolved);
                }
                other => out.push(other),
            }
        }
        Err(self.error("unterminated string"))
    }

    fn parse_number(&mut self) -> Result<Value, CallParseError> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        let mut is_float = false;
        while let Some(ch) = self.peek() {
            match ch {
                '0'..='9' => {
                    self.bump();
                }
                '.' => {
                    is_float = true;
                    self.bump();
                }
                'e' | 'E' => {
                    is_float = true;
                    self.bump();
                    if matches!(self.peek(), Some('-' | '+')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
        let literal = &self.input[start..self.pos];
        if !is_float {
            if let Ok(int) = literal.parse::<i64>() {
                return Ok(Value::Int(int));
            }
        }
        match literal.parse::<f64>() {
            Ok(float) if float.is_finite() => Ok(Value::Float(OrderedFloat(float))),
            _ => {
                self.pos = start;
                Err(self.error(format!("invalid number '{literal}'")))
            }
        }
    }

    fn parse_identifier(&mut self) -> Option<String> {
        let start = self.pos;
        match self.peek() {
            Some(ch) if is_identifier_start(ch) => {
                self.bump();
            }
            _ => return None,
        }
        while let Some(ch) = self.peek() {
            if !is_identifier_part(ch) {
                break;
            }
            self.bump();
        }
        Some(self.input[start..self.pos].to_string())
    }

    fn enter(&mut self) -> Result<(), CallParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("arguments nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(' ' | '\n' | '\r' | '\t')) {
            self.bump();
        }
    }

    fn lookahead(&self, prefix: &str) -> bool {
        self.input[self.pos..].starts_with(prefix)
    }

    fn expect(&mut self, ch: char) -> Result<(), CallParseError> {
        match self.peek() {
            Some(actual) if actual == ch => {
                self.bump();
                Ok(())
            }
            Some(actual) => Err(self.error(format!("expected '{ch}', found '{actual}'"))),
            None => Err(self.error(format!("expected '{ch}', found end of input"))),
        }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn error(&self, message: impl Into<String>) -> CallParseError {
        CallParseError {
            message: message.into(),
            offset: self.pos,
        }
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphabetic()
}

fn is_identifier_part(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_name_requires_identifier_after_dot() {
        let err = parse_call_method_name("parent.(1)").expect_err("dangling dot");
        assert_eq!(err.message, "expected method name");
    }

    #[test]
    fn nesting_is_bounded() {
        let expr = format!("f({}{})", "[".repeat(40), "]".repeat(40));
        let err = parse_call_method_name(&expr).expect_err("too deep");
        assert_eq!(err.message, "arguments nested too deeply");
    }

    #[test]
    fn exponent_sign_is_part_of_number() {
        let call = parse_call_method_name("f(1e-3, -2)").expect("parse");
        assert_eq!(
            call.args,
            vec![Value::Float(OrderedFloat(0.001)), Value::Int(-2)]
        );
    }
}
