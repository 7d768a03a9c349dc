//! LDAP-style property filters used to select services
//!
//! Supported syntax: `(&...)`, `(|...)`, `(!...)`, `(attr=value)`,
//! `(attr=*)`, `(attr=pre*mid*post)`, `(attr>=value)` and `(attr<=value)`.
//! Attribute names match case-insensitively. Values are compared as
//! numbers, booleans or strings depending on the property's type, and a
//! list-valued property matches when any element does.

use bundleworks_core::{FrameworkError, FrameworkResult, Properties};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A parsed filter expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LdapFilter {
    And(Vec<LdapFilter>),
    Or(Vec<LdapFilter>),
    Not(Box<LdapFilter>),
    Present(String),
    Equal(String, String),
    /// Value split at each wildcard; always at least two parts
    Substring(String, Vec<String>),
    GreaterOrEqual(String, String),
    LessOrEqual(String, String),
}

impl LdapFilter {
    /// Parse a filter string
    pub fn parse(input: &str) -> FrameworkResult<Self> {
        let mut parser = Parser {
            input,
            chars: input.chars().collect(),
            pos: 0,
        };
        parser.skip_ws();
        let filter = parser.filter()?;
        parser.skip_ws();
        if parser.pos != parser.chars.len() {
            return Err(parser.error("unexpected trailing characters"));
        }
        Ok(filter)
    }

    /// `(attr=value)` with no wildcard interpretation
    pub fn equal(attr: impl Into<String>, value: impl Into<String>) -> Self {
        LdapFilter::Equal(attr.into(), value.into())
    }

    /// Conjunction, flattening a single operand
    pub fn and(mut filters: Vec<LdapFilter>) -> Self {
        if filters.len() == 1 {
            if let Some(only) = filters.pop() {
                return only;
            }
        }
        LdapFilter::And(filters)
    }

    /// Evaluate the filter against a property map
    pub fn matches(&self, properties: &Properties) -> bool {
        match self {
            LdapFilter::And(filters) => filters.iter().all(|f| f.matches(properties)),
            LdapFilter::Or(filters) => filters.iter().any(|f| f.matches(properties)),
            LdapFilter::Not(filter) => !filter.matches(properties),
            LdapFilter::Present(attr) => lookup(properties, attr).is_some(),
            LdapFilter::Equal(attr, value) => {
                test_property(properties, attr, &Comparison::Equal(value))
            }
            LdapFilter::Substring(attr, parts) => {
                test_property(properties, attr, &Comparison::Substring(parts))
            }
            LdapFilter::GreaterOrEqual(attr, value) => {
                test_property(properties, attr, &Comparison::GreaterOrEqual(value))
            }
            LdapFilter::LessOrEqual(attr, value) => {
                test_property(properties, attr, &Comparison::LessOrEqual(value))
            }
        }
    }
}

impl FromStr for LdapFilter {
    type Err = FrameworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LdapFilter::parse(s)
    }
}

impl fmt::Display for LdapFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LdapFilter::And(filters) => {
                write!(f, "(&")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                write!(f, ")")
            }
            LdapFilter::Or(filters) => {
                write!(f, "(|")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                write!(f, ")")
            }
            LdapFilter::Not(filter) => write!(f, "(!{})", filter),
            LdapFilter::Present(attr) => write!(f, "({}=*)", attr),
            LdapFilter::Equal(attr, value) => write!(f, "({}={})", attr, escape(value)),
            LdapFilter::Substring(attr, parts) => {
                let escaped: Vec<String> = parts.iter().map(|p| escape(p)).collect();
                write!(f, "({}={})", attr, escaped.join("*"))
            }
            LdapFilter::GreaterOrEqual(attr, value) => {
                write!(f, "({}>={})", attr, escape(value))
            }
            LdapFilter::LessOrEqual(attr, value) => write!(f, "({}<={})", attr, escape(value)),
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '(' | ')' | '*' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn lookup<'a>(properties: &'a Properties, attr: &str) -> Option<&'a Value> {
    properties.get(attr).or_else(|| {
        properties
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(attr))
            .map(|(_, value)| value)
    })
}

enum Comparison<'a> {
    Equal(&'a str),
    Substring(&'a [String]),
    GreaterOrEqual(&'a str),
    LessOrEqual(&'a str),
}

fn test_property(properties: &Properties, attr: &str, comparison: &Comparison<'_>) -> bool {
    lookup(properties, attr).is_some_and(|value| test_value(value, comparison))
}

fn test_value(value: &Value, comparison: &Comparison<'_>) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| test_value(item, comparison)),
        Value::String(text) => match comparison {
            Comparison::Equal(expected) => text == expected,
            Comparison::Substring(parts) => substring_matches(text, parts),
            Comparison::GreaterOrEqual(bound) => text.as_str() >= *bound,
            Comparison::LessOrEqual(bound) => text.as_str() <= *bound,
        },
        Value::Number(number) => {
            let (Some(actual), Some(expected)) = (number.as_f64(), numeric_operand(comparison))
            else {
                return false;
            };
            match comparison {
                Comparison::Equal(_) => actual == expected,
                Comparison::GreaterOrEqual(_) => actual >= expected,
                Comparison::LessOrEqual(_) => actual <= expected,
                Comparison::Substring(_) => false,
            }
        }
        Value::Bool(flag) => match comparison {
            Comparison::Equal(expected) => {
                expected.trim().eq_ignore_ascii_case(if *flag { "true" } else { "false" })
            }
            _ => false,
        },
        Value::Null | Value::Object(_) => false,
    }
}

fn numeric_operand(comparison: &Comparison<'_>) -> Option<f64> {
    match comparison {
        Comparison::Equal(v) | Comparison::GreaterOrEqual(v) | Comparison::LessOrEqual(v) => {
            v.trim().parse().ok()
        }
        Comparison::Substring(_) => None,
    }
}

fn substring_matches(text: &str, parts: &[String]) -> bool {
    let Some((first, rest)) = parts.split_first() else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return text == first;
    };
    let Some(mut remaining) = text.strip_prefix(first.as_str()) else {
        return false;
    };
    for part in middle {
        match remaining.find(part.as_str()) {
            Some(index) => remaining = &remaining[index + part.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.as_str())
}

enum Operator {
    Equal,
    GreaterOrEqual,
    LessOrEqual,
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: &str) -> FrameworkError {
        FrameworkError::InvalidFilter(format!("{} at {} in '{}'", reason, self.pos, self.input))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> FrameworkResult<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn filter(&mut self) -> FrameworkResult<LdapFilter> {
        self.expect('(')?;
        self.skip_ws();
        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                LdapFilter::And(self.filter_list()?)
            }
            Some('|') => {
                self.pos += 1;
                LdapFilter::Or(self.filter_list()?)
            }
            Some('!') => {
                self.pos += 1;
                self.skip_ws();
                LdapFilter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(self.error("unexpected end of filter")),
        };
        self.skip_ws();
        self.expect(')')?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> FrameworkResult<Vec<LdapFilter>> {
        let mut filters = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() != Some('(') {
                break;
            }
            filters.push(self.filter()?);
        }
        if filters.is_empty() {
            return Err(self.error("empty filter list"));
        }
        Ok(filters)
    }

    fn item(&mut self) -> FrameworkResult<LdapFilter> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, '=' | '<' | '>' | '~' | '(' | ')') {
                break;
            }
            self.pos += 1;
        }
        let attr: String = self.chars[start..self.pos].iter().collect();
        let attr = attr.trim().to_string();
        if attr.is_empty() {
            return Err(self.error("missing attribute name"));
        }

        let operator = match (self.peek(), self.peek_at(1)) {
            (Some('='), _) => {
                self.pos += 1;
                Operator::Equal
            }
            (Some('>'), Some('=')) => {
                self.pos += 2;
                Operator::GreaterOrEqual
            }
            (Some('<'), Some('=')) => {
                self.pos += 2;
                Operator::LessOrEqual
            }
            _ => return Err(self.error("expected '=', '>=' or '<='")),
        };

        let mut parts = self.value()?;
        match operator {
            Operator::Equal => match parts.len() {
                1 => Ok(LdapFilter::Equal(attr, parts.remove(0))),
                2 if parts.iter().all(String::is_empty) => Ok(LdapFilter::Present(attr)),
                _ => Ok(LdapFilter::Substring(attr, parts)),
            },
            Operator::GreaterOrEqual | Operator::LessOrEqual if parts.len() != 1 => {
                Err(self.error("wildcards are only allowed with '='"))
            }
            Operator::GreaterOrEqual => Ok(LdapFilter::GreaterOrEqual(attr, parts.remove(0))),
            Operator::LessOrEqual => Ok(LdapFilter::LessOrEqual(attr, parts.remove(0))),
        }
    }

    fn value(&mut self) -> FrameworkResult<Vec<String>> {
        let mut parts = Vec::new();
        let mut current = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated value")),
                Some(')') => break,
                Some('(') => return Err(self.error("unescaped '(' in value")),
                Some('\\') => {
                    self.pos += 1;
                    let Some(escaped) = self.peek() else {
                        return Err(self.error("dangling escape"));
                    };
                    current.push(escaped);
                    self.pos += 1;
                }
                Some('*') => {
                    parts.push(std::mem::take(&mut current));
                    self.pos += 1;
                }
                Some(c) => {
                    current.push(c);
                    self.pos += 1;
                }
            }
        }
        parts.push(current);
        Ok(parts)
    }
}
