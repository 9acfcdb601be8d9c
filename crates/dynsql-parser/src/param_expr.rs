//! Parser for the content of a `#{...}` bind-parameter token.
//!
//! ```text
//! inline := (propertyPath | '(' expression ')') [':' jdbcType] (',' name '=' value)*
//! ```
//!
//! Every token is trimmed of ASCII whitespace and control bytes (anything
//! `<= 0x20`). Errors carry the 0-based byte offset of the first offending
//! position.

use std::collections::BTreeMap;

use dynsql_error::{DynSqlError, Result};
use tracing::trace;

/// Structured form of a `#{...}` token.
///
/// Exactly one of `property` / `expression` is set. The `:TYPE` shorthand and
/// a `jdbcType=TYPE` option both populate [`jdbc_type`](Self::jdbc_type).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterExpression {
    property: Option<String>,
    expression: Option<String>,
    jdbc_type: Option<String>,
    options: BTreeMap<String, String>,
}

impl ParameterExpression {
    /// Parse the content between `#{` and `}`.
    pub fn parse(content: &str) -> Result<Self> {
        let mut parser = Parser {
            src: content,
            bytes: content.as_bytes(),
            out: Self::default(),
        };
        parser.run().inspect_err(|err| {
            trace!(content, error = %err, "parameter expression rejected");
        })?;
        Ok(parser.out)
    }

    pub fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    /// Parenthesised expression, without its outer parentheses.
    pub fn expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    pub fn is_expression(&self) -> bool {
        self.expression.is_some()
    }

    pub fn jdbc_type(&self) -> Option<&str> {
        self.jdbc_type.as_deref()
    }

    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn mode(&self) -> Option<&str> {
        self.option("mode")
    }
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    out: ParameterExpression,
}

impl Parser<'_> {
    fn run(&mut self) -> Result<()> {
        let start = self.skip_ws(0);
        match self.bytes.get(start) {
            None => Err(self.error(start)),
            Some(b'(') => self.expression(start + 1),
            Some(_) => self.property(start),
        }
    }

    fn expression(&mut self, left: usize) -> Result<()> {
        let mut depth = 1usize;
        let mut right = left;
        while depth > 0 {
            match self.bytes.get(right) {
                None => return Err(self.error(right)),
                Some(b')') => depth -= 1,
                Some(b'(') => depth += 1,
                Some(_) => {}
            }
            right += 1;
        }
        self.out.expression = Some(self.src[left..right - 1].to_owned());
        self.jdbc_type_opt(right)
    }

    fn property(&mut self, left: usize) -> Result<()> {
        let right = self.skip_until(left, b",:");
        self.out.property = Some(self.trimmed(left, right).to_owned());
        self.jdbc_type_opt(right)
    }

    fn jdbc_type_opt(&mut self, p: usize) -> Result<()> {
        let p = self.skip_ws(p);
        match self.bytes.get(p) {
            None => Ok(()),
            Some(b':') => self.jdbc_type(p + 1),
            Some(b',') => self.options(p + 1),
            Some(_) => Err(self.error(p)),
        }
    }

    fn jdbc_type(&mut self, p: usize) -> Result<()> {
        let left = self.skip_ws(p);
        let right = self.skip_until(left, b",");
        if right <= left {
            return Err(self.error(p));
        }
        self.out.jdbc_type = Some(self.trimmed(left, right).to_owned());
        self.options(right + 1)
    }

    fn options(&mut self, mut p: usize) -> Result<()> {
        loop {
            let left = self.skip_ws(p);
            if left >= self.bytes.len() {
                return Ok(());
            }
            let eq = self.skip_until(left, b"=");
            if eq >= self.bytes.len() {
                return Err(self.error(left));
            }
            let name = self.trimmed(left, eq).to_owned();
            let end = self.skip_until(eq + 1, b",");
            let value = self.trimmed(eq + 1, end).to_owned();
            if name == "jdbcType" {
                self.out.jdbc_type = Some(value.clone());
            }
            self.out.options.insert(name, value);
            p = end + 1;
        }
    }

    fn skip_ws(&self, p: usize) -> usize {
        (p..self.bytes.len())
            .find(|&i| self.bytes[i] > 0x20)
            .unwrap_or(self.bytes.len())
    }

    fn skip_until(&self, p: usize, stops: &[u8]) -> usize {
        (p..self.bytes.len())
            .find(|&i| stops.contains(&self.bytes[i]))
            .unwrap_or(self.bytes.len())
    }

    fn trimmed(&self, mut start: usize, end: usize) -> &str {
        let mut end = end.min(self.bytes.len());
        while start < end && self.bytes[start] <= 0x20 {
            start += 1;
        }
        while end > start && self.bytes[end - 1] <= 0x20 {
            end -= 1;
        }
        if start >= end {
            return "";
        }
        &self.src[start..end]
    }

    fn error(&self, position: usize) -> DynSqlError {
        DynSqlError::parameter_parse(self.src, position)
    }
}
