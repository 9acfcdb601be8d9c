//! Expression evaluation boundary.
//!
//! Templates carry expressions (`if` tests, `foreach` collections, `bind`
//! values, `${}` contents) that are evaluated against the bindings by a
//! pluggable [`ExpressionEvaluator`]. Only [`get_value`] is required; the
//! boolean and iterable coercions are shared.
//!
//! [`get_value`]: ExpressionEvaluator::get_value

use std::fmt;

use dynsql_error::{DynSqlError, Result};
use dynsql_types::Value;

use crate::bindings::Bindings;

/// One element of an iterated collection.
///
/// `key` is the position for lists and the entry key for maps.
#[derive(Debug, Clone, PartialEq)]
pub struct IterItem {
    pub key: Value,
    pub value: Value,
}

pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluate `expression`; unresolvable names yield `Value::Null`.
    fn get_value(&self, expression: &str, bindings: &Bindings) -> Result<Value>;

    /// Booleans pass through, numbers are true iff non-zero, any other
    /// non-null value is true.
    fn evaluate_boolean(&self, expression: &str, bindings: &Bindings) -> Result<bool> {
        Ok(self.get_value(expression, bindings)?.is_truthy())
    }

    /// Evaluate to a sequence of elements.
    ///
    /// `Ok(None)` only for a null result with `nullable` set; a null result
    /// otherwise is an error, as is a value that cannot be iterated.
    fn evaluate_iterable(
        &self,
        expression: &str,
        bindings: &Bindings,
        nullable: bool,
    ) -> Result<Option<Vec<IterItem>>> {
        let value = self.get_value(expression, bindings)?;
        iter_items(expression, value, nullable)
    }
}

/// Iterable view of a value: lists by position, maps by entry, bytes as
/// integers.
pub fn iter_items(expression: &str, value: Value, nullable: bool) -> Result<Option<Vec<IterItem>>> {
    let items = match value {
        Value::Null if nullable => return Ok(None),
        Value::Null => {
            return Err(DynSqlError::evaluation(
                expression,
                format!("The expression '{expression}' evaluated to a null value."),
            ));
        }
        Value::List(values) => values
            .into_iter()
            .enumerate()
            .map(|(i, value)| IterItem {
                key: Value::from(i),
                value,
            })
            .collect(),
        Value::Map(entries) => entries
            .into_iter()
            .map(|(k, value)| IterItem {
                key: Value::Text(k),
                value,
            })
            .collect(),
        Value::Bytes(bytes) => bytes
            .into_iter()
            .enumerate()
            .map(|(i, b)| IterItem {
                key: Value::from(i),
                value: Value::from(u32::from(b)),
            })
            .collect(),
        other => {
            return Err(DynSqlError::evaluation(
                expression,
                format!("Return value ({other}) was not iterable."),
            ));
        }
    };
    Ok(Some(items))
}

// ---------------------------------------------------------------------------
// Path evaluator
// ---------------------------------------------------------------------------

/// Literals (`null`, `true`, `false`, numbers, quoted strings) and property
/// paths. Anything else is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathEvaluator;

impl ExpressionEvaluator for PathEvaluator {
    fn get_value(&self, expression: &str, bindings: &Bindings) -> Result<Value> {
        let expr = expression.trim();
        if let Some(literal) = parse_literal(expr) {
            return Ok(literal);
        }
        if !is_property_path(expr) {
            return Err(DynSqlError::evaluation(
                expression,
                "only literals and property paths are supported",
            ));
        }
        Ok(bindings.get_path(expr).cloned().unwrap_or_default())
    }
}

fn parse_literal(expr: &str) -> Option<Value> {
    match expr {
        "null" => return Some(Value::Null),
        "true" => return Some(Value::Bool(true)),
        "false" => return Some(Value::Bool(false)),
        _ => {}
    }
    for quote in ['\'', '"'] {
        if let Some(inner) = expr
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Some(Value::from(inner));
        }
    }
    if expr.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        if let Ok(n) = expr.parse::<i64>() {
            return Some(Value::Int(n));
        }
        if let Ok(f) = expr.parse::<f64>() {
            return Some(Value::Float(f));
        }
    }
    None
}

fn is_property_path(expr: &str) -> bool {
    !expr.is_empty()
        && !expr.starts_with(|c: char| c.is_ascii_digit() || c == '.' || c == '[')
        && expr
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.' | '[' | ']'))
}

// ---------------------------------------------------------------------------
// Closure evaluator
// ---------------------------------------------------------------------------

/// Adapts a closure into an [`ExpressionEvaluator`].
pub struct FnEvaluator<F> {
    eval: F,
}

impl<F> FnEvaluator<F>
where
    F: Fn(&str, &Bindings) -> Result<Value> + Send + Sync,
{
    pub fn new(eval: F) -> Self {
        Self { eval }
    }
}

impl<F> ExpressionEvaluator for FnEvaluator<F>
where
    F: Fn(&str, &Bindings) -> Result<Value> + Send + Sync,
{
    fn get_value(&self, expression: &str, bindings: &Bindings) -> Result<Value> {
        (self.eval)(expression, bindings)
    }
}

impl<F> fmt::Debug for FnEvaluator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnEvaluator")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn bindings() -> Bindings {
        Bindings::new(
            Value::from(json!({
                "id": 7,
                "name": "Steve",
                "flags": {"on": true, "zero": 0},
                "ids": [1, 2, 3],
                "empty": [],
                "nothing": null
            })),
            None,
            false,
        )
    }

    #[test]
    fn test_literals() {
        let b = bindings();
        assert_eq!(PathEvaluator.get_value("null", &b).unwrap(), Value::Null);
        assert_eq!(PathEvaluator.get_value(" true ", &b).unwrap(), Value::Bool(true));
        assert_eq!(PathEvaluator.get_value("-12", &b).unwrap(), Value::Int(-12));
        assert_eq!(PathEvaluator.get_value("1.5", &b).unwrap(), Value::Float(1.5));
        assert_eq!(PathEvaluator.get_value("'abc'", &b).unwrap(), Value::from("abc"));
    }

    #[test]
    fn test_paths() {
        let b = bindings();
        assert_eq!(PathEvaluator.get_value("id", &b).unwrap(), Value::Int(7));
        assert_eq!(PathEvaluator.get_value("ids[2]", &b).unwrap(), Value::Int(3));
        assert_eq!(PathEvaluator.get_value("flags.on", &b).unwrap(), Value::Bool(true));
        assert_eq!(PathEvaluator.get_value("missing.x", &b).unwrap(), Value::Null);
        assert!(PathEvaluator.get_value("id != null", &b).is_err());
    }

    #[test]
    fn test_boolean_coercion() {
        let b = bindings();
        assert!(PathEvaluator.evaluate_boolean("flags.on", &b).unwrap());
        assert!(!PathEvaluator.evaluate_boolean("flags.zero", &b).unwrap());
        assert!(PathEvaluator.evaluate_boolean("name", &b).unwrap());
        assert!(!PathEvaluator.evaluate_boolean("nothing", &b).unwrap());
    }

    #[test]
    fn test_iterables() {
        let b = bindings();
        let items = PathEvaluator.evaluate_iterable("ids", &b, false).unwrap().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].key, Value::Int(1));
        assert_eq!(items[1].value, Value::Int(2));

        let entries = PathEvaluator.evaluate_iterable("flags", &b, false).unwrap().unwrap();
        assert_eq!(entries[0].key, Value::from("on"));

        assert_eq!(PathEvaluator.evaluate_iterable("empty", &b, false).unwrap(), Some(vec![]));
        assert_eq!(PathEvaluator.evaluate_iterable("nothing", &b, true).unwrap(), None);
    }

    #[test]
    fn test_null_and_scalar_iterables_fail() {
        let b = bindings();
        let err = PathEvaluator.evaluate_iterable("nothing", &b, false).unwrap_err();
        assert!(err.to_string().contains("evaluated to a null value"), "{err}");
        let err = PathEvaluator.evaluate_iterable("name", &b, false).unwrap_err();
        assert!(err.to_string().contains("was not iterable"), "{err}");
    }

    #[test]
    fn test_fn_evaluator() {
        let eval = FnEvaluator::new(|expr: &str, _: &Bindings| Ok(Value::from(expr.len())));
        assert_eq!(eval.get_value("abcd", &bindings()).unwrap(), Value::Int(4));
    }
}
