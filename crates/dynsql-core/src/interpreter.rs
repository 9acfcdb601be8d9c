//! Template evaluation.
//!
//! [`Interpreter::apply`] walks a [`SqlNode`] tree against a build context.
//! Nodes never change; all per-call state lives in the context and its
//! bindings. Decorator contexts are created on the stack for the duration of
//! one node and dropped before the node returns.

use dynsql_ast::foreach::itemize;
use dynsql_ast::{ForEachNode, SqlNode, TextNode, TrimNode};
use dynsql_error::Result;
use dynsql_parser::TokenScanner;
use dynsql_types::Value;
use tracing::{trace, warn};

use crate::context::{BufferedContext, ItemizedContext, PrefixedContext, SqlBuildContext};
use crate::evaluator::{ExpressionEvaluator, IterItem};

/// Binding seeded for `${}` substitutions against a simple parameter.
const VALUE_KEY: &str = "value";

#[derive(Clone, Copy)]
pub struct Interpreter<'e> {
    evaluator: &'e dyn ExpressionEvaluator,
}

impl<'e> Interpreter<'e> {
    pub fn new(evaluator: &'e dyn ExpressionEvaluator) -> Self {
        Self { evaluator }
    }

    /// Apply `node`, appending its SQL to `ctx`.
    ///
    /// Returns whether the node applied its body (false for an `if` whose test
    /// failed or a `choose` with no matching branch).
    ///
    /// # Errors
    ///
    /// Evaluator failures, null non-nullable collections and rejected `${}`
    /// substitutions.
    pub fn apply(&self, node: &SqlNode, ctx: &mut dyn SqlBuildContext) -> Result<bool> {
        match node {
            SqlNode::StaticText(text) => {
                ctx.append_sql(text);
                Ok(true)
            }
            SqlNode::DynamicText(text) => {
                let sql = self.substitute(text, ctx)?;
                ctx.append_sql(&sql);
                Ok(true)
            }
            SqlNode::If(if_node) => {
                if self.evaluator.evaluate_boolean(&if_node.test, ctx.bindings())? {
                    self.apply(&if_node.body, ctx)?;
                    return Ok(true);
                }
                Ok(false)
            }
            SqlNode::Choose(choose) => {
                for when in &choose.whens {
                    if self.evaluator.evaluate_boolean(&when.test, ctx.bindings())? {
                        self.apply(&when.body, ctx)?;
                        return Ok(true);
                    }
                }
                match &choose.otherwise {
                    Some(otherwise) => {
                        self.apply(otherwise, ctx)?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            SqlNode::Trim(trim) => self.apply_trim(trim, ctx),
            SqlNode::ForEach(foreach) => self.apply_foreach(foreach, ctx),
            SqlNode::Bind(bind) => {
                let value = self.evaluator.get_value(&bind.expression, ctx.bindings())?;
                trace!(name = %bind.name, value = %value, "bind");
                ctx.bind(&bind.name, value);
                Ok(true)
            }
            SqlNode::Mixed(children) => {
                for child in children {
                    self.apply(child, ctx)?;
                }
                Ok(true)
            }
        }
    }

    fn substitute(&self, node: &TextNode, ctx: &mut dyn SqlBuildContext) -> Result<String> {
        TokenScanner::dollar().scan(&node.text, |content: &str| -> Result<String> {
            let parameter = ctx.bindings().parameter();
            if parameter.is_null() {
                ctx.bind(VALUE_KEY, Value::Null);
            } else if parameter.is_simple() {
                let parameter = parameter.clone();
                ctx.bind(VALUE_KEY, parameter);
            }
            let value = self.evaluator.get_value(content, ctx.bindings())?;
            let text = value.to_sql_string();
            if let Some(filter) = &node.injection_filter {
                filter.check(&text).inspect_err(|_| {
                    warn!(
                        expression = content,
                        value = %text,
                        pattern = filter.pattern(),
                        "rejected ${{}} substitution"
                    );
                })?;
            }
            Ok(text)
        })
    }

    fn apply_trim(&self, trim: &TrimNode, ctx: &mut dyn SqlBuildContext) -> Result<bool> {
        let mut buffered = BufferedContext::new(ctx);
        let applied = self.apply(&trim.body, &mut buffered)?;
        let body = buffered.into_sql();
        if let Some(sql) = trim.finish(&body) {
            ctx.append_sql(&sql);
        }
        Ok(applied)
    }

    fn apply_foreach(&self, node: &ForEachNode, ctx: &mut dyn SqlBuildContext) -> Result<bool> {
        let items = self
            .evaluator
            .evaluate_iterable(&node.collection, ctx.bindings(), node.nullable)?;
        let Some(items) = items.filter(|items| !items.is_empty()) else {
            trace!(collection = %node.collection, "foreach over nothing");
            return Ok(true);
        };
        trace!(collection = %node.collection, items = items.len(), "foreach");

        if let Some(column) = &node.column {
            ctx.append_sql(&format!("{column} IN"));
        }

        if node.inline_literals {
            if let Some(sql) = inline_literals(node, &items) {
                ctx.append_sql(&sql);
                return Ok(true);
            }
        }

        if let Some(open) = &node.open {
            ctx.append_sql(open);
        }
        let separator = node.separator.as_deref().unwrap_or("");
        let mut first = true;
        for IterItem { key, value } in items {
            let prefix = if first { "" } else { separator };
            let mut prefixed = PrefixedContext::new(ctx, prefix);
            let unique = prefixed.unique_number();
            if let Some(index) = &node.index {
                prefixed.bind(&itemize(index, unique), key.clone());
                prefixed.bind(index, key);
            }
            if let Some(item) = &node.item {
                prefixed.bind(&itemize(item, unique), value.clone());
                prefixed.bind(item, value);
            }
            {
                let mut itemized = ItemizedContext::new(
                    &mut prefixed,
                    node.item.as_deref(),
                    node.index.as_deref(),
                    unique,
                );
                self.apply(&node.body, &mut itemized)?;
            }
            if first {
                first = !prefixed.is_prefix_applied();
            }
        }
        if let Some(close) = &node.close {
            ctx.append_sql(close);
        }
        if let Some(item) = &node.item {
            ctx.bindings_mut().remove(item);
        }
        if let Some(index) = &node.index {
            ctx.bindings_mut().remove(index);
        }
        Ok(true)
    }
}

/// `(1,2,3)` or `('a','b')` for homogeneous scalar lists; `None` for any
/// other element mix.
fn inline_literals(node: &ForEachNode, items: &[IterItem]) -> Option<String> {
    let numeric = items
        .iter()
        .all(|it| matches!(it.value, Value::Int(_) | Value::Float(_)));
    let textual = items.iter().all(|it| matches!(it.value, Value::Text(_)));
    if !numeric && !textual {
        return None;
    }
    let literals: Vec<String> = items
        .iter()
        .map(|it| match &it.value {
            Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
            other => other.to_string(),
        })
        .collect();
    Some(format!(
        "{}{}{}",
        node.open.as_deref().unwrap_or(""),
        literals.join(node.separator.as_deref().unwrap_or("")),
        node.close.as_deref().unwrap_or("")
    ))
}
