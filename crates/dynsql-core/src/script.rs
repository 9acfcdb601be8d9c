//! Template source to node tree.
//!
//! Templates arrive as a pre-parsed element tree ([`TemplateElement`]);
//! reading markup is the caller's concern. [`ScriptBuilder`] maps each element
//! onto a [`SqlNode`] and picks a raw or dynamic [`SqlSource`] for the root.

use std::collections::BTreeMap;
use std::sync::Arc;

use dynsql_ast::{ForEachNode, IfNode, SqlNode, TrimNode};
use dynsql_error::{DynSqlError, Result};
use dynsql_parser::TokenScanner;
use dynsql_types::ValueType;
use tracing::debug;

use crate::config::Configuration;
use crate::evaluator::ExpressionEvaluator;
use crate::source::{DynamicSqlSource, RawSqlSource, SqlSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNode {
    Text(String),
    Element(TemplateElement),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateElement {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<TemplateNode>,
}

impl TemplateElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(TemplateNode::Text(text.into()));
        self
    }

    pub fn child(mut self, element: Self) -> Self {
        self.children.push(TemplateNode::Element(element));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn required(&self, name: &str) -> Result<&str> {
        self.attribute(name).ok_or_else(|| {
            DynSqlError::syntax(
                format!("Missing required attribute '{name}' in <{}>", self.name),
                self.name.as_str(),
            )
        })
    }

    fn flag(&self, name: &str, default: bool) -> Result<bool> {
        match self.attribute(name) {
            None => Ok(default),
            Some(raw) if raw.eq_ignore_ascii_case("true") => Ok(true),
            Some(raw) if raw.eq_ignore_ascii_case("false") => Ok(false),
            Some(raw) => Err(DynSqlError::syntax(
                format!("Invalid boolean value '{raw}' for attribute '{name}' in <{}>", self.name),
                raw,
            )),
        }
    }
}

impl From<TemplateElement> for TemplateNode {
    fn from(element: TemplateElement) -> Self {
        Self::Element(element)
    }
}

pub struct ScriptBuilder<'c> {
    config: &'c Configuration,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl<'c> ScriptBuilder<'c> {
    pub fn new(config: &'c Configuration, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        Self { config, evaluator }
    }

    /// Compile a statement whose body is the children of `root`.
    ///
    /// # Errors
    ///
    /// Unknown elements, malformed attributes, and, for non-dynamic
    /// templates, anything the placeholder pass rejects.
    pub fn parse_script(
        &self,
        root: &TemplateElement,
        parameter_type: &ValueType,
    ) -> Result<Box<dyn SqlSource>> {
        let node = self.parse_dynamic_tags(root)?;
        self.finish(node, parameter_type)
    }

    /// Compile a plain-text statement.
    pub fn parse_text(&self, text: &str, parameter_type: &ValueType) -> Result<Box<dyn SqlSource>> {
        let node = self.text_node(text);
        self.finish(node, parameter_type)
    }

    fn finish(&self, node: SqlNode, parameter_type: &ValueType) -> Result<Box<dyn SqlSource>> {
        if node.is_dynamic() {
            debug!(root = node.kind(), "compiled dynamic sql source");
            Ok(Box::new(DynamicSqlSource::new(node, Arc::clone(&self.evaluator))))
        } else {
            Ok(Box::new(RawSqlSource::new(self.config, &node, parameter_type)?))
        }
    }

    /// Children of `element` as one mixed node.
    pub fn parse_dynamic_tags(&self, element: &TemplateElement) -> Result<SqlNode> {
        let mut contents = Vec::with_capacity(element.children.len());
        for child in &element.children {
            match child {
                TemplateNode::Text(text) => contents.push(self.text_node(text)),
                TemplateNode::Element(el) => contents.push(self.element_node(el)?),
            }
        }
        Ok(SqlNode::mixed(contents))
    }

    fn text_node(&self, text: &str) -> SqlNode {
        let text = self.config.substitute_variables(text);
        if TokenScanner::dollar().contains_token(&text) {
            SqlNode::dynamic_text(text, self.config.injection_filter().cloned())
        } else {
            SqlNode::text(text)
        }
    }

    fn element_node(&self, el: &TemplateElement) -> Result<SqlNode> {
        let node = match el.name.as_str() {
            "trim" => SqlNode::from(TrimNode::new(
                self.parse_dynamic_tags(el)?,
                el.attribute("prefix"),
                el.attribute("prefixOverrides"),
                el.attribute("suffix"),
                el.attribute("suffixOverrides"),
            )),
            "where" => SqlNode::where_clause(self.parse_dynamic_tags(el)?),
            "set" => SqlNode::set_clause(self.parse_dynamic_tags(el)?),
            "foreach" => {
                let mut node = ForEachNode::new(self.parse_dynamic_tags(el)?, el.required("collection")?)
                    .nullable(el.flag("nullable", self.config.settings().nullable_on_for_each)?);
                node.item = el.attribute("item").map(str::to_owned);
                node.index = el.attribute("index").map(str::to_owned);
                node.open = el.attribute("open").map(str::to_owned);
                node.close = el.attribute("close").map(str::to_owned);
                node.separator = el.attribute("separator").map(str::to_owned);
                SqlNode::from(node)
            }
            "in" => {
                let mut node =
                    ForEachNode::in_list(el.required("collection")?, el.attribute("item").unwrap_or("item"))
                        .nullable(el.flag("nullable", self.config.settings().nullable_on_for_each)?)
                        .with_inline_literals(el.flag("inline", false)?);
                node.column = el.attribute("column").map(str::to_owned);
                SqlNode::from(node)
            }
            "if" | "when" => SqlNode::If(self.if_node(el)?),
            "choose" => self.choose_node(el)?,
            "otherwise" => self.parse_dynamic_tags(el)?,
            "bind" => SqlNode::bind(el.required("name")?, el.required("value")?),
            other => {
                return Err(DynSqlError::syntax(
                    format!("Unknown element <{other}> in SQL statement."),
                    other,
                ));
            }
        };
        Ok(node)
    }

    fn if_node(&self, el: &TemplateElement) -> Result<IfNode> {
        Ok(IfNode::new(el.required("test")?, self.parse_dynamic_tags(el)?))
    }

    /// `when` children become branches; at most one `otherwise`. Text and
    /// other elements directly inside `choose` are ignored.
    fn choose_node(&self, el: &TemplateElement) -> Result<SqlNode> {
        let mut whens = Vec::new();
        let mut otherwise = None;
        for child in &el.children {
            let TemplateNode::Element(child) = child else {
                continue;
            };
            match child.name.as_str() {
                "when" | "if" => whens.push(self.if_node(child)?),
                "otherwise" => {
                    if otherwise.is_some() {
                        return Err(DynSqlError::syntax(
                            "Too many default (otherwise) elements in choose statement.",
                            "choose",
                        ));
                    }
                    otherwise = Some(self.parse_dynamic_tags(child)?);
                }
                _ => {}
            }
        }
        Ok(SqlNode::choose(whens, otherwise))
    }
}
