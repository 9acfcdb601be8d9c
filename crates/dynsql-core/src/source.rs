//! SQL sources and the final placeholder pass.
//!
//! A [`SqlSource`] is built once per statement and shared by every call.
//! [`RawSqlSource`] resolves its SQL and mappings at construction;
//! [`DynamicSqlSource`] re-evaluates its template per call and then runs
//! [`SqlSourceBuilder`] over the result.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use dynsql_ast::SqlNode;
use dynsql_error::{DynSqlError, Result};
use dynsql_parser::{ParameterExpression, TokenScanner};
use dynsql_types::{JdbcType, ParameterMode, PropertyTokenizer, Value, ValueType};
use tracing::{debug, trace};

use crate::bindings::Bindings;
use crate::config::Configuration;
use crate::context::DynamicContext;
use crate::evaluator::{ExpressionEvaluator, PathEvaluator};
use crate::interpreter::Interpreter;
use crate::mapping::ParameterMapping;

const VALID_OPTIONS: &str = "javaType,jdbcType,mode,numericScale,resultMap,typeHandler,jdbcTypeName";

// ---------------------------------------------------------------------------
// BoundSql
// ---------------------------------------------------------------------------

/// Final SQL for one call plus what the execution layer needs to bind it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundSql {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
    parameter: Value,
    additional_parameters: BTreeMap<String, Value>,
}

impl BoundSql {
    pub fn new(sql: String, parameter_mappings: Vec<ParameterMapping>, parameter: Value) -> Self {
        Self {
            sql,
            parameter_mappings,
            parameter,
            additional_parameters: BTreeMap::new(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_mappings(&self) -> &[ParameterMapping] {
        &self.parameter_mappings
    }

    pub fn parameter(&self) -> &Value {
        &self.parameter
    }

    pub fn additional_parameters(&self) -> &BTreeMap<String, Value> {
        &self.additional_parameters
    }

    pub fn set_additional_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.additional_parameters.insert(name.into(), value);
    }

    /// Whether the root name of `path` is an additional parameter.
    pub fn has_additional_parameter(&self, path: &str) -> bool {
        self.additional_parameters
            .contains_key(PropertyTokenizer::new(path).name())
    }

    pub fn additional_parameter(&self, path: &str) -> Option<&Value> {
        let root = PropertyTokenizer::new(path);
        let mut value = self.additional_parameters.get(root.name())?;
        if let Some(index) = root.index() {
            value = value.index(index)?;
        }
        match root.children() {
            Some(rest) => value.get_path(rest),
            None => Some(value),
        }
    }

    /// One value per mapping, in placeholder order.
    ///
    /// Additional parameters win; then a null parameter yields null; then a
    /// parameter whose type has a handler is bound as a whole; otherwise the
    /// mapping's property path is read from the parameter. `OUT` mappings
    /// yield null.
    pub fn parameter_values(&self, config: &Configuration) -> Vec<Value> {
        let whole_parameter =
            !self.parameter.is_null() && config.has_type_handler(&self.parameter.value_type());
        self.parameter_mappings
            .iter()
            .map(|mapping| {
                let property = mapping.property();
                if mapping.mode() == ParameterMode::Out {
                    Value::Null
                } else if self.has_additional_parameter(property) {
                    self.additional_parameter(property).cloned().unwrap_or_default()
                } else if self.parameter.is_null() {
                    Value::Null
                } else if whole_parameter {
                    self.parameter.clone()
                } else {
                    self.parameter.get_path(property).cloned().unwrap_or_default()
                }
            })
            .collect()
    }

    /// Jdbc type to bind each value with, in placeholder order.
    ///
    /// A mapping without a declared jdbc type whose value is null binds as
    /// the configured `jdbc_type_for_null`.
    pub fn jdbc_types(&self, config: &Configuration) -> Vec<Option<JdbcType>> {
        let null_type = config.settings().jdbc_type_for_null;
        self.parameter_mappings
            .iter()
            .zip(self.parameter_values(config))
            .map(|(mapping, value)| {
                mapping
                    .jdbc_type()
                    .or_else(|| value.is_null().then_some(null_type))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Placeholder pass
// ---------------------------------------------------------------------------

/// Replaces every `#{...}` token with `?` and records its mapping.
#[derive(Debug, Clone, Copy)]
pub struct SqlSourceBuilder<'c> {
    config: &'c Configuration,
}

impl<'c> SqlSourceBuilder<'c> {
    pub fn new(config: &'c Configuration) -> Self {
        Self { config }
    }

    /// Build a static source from evaluated SQL.
    ///
    /// `parameter_type` is the type of the parameter object and `bindings`
    /// the bindings left by evaluation; both drive java type resolution.
    ///
    /// # Errors
    ///
    /// Malformed `#{}` content, unknown options, and unresolvable types or
    /// type handlers.
    pub fn parse(
        &self,
        sql: &str,
        parameter_type: &ValueType,
        bindings: &Bindings,
    ) -> Result<StaticSqlSource> {
        let shrunk;
        let sql = if self.config.settings().shrink_whitespaces_in_sql {
            shrunk = shrink_whitespaces(sql);
            shrunk.as_str()
        } else {
            sql
        };
        let mut mappings = Vec::new();
        let sql = TokenScanner::hash().scan(sql, |content: &str| -> Result<String> {
            mappings.push(self.build_mapping(content, parameter_type, bindings)?);
            Ok("?".to_owned())
        })?;
        Ok(StaticSqlSource::new(sql, mappings))
    }

    fn build_mapping(
        &self,
        content: &str,
        parameter_type: &ValueType,
        bindings: &Bindings,
    ) -> Result<ParameterMapping> {
        let config = self.config;
        let expr = ParameterExpression::parse(content)?;
        if expr.is_expression() {
            return Err(DynSqlError::syntax(
                "Expression based parameters are not supported yet",
                content,
            ));
        }
        let property = expr.property();
        let jdbc_type = expr
            .jdbc_type()
            .map(|name| config.resolve_jdbc_type(name))
            .transpose()
            .map_err(|err| in_fragment(err, content))?;

        let property_type = if let Some(local) = property.and_then(|p| bindings.local_path(p)) {
            local.value_type()
        } else if config.has_type_handler(parameter_type) {
            parameter_type.clone()
        } else if jdbc_type == Some(JdbcType::Cursor) {
            ValueType::ResultSet
        } else {
            match property {
                Some(path) if !parameter_type.is_map() => config
                    .property_type(parameter_type, path)
                    .unwrap_or_default(),
                _ => ValueType::Object,
            }
        };

        let mut java_type = property_type.clone();
        let mut handler_alias = None;
        let mut builder = ParameterMapping::builder(property.unwrap_or_default(), property_type);
        for (name, value) in expr.options() {
            match name.as_str() {
                "javaType" => {
                    java_type = config
                        .resolve_type_alias(value)
                        .map_err(|err| in_fragment(err, content))?;
                    builder = builder.java_type(java_type.clone());
                }
                "jdbcType" | "property" => {}
                "mode" => {
                    let mode = value.parse().map_err(|err| in_fragment(err, content))?;
                    builder = builder.mode(mode);
                }
                "numericScale" => {
                    let scale = value.parse().map_err(|_| {
                        DynSqlError::syntax(format!("Invalid numericScale '{value}'"), content)
                    })?;
                    builder = builder.numeric_scale(scale);
                }
                "resultMap" => builder = builder.result_map_id(value.as_str()),
                "typeHandler" => handler_alias = Some(value.as_str()),
                "jdbcTypeName" => builder = builder.jdbc_type_name(value.as_str()),
                "expression" => {
                    return Err(DynSqlError::syntax(
                        "Expression based parameters are not supported yet",
                        content,
                    ));
                }
                other => {
                    return Err(DynSqlError::syntax(
                        format!(
                            "An invalid property '{other}' was found in mapping #{{{content}}}.  \
                             Valid properties are {VALID_OPTIONS}"
                        ),
                        content,
                    ));
                }
            }
        }
        if let Some(jdbc_type) = jdbc_type {
            builder = builder.jdbc_type(jdbc_type);
        }
        if let Some(alias) = handler_alias {
            let handler = config
                .resolve_type_handler(&java_type, alias)
                .map_err(|err| in_fragment(err, content))?;
            builder = builder.type_handler(handler);
        }
        let mapping = builder.build(config, content)?;
        trace!(
            property = mapping.property(),
            java_type = %mapping.java_type(),
            "parameter mapping"
        );
        Ok(mapping)
    }
}

/// Re-point a type-resolution error at the whole `#{}` content.
fn in_fragment(err: DynSqlError, content: &str) -> DynSqlError {
    match err {
        DynSqlError::TypeResolution { message, .. } => DynSqlError::type_resolution(message, content),
        other => other,
    }
}

/// Collapse every whitespace run to one space and trim both ends.
fn shrink_whitespaces(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Produces the bound SQL for one call.
pub trait SqlSource: Send + Sync {
    /// # Errors
    ///
    /// Evaluation and type-resolution failures for this call.
    fn bound_sql(&self, config: &Configuration, parameter: Value) -> Result<BoundSql>;
}

/// Final SQL and mappings, fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticSqlSource {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
}

impl StaticSqlSource {
    pub fn new(sql: String, parameter_mappings: Vec<ParameterMapping>) -> Self {
        Self {
            sql,
            parameter_mappings,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_mappings(&self) -> &[ParameterMapping] {
        &self.parameter_mappings
    }
}

impl SqlSource for StaticSqlSource {
    fn bound_sql(&self, _config: &Configuration, parameter: Value) -> Result<BoundSql> {
        Ok(BoundSql::new(
            self.sql.clone(),
            self.parameter_mappings.clone(),
            parameter,
        ))
    }
}

/// A template without dynamic nodes, compiled once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSqlSource {
    inner: StaticSqlSource,
}

impl RawSqlSource {
    /// # Errors
    ///
    /// Any `#{}` grammar or type-resolution error in the template.
    pub fn new(config: &Configuration, root: &SqlNode, parameter_type: &ValueType) -> Result<Self> {
        let mut ctx = DynamicContext::new(config.new_bindings(Value::Null));
        Interpreter::new(&PathEvaluator).apply(root, &mut ctx)?;
        let (sql, bindings) = ctx.into_parts();
        Self::compile(config, &sql, parameter_type, &bindings)
    }

    pub fn from_sql(config: &Configuration, sql: &str, parameter_type: &ValueType) -> Result<Self> {
        let bindings = config.new_bindings(Value::Null);
        Self::compile(config, sql, parameter_type, &bindings)
    }

    fn compile(
        config: &Configuration,
        sql: &str,
        parameter_type: &ValueType,
        bindings: &Bindings,
    ) -> Result<Self> {
        let inner = SqlSourceBuilder::new(config).parse(sql, parameter_type, bindings)?;
        debug!(
            sql = inner.sql(),
            parameters = inner.parameter_mappings().len(),
            "compiled raw sql source"
        );
        Ok(Self { inner })
    }

    pub fn sql(&self) -> &str {
        self.inner.sql()
    }

    pub fn parameter_mappings(&self) -> &[ParameterMapping] {
        self.inner.parameter_mappings()
    }
}

impl SqlSource for RawSqlSource {
    fn bound_sql(&self, config: &Configuration, parameter: Value) -> Result<BoundSql> {
        self.inner.bound_sql(config, parameter)
    }
}

/// A template re-evaluated on every call.
#[derive(Clone)]
pub struct DynamicSqlSource {
    root: SqlNode,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl DynamicSqlSource {
    pub fn new(root: SqlNode, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        Self { root, evaluator }
    }

    pub fn root(&self) -> &SqlNode {
        &self.root
    }
}

impl fmt::Debug for DynamicSqlSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicSqlSource")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl SqlSource for DynamicSqlSource {
    fn bound_sql(&self, config: &Configuration, parameter: Value) -> Result<BoundSql> {
        let mut ctx = DynamicContext::new(config.new_bindings(parameter));
        Interpreter::new(self.evaluator.as_ref()).apply(&self.root, &mut ctx)?;
        let (sql, bindings) = ctx.into_parts();
        let parameter_type = bindings.parameter().value_type();
        let source = SqlSourceBuilder::new(config).parse(&sql, &parameter_type, &bindings)?;
        let mut bound = source.bound_sql(config, bindings.parameter().clone())?;
        for (name, value) in bindings.into_map() {
            bound.set_additional_parameter(name, value);
        }
        trace!(
            sql = bound.sql(),
            parameters = bound.parameter_mappings().len(),
            "bound dynamic sql"
        );
        Ok(bound)
    }
}
