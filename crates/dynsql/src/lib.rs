//! Dynamic SQL templating and parameter binding.
//!
//! Statement templates are compiled once into a [`SqlSource`]. Each call
//! evaluates the template against a parameter object and yields a
//! [`BoundSql`]: placeholder-only SQL plus one [`ParameterMapping`] per `?`.
//!
//! ```
//! use std::sync::Arc;
//!
//! use dynsql::{Configuration, PathEvaluator, ScriptBuilder, TemplateElement, Value, ValueType};
//!
//! let config = Configuration::default();
//! let builder = ScriptBuilder::new(&config, Arc::new(PathEvaluator));
//! let template = TemplateElement::new("select")
//!     .text("SELECT * FROM BLOG")
//!     .child(
//!         TemplateElement::new("where")
//!             .child(TemplateElement::new("if").attr("test", "id").text("AND ID = #{id}")),
//!     );
//! let source = builder.parse_script(&template, &ValueType::Map).unwrap();
//!
//! let parameter = Value::map([("id", Value::Int(7))]);
//! let bound = source.bound_sql(&config, parameter).unwrap();
//! assert_eq!(bound.sql(), "SELECT * FROM BLOG WHERE  ID = ?");
//! assert_eq!(bound.parameter_values(&config), vec![Value::Int(7)]);
//! ```

pub use dynsql_ast::{
    BindNode, ChooseNode, ForEachNode, IfNode, InjectionFilter, SqlNode, TextNode, TrimNode,
};
pub use dynsql_core::{
    Bindings, BoundSql, Configuration, DynamicContext, DynamicSqlSource, ExpressionEvaluator,
    FnEvaluator, Interpreter, IterItem, ParameterMapping, PathEvaluator, RawSqlSource,
    ScriptBuilder, Settings, SqlBuildContext, SqlSource, SqlSourceBuilder, StaticSqlSource,
    TemplateElement, TemplateNode, TypeHandlerRef, TypeHandlerRegistry,
};
pub use dynsql_error::{DynSqlError, Result};
pub use dynsql_parser::{ParameterExpression, TokenScanner};
pub use dynsql_types::{Bean, JdbcType, ParameterMode, Value, ValueType};
