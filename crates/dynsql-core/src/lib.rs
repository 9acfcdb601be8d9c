//! Template evaluation and parameter binding.
//!
//! Registration compiles a template into a [`SqlSource`] through
//! [`ScriptBuilder`]. Each call then asks the source for a [`BoundSql`]: the
//! template is evaluated against a fresh [`DynamicContext`], and the
//! remaining `#{}` tokens are turned into `?` placeholders with one
//! [`ParameterMapping`] each.

pub mod bindings;
pub mod config;
pub mod context;
pub mod evaluator;
pub mod interpreter;
pub mod mapping;
pub mod script;
pub mod source;
pub mod type_handler;

pub use bindings::{Bindings, DATABASE_ID_KEY, PARAMETER_KEY};
pub use config::{Configuration, Settings};
pub use context::{DynamicContext, SqlBuildContext};
pub use evaluator::{ExpressionEvaluator, FnEvaluator, IterItem, PathEvaluator};
pub use interpreter::Interpreter;
pub use mapping::{ParameterMapping, ParameterMappingBuilder};
pub use script::{ScriptBuilder, TemplateElement, TemplateNode};
pub use source::{
    BoundSql, DynamicSqlSource, RawSqlSource, SqlSource, SqlSourceBuilder, StaticSqlSource,
};
pub use type_handler::{TypeHandlerRef, TypeHandlerRegistry};
