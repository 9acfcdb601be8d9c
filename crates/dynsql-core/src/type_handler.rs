//! Type-handler selection.
//!
//! Handlers themselves (value conversion at execution time) belong to the
//! execution layer. The registry only records which named handler serves a
//! `(value type, jdbc type)` pair so that mappings can be validated and
//! handed over with a resolved [`TypeHandlerRef`].

use std::collections::BTreeMap;
use std::fmt;

use dynsql_types::{JdbcType, ValueType};

/// Name of a registered type handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeHandlerRef(String);

impl TypeHandlerRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeHandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct TypeHandlerRegistry {
    by_type: BTreeMap<ValueType, BTreeMap<Option<JdbcType>, TypeHandlerRef>>,
    by_name: BTreeMap<String, ValueType>,
}

impl Default for TypeHandlerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ValueType::Object, None, "object");
        registry.register(ValueType::Bool, None, "boolean");
        registry.register(ValueType::Bool, Some(JdbcType::Bit), "boolean");
        registry.register(ValueType::Int, None, "long");
        registry.register(ValueType::Float, None, "double");
        registry.register(ValueType::Text, None, "string");
        registry.register(ValueType::Text, Some(JdbcType::Char), "string");
        registry.register(ValueType::Text, Some(JdbcType::Varchar), "string");
        registry.register(ValueType::Text, Some(JdbcType::Clob), "clob");
        registry.register(ValueType::Text, Some(JdbcType::LongVarchar), "clob");
        registry.register(ValueType::Text, Some(JdbcType::NVarchar), "nstring");
        registry.register(ValueType::Text, Some(JdbcType::NChar), "nstring");
        registry.register(ValueType::Text, Some(JdbcType::NClob), "nclob");
        registry.register(ValueType::Bytes, None, "bytes");
        registry.register(ValueType::Bytes, Some(JdbcType::Blob), "blob");
        registry.register(ValueType::Bytes, Some(JdbcType::LongVarBinary), "blob");
        registry
    }
}

impl TypeHandlerRegistry {
    /// A registry with no handlers at all.
    pub fn empty() -> Self {
        Self {
            by_type: BTreeMap::new(),
            by_name: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, value_type: ValueType, jdbc_type: Option<JdbcType>, name: &str) {
        self.by_type
            .entry(value_type.clone())
            .or_default()
            .insert(jdbc_type, TypeHandlerRef::new(name));
        self.by_name.entry(name.to_owned()).or_insert(value_type);
    }

    pub fn has_type_handler(&self, value_type: &ValueType) -> bool {
        self.by_type.get(value_type).is_some_and(|m| !m.is_empty())
    }

    /// Exact jdbc type first, then the jdbc-agnostic entry, then the only
    /// handler registered for the type.
    pub fn type_handler(
        &self,
        value_type: &ValueType,
        jdbc_type: Option<JdbcType>,
    ) -> Option<TypeHandlerRef> {
        let handlers = self.by_type.get(value_type)?;
        if let Some(jdbc) = jdbc_type {
            if let Some(handler) = handlers.get(&Some(jdbc)) {
                return Some(handler.clone());
            }
        }
        if let Some(handler) = handlers.get(&None) {
            return Some(handler.clone());
        }
        let mut distinct = handlers.values();
        let first = distinct.next()?;
        if distinct.all(|h| h == first) {
            Some(first.clone())
        } else {
            None
        }
    }

    /// Resolve a handler named in a `typeHandler=` option.
    pub fn resolve(&self, alias: &str) -> Option<TypeHandlerRef> {
        self.by_name
            .contains_key(alias)
            .then(|| TypeHandlerRef::new(alias))
    }
}
