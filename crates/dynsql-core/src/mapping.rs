//! Bind-parameter descriptors.
//!
//! One [`ParameterMapping`] per `?` placeholder in the final SQL, in order.
//! A mapping either carries a resolved type handler or, for CURSOR
//! out-parameters, a result map id.

use dynsql_error::{DynSqlError, Result};
use dynsql_types::{JdbcType, ParameterMode, ValueType};

use crate::config::Configuration;
use crate::type_handler::TypeHandlerRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMapping {
    property: String,
    mode: ParameterMode,
    java_type: ValueType,
    jdbc_type: Option<JdbcType>,
    numeric_scale: Option<u32>,
    type_handler: Option<TypeHandlerRef>,
    result_map_id: Option<String>,
    jdbc_type_name: Option<String>,
}

impl ParameterMapping {
    pub fn builder(property: impl Into<String>, java_type: ValueType) -> ParameterMappingBuilder {
        ParameterMappingBuilder {
            mapping: Self {
                property: property.into(),
                mode: ParameterMode::In,
                java_type,
                jdbc_type: None,
                numeric_scale: None,
                type_handler: None,
                result_map_id: None,
                jdbc_type_name: None,
            },
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn mode(&self) -> ParameterMode {
        self.mode
    }

    pub fn java_type(&self) -> &ValueType {
        &self.java_type
    }

    pub fn jdbc_type(&self) -> Option<JdbcType> {
        self.jdbc_type
    }

    pub fn numeric_scale(&self) -> Option<u32> {
        self.numeric_scale
    }

    pub fn type_handler(&self) -> Option<&TypeHandlerRef> {
        self.type_handler.as_ref()
    }

    pub fn result_map_id(&self) -> Option<&str> {
        self.result_map_id.as_deref()
    }

    pub fn jdbc_type_name(&self) -> Option<&str> {
        self.jdbc_type_name.as_deref()
    }

    fn is_cursor(&self) -> bool {
        self.java_type == ValueType::ResultSet || self.jdbc_type == Some(JdbcType::Cursor)
    }
}

#[derive(Debug, Clone)]
pub struct ParameterMappingBuilder {
    mapping: ParameterMapping,
}

impl ParameterMappingBuilder {
    pub fn mode(mut self, mode: ParameterMode) -> Self {
        self.mapping.mode = mode;
        self
    }

    pub fn java_type(mut self, java_type: ValueType) -> Self {
        self.mapping.java_type = java_type;
        self
    }

    pub fn jdbc_type(mut self, jdbc_type: JdbcType) -> Self {
        self.mapping.jdbc_type = Some(jdbc_type);
        self
    }

    pub fn numeric_scale(mut self, scale: u32) -> Self {
        self.mapping.numeric_scale = Some(scale);
        self
    }

    pub fn type_handler(mut self, handler: TypeHandlerRef) -> Self {
        self.mapping.type_handler = Some(handler);
        self
    }

    pub fn result_map_id(mut self, id: impl Into<String>) -> Self {
        self.mapping.result_map_id = Some(id.into());
        self
    }

    pub fn jdbc_type_name(mut self, name: impl Into<String>) -> Self {
        self.mapping.jdbc_type_name = Some(name.into());
        self
    }

    /// Resolve the type handler and validate the mapping.
    ///
    /// `fragment` is the `#{...}` content the mapping came from; it is quoted
    /// in errors.
    ///
    /// # Errors
    ///
    /// Returns [`DynSqlError::TypeResolution`] when a cursor mapping has no
    /// result map, or when no type handler serves the java/jdbc type pair.
    pub fn build(mut self, config: &Configuration, fragment: &str) -> Result<ParameterMapping> {
        let mapping = &mut self.mapping;
        if mapping.is_cursor() {
            if mapping.result_map_id.is_none() {
                return Err(DynSqlError::type_resolution(
                    format!(
                        "Missing result map in property '{}'.  Parameters of type ResultSet \
                         or jdbcType CURSOR require a result map.",
                        mapping.property
                    ),
                    fragment,
                ));
            }
            return Ok(self.mapping);
        }
        if mapping.type_handler.is_none() {
            mapping.type_handler = config.type_handler(&mapping.java_type, mapping.jdbc_type);
        }
        if mapping.type_handler.is_none() {
            return Err(DynSqlError::type_resolution(
                format!(
                    "Type handler was null on parameter mapping for property '{}'. It was either \
                     not specified and/or could not be found for the javaType ({}) : jdbcType ({}) \
                     combination.",
                    mapping.property,
                    mapping.java_type,
                    mapping.jdbc_type.map_or("null", JdbcType::name),
                ),
                fragment,
            ));
        }
        Ok(self.mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_default_handler() {
        let config = Configuration::default();
        let mapping = ParameterMapping::builder("name", ValueType::Text)
            .jdbc_type(JdbcType::NVarchar)
            .build(&config, "name")
            .unwrap();
        assert_eq!(mapping.type_handler().map(TypeHandlerRef::name), Some("nstring"));
        assert_eq!(mapping.mode(), ParameterMode::In);
    }

    #[test]
    fn test_explicit_handler_wins() {
        let config = Configuration::default();
        let mapping = ParameterMapping::builder("body", ValueType::Text)
            .type_handler(TypeHandlerRef::new("clob"))
            .build(&config, "body,typeHandler=clob")
            .unwrap();
        assert_eq!(mapping.type_handler().map(TypeHandlerRef::name), Some("clob"));
    }

    #[test]
    fn test_cursor_requires_result_map() {
        let config = Configuration::default();
        let err = ParameterMapping::builder("rs", ValueType::ResultSet)
            .jdbc_type(JdbcType::Cursor)
            .mode(ParameterMode::Out)
            .build(&config, "rs,jdbcType=CURSOR,mode=OUT")
            .unwrap_err();
        assert!(err.to_string().contains("Missing result map in property 'rs'"), "{err}");
        assert!(err.to_string().contains("rs,jdbcType=CURSOR,mode=OUT"), "{err}");

        let ok = ParameterMapping::builder("rs", ValueType::Object)
            .jdbc_type(JdbcType::Cursor)
            .result_map_id("blogMap")
            .build(&config, "rs")
            .unwrap();
        assert_eq!(ok.result_map_id(), Some("blogMap"));
        assert!(ok.type_handler().is_none());
    }

    #[test]
    fn test_unresolvable_handler() {
        let config = Configuration::default();
        let err = ParameterMapping::builder("tags", ValueType::List)
            .build(&config, "tags")
            .unwrap_err();
        assert!(err.to_string().contains("Type handler was null"), "{err}");
        assert!(err.to_string().contains("javaType (list) : jdbcType (null)"), "{err}");
    }
}
