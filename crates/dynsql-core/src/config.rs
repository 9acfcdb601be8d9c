//! Engine settings and the configuration collaborator.
//!
//! [`Settings`] is plain data loaded from TOML. [`Configuration`] owns the
//! settings plus everything derived from them at startup: the compiled
//! injection filter, the type-handler registry, type aliases and declared
//! bean property types.

use std::collections::BTreeMap;

use dynsql_ast::InjectionFilter;
use dynsql_error::{DynSqlError, Result};
use dynsql_parser::TokenScanner;
use dynsql_types::{JdbcType, PropertyTokenizer, Value, ValueType};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bindings::Bindings;
use crate::type_handler::{TypeHandlerRef, TypeHandlerRegistry};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Exposed to templates as `_databaseId`.
    pub database_id: Option<String>,
    /// Collapse whitespace runs in the final SQL.
    pub shrink_whitespaces_in_sql: bool,
    /// Default `nullable` for `foreach` / `in` elements that omit it.
    pub nullable_on_for_each: bool,
    /// Allow-list regex every `${}` substitution must fully match.
    pub injection_filter: Option<String>,
    /// Load-time `${key}` substitutions for template text.
    pub variables: BTreeMap<String, String>,
    /// Enables `${key:default}`.
    pub enable_variable_defaults: bool,
    pub variable_default_separator: String,
    /// Jdbc type bound for null values whose mapping declares none.
    pub jdbc_type_for_null: JdbcType,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_id: None,
            shrink_whitespaces_in_sql: false,
            nullable_on_for_each: false,
            injection_filter: None,
            variables: BTreeMap::new(),
            enable_variable_defaults: false,
            variable_default_separator: ":".to_owned(),
            jdbc_type_for_null: JdbcType::Other,
        }
    }
}

impl Settings {
    /// Parse settings from a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DynSqlError::Config`] if the document is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| DynSqlError::config(err.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Configuration {
    settings: Settings,
    injection_filter: Option<InjectionFilter>,
    type_handlers: TypeHandlerRegistry,
    type_aliases: BTreeMap<String, ValueType>,
    beans: BTreeMap<String, BTreeMap<String, ValueType>>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            injection_filter: None,
            type_handlers: TypeHandlerRegistry::default(),
            type_aliases: default_type_aliases(),
            beans: BTreeMap::new(),
        }
    }
}

fn default_type_aliases() -> BTreeMap<String, ValueType> {
    [
        ("object", ValueType::Object),
        ("boolean", ValueType::Bool),
        ("bool", ValueType::Bool),
        ("int", ValueType::Int),
        ("integer", ValueType::Int),
        ("long", ValueType::Int),
        ("short", ValueType::Int),
        ("double", ValueType::Float),
        ("float", ValueType::Float),
        ("decimal", ValueType::Float),
        ("string", ValueType::Text),
        ("text", ValueType::Text),
        ("bytes", ValueType::Bytes),
        ("byte[]", ValueType::Bytes),
        ("list", ValueType::List),
        ("arraylist", ValueType::List),
        ("map", ValueType::Map),
        ("hashmap", ValueType::Map),
        ("resultset", ValueType::ResultSet),
    ]
    .into_iter()
    .map(|(alias, ty)| (alias.to_owned(), ty))
    .collect()
}

impl Configuration {
    /// Build a configuration, compiling the injection filter if one is set.
    ///
    /// # Errors
    ///
    /// Returns [`DynSqlError::Config`] if the injection filter is not a valid
    /// regular expression.
    pub fn new(settings: Settings) -> Result<Self> {
        let injection_filter = settings
            .injection_filter
            .as_deref()
            .map(InjectionFilter::new)
            .transpose()?;
        debug!(
            database_id = settings.database_id.as_deref().unwrap_or(""),
            injection_filter = injection_filter.is_some(),
            variables = settings.variables.len(),
            "configuration built"
        );
        Ok(Self {
            settings,
            injection_filter,
            ..Self::default()
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::new(Settings::from_toml_str(text)?)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn database_id(&self) -> Option<&str> {
        self.settings.database_id.as_deref()
    }

    pub fn injection_filter(&self) -> Option<&InjectionFilter> {
        self.injection_filter.as_ref()
    }

    pub fn type_handlers(&self) -> &TypeHandlerRegistry {
        &self.type_handlers
    }

    pub fn type_handlers_mut(&mut self) -> &mut TypeHandlerRegistry {
        &mut self.type_handlers
    }

    pub fn has_type_handler(&self, value_type: &ValueType) -> bool {
        self.type_handlers.has_type_handler(value_type)
    }

    pub fn type_handler(
        &self,
        value_type: &ValueType,
        jdbc_type: Option<JdbcType>,
    ) -> Option<TypeHandlerRef> {
        self.type_handlers.type_handler(value_type, jdbc_type)
    }

    /// Resolve a handler named by a `typeHandler=` option.
    ///
    /// # Errors
    ///
    /// Returns [`DynSqlError::TypeResolution`] if no handler of that name is
    /// registered.
    pub fn resolve_type_handler(&self, java_type: &ValueType, alias: &str) -> Result<TypeHandlerRef> {
        self.type_handlers.resolve(alias).ok_or_else(|| {
            DynSqlError::type_resolution(
                format!("Could not resolve type handler '{alias}' for javaType ({java_type})"),
                alias,
            )
        })
    }

    pub fn register_type_alias(&mut self, alias: &str, value_type: ValueType) {
        self.type_aliases.insert(alias.to_ascii_lowercase(), value_type);
    }

    /// Resolve a `javaType=` alias. Registered bean names resolve to
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns [`DynSqlError::TypeResolution`] for an unknown alias.
    pub fn resolve_type_alias(&self, alias: &str) -> Result<ValueType> {
        let alias = alias.trim();
        if let Some(ty) = self.type_aliases.get(&alias.to_ascii_lowercase()) {
            return Ok(ty.clone());
        }
        if self.beans.contains_key(alias) {
            return Ok(ValueType::bean(alias));
        }
        Err(DynSqlError::type_resolution(
            format!("Could not resolve type alias '{alias}'"),
            alias,
        ))
    }

    pub fn resolve_jdbc_type(&self, name: &str) -> Result<JdbcType> {
        name.parse()
    }

    /// Declare the property types of a bean type.
    pub fn register_bean_type<I, K>(&mut self, bean: &str, properties: I)
    where
        I: IntoIterator<Item = (K, ValueType)>,
        K: Into<String>,
    {
        let entry = self.beans.entry(bean.to_owned()).or_default();
        entry.extend(properties.into_iter().map(|(k, v)| (k.into(), v)));
    }

    /// Declared type of the property at `path` on `bean_type`.
    ///
    /// Indexed segments yield `Object`: element types are not declared.
    /// `None` when some segment has no declared property.
    pub fn property_type(&self, bean_type: &ValueType, path: &str) -> Option<ValueType> {
        let mut current = bean_type.clone();
        let mut segment = PropertyTokenizer::new(path);
        loop {
            let ValueType::Bean(name) = &current else {
                return None;
            };
            let declared = self.beans.get(name)?.get(segment.name())?;
            if segment.index().is_some() {
                return Some(ValueType::Object);
            }
            current = declared.clone();
            if segment.next().is_none() {
                return Some(current);
            }
        }
    }

    /// Replace `${key}` (and `${key<sep>default}` when enabled) with
    /// configured variables. Unknown keys are left untouched.
    pub fn substitute_variables(&self, text: &str) -> String {
        let settings = &self.settings;
        TokenScanner::dollar().replace(text, |content| {
            let (key, default) = if settings.enable_variable_defaults
                && !settings.variable_default_separator.is_empty()
            {
                match content.split_once(settings.variable_default_separator.as_str()) {
                    Some((key, default)) => (key, Some(default)),
                    None => (content, None),
                }
            } else {
                (content, None)
            };
            settings
                .variables
                .get(key)
                .map(String::as_str)
                .or(default)
                .map_or_else(|| format!("${{{content}}}"), str::to_owned)
        })
    }

    /// Fresh bindings for one invocation against `parameter`.
    pub fn new_bindings(&self, parameter: Value) -> Bindings {
        let has_handler = self.has_type_handler(&parameter.value_type());
        Bindings::new(parameter, self.database_id(), has_handler)
    }
}
