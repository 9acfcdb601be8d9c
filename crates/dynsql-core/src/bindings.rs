//! Per-invocation binding map.
//!
//! Holds everything a template can reference by name: `_parameter`,
//! `_databaseId`, loop variables and `bind` declarations. Names that are not
//! bound locally fall back to properties of the parameter object.

use std::collections::BTreeMap;

use dynsql_types::{PropertyTokenizer, Value};

/// Key of the parameter object.
pub const PARAMETER_KEY: &str = "_parameter";
/// Key of the configured database id.
pub const DATABASE_ID_KEY: &str = "_databaseId";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    local: BTreeMap<String, Value>,
    /// Unknown names resolve to the parameter itself (simple parameters).
    fallback_to_parameter: bool,
}

impl Bindings {
    /// Seed `_parameter` and `_databaseId`.
    ///
    /// `parameter_has_handler` is true when the parameter's type has a type
    /// handler; such a parameter answers for every name it has no property
    /// for, which lets `#{anything}` address a scalar parameter.
    pub fn new(parameter: Value, database_id: Option<&str>, parameter_has_handler: bool) -> Self {
        let fallback_to_parameter = parameter_has_handler && !parameter.is_null();
        let mut local = BTreeMap::new();
        local.insert(PARAMETER_KEY.to_owned(), parameter);
        local.insert(
            DATABASE_ID_KEY.to_owned(),
            database_id.map_or(Value::Null, Value::from),
        );
        Self {
            local,
            fallback_to_parameter,
        }
    }

    pub fn parameter(&self) -> &Value {
        self.local.get(PARAMETER_KEY).unwrap_or(&Value::Null)
    }

    pub fn database_id(&self) -> Option<&str> {
        self.local.get(DATABASE_ID_KEY).and_then(Value::as_str)
    }

    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        self.local.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.local.remove(name)
    }

    /// Only locally bound names count; parameter properties do not.
    pub fn contains_key(&self, name: &str) -> bool {
        self.local.contains_key(name)
    }

    /// Look up a single name, falling back to the parameter object.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.local.get(name) {
            return Some(value);
        }
        let parameter = self.parameter();
        if parameter.is_null() {
            return None;
        }
        if self.fallback_to_parameter && !parameter.has_property(name) {
            return Some(parameter);
        }
        parameter.property(name)
    }

    /// Look up a property path whose root is resolved through [`get`](Self::get).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let root = PropertyTokenizer::new(path);
        let mut value = self.get(root.name())?;
        if let Some(index) = root.index() {
            value = value.index(index)?;
        }
        match root.children() {
            Some(rest) => value.get_path(rest),
            None => Some(value),
        }
    }

    /// Value at `path` when its root name is bound locally.
    ///
    /// `Some(Value::Null)` means the root is bound but the path leads nowhere.
    pub fn local_path(&self, path: &str) -> Option<Value> {
        let root = PropertyTokenizer::new(path);
        self.local.get(root.name())?;
        Some(self.get_path(path).cloned().unwrap_or_default())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.local.iter()
    }

    pub fn into_map(self) -> BTreeMap<String, Value> {
        self.local
    }
}
