//! Dynamic runtime values.
//!
//! Parameter objects, binding-context entries and evaluator results are all
//! [`Value`]s. Beans are named records; their declared property types live in
//! the configuration, while the values themselves carry only the type name.

use std::collections::BTreeMap;
use std::fmt;

use crate::property::PropertyTokenizer;
use crate::value_type::ValueType;

/// A named record: the stand-in for a bean-style parameter object.
#[derive(Debug, Clone, PartialEq)]
pub struct Bean {
    type_name: String,
    properties: BTreeMap<String, Value>,
}

impl Bean {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Bean(Bean),
}

impl Value {
    /// Build a map value from key/value pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Self>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Runtime type; `Null` has no type of its own and reports `Object`.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Object,
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Text(_) => ValueType::Text,
            Self::Bytes(_) => ValueType::Bytes,
            Self::List(_) => ValueType::List,
            Self::Map(_) => ValueType::Map,
            Self::Bean(bean) => ValueType::Bean(bean.type_name.clone()),
        }
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Scalars (booleans, numbers, text, bytes).
    pub const fn is_simple(&self) -> bool {
        matches!(
            self,
            Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Text(_) | Self::Bytes(_)
        )
    }

    /// Boolean coercion: booleans pass through, numbers are true iff non-zero,
    /// null is false, anything else is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(f) => *f != 0.0,
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Named property of a map or bean.
    pub fn property(&self, name: &str) -> Option<&Self> {
        match self {
            Self::Map(map) => map.get(name),
            Self::Bean(bean) => bean.get(name),
            _ => None,
        }
    }

    pub fn has_property(&self, name: &str) -> bool {
        match self {
            Self::Map(map) => map.contains_key(name),
            Self::Bean(bean) => bean.contains(name),
            _ => false,
        }
    }

    /// `[index]` access: list positions, or keys of maps and beans.
    pub fn index(&self, index: &str) -> Option<&Self> {
        match self {
            Self::List(items) => index.trim().parse::<usize>().ok().and_then(|i| items.get(i)),
            Self::Map(_) | Self::Bean(_) => self.property(index.trim_matches(|c| c == '\'' || c == '"')),
            _ => None,
        }
    }

    /// Navigate a property path such as `orders[0].lines.sku`.
    ///
    /// A segment with an empty name (`[0].id`) indexes the current value.
    pub fn get_path(&self, path: &str) -> Option<&Self> {
        let mut current = self;
        let mut segment = PropertyTokenizer::new(path);
        loop {
            if !segment.name().is_empty() {
                current = current.property(segment.name())?;
            }
            if let Some(index) = segment.index() {
                current = current.index(index)?;
            }
            match segment.next() {
                Some(next) => segment = next,
                None => return Some(current),
            }
        }
    }

    /// String form used by `${}` substitution; null becomes the empty string.
    pub fn to_sql_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Bytes(bytes) => {
                f.write_str("0x")?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(map) => write_entries(f, map),
            Self::Bean(bean) => {
                f.write_str(&bean.type_name)?;
                write_entries(f, &bean.properties)
            }
        }
    }
}

fn write_entries(f: &mut fmt::Formatter<'_>, map: &BTreeMap<String, Value>) -> fmt::Result {
    f.write_str("{")?;
    for (i, (k, v)) in map.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{k}={v}")?;
    }
    f.write_str("}")
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<Bean> for Value {
    fn from(v: Bean) -> Self {
        Self::Bean(v)
    }
}

impl From<BTreeMap<String, Self>> for Value {
    fn from(v: BTreeMap<String, Self>) -> Self {
        Self::Map(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> FromIterator<T> for Value {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::List(iter.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => items.into_iter().collect(),
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn truthiness_rules() {
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(-3).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(Value::List(vec![]).is_truthy());
    }

    #[test]
    fn json_conversion_and_paths() {
        let v = Value::from(json!({
            "blog": {"id": 7, "tags": ["a", "b"], "author": {"name": "jim"}},
            "ratio": 0.5
        }));
        assert_eq!(v.get_path("blog.id"), Some(&Value::Int(7)));
        assert_eq!(v.get_path("blog.tags[1]"), Some(&Value::from("b")));
        assert_eq!(v.get_path("blog.author.name"), Some(&Value::from("jim")));
        assert_eq!(v.get_path("ratio"), Some(&Value::Float(0.5)));
        assert_eq!(v.get_path("blog.missing"), None);
        assert_eq!(v.get_path("blog.tags[9]"), None);
    }

    #[test]
    fn bean_navigation_and_type() {
        let author = Bean::new("Author").with("username", "jim");
        let post = Bean::new("Post").with("id", 1).with("author", author);
        let v = Value::from(post);
        assert_eq!(v.value_type(), ValueType::bean("Post"));
        assert_eq!(v.get_path("author.username"), Some(&Value::from("jim")));
        assert!(v.has_property("id"));
        assert!(!v.has_property("title"));
    }

    #[test]
    fn sql_string_forms() {
        assert_eq!(Value::Null.to_sql_string(), "");
        assert_eq!(Value::from("O'Hara").to_sql_string(), "O'Hara");
        assert_eq!(Value::Int(3).to_sql_string(), "3");
        assert_eq!(Value::Bool(true).to_sql_string(), "true");
        assert_eq!(
            Value::from_iter([1, 2]).to_sql_string(),
            "[1, 2]"
        );
        assert_eq!(Value::map([("k", 1)]).to_sql_string(), "{k=1}");
    }

    #[test]
    fn null_reports_object_type() {
        assert_eq!(Value::Null.value_type(), ValueType::Object);
        assert!(Value::Int(1).value_type().is_simple());
    }

    proptest! {
        #[test]
        fn json_objects_keep_every_entry_reachable_by_path(
            entries in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..8),
            tags in proptest::collection::vec("[a-z ]{0,8}", 0..5),
        ) {
            let object: serde_json::Map<String, serde_json::Value> = entries
                .iter()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect();
            let value = Value::from(json!({"row": object, "tags": tags}));

            let Some(Value::Map(row)) = value.get_path("row") else {
                panic!("row is not a map: {value:?}");
            };
            prop_assert_eq!(row.len(), entries.len());
            for (key, expected) in &entries {
                prop_assert_eq!(value.get_path(&format!("row.{key}")), Some(&Value::Int(*expected)));
            }
            for (i, tag) in tags.iter().enumerate() {
                prop_assert_eq!(
                    value.get_path(&format!("tags[{i}]")),
                    Some(&Value::from(tag.as_str()))
                );
            }
            prop_assert_eq!(value.get_path(&format!("tags[{}]", tags.len())), None);
        }
    }
}
