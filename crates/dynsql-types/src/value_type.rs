//! Static type descriptors for bind parameters.

use std::fmt;

/// The type a parameter mapping resolves to.
///
/// `Object` is the catch-all used when nothing more specific is known.
/// `ResultSet` marks CURSOR out-parameters, which carry a result map instead of
/// a type handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueType {
    #[default]
    Object,
    Bool,
    Int,
    Float,
    Text,
    Bytes,
    List,
    Map,
    /// A named record type whose property types are registered with the
    /// configuration.
    Bean(String),
    ResultSet,
}

impl ValueType {
    pub fn bean(name: impl Into<String>) -> Self {
        Self::Bean(name.into())
    }

    /// Scalar types that bind directly to a single placeholder.
    pub const fn is_simple(&self) -> bool {
        matches!(
            self,
            Self::Bool | Self::Int | Self::Float | Self::Text | Self::Bytes
        )
    }

    pub const fn is_map(&self) -> bool {
        matches!(self, Self::Map)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => f.write_str("object"),
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::Float => f.write_str("float"),
            Self::Text => f.write_str("text"),
            Self::Bytes => f.write_str("bytes"),
            Self::List => f.write_str("list"),
            Self::Map => f.write_str("map"),
            Self::Bean(name) => f.write_str(name),
            Self::ResultSet => f.write_str("result_set"),
        }
    }
}
