//! Core type definitions for dynsql.
//!
//! [`Value`] is the dynamic runtime value that parameter objects and bindings
//! are made of. [`ValueType`] is its static counterpart, used when selecting
//! type handlers for bind parameters.

pub mod jdbc;
pub mod property;
pub mod value;
pub mod value_type;

pub use jdbc::{JdbcType, ParameterMode};
pub use property::PropertyTokenizer;
pub use value::{Bean, Value};
pub use value_type::ValueType;
