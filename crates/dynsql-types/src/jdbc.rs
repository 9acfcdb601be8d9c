//! JDBC-style column type codes and parameter modes.
//!
//! These are descriptors only: the engine records them on parameter mappings
//! and uses them as a key when selecting type handlers.

use std::fmt;
use std::str::FromStr;

use dynsql_error::DynSqlError;
use serde::{Deserialize, Serialize};

macro_rules! jdbc_types {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Database column type of a bind parameter. Serialized by its
        /// canonical name.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum JdbcType {
            $(#[serde(rename = $name)] $variant),+
        }

        impl JdbcType {
            /// Every known type, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Canonical upper-case name, as written in `#{prop,jdbcType=NAME}`.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }
        }
    };
}

jdbc_types! {
    Array => "ARRAY",
    Bit => "BIT",
    TinyInt => "TINYINT",
    SmallInt => "SMALLINT",
    Integer => "INTEGER",
    BigInt => "BIGINT",
    Float => "FLOAT",
    Real => "REAL",
    Double => "DOUBLE",
    Numeric => "NUMERIC",
    Decimal => "DECIMAL",
    Char => "CHAR",
    Varchar => "VARCHAR",
    LongVarchar => "LONGVARCHAR",
    Date => "DATE",
    Time => "TIME",
    Timestamp => "TIMESTAMP",
    Binary => "BINARY",
    VarBinary => "VARBINARY",
    LongVarBinary => "LONGVARBINARY",
    Null => "NULL",
    Other => "OTHER",
    Blob => "BLOB",
    Clob => "CLOB",
    Boolean => "BOOLEAN",
    Cursor => "CURSOR",
    Undefined => "UNDEFINED",
    NVarchar => "NVARCHAR",
    NChar => "NCHAR",
    NClob => "NCLOB",
    Struct => "STRUCT",
    JavaObject => "JAVA_OBJECT",
    Distinct => "DISTINCT",
    Ref => "REF",
    DataLink => "DATALINK",
    RowId => "ROWID",
    LongNVarchar => "LONGNVARCHAR",
    SqlXml => "SQLXML",
    DateTimeOffset => "DATETIMEOFFSET",
    TimeWithTimezone => "TIME_WITH_TIMEZONE",
    TimestampWithTimezone => "TIMESTAMP_WITH_TIMEZONE",
}

impl fmt::Display for JdbcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JdbcType {
    type Err = DynSqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                DynSqlError::type_resolution(
                    format!("Error resolving JdbcType. Cause: no enum constant named '{wanted}'"),
                    s,
                )
            })
    }
}

/// Direction of a bind parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

impl ParameterMode {
    pub const fn name(self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::InOut => "INOUT",
        }
    }
}

impl fmt::Display for ParameterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParameterMode {
    type Err = DynSqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IN" => Ok(Self::In),
            "OUT" => Ok(Self::Out),
            "INOUT" => Ok(Self::InOut),
            other => Err(DynSqlError::type_resolution(
                format!("Error resolving ParameterMode. Cause: no enum constant named '{other}'"),
                s,
            )),
        }
    }
}
