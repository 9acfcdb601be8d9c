//! Allow-list applied to `${}` substitutions.

use std::fmt;

use dynsql_error::{DynSqlError, Result};
use regex::Regex;

/// A regex every substituted value must match in full.
#[derive(Clone)]
pub struct InjectionFilter {
    pattern: String,
    anchored: Regex,
}

impl InjectionFilter {
    pub fn new(pattern: &str) -> Result<Self> {
        let anchored = Regex::new(&format!("^(?:{pattern})$")).map_err(|err| {
            DynSqlError::config(format!("invalid injection filter '{pattern}': {err}"))
        })?;
        Ok(Self {
            pattern: pattern.to_owned(),
            anchored,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, value: &str) -> bool {
        self.anchored.is_match(value)
    }

    /// Reject `value` unless it fully matches.
    pub fn check(&self, value: &str) -> Result<()> {
        if self.is_match(value) {
            Ok(())
        } else {
            Err(DynSqlError::InjectionRejected {
                value: value.to_owned(),
                pattern: self.pattern.clone(),
            })
        }
    }
}

impl fmt::Debug for InjectionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InjectionFilter").field(&self.pattern).finish()
    }
}

impl PartialEq for InjectionFilter {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}
