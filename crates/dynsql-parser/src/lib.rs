//! Template text scanning.
//!
//! [`TokenScanner`] finds `${...}` / `#{...}` tokens (with backslash escapes)
//! and hands their content to a callback. [`ParameterExpression`] parses the
//! mini-grammar found inside `#{...}`.

pub mod param_expr;
pub mod token;

pub use param_expr::ParameterExpression;
pub use token::{scan, TokenScanner};
