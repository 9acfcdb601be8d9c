//! Error type for the dynsql templating engine.
//!
//! Two surfaces exist. Template errors are raised while a statement is
//! registered (malformed `#{}`/`${}` grammar, unknown elements) and are fatal
//! for that statement. Invocation errors are raised while a template is
//! evaluated against a parameter object (evaluator failures, injection
//! rejection) and are fatal for that call only. Type-resolution errors belong
//! to whichever phase runs the final placeholder pass: registration for
//! statements without dynamic nodes, each call otherwise. Nothing is retried.

use thiserror::Error;

/// Primary error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DynSqlError {
    /// Malformed template: bad token grammar, unknown element, duplicate
    /// `otherwise`, missing attribute.
    #[error("{message} (in `{fragment}`)")]
    TemplateSyntax { message: String, fragment: String },

    /// Malformed `#{...}` parameter expression.
    #[error(
        "Parsing error in {{{content}}} in position {position}. \
         Check syntax #{{property|(expression), var1=value1, var2=value2, ...}}"
    )]
    ParameterParse { content: String, position: usize },

    /// The expression evaluator failed, or a required collection was null.
    #[error("error evaluating expression '{expression}': {message}")]
    Evaluation { expression: String, message: String },

    /// No type handler could be resolved, or a CURSOR mapping has no result map.
    #[error("{message} (in mapping #{{{fragment}}})")]
    TypeResolution { message: String, fragment: String },

    /// A `${}` substitution failed the injection allow-list.
    #[error("Invalid input '{value}'. Please conform to regex {pattern}")]
    InjectionRejected { value: String, pattern: String },

    /// Invalid engine settings.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DynSqlError {
    pub fn syntax(message: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::TemplateSyntax {
            message: message.into(),
            fragment: fragment.into(),
        }
    }

    pub fn parameter_parse(content: impl Into<String>, position: usize) -> Self {
        Self::ParameterParse {
            content: content.into(),
            position,
        }
    }

    pub fn evaluation(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Evaluation {
            expression: expression.into(),
            message: message.into(),
        }
    }

    pub fn type_resolution(message: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self::TypeResolution {
            message: message.into(),
            fragment: fragment.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Raised while a statement is registered. [`Self::TypeResolution`] is
    /// excluded: see [`Self::is_type_resolution_error`].
    pub const fn is_template_error(&self) -> bool {
        matches!(
            self,
            Self::TemplateSyntax { .. } | Self::ParameterParse { .. } | Self::Config(_)
        )
    }

    /// Raised while a registered statement is evaluated for one call.
    /// [`Self::TypeResolution`] is excluded: see
    /// [`Self::is_type_resolution_error`].
    pub const fn is_invocation_error(&self) -> bool {
        matches!(
            self,
            Self::Evaluation { .. } | Self::InjectionRejected { .. }
        )
    }

    /// Raised by the final placeholder pass, which runs once at registration
    /// for statements without dynamic nodes and on every call otherwise.
    pub const fn is_type_resolution_error(&self) -> bool {
        matches!(self, Self::TypeResolution { .. })
    }
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DynSqlError>;
