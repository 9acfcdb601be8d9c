//! SQL template node tree.
//!
//! A statement template compiles once into a [`SqlNode`] tree. The tree is
//! immutable and shared by every invocation; evaluation lives in
//! `dynsql-core`, which walks the tree against a per-call build context.

pub mod filter;
pub mod foreach;
pub mod trim;

pub use filter::InjectionFilter;
pub use foreach::ForEachNode;
pub use trim::TrimNode;

/// One node of a statement template.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlNode {
    /// Literal SQL, emitted as-is.
    StaticText(String),
    /// Text containing `${...}` substitutions.
    DynamicText(TextNode),
    If(IfNode),
    /// First matching `when`, else `otherwise`.
    Choose(ChooseNode),
    /// Trim, `where` and `set`.
    Trim(TrimNode),
    /// ForEach and `in`.
    ForEach(ForEachNode),
    Bind(BindNode),
    Mixed(Vec<SqlNode>),
}

/// `${...}` text with an optional allow-list for substituted values.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    pub injection_filter: Option<InjectionFilter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub test: String,
    pub body: Box<SqlNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChooseNode {
    pub whens: Vec<IfNode>,
    pub otherwise: Option<Box<SqlNode>>,
}

/// Declares `name` as the value of `expression` for the rest of the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindNode {
    pub name: String,
    pub expression: String,
}

impl SqlNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self::StaticText(text.into())
    }

    pub fn dynamic_text(text: impl Into<String>, injection_filter: Option<InjectionFilter>) -> Self {
        Self::DynamicText(TextNode {
            text: text.into(),
            injection_filter,
        })
    }

    pub fn if_node(test: impl Into<String>, body: Self) -> Self {
        Self::If(IfNode::new(test, body))
    }

    pub fn choose(whens: Vec<IfNode>, otherwise: Option<Self>) -> Self {
        Self::Choose(ChooseNode {
            whens,
            otherwise: otherwise.map(Box::new),
        })
    }

    pub fn bind(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::Bind(BindNode {
            name: name.into(),
            expression: expression.into(),
        })
    }

    pub fn mixed(children: Vec<Self>) -> Self {
        Self::Mixed(children)
    }

    /// `where` clause: prefix `WHERE`, leading `AND`/`OR` stripped.
    pub fn where_clause(body: Self) -> Self {
        Self::Trim(TrimNode::where_clause(body))
    }

    /// `set` clause: prefix `SET`, stray commas stripped.
    pub fn set_clause(body: Self) -> Self {
        Self::Trim(TrimNode::set_clause(body))
    }

    /// Whether the node must be re-evaluated per invocation.
    ///
    /// Conditionals, loops, binds and `${}` text always are; static text never
    /// is; trim and mixed nodes inherit from their children.
    pub fn is_dynamic(&self) -> bool {
        match self {
            Self::StaticText(_) => false,
            Self::DynamicText(_)
            | Self::If(_)
            | Self::Choose(_)
            | Self::ForEach(_)
            | Self::Bind(_) => true,
            Self::Trim(trim) => trim.body.is_dynamic(),
            Self::Mixed(children) => children.iter().any(Self::is_dynamic),
        }
    }

    /// Short tag used in log fields.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::StaticText(_) => "static_text",
            Self::DynamicText(_) => "dynamic_text",
            Self::If(_) => "if",
            Self::Choose(_) => "choose",
            Self::Trim(_) => "trim",
            Self::ForEach(_) => "foreach",
            Self::Bind(_) => "bind",
            Self::Mixed(_) => "mixed",
        }
    }
}

impl IfNode {
    pub fn new(test: impl Into<String>, body: SqlNode) -> Self {
        Self {
            test: test.into(),
            body: Box::new(body),
        }
    }
}

impl From<ForEachNode> for SqlNode {
    fn from(node: ForEachNode) -> Self {
        Self::ForEach(node)
    }
}

impl From<TrimNode> for SqlNode {
    fn from(node: TrimNode) -> Self {
        Self::Trim(node)
    }
}
