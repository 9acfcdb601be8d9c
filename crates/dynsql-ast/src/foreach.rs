//! ForEach / in nodes.

use crate::SqlNode;

/// Prefix of per-iteration binding names (`__frch_<name>_<n>`).
pub const ITEM_PREFIX: &str = "__frch_";

/// Loop over an iterable expression, applying `body` once per element.
#[derive(Debug, Clone, PartialEq)]
pub struct ForEachNode {
    pub body: Box<SqlNode>,
    pub collection: String,
    pub nullable: bool,
    pub index: Option<String>,
    pub item: Option<String>,
    pub open: Option<String>,
    pub close: Option<String>,
    pub separator: Option<String>,
    /// Render scalar lists as literal `(a,b,c)` instead of bind parameters.
    pub inline_literals: bool,
    /// Column emitted as `<column> IN` ahead of a non-empty `in` list.
    pub column: Option<String>,
}

impl ForEachNode {
    pub fn new(body: SqlNode, collection: impl Into<String>) -> Self {
        Self {
            body: Box::new(body),
            collection: collection.into(),
            nullable: false,
            index: None,
            item: None,
            open: None,
            close: None,
            separator: None,
            inline_literals: false,
            column: None,
        }
    }

    /// `in` list: `(#{item},#{item},...)`.
    ///
    /// `item` may be a path such as `author.id`; its root name becomes the
    /// loop variable and the whole path is bound per element.
    pub fn in_list(collection: impl Into<String>, item: &str) -> Self {
        let variable = item.split(['.', '[']).next().unwrap_or(item);
        let body = SqlNode::text(format!("#{{{item}}}"));
        Self::new(body, collection)
            .item(variable)
            .open("(")
            .close(")")
            .separator(",")
    }

    pub fn item(mut self, item: impl Into<String>) -> Self {
        self.item = Some(item.into());
        self
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn open(mut self, open: impl Into<String>) -> Self {
        self.open = Some(open.into());
        self
    }

    pub fn close(mut self, close: impl Into<String>) -> Self {
        self.close = Some(close.into());
        self
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = Some(separator.into());
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_inline_literals(mut self, inline: bool) -> Self {
        self.inline_literals = inline;
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

/// Per-iteration name for a loop variable.
pub fn itemize(name: &str, unique: usize) -> String {
    format!("{ITEM_PREFIX}{name}_{unique}")
}
