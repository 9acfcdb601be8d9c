//! Build contexts.
//!
//! [`DynamicContext`] is the root accumulator for one invocation. The other
//! contexts decorate a borrowed parent for the duration of a single node's
//! evaluation: they intercept `append_sql` and forward everything else.

use dynsql_ast::foreach::itemize;
use dynsql_parser::TokenScanner;
use dynsql_types::Value;

use crate::bindings::Bindings;

/// Mutable state threaded through template evaluation.
pub trait SqlBuildContext {
    fn bindings(&self) -> &Bindings;

    fn bindings_mut(&mut self) -> &mut Bindings;

    fn bind(&mut self, name: &str, value: Value) {
        self.bindings_mut().bind(name, value);
    }

    fn append_sql(&mut self, sql: &str);

    /// Next value of the per-invocation counter.
    fn unique_number(&mut self) -> usize;
}

// ---------------------------------------------------------------------------
// Root context
// ---------------------------------------------------------------------------

/// Root context: fragments are joined with a single space.
#[derive(Debug)]
pub struct DynamicContext {
    bindings: Bindings,
    sql: String,
    started: bool,
    unique: usize,
}

impl DynamicContext {
    pub fn new(bindings: Bindings) -> Self {
        Self {
            bindings,
            sql: String::new(),
            started: false,
            unique: 0,
        }
    }

    /// Accumulated SQL, trimmed.
    pub fn sql(&self) -> &str {
        self.sql.trim()
    }

    pub fn into_parts(self) -> (String, Bindings) {
        let sql = self.sql.trim().to_owned();
        (sql, self.bindings)
    }
}

impl SqlBuildContext for DynamicContext {
    fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    fn bindings_mut(&mut self) -> &mut Bindings {
        &mut self.bindings
    }

    fn append_sql(&mut self, sql: &str) {
        if self.started {
            self.sql.push(' ');
        }
        self.sql.push_str(sql);
        self.started = true;
    }

    fn unique_number(&mut self) -> usize {
        let n = self.unique;
        self.unique += 1;
        n
    }
}

macro_rules! forward_to_parent {
    () => {
        fn bindings(&self) -> &Bindings {
            self.parent.bindings()
        }

        fn bindings_mut(&mut self) -> &mut Bindings {
            self.parent.bindings_mut()
        }

        fn unique_number(&mut self) -> usize {
            self.parent.unique_number()
        }
    };
}

// ---------------------------------------------------------------------------
// Decorators
// ---------------------------------------------------------------------------

/// Captures appended SQL verbatim instead of passing it on.
pub struct BufferedContext<'a> {
    parent: &'a mut dyn SqlBuildContext,
    buffer: String,
}

impl<'a> BufferedContext<'a> {
    pub fn new(parent: &'a mut dyn SqlBuildContext) -> Self {
        Self {
            parent,
            buffer: String::new(),
        }
    }

    pub fn into_sql(self) -> String {
        self.buffer
    }
}

impl SqlBuildContext for BufferedContext<'_> {
    forward_to_parent!();

    fn append_sql(&mut self, sql: &str) {
        self.buffer.push_str(sql);
    }
}

/// Emits `prefix` once, just before the first non-blank fragment.
pub struct PrefixedContext<'a> {
    parent: &'a mut dyn SqlBuildContext,
    prefix: &'a str,
    applied: bool,
}

impl<'a> PrefixedContext<'a> {
    pub fn new(parent: &'a mut dyn SqlBuildContext, prefix: &'a str) -> Self {
        Self {
            parent,
            prefix,
            applied: false,
        }
    }

    pub fn is_prefix_applied(&self) -> bool {
        self.applied
    }
}

impl SqlBuildContext for PrefixedContext<'_> {
    forward_to_parent!();

    fn append_sql(&mut self, sql: &str) {
        if !self.applied && !sql.trim().is_empty() {
            self.parent.append_sql(self.prefix);
            self.applied = true;
        }
        self.parent.append_sql(sql);
    }
}

/// Rewrites `#{item...}` / `#{index...}` references to the itemized names
/// of one loop iteration.
pub struct ItemizedContext<'a> {
    parent: &'a mut dyn SqlBuildContext,
    item: Option<&'a str>,
    index: Option<&'a str>,
    unique: usize,
}

impl<'a> ItemizedContext<'a> {
    pub fn new(
        parent: &'a mut dyn SqlBuildContext,
        item: Option<&'a str>,
        index: Option<&'a str>,
        unique: usize,
    ) -> Self {
        Self {
            parent,
            item,
            index,
            unique,
        }
    }

    fn rewrite(&self, content: &str) -> String {
        let renamed = self
            .item
            .and_then(|item| rename_reference(content, item, self.unique))
            .or_else(|| {
                self.index
                    .and_then(|index| rename_reference(content, index, self.unique))
            });
        format!("#{{{}}}", renamed.as_deref().unwrap_or(content))
    }
}

impl SqlBuildContext for ItemizedContext<'_> {
    forward_to_parent!();

    fn append_sql(&mut self, sql: &str) {
        let rewritten = TokenScanner::hash().replace(sql, |content| self.rewrite(content));
        self.parent.append_sql(&rewritten);
    }
}

/// Replace a leading reference to `name` in token content.
///
/// Leading whitespace is dropped; the name must not run on into another
/// identifier character (`u` matches `u.id` and `u,jdbcType=..` but not
/// `uuu.u`).
fn rename_reference(content: &str, name: &str, unique: usize) -> Option<String> {
    let body = content.trim_start();
    let rest = body.strip_prefix(name)?;
    if rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        return None;
    }
    Some(format!("{}{rest}", itemize(name, unique)))
}
