//! Property-path tokenizer.
//!
//! Splits `orders[0].lines.sku` into successive segments: each segment has a
//! bare `name`, an optional `[index]`, and the remaining `children` path.

/// One segment of a property path plus the unconsumed remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyTokenizer<'a> {
    name: &'a str,
    indexed_name: &'a str,
    index: Option<&'a str>,
    children: Option<&'a str>,
}

impl<'a> PropertyTokenizer<'a> {
    pub fn new(full_name: &'a str) -> Self {
        let (indexed_name, children) = match full_name.find('.') {
            Some(dot) => (&full_name[..dot], Some(&full_name[dot + 1..])),
            None => (full_name, None),
        };
        let (name, index) = match indexed_name.find('[') {
            Some(open) => {
                let inner = &indexed_name[open + 1..];
                let inner = inner.strip_suffix(']').unwrap_or(inner);
                (&indexed_name[..open], Some(inner))
            }
            None => (indexed_name, None),
        };
        Self {
            name,
            indexed_name,
            index,
            children,
        }
    }

    /// Segment name without any `[index]` suffix.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// Segment name including its `[index]` suffix.
    pub fn indexed_name(&self) -> &'a str {
        self.indexed_name
    }

    pub fn index(&self) -> Option<&'a str> {
        self.index
    }

    pub fn children(&self) -> Option<&'a str> {
        self.children
    }
}

impl<'a> Iterator for PropertyTokenizer<'a> {
    type Item = PropertyTokenizer<'a>;

    /// Advance to the next segment of the path.
    fn next(&mut self) -> Option<Self::Item> {
        let next = Self::new(self.children?);
        *self = next;
        Some(next)
    }
}

/// Root name of a property path (`a[0].b` → `a`).
pub fn root_name(path: &str) -> &str {
    PropertyTokenizer::new(path).name()
}
