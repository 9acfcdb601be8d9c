//! Trim / where / set nodes and the trimming rule they share.

use crate::SqlNode;

/// Keywords stripped from the front of a `where` body. The trailing
/// whitespace character is part of the match but not of what gets removed.
const WHERE_PREFIXES: &[&str] = &[
    "AND ", "OR ", "AND\n", "OR\n", "AND\r", "OR\r", "AND\t", "OR\t",
];

/// Wraps a body, strips one leading/trailing override, and adds a
/// prefix/suffix when the body produced any SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimNode {
    pub body: Box<SqlNode>,
    pub prefix: Option<String>,
    /// Upper-cased, checked in order; first match wins.
    pub prefixes_to_strip: Vec<String>,
    pub suffix: Option<String>,
    pub suffixes_to_strip: Vec<String>,
}

impl TrimNode {
    /// Build from template attributes. Overrides are `|`-separated; empty
    /// segments are ignored.
    pub fn new(
        body: SqlNode,
        prefix: Option<&str>,
        prefix_overrides: Option<&str>,
        suffix: Option<&str>,
        suffix_overrides: Option<&str>,
    ) -> Self {
        Self {
            body: Box::new(body),
            prefix: prefix.map(str::to_owned),
            prefixes_to_strip: parse_overrides(prefix_overrides),
            suffix: suffix.map(str::to_owned),
            suffixes_to_strip: parse_overrides(suffix_overrides),
        }
    }

    pub fn where_clause(body: SqlNode) -> Self {
        Self {
            body: Box::new(body),
            prefix: Some("WHERE".to_owned()),
            prefixes_to_strip: WHERE_PREFIXES.iter().map(|p| (*p).to_owned()).collect(),
            suffix: None,
            suffixes_to_strip: Vec::new(),
        }
    }

    pub fn set_clause(body: SqlNode) -> Self {
        Self {
            body: Box::new(body),
            prefix: Some("SET".to_owned()),
            prefixes_to_strip: vec![",".to_owned()],
            suffix: None,
            suffixes_to_strip: vec![",".to_owned()],
        }
    }

    /// Apply the trimming rule to the SQL the body produced.
    ///
    /// Returns `None` when the body is blank: nothing, not even the prefix,
    /// is emitted.
    pub fn finish(&self, body: &str) -> Option<String> {
        let trimmed = body.trim_matches(|c: char| c <= ' ');
        if trimmed.is_empty() {
            return None;
        }
        let upper = trimmed.to_ascii_uppercase();
        let mut start = 0;
        let mut end = trimmed.len();

        if let Some(hit) = self
            .prefixes_to_strip
            .iter()
            .find(|p| upper.starts_with(p.as_str()))
        {
            start = hit.trim().len();
        }
        if let Some(hit) = self
            .suffixes_to_strip
            .iter()
            .find(|s| upper.ends_with(s.as_str()) || upper.ends_with(s.trim()))
        {
            end = end.saturating_sub(hit.trim().len()).max(start);
        }

        let core = trimmed.get(start..end).unwrap_or(trimmed);
        let mut out = String::with_capacity(core.len() + 16);
        if let Some(prefix) = &self.prefix {
            out.push_str(prefix);
            if !core.is_empty() || self.suffix.is_some() {
                out.push(' ');
            }
        }
        out.push_str(core);
        if let Some(suffix) = &self.suffix {
            out.push(' ');
            out.push_str(suffix);
        }
        Some(out)
    }
}

fn parse_overrides(overrides: Option<&str>) -> Vec<String> {
    overrides
        .map(|raw| {
            raw.split('|')
                .filter(|part| !part.is_empty())
                .map(str::to_ascii_uppercase)
                .collect()
        })
        .unwrap_or_default()
}
