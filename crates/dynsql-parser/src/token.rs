//! Delimited-token scanner.
//!
//! Walks text left to right looking for `open ... close` tokens. A backslash
//! directly before `open` escapes it (the backslash is dropped, the delimiter
//! kept). Inside a token, a backslash before `close` makes that close part of
//! the content. An unterminated token is copied through verbatim.

use std::convert::Infallible;

use memchr::memmem;

/// Scanner for one pair of delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenScanner<'a> {
    open: &'a str,
    close: &'a str,
}

impl<'a> TokenScanner<'a> {
    pub const fn new(open: &'a str, close: &'a str) -> Self {
        Self { open, close }
    }

    /// Replace every token with the handler's output.
    ///
    /// The handler receives the unescaped content between the delimiters; its
    /// first error aborts the scan.
    pub fn scan<E, F>(&self, text: &str, mut handler: F) -> Result<String, E>
    where
        F: FnMut(&str) -> Result<String, E>,
    {
        let Some(mut start) = find_from(text, self.open, 0) else {
            return Ok(text.to_owned());
        };
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut content = String::new();
        let mut offset = 0;

        loop {
            if start > offset && bytes[start - 1] == b'\\' {
                out.push_str(&text[offset..start - 1]);
                out.push_str(self.open);
                offset = start + self.open.len();
            } else {
                content.clear();
                out.push_str(&text[offset..start]);
                offset = start + self.open.len();

                let mut end = find_from(text, self.close, offset);
                while let Some(close_at) = end {
                    if close_at > offset && bytes[close_at - 1] == b'\\' {
                        content.push_str(&text[offset..close_at - 1]);
                        content.push_str(self.close);
                        offset = close_at + self.close.len();
                        end = find_from(text, self.close, offset);
                    } else {
                        content.push_str(&text[offset..close_at]);
                        break;
                    }
                }

                match end {
                    Some(close_at) => {
                        out.push_str(&handler(&content)?);
                        offset = close_at + self.close.len();
                    }
                    None => {
                        out.push_str(&text[start..]);
                        offset = text.len();
                    }
                }
            }

            match find_from(text, self.open, offset) {
                Some(next) => start = next,
                None => break,
            }
        }

        if offset < text.len() {
            out.push_str(&text[offset..]);
        }
        Ok(out)
    }

    /// Infallible form of [`scan`](Self::scan).
    pub fn replace<F>(&self, text: &str, mut handler: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        match self.scan::<Infallible, _>(text, |content| Ok(handler(content))) {
            Ok(out) => out,
            Err(never) => match never {},
        }
    }

    /// True when `text` holds at least one complete, unescaped token.
    pub fn contains_token(&self, text: &str) -> bool {
        let mut found = false;
        self.replace(text, |_| {
            found = true;
            String::new()
        });
        found
    }

    /// Contents of every complete token, in order.
    pub fn collect_tokens(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();
        self.replace(text, |content| {
            tokens.push(content.to_owned());
            String::new()
        });
        tokens
    }
}

impl TokenScanner<'static> {
    /// `${...}` substitution tokens.
    pub const fn dollar() -> Self {
        Self::new("${", "}")
    }

    /// `#{...}` bind-parameter tokens.
    pub const fn hash() -> Self {
        Self::new("#{", "}")
    }
}

/// Scan `text` for `open ... close` tokens, replacing each via `handler`.
pub fn scan<E, F>(text: &str, open: &str, close: &str, handler: F) -> Result<String, E>
where
    F: FnMut(&str) -> Result<String, E>,
{
    TokenScanner::new(open, close).scan(text, handler)
}

fn find_from(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let tail = haystack.as_bytes().get(from..)?;
    memmem::find(tail, needle.as_bytes()).map(|at| at + from)
}
