//! Route template compilation.
//!
//! A template is plain path text with two kinds of placeholder:
//!
//! | Placeholder | Matches | Exposed as |
//! |---|---|---|
//! | `:name` | one or more non-`/` characters | `params["name"]` |
//! | `*` | the rest of the path, possibly empty | `params["*"]` |
//!
//! Compilation happens in two steps. [`parse`] splits the template into
//! pieces, then [`PathPattern::compile`] turns the pieces into one anchored
//! regular expression plus the ordered list of captures, one per group. After
//! that the pattern is a pure function of the path it is asked about.
//!
//! ```rust
//! use wick::PathPattern;
//!
//! let pattern = PathPattern::compile("/users/:id").unwrap();
//! assert_eq!(pattern.matches("/users/42").unwrap()["id"], "42");
//! assert!(pattern.matches("/users/42/edit").is_none());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::error::{Error, Result};

/// Path parameters extracted by a successful match, keyed by name.
pub type Params = HashMap<String, String>;

/// Key under which a `*` capture is stored in [`Params`].
pub const WILDCARD: &str = "*";

/// One lexical piece of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Param(String),
    Wildcard,
}

/// What a capture group in the compiled expression stands for.
#[derive(Debug, Clone)]
enum Capture {
    Param(Arc<str>),
    Wildcard,
}

/// A compiled route template.
#[derive(Debug, Clone)]
pub struct PathPattern {
    template: String,
    regex: Regex,
    /// One entry per capture group, left to right.
    captures: Vec<Capture>,
}

impl PathPattern {
    /// Compiles `template` into a matcher.
    ///
    /// Literal text is matched exactly (regex metacharacters are escaped) and
    /// the whole path must match, never a prefix of it.
    pub fn compile(template: &str) -> Result<Self> {
        let pieces = parse(template);

        let mut pattern = String::with_capacity(template.len() + 8);
        pattern.push_str("(?s)^");
        let mut captures = Vec::new();

        for piece in pieces {
            match piece {
                Piece::Literal(text) => pattern.push_str(&regex::escape(&text)),
                Piece::Param(name) => {
                    pattern.push_str("([^/]+)");
                    captures.push(Capture::Param(name.into()));
                }
                Piece::Wildcard => {
                    pattern.push_str("(.*)");
                    captures.push(Capture::Wildcard);
                }
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|source| Error::InvalidPattern {
            template: template.to_owned(),
            source,
        })?;

        Ok(Self { template: template.to_owned(), regex, captures })
    }

    /// Matches a request path, returning the captured parameters.
    ///
    /// Never fails: a path that does not fit the template is simply `None`.
    /// When the same name (or more than one `*`) appears twice, the capture
    /// furthest to the right wins.
    pub fn matches(&self, path: &str) -> Option<Params> {
        let groups = self.regex.captures(path)?;

        let mut params = Params::with_capacity(self.captures.len());
        for (capture, group) in self.captures.iter().zip(groups.iter().skip(1)) {
            let Some(value) = group else { continue };
            let key = match capture {
                Capture::Param(name) => name.as_ref(),
                Capture::Wildcard => WILDCARD,
            };
            params.insert(key.to_owned(), value.as_str().to_owned());
        }
        Some(params)
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Named parameters in left-to-right order. Wildcards are not listed.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.captures.iter().filter_map(|capture| match capture {
            Capture::Param(name) => Some(name.as_ref()),
            Capture::Wildcard => None,
        })
    }

    pub fn has_wildcard(&self) -> bool {
        self.captures.iter().any(|c| matches!(c, Capture::Wildcard))
    }
}

/// Splits a template into literal text, `:name` markers and `*` markers.
///
/// A marker name runs from the `:` to the next `/` (or the end). A `:` that is
/// immediately followed by `/` or by nothing is ordinary text.
fn parse(template: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut literal = String::new();
    let mut rest = template;

    while let Some(c) = rest.chars().next() {
        match c {
            ':' => {
                let after = &rest[1..];
                let len = after.find('/').unwrap_or(after.len());
                if len == 0 {
                    literal.push(':');
                    rest = after;
                    continue;
                }
                flush(&mut literal, &mut pieces);
                pieces.push(Piece::Param(after[..len].to_owned()));
                rest = &after[len..];
            }
            '*' => {
                flush(&mut literal, &mut pieces);
                pieces.push(Piece::Wildcard);
                rest = &rest[1..];
            }
            _ => {
                literal.push(c);
                rest = &rest[c.len_utf8()..];
            }
        }
    }
    flush(&mut literal, &mut pieces);
    pieces
}

fn flush(literal: &mut String, pieces: &mut Vec<Piece>) {
    if !literal.is_empty() {
        pieces.push(Piece::Literal(std::mem::take(literal)));
    }
}
