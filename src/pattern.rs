//! Validated route path patterns.

use std::fmt;

use crate::error::Error;

/// A route path pattern, validated when the route is registered.
///
/// - `/hello`, `/users/{id}`: **exact**: match that path only; `{name}`
///   segments match any single segment and are exposed via
///   [`Request::param`](crate::Request::param).
/// - `/static/`, `/`: **subtree**: a trailing slash matches the path itself
///   and every path below it. Among matching subtrees the longest wins, and
///   an exact pattern always beats a subtree.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Pattern {
    raw: String,
    kind: Kind,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub(crate) enum Kind {
    Exact,
    Subtree,
}

impl Pattern {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| Error::InvalidPattern {
            pattern: raw.to_owned(),
            reason: reason.to_owned(),
        };

        if !raw.starts_with('/') {
            return Err(invalid("must start with `/`"));
        }
        if raw.chars().any(|c| c.is_whitespace() || c == '?' || c == '#') {
            return Err(invalid("must not contain whitespace, `?` or `#`"));
        }

        let kind = if raw.ends_with('/') { Kind::Subtree } else { Kind::Exact };
        if kind == Kind::Subtree && (raw.contains('{') || raw.contains('}')) {
            return Err(invalid("subtree patterns cannot contain wildcards"));
        }

        Ok(Self { raw: raw.to_owned(), kind })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_subtree(&self) -> bool {
        self.kind == Kind::Subtree
    }

    pub(crate) fn kind(&self) -> Kind {
        self.kind
    }

    /// Whether this subtree pattern covers `path`.
    pub(crate) fn covers(&self, path: &str) -> bool {
        self.kind == Kind::Subtree && path.starts_with(&self.raw)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_makes_a_subtree() {
        assert!(Pattern::parse("/foo/").unwrap().is_subtree());
        assert!(Pattern::parse("/").unwrap().is_subtree());
        assert!(!Pattern::parse("/hello").unwrap().is_subtree());
        assert!(!Pattern::parse("/users/{id}").unwrap().is_subtree());
    }

    #[test]
    fn subtree_covers_itself_and_descendants_only() {
        let p = Pattern::parse("/foo/").unwrap();
        assert!(p.covers("/foo/"));
        assert!(p.covers("/foo/bar/baz"));
        assert!(!p.covers("/foo"));
        assert!(!p.covers("/foobar/"));
        assert!(!Pattern::parse("/foo").unwrap().covers("/foo"));
    }

    #[test]
    fn rejects_malformed_patterns() {
        for raw in ["", "hello", "/he llo", "/a?b=1", "/users/{id}/"] {
            assert!(
                matches!(Pattern::parse(raw), Err(Error::InvalidPattern { .. })),
                "{raw:?} should be rejected"
            );
        }
    }
}
