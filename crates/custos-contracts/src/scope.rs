//! Scope patterns: the addressing scheme for governed state.
//!
//! A scope is a slash-separated path into the governed state tree, e.g.
//! `objectives/weights/stability`. A pattern is either an exact path or a
//! subtree pattern ending in `/*`, which covers the named path and everything
//! below it. Axioms declare the scope they constrain; intents declare the
//! scope they touch; conflict detection is driven by scope overlap.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A scope pattern over the governed state tree.
///
/// Stored and serialized as its string form. Two forms exist:
///
/// - exact: `objectives/weights/stability`
/// - subtree: `objectives/weights/*` (the path and all descendants)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopePattern(String);

impl ScopePattern {
    /// Build a pattern from its string form. No validation happens here;
    /// structural checks belong to intent intake and canon loading.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// The raw string form of the pattern.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the pattern ends in the subtree wildcard `/*`.
    pub fn is_subtree(&self) -> bool {
        self.0.ends_with("/*") || self.0 == "*"
    }

    /// The path segments without a trailing wildcard segment.
    fn stem(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.0.split('/').collect();
        if segments.last() == Some(&"*") {
            segments.pop();
        }
        segments
    }

    /// The first path segment, used to check scope-root registration.
    ///
    /// Returns `None` for an empty pattern or a bare `*`.
    pub fn root(&self) -> Option<&str> {
        self.stem().first().copied().filter(|s| !s.is_empty())
    }

    /// True if the pattern has at least one non-empty segment and no empty
    /// interior segments (`a//b` is malformed).
    pub fn is_well_formed(&self) -> bool {
        if self.0.is_empty() {
            return false;
        }
        self.0.split('/').all(|s| !s.is_empty())
    }

    /// True if this pattern covers the given pattern entirely.
    ///
    /// An exact pattern covers only itself. A subtree pattern covers every
    /// pattern whose stem starts with its own stem.
    pub fn covers(&self, other: &ScopePattern) -> bool {
        let mine = self.stem();
        let theirs = other.stem();
        if self.is_subtree() {
            theirs.len() >= mine.len() && theirs[..mine.len()] == mine[..]
        } else {
            // An exact pattern cannot cover a subtree pattern.
            !other.is_subtree() && mine == theirs
        }
    }

    /// True if the two patterns can both address at least one common path.
    ///
    /// Overlap is symmetric: it holds when either stem is a prefix of the
    /// other and the shorter side is a subtree pattern, or when the stems are
    /// identical.
    pub fn overlaps(&self, other: &ScopePattern) -> bool {
        let a = self.stem();
        let b = other.stem();
        let shared = a.len().min(b.len());
        if a[..shared] != b[..shared] {
            return false;
        }
        if a.len() == b.len() {
            return true;
        }
        // Stems share a prefix but differ in depth: only a subtree wildcard
        // on the shorter side reaches into the longer one.
        if a.len() < b.len() {
            self.is_subtree()
        } else {
            other.is_subtree()
        }
    }

    /// True if this pattern strictly contains the other: it covers the other
    /// but addresses a strictly wider subtree.
    ///
    /// Used by conflict detection to recognize parent-only reads.
    pub fn is_strict_parent_of(&self, other: &ScopePattern) -> bool {
        self.covers(other) && self != other
    }
}

impl fmt::Display for ScopePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::ScopePattern;

    fn p(s: &str) -> ScopePattern {
        ScopePattern::new(s)
    }

    #[test]
    fn exact_covers_only_itself() {
        assert!(p("a/b").covers(&p("a/b")));
        assert!(!p("a/b").covers(&p("a/b/c")));
        assert!(!p("a/b").covers(&p("a")));
    }

    #[test]
    fn subtree_covers_descendants() {
        assert!(p("a/b/*").covers(&p("a/b")));
        assert!(p("a/b/*").covers(&p("a/b/c")));
        assert!(p("a/b/*").covers(&p("a/b/c/*")));
        assert!(!p("a/b/*").covers(&p("a/x")));
    }

    #[test]
    fn overlap_is_symmetric() {
        let cases = [
            ("a/b", "a/b", true),
            ("a/b", "a/c", false),
            ("a/*", "a/b/c", true),
            ("a/b/c", "a/*", true),
            ("a/b", "a/b/c", false),
            ("x/*", "y/*", false),
        ];
        for (left, right, expected) in cases {
            assert_eq!(p(left).overlaps(&p(right)), expected, "{left} vs {right}");
            assert_eq!(p(right).overlaps(&p(left)), expected, "{right} vs {left}");
        }
    }

    #[test]
    fn strict_parent_excludes_equal_patterns() {
        assert!(p("a/*").is_strict_parent_of(&p("a/b")));
        assert!(!p("a/b").is_strict_parent_of(&p("a/b")));
        assert!(!p("a/b").is_strict_parent_of(&p("a/*")));
    }

    #[test]
    fn well_formedness() {
        assert!(p("a/b/c").is_well_formed());
        assert!(p("a/*").is_well_formed());
        assert!(!p("").is_well_formed());
        assert!(!p("a//b").is_well_formed());
    }

    #[test]
    fn root_segment() {
        assert_eq!(p("objectives/weights").root(), Some("objectives"));
        assert_eq!(p("objectives/*").root(), Some("objectives"));
        assert_eq!(p("*").root(), None);
    }
}
