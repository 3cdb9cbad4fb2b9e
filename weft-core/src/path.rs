//! Path Expressions
//!
//! A path expression is a dot-separated chain of property names used to
//! locate a value inside the data root: `user.name`, `items.0.label`.
//! There is no bracket syntax, no computed expressions, and no calls; a
//! numeric segment indexes into an array.
//!
//! Resolution lives on `DataObject` (it has to touch cells); this module
//! owns the parsed form and the error taxonomy. Every resolution failure
//! names the segment that broke the chain, so a bad template expression
//! points at itself instead of surfacing as an opaque fault.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;
use thiserror::Error;

/// A path resolution or parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The expression was empty, or contained an empty segment (`a..b`).
    #[error("invalid path expression `{raw}`")]
    InvalidExpression { raw: String },

    /// A segment named a key that does not exist at that level.
    #[error("segment `{segment}` of path `{path}` does not exist")]
    MissingSegment { path: String, segment: String },

    /// A segment tried to index into a scalar.
    #[error("segment `{segment}` of path `{path}` is not an object or array")]
    NotAContainer { path: String, segment: String },

    /// A segment indexed an array but was not a valid in-range index.
    #[error("segment `{segment}` of path `{path}` is not a valid array index")]
    BadIndex { path: String, segment: String },
}

/// A parsed dot-separated path expression.
///
/// Parsing trims surrounding whitespace (interpolation placeholders arrive
/// as `{{ user.name }}`) and rejects empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathExpr {
    raw: String,
    segments: SmallVec<[String; 4]>,
}

impl PathExpr {
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        let raw = expr.trim().to_string();
        if raw.is_empty() {
            return Err(PathError::InvalidExpression { raw });
        }
        let segments: SmallVec<[String; 4]> =
            raw.split('.').map(|s| s.trim().to_string()).collect();
        if segments.iter().any(String::is_empty) {
            return Err(PathError::InvalidExpression { raw });
        }
        Ok(Self { raw, segments })
    }

    /// The original (trimmed) expression text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// All segments except the last, and the last. Safe because parsing
    /// guarantees at least one segment.
    pub fn split_last(&self) -> (&[String], &str) {
        let (last, parents) = self
            .segments
            .split_last()
            .expect("parsed path has at least one segment");
        (parents, last.as_str())
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PathExpr {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
