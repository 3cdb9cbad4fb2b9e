//! Text Interpolation
//!
//! Splits raw text content into literal and `{{ placeholder }}` segments.
//! Whitespace around the embedded path is trimmed; an opening brace pair
//! with no closing pair is left as literal text. A template re-renders by
//! substituting every placeholder with its currently resolved value;
//! text updates always rewrite the whole node content, not just the
//! placeholder that changed.

use indexmap::IndexSet;

use crate::path::{PathError, PathExpr};
use crate::reactive::DataObject;

/// One piece of a text node's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    /// A trimmed path expression from a `{{ ... }}` placeholder.
    Placeholder(String),
}

/// Parsed text content of one text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTemplate {
    segments: Vec<Segment>,
}

impl TextTemplate {
    pub fn parse(raw: &str) -> Self {
        let mut segments = Vec::new();
        let mut rest = raw;
        loop {
            let Some(open) = rest.find("{{") else {
                if !rest.is_empty() {
                    segments.push(Segment::Literal(rest.to_string()));
                }
                break;
            };
            let Some(close) = rest[open + 2..].find("}}") else {
                // Unterminated placeholder stays literal.
                if !rest.is_empty() {
                    segments.push(Segment::Literal(rest.to_string()));
                }
                break;
            };
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            let expr = rest[open + 2..open + 2 + close].trim();
            segments.push(Segment::Placeholder(expr.to_string()));
            rest = &rest[open + 2 + close + 2..];
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn has_placeholders(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Placeholder(_)))
    }

    /// Distinct embedded expressions, in first-appearance order.
    pub fn expressions(&self) -> Vec<&str> {
        let distinct: IndexSet<&str> = self
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder(expr) => Some(expr.as_str()),
                Segment::Literal(_) => None,
            })
            .collect();
        distinct.into_iter().collect()
    }

    /// Substitute every placeholder with its current resolved value.
    pub fn render(&self, data: &DataObject) -> Result<String, PathError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(expr) => {
                    let value = data.resolve(&PathExpr::parse(expr)?)?;
                    out.push_str(&value.to_string());
                }
            }
        }
        Ok(out)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
