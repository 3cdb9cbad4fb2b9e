//! Template Markup Parser
//!
//! A small recursive-descent parser that turns template text into a
//! `Document`. It covers exactly what templates need: elements with quoted,
//! single-quoted, or bare attributes, self-closing tags, the usual void
//! elements (`<input>`, `<br>`, ...), text, and comments (skipped).
//!
//! Text nodes are kept verbatim, whitespace included; interpolation works
//! on raw text content, so the parser must not normalize it.

use thiserror::Error;

use super::document::Document;
use super::node::NodeId;

/// Elements that never have children or a closing tag.
const VOID_ELEMENTS: &[&str] = &["input", "br", "hr", "img", "meta", "link"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected end of input while parsing `{context}`")]
    UnexpectedEof { context: String },

    #[error("malformed tag at byte {position}")]
    MalformedTag { position: usize },

    #[error("closing tag `{found}` does not match open tag `{expected}`")]
    MismatchedClosingTag { expected: String, found: String },

    #[error("closing tag `{tag}` has no matching open tag")]
    UnexpectedClosingTag { tag: String },

    #[error("unterminated attribute value at byte {position}")]
    UnterminatedAttribute { position: usize },

    #[error("unterminated comment at byte {position}")]
    UnterminatedComment { position: usize },
}

/// Parse template markup into a document. Top-level nodes become children
/// of the document's synthetic root.
pub fn parse_document(markup: &str) -> Result<Document, ParseError> {
    let mut doc = Document::new();
    let root = doc.root();
    let mut parser = Parser {
        src: markup,
        pos: 0,
    };
    parser.parse_nodes(&mut doc, root)?;
    if !parser.eof() {
        // parse_nodes only stops early on a closing tag.
        parser.bump(2);
        let tag = parser.take_name()?;
        return Err(ParseError::UnexpectedClosingTag { tag });
    }
    Ok(doc)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn starts_with(&self, pat: &str) -> bool {
        self.rest().starts_with(pat)
    }

    fn bump(&mut self, n: usize) {
        self.pos += n;
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    /// Parse siblings until end of input or a closing tag.
    fn parse_nodes(&mut self, doc: &mut Document, parent: NodeId) -> Result<(), ParseError> {
        loop {
            if self.eof() || self.starts_with("</") {
                return Ok(());
            }
            if self.starts_with("<!--") {
                self.skip_comment()?;
            } else if self.starts_with("<") {
                self.parse_element(doc, parent)?;
            } else {
                self.parse_text(doc, parent);
            }
        }
    }

    fn parse_text(&mut self, doc: &mut Document, parent: NodeId) {
        let end = self
            .rest()
            .find('<')
            .map(|i| self.pos + i)
            .unwrap_or(self.src.len());
        let content = &self.src[self.pos..end];
        self.pos = end;
        if !content.is_empty() {
            let id = doc.create_text(content);
            doc.append_child(parent, id)
                .expect("parser only appends to elements it created");
        }
    }

    fn parse_element(&mut self, doc: &mut Document, parent: NodeId) -> Result<(), ParseError> {
        self.bump(1); // '<'
        let tag = self.take_name()?;
        let id = doc.create_element(&tag);
        doc.append_child(parent, id)
            .expect("parser only appends to elements it created");

        let self_closing = self.parse_attributes(doc, id, &tag)?;
        if self_closing || VOID_ELEMENTS.contains(&tag.as_str()) {
            return Ok(());
        }

        self.parse_nodes(doc, id)?;

        if self.eof() {
            return Err(ParseError::UnexpectedEof { context: tag });
        }
        self.bump(2); // '</'
        let close = self.take_name()?;
        self.skip_whitespace();
        if !self.starts_with(">") {
            return Err(ParseError::MalformedTag { position: self.pos });
        }
        self.bump(1);
        if close != tag {
            return Err(ParseError::MismatchedClosingTag {
                expected: tag,
                found: close,
            });
        }
        Ok(())
    }

    /// Parse attributes up to and including `>` or `/>`. Returns true for
    /// a self-closing tag.
    fn parse_attributes(
        &mut self,
        doc: &mut Document,
        id: NodeId,
        tag: &str,
    ) -> Result<bool, ParseError> {
        loop {
            self.skip_whitespace();
            if self.starts_with("/>") {
                self.bump(2);
                return Ok(true);
            }
            if self.starts_with(">") {
                self.bump(1);
                return Ok(false);
            }
            if self.eof() {
                return Err(ParseError::UnexpectedEof {
                    context: tag.to_string(),
                });
            }
            let name = self.take_name()?;
            let value = if self.starts_with("=") {
                self.bump(1);
                self.take_attr_value()?
            } else {
                String::new()
            };
            doc.set_attribute(id, &name, &value)
                .expect("parser sets attributes on the element it created");
        }
    }

    /// A tag or attribute name: ASCII alphanumerics plus `-`, `_`, `:`.
    fn take_name(&mut self) -> Result<String, ParseError> {
        let rest = self.rest();
        let end = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'))
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(ParseError::MalformedTag { position: self.pos });
        }
        let name = rest[..end].to_string();
        self.bump(end);
        Ok(name)
    }

    fn take_attr_value(&mut self) -> Result<String, ParseError> {
        let rest = self.rest();
        let quote = rest.chars().next();
        match quote {
            Some(q @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body.find(q).ok_or(ParseError::UnterminatedAttribute {
                    position: self.pos,
                })?;
                let value = body[..end].to_string();
                self.bump(end + 2);
                Ok(value)
            }
            Some(_) => {
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                    .unwrap_or(rest.len());
                let value = rest[..end].to_string();
                self.bump(end);
                Ok(value)
            }
            None => Err(ParseError::UnterminatedAttribute {
                position: self.pos,
            }),
        }
    }

    fn skip_comment(&mut self) -> Result<(), ParseError> {
        let body = &self.rest()[4..];
        let end = body.find("-->").ok_or(ParseError::UnterminatedComment {
            position: self.pos,
        })?;
        self.bump(4 + end + 3);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_element_with_text() {
        let doc = parse_document("<div>Hello</div>").unwrap();
        let root = doc.root();
        let children = doc.children(root);
        assert_eq!(children.len(), 1);
        let div = children[0];
        assert_eq!(doc.node(div).unwrap().tag(), Some("div"));
        assert_eq!(doc.inner_text(div), "Hello");
    }

    #[test]
    fn parses_attributes() {
        let doc =
            parse_document(r#"<input type="text" w-model='msg' disabled>"#).unwrap();
        let input = doc.query("input").unwrap();
        let node = doc.node(input).unwrap();
        assert_eq!(node.attribute("type"), Some("text"));
        assert_eq!(node.attribute("w-model"), Some("msg"));
        assert_eq!(node.attribute("disabled"), Some(""));
    }

    #[test]
    fn parses_bare_attribute_values() {
        let doc = parse_document("<div id=app></div>").unwrap();
        assert!(doc.query("#app").is_some());
    }

    #[test]
    fn parses_nesting() {
        let doc = parse_document("<div><span>a</span><span>b</span></div>").unwrap();
        let div = doc.query("div").unwrap();
        assert_eq!(doc.children(div).len(), 2);
        assert_eq!(doc.inner_text(div), "ab");
    }

    #[test]
    fn void_and_self_closing_elements_take_no_children() {
        let doc = parse_document("<div><input><br/>after</div>").unwrap();
        let div = doc.query("div").unwrap();
        let children = doc.children(div);
        assert_eq!(children.len(), 3);
        assert_eq!(doc.inner_text(div), "after");
    }

    #[test]
    fn preserves_text_whitespace() {
        let doc = parse_document("<p>Hello, {{ name }}!\n</p>").unwrap();
        let p = doc.query("p").unwrap();
        assert_eq!(doc.inner_text(p), "Hello, {{ name }}!\n");
    }

    #[test]
    fn skips_comments() {
        let doc = parse_document("<div><!-- note -->text</div>").unwrap();
        let div = doc.query("div").unwrap();
        assert_eq!(doc.children(div).len(), 1);
        assert_eq!(doc.inner_text(div), "text");
    }

    #[test]
    fn mismatched_closing_tag_is_an_error() {
        assert!(matches!(
            parse_document("<div>text</span>"),
            Err(ParseError::MismatchedClosingTag { .. })
        ));
    }

    #[test]
    fn stray_closing_tag_is_an_error() {
        assert!(matches!(
            parse_document("</div>"),
            Err(ParseError::UnexpectedClosingTag { .. })
        ));
    }

    #[test]
    fn unterminated_element_is_an_error() {
        assert!(matches!(
            parse_document("<div>text"),
            Err(ParseError::UnexpectedEof { .. })
        ));
    }
}
