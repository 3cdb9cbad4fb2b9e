//! Document Nodes
//!
//! This module defines the node types that live in the document tree.
//!
//! The tree is deliberately small: elements (tag, attributes, children, an
//! editable value for input-like elements) and text nodes. That is the
//! entire surface the compiler and the directive handlers need.

use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

/// Unique identifier for a node in the document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node, as classified by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// An element. May carry attributes and children.
    Element,

    /// A text node. Never has children.
    Text,
}

/// Node payload.
#[derive(Debug, Clone)]
pub enum NodeData {
    Element {
        tag: String,
        /// Attributes in source order. The directive scan walks this map
        /// in order, so directive application order is attribute order.
        attributes: IndexMap<String, String>,
        children: Vec<NodeId>,
        /// The editable value (what an input-like element currently shows).
        value: String,
    },
    Text {
        content: String,
    },
}

/// A node in the document tree.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    parent: Option<NodeId>,
    data: NodeData,
}

impl Node {
    /// Create a new element node.
    pub fn element(tag: &str) -> Self {
        Self {
            id: NodeId::new(),
            parent: None,
            data: NodeData::Element {
                tag: tag.to_string(),
                attributes: IndexMap::new(),
                children: Vec::new(),
                value: String::new(),
            },
        }
    }

    /// Create a new text node.
    pub fn text(content: &str) -> Self {
        Self {
            id: NodeId::new(),
            parent: None,
            data: NodeData::Text {
                content: content.to_string(),
            },
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text { .. } => NodeKind::Text,
        }
    }

    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    pub fn is_text(&self) -> bool {
        self.kind() == NodeKind::Text
    }

    /// The element tag, if this is an element.
    pub fn tag(&self) -> Option<&str> {
        match &self.data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text { .. } => None,
        }
    }

    /// The attribute map, if this is an element.
    pub fn attributes(&self) -> Option<&IndexMap<String, String>> {
        match &self.data {
            NodeData::Element { attributes, .. } => Some(attributes),
            NodeData::Text { .. } => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes()?.get(name).map(String::as_str)
    }

    pub(crate) fn set_attribute(&mut self, name: &str, value: &str) {
        if let NodeData::Element { attributes, .. } = &mut self.data {
            attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// Child IDs, in document order. Empty for text nodes.
    pub fn children(&self) -> &[NodeId] {
        match &self.data {
            NodeData::Element { children, .. } => children,
            NodeData::Text { .. } => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.data {
            NodeData::Element { children, .. } => Some(children),
            NodeData::Text { .. } => None,
        }
    }

    /// Text content, if this is a text node.
    pub fn text_content(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text { content } => Some(content),
            NodeData::Element { .. } => None,
        }
    }

    pub(crate) fn set_text_content(&mut self, content: &str) {
        if let NodeData::Text { content: c } = &mut self.data {
            *c = content.to_string();
        }
    }

    /// The editable value, if this is an element.
    pub fn value(&self) -> Option<&str> {
        match &self.data {
            NodeData::Element { value, .. } => Some(value),
            NodeData::Text { .. } => None,
        }
    }

    pub(crate) fn set_value(&mut self, value: &str) {
        if let NodeData::Element { value: v, .. } = &mut self.data {
            *v = value.to_string();
        }
    }
}
