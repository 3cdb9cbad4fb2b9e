//! Document Tree
//!
//! An arena of nodes indexed by `NodeId`, plus the operations the engine
//! needs from a host document API: building trees, detaching children into
//! a fragment and reattaching them, mutating text content and editable
//! values in place, and dispatching input events to listeners.
//!
//! `Document` is the plain arena; `DocumentHandle` is the cloneable shared
//! handle the compiler and the directive handlers hold. Update effects run
//! long after compilation, so everything that mutates the tree goes through
//! the handle.
//!
//! # Locking
//!
//! The handle never holds the document lock while running listeners:
//! `dispatch_input` snapshots the listener list, releases the lock, then
//! invokes them. A listener typically writes into the data object, which
//! broadcasts back into update effects that take the lock again.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::node::{Node, NodeId};
use super::parser::{self, ParseError};
use crate::error::BindError;

/// Callback invoked when an input event is dispatched to an element.
///
/// The argument is the value the user entered.
pub type InputListener = Arc<dyn Fn(&str) -> Result<(), BindError> + Send + Sync>;

/// A detached run of sibling nodes.
///
/// Produced by `Document::take_children`; the nodes stay in the arena but
/// have no parent until the fragment is appended back.
#[derive(Debug)]
pub struct Fragment {
    children: Vec<NodeId>,
}

impl Fragment {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }
}

/// The node arena.
pub struct Document {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    listeners: HashMap<NodeId, Vec<InputListener>>,
}

impl Document {
    /// Create a document holding only a synthetic root element.
    pub fn new() -> Self {
        let root_node = Node::element("root");
        let root = root_node.id();
        let mut nodes = HashMap::new();
        nodes.insert(root, root_node);
        Self {
            nodes,
            root,
            listeners: HashMap::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached element node.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let node = Node::element(tag);
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, content: &str) -> NodeId {
        let node = Node::text(content);
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, BindError> {
        self.nodes.get_mut(&id).ok_or(BindError::DetachedNode(id))
    }

    /// Append `child` as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), BindError> {
        if !self.nodes.contains_key(&child) {
            return Err(BindError::DetachedNode(child));
        }
        let parent_node = self.node_mut(parent)?;
        parent_node
            .children_mut()
            .ok_or(BindError::NotAnElement(parent))?
            .push(child);
        self.node_mut(child)?.set_parent(Some(parent));
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), BindError> {
        self.node_mut(id)?.set_attribute(name, value);
        Ok(())
    }

    /// Child IDs of a node, in document order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .map(|n| n.children().to_vec())
            .unwrap_or_default()
    }

    /// Detach all children of `container` into a fragment.
    ///
    /// The container is left empty; node identity is preserved, so bindings
    /// installed while the fragment is detached keep working after it is
    /// appended back.
    pub fn take_children(&mut self, container: NodeId) -> Result<Fragment, BindError> {
        let node = self.node_mut(container)?;
        let children = node
            .children_mut()
            .ok_or(BindError::NotAnElement(container))?;
        let taken: Vec<NodeId> = std::mem::take(children);
        for child in &taken {
            self.node_mut(*child)?.set_parent(None);
        }
        Ok(Fragment { children: taken })
    }

    /// Reattach a fragment as the trailing children of `container`.
    pub fn append_fragment(
        &mut self,
        container: NodeId,
        fragment: Fragment,
    ) -> Result<(), BindError> {
        for child in fragment.children {
            self.append_child(container, child)?;
        }
        Ok(())
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id)?.text_content()
    }

    /// Overwrite a text node's content.
    pub fn set_text(&mut self, id: NodeId, content: &str) -> Result<(), BindError> {
        self.node_mut(id)?.set_text_content(content);
        Ok(())
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(&id)?.value()
    }

    /// Overwrite an element's editable value. Programmatic writes never
    /// fire input listeners.
    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<(), BindError> {
        self.node_mut(id)?.set_value(value);
        Ok(())
    }

    pub fn add_input_listener(
        &mut self,
        id: NodeId,
        listener: InputListener,
    ) -> Result<(), BindError> {
        if !self.nodes.contains_key(&id) {
            return Err(BindError::DetachedNode(id));
        }
        self.listeners.entry(id).or_default().push(listener);
        Ok(())
    }

    /// Resolve a selector to a node: `#name` matches an `id` attribute,
    /// anything else matches a tag name. First match in depth-first order.
    pub fn query(&self, selector: &str) -> Option<NodeId> {
        let selector = selector.trim();
        if let Some(id_attr) = selector.strip_prefix('#') {
            self.find_first(self.root, &|n| n.attribute("id") == Some(id_attr))
        } else {
            self.find_first(self.root, &|n| n.tag() == Some(selector))
        }
    }

    fn find_first(&self, start: NodeId, pred: &dyn Fn(&Node) -> bool) -> Option<NodeId> {
        let node = self.nodes.get(&start)?;
        if node.is_element() && pred(node) {
            return Some(start);
        }
        for child in node.children() {
            if let Some(found) = self.find_first(*child, pred) {
                return Some(found);
            }
        }
        None
    }

    /// Concatenated text content of a subtree, in document order.
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        if let Some(text) = node.text_content() {
            out.push_str(text);
        }
        for child in node.children() {
            self.collect_text(*child, out);
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable shared handle over a document.
#[derive(Clone)]
pub struct DocumentHandle {
    inner: Arc<RwLock<Document>>,
}

impl DocumentHandle {
    pub fn new(document: Document) -> Self {
        Self {
            inner: Arc::new(RwLock::new(document)),
        }
    }

    /// Parse template markup into a fresh document.
    pub fn parse(markup: &str) -> Result<Self, ParseError> {
        parser::parse_document(markup).map(Self::new)
    }

    /// Run a closure with shared access to the document.
    pub fn with<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        f(&self.inner.read().expect("document lock poisoned"))
    }

    /// Run a closure with exclusive access to the document.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        f(&mut self.inner.write().expect("document lock poisoned"))
    }

    pub fn query(&self, selector: &str) -> Option<NodeId> {
        self.with(|d| d.query(selector))
    }

    pub fn text(&self, id: NodeId) -> Option<String> {
        self.with(|d| d.text(id).map(str::to_string))
    }

    pub fn set_text(&self, id: NodeId, content: &str) -> Result<(), BindError> {
        self.with_mut(|d| d.set_text(id, content))
    }

    pub fn value(&self, id: NodeId) -> Option<String> {
        self.with(|d| d.value(id).map(str::to_string))
    }

    pub fn set_value(&self, id: NodeId, value: &str) -> Result<(), BindError> {
        self.with_mut(|d| d.set_value(id, value))
    }

    pub fn inner_text(&self, id: NodeId) -> String {
        self.with(|d| d.inner_text(id))
    }

    pub fn add_input_listener(
        &self,
        id: NodeId,
        listener: InputListener,
    ) -> Result<(), BindError> {
        self.with_mut(|d| d.add_input_listener(id, listener))
    }

    /// Simulate a user input event: store the entered value on the element,
    /// then invoke its input listeners with the lock released.
    pub fn dispatch_input(&self, id: NodeId, value: &str) -> Result<(), BindError> {
        let listeners = {
            let mut doc = self.inner.write().expect("document lock poisoned");
            doc.set_value(id, value)?;
            doc.listeners.get(&id).cloned().unwrap_or_default()
        };
        for listener in listeners {
            listener(value)?;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
