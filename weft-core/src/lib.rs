//! Weft Core
//!
//! This crate provides the core engine for the Weft reactive view-binding
//! framework. It implements:
//!
//! - An observable data layer with automatic dependency tracking
//! - A template compiler for directives and text interpolation
//! - A small in-memory document tree with a markup parser
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: plain values, observed cells, notifiers, and bindings
//! - `dom`: the document tree and the template markup parser
//! - `compile`: the template compiler and the directive registry
//! - `path`: dot-separated path expressions
//!
//! # Example
//!
//! ```rust,ignore
//! use weft_core::{App, AppConfig, dom::DocumentHandle, reactive::Value};
//! use serde_json::json;
//!
//! let document = DocumentHandle::parse(
//!     r#"<div id="app"><p>Hello, {{ user.name }}!</p><input w-model="user.name"></div>"#,
//! )?;
//!
//! let app = App::mount(document, AppConfig {
//!     container: "#app".into(),
//!     data: Value::from(json!({ "user": { "name": "Ann" } })),
//! })?;
//!
//! // Mutations re-render synchronously.
//! app.data().unwrap().set("user.name", "Bob")?;
//! ```
//!
//! The engine is fully synchronous: a mutation's effects are applied
//! before the mutating call returns. There is no batching, no list
//! directives, no component composition, and no virtual-tree diffing.

pub mod compile;
pub mod dom;
pub mod error;
pub mod path;
pub mod reactive;

pub use compile::{BindContext, DirectiveRegistry, TemplateCompiler};
pub use error::BindError;
pub use reactive::{DataObject, Value};

use tracing::{info, warn};

use dom::{DocumentHandle, NodeId};

/// How the mount container is located.
#[derive(Debug, Clone)]
pub enum ContainerRef {
    /// An existing node in the document.
    Node(NodeId),
    /// A selector: `#name` matches an `id` attribute, anything else a tag.
    Selector(String),
}

impl From<NodeId> for ContainerRef {
    fn from(id: NodeId) -> Self {
        ContainerRef::Node(id)
    }
}

impl From<&str> for ContainerRef {
    fn from(selector: &str) -> Self {
        ContainerRef::Selector(selector.to_string())
    }
}

/// Mount configuration: where to compile, and what data to observe.
pub struct AppConfig {
    pub container: ContainerRef,
    pub data: Value,
}

/// A mounted application: an observed data root bound to a compiled
/// container.
pub struct App {
    document: DocumentHandle,
    data: Option<DataObject>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("data_observed", &self.data.is_some())
            .finish()
    }
}

impl App {
    /// Observe the data and compile the container's template.
    ///
    /// If the container resolves to nothing, nothing happens: the data
    /// stays unobserved and `data()` returns `None`.
    pub fn mount(document: DocumentHandle, config: AppConfig) -> Result<Self, BindError> {
        let container = match &config.container {
            ContainerRef::Node(id) => document.with(|doc| doc.node(*id).map(|n| n.id())),
            ContainerRef::Selector(selector) => document.query(selector),
        };
        let Some(container) = container else {
            warn!("mount container not found; skipping observation and compilation");
            return Ok(Self {
                document,
                data: None,
            });
        };

        info!(%container, "mounting");
        let data = DataObject::observe(config.data);
        let ctx = BindContext {
            data: data.clone(),
            document: document.clone(),
        };
        TemplateCompiler::new(ctx).compile(container)?;

        Ok(Self {
            document,
            data: Some(data),
        })
    }

    pub fn document(&self) -> &DocumentHandle {
        &self.document
    }

    /// The observed data root, or `None` when the container did not
    /// resolve at mount time.
    pub fn data(&self) -> Option<&DataObject> {
        self.data.as_ref()
    }
}
