//! Directive Handlers
//!
//! Directives are template attributes prefixed with `w-`; the suffix
//! selects a handler from the registry. The registry is a flat
//! name-to-handler mapping behind a uniform trait, so new directives can
//! be registered without touching the compiler.
//!
//! Two handlers are built in:
//!
//! - `model`: two-way value binding. Pushes the data value into the
//!   node's editable value, keeps it updated through a binding, and
//!   writes user input back into the data object.
//! - `text`: interpolation. Not an attribute: the compiler dispatches
//!   text nodes containing `{{ }}` here with their raw content.

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use super::interpolate::TextTemplate;
use crate::dom::{DocumentHandle, NodeId};
use crate::error::BindError;
use crate::path::PathExpr;
use crate::reactive::{Binding, DataObject, Value};

/// The fixed two-character attribute prefix marking a directive.
pub const DIRECTIVE_PREFIX: &str = "w-";

/// Shared state handlers and bindings work against: the observed data
/// root and the document being compiled.
#[derive(Clone)]
pub struct BindContext {
    pub data: DataObject,
    pub document: DocumentHandle,
}

/// A directive implementation.
///
/// `expr` is the attribute value for attribute directives, or the raw
/// text content for the text-interpolation handler.
pub trait DirectiveHandler: Send + Sync {
    fn apply(&self, ctx: &BindContext, node: NodeId, expr: &str) -> Result<(), BindError>;
}

/// Name-to-handler mapping consulted by the compiler.
pub struct DirectiveRegistry {
    handlers: IndexMap<String, Box<dyn DirectiveHandler>>,
}

impl DirectiveRegistry {
    pub fn empty() -> Self {
        Self {
            handlers: IndexMap::new(),
        }
    }

    /// The built-in set: `model` plus the text-interpolation handler.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register("model", Box::new(ModelDirective));
        registry.register("text", Box::new(TextDirective));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, handler: Box<dyn DirectiveHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&dyn DirectiveHandler> {
        self.handlers.get(name).map(Box::as_ref)
    }
}

/// Two-way value binding (`w-model="path"`).
pub struct ModelDirective;

impl DirectiveHandler for ModelDirective {
    fn apply(&self, ctx: &BindContext, node: NodeId, expr: &str) -> Result<(), BindError> {
        let path = PathExpr::parse(expr)?;
        let initial = ctx.data.resolve(&path)?;
        ctx.document.set_value(node, &initial.to_string())?;

        // What the engine last wrote into the node. The input listener
        // compares against this to avoid echoing its own writes back.
        let last_pushed = Arc::new(RwLock::new(initial));

        // Data to node.
        {
            let document = ctx.document.clone();
            let last_pushed = last_pushed.clone();
            Binding::new(&ctx.data, path.clone(), move |value| {
                document.set_value(node, &value.to_string())?;
                *last_pushed.write().expect("last pushed lock poisoned") = value.clone();
                Ok(())
            })?;
        }

        // Node to data.
        let data = ctx.data.clone();
        ctx.document.add_input_listener(
            node,
            Arc::new(move |entered| {
                let entered = Value::from(entered);
                let differs =
                    *last_pushed.read().expect("last pushed lock poisoned") != entered;
                if differs {
                    data.assign(&path, entered)?;
                }
                Ok(())
            }),
        )
    }
}

/// Text interpolation (`{{ path }}` inside a text node).
pub struct TextDirective;

impl DirectiveHandler for TextDirective {
    fn apply(&self, ctx: &BindContext, node: NodeId, raw: &str) -> Result<(), BindError> {
        let template = TextTemplate::parse(raw);

        // One binding per distinct expression; every effect re-renders
        // the whole content from all current values.
        for expr in template.expressions() {
            let path = PathExpr::parse(expr)?;
            let document = ctx.document.clone();
            let data = ctx.data.clone();
            let template = template.clone();
            Binding::new(&ctx.data, path, move |_| {
                let rendered = template.render(&data)?;
                document.set_text(node, &rendered)
            })?;
        }

        let rendered = template.render(&ctx.data)?;
        ctx.document.set_text(node, &rendered)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
