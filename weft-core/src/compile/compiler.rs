//! Template Compiler
//!
//! Converts a container's children into live bindings:
//!
//! 1. Detach all children of the container into a fragment, so the walk
//!    and the per-node writes happen against a detached tree.
//! 2. Walk the fragment depth-first, pre-order. Elements have their
//!    attribute list scanned for the directive prefix, each match
//!    dispatched to its registry handler; text nodes containing `{{ }}`
//!    go to the text handler with their raw content. Recursion descends
//!    only into elements, since text nodes cannot have children.
//! 3. Reattach the fragment to the container as the final operation, a
//!    single batched append.
//!
//! Node identity is preserved across detachment, so the bindings
//! installed during the walk keep pointing at the right nodes after the
//! fragment is appended back.
//!
//! There is no guard against compiling the same container twice; the
//! second pass re-walks the now-live tree (placeholders consumed by the
//! first pass are gone, directive attributes are still present and
//! re-install their handlers).

use tracing::debug;

use super::directive::{BindContext, DirectiveRegistry, DIRECTIVE_PREFIX};
use super::interpolate::TextTemplate;
use crate::dom::{NodeId, NodeKind};
use crate::error::BindError;

/// Walks a template tree and attaches live bindings.
pub struct TemplateCompiler {
    ctx: BindContext,
    registry: DirectiveRegistry,
}

/// Per-node snapshot taken under the document lock, so handlers run
/// without it.
enum Classified {
    Element {
        directives: Vec<(String, String)>,
        children: Vec<NodeId>,
    },
    Text {
        content: String,
    },
}

impl TemplateCompiler {
    /// A compiler with the built-in directive set.
    pub fn new(ctx: BindContext) -> Self {
        Self {
            ctx,
            registry: DirectiveRegistry::builtin(),
        }
    }

    /// A compiler with a caller-assembled registry.
    pub fn with_registry(ctx: BindContext, registry: DirectiveRegistry) -> Self {
        Self { ctx, registry }
    }

    /// Compile the container's children and reattach them.
    pub fn compile(&self, container: NodeId) -> Result<(), BindError> {
        let fragment = self
            .ctx
            .document
            .with_mut(|doc| doc.take_children(container))?;
        debug!(%container, nodes = fragment.len(), "compiling template container");

        for child in fragment.children().to_vec() {
            self.compile_node(child)?;
        }

        self.ctx
            .document
            .with_mut(|doc| doc.append_fragment(container, fragment))
    }

    fn compile_node(&self, node: NodeId) -> Result<(), BindError> {
        let classified = self.ctx.document.with(|doc| -> Result<Classified, BindError> {
            let n = doc.node(node).ok_or(BindError::DetachedNode(node))?;
            Ok(match n.kind() {
                NodeKind::Element => Classified::Element {
                    directives: n
                        .attributes()
                        .map(|attrs| {
                            attrs
                                .iter()
                                .filter(|(name, _)| name.starts_with(DIRECTIVE_PREFIX))
                                .map(|(name, value)| (name.clone(), value.clone()))
                                .collect()
                        })
                        .unwrap_or_default(),
                    children: n.children().to_vec(),
                },
                NodeKind::Text => Classified::Text {
                    content: n.text_content().unwrap_or_default().to_string(),
                },
            })
        })?;

        match classified {
            Classified::Element {
                directives,
                children,
            } => {
                for (name, expr) in directives {
                    let suffix = &name[DIRECTIVE_PREFIX.len()..];
                    let handler = self
                        .registry
                        .get(suffix)
                        .ok_or_else(|| BindError::UnknownDirective(suffix.to_string()))?;
                    handler.apply(&self.ctx, node, &expr)?;
                }
                for child in children {
                    self.compile_node(child)?;
                }
            }
            Classified::Text { content } => {
                if TextTemplate::parse(&content).has_placeholders() {
                    let handler = self
                        .registry
                        .get("text")
                        .ok_or_else(|| BindError::UnknownDirective("text".to_string()))?;
                    handler.apply(&self.ctx, node, &content)?;
                }
            }
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::DocumentHandle;
    use crate::reactive::{DataObject, Value};
    use serde_json::json;

    fn compile(markup: &str, data: serde_json::Value) -> BindContext {
        let document = DocumentHandle::parse(markup).unwrap();
        let ctx = BindContext {
            data: DataObject::observe(Value::from(data)),
            document: document.clone(),
        };
        let container = document.with(|d| d.root());
        TemplateCompiler::new(ctx.clone()).compile(container).unwrap();
        ctx
    }

    #[test]
    fn compiles_text_interpolation_in_nested_elements() {
        let ctx = compile(
            "<div><p>Hello, {{ user.name }}!</p></div>",
            json!({ "user": { "name": "Ann" } }),
        );
        let p = ctx.document.query("p").unwrap();
        assert_eq!(ctx.document.inner_text(p), "Hello, Ann!");

        ctx.data.set("user.name", "Bob").unwrap();
        assert_eq!(ctx.document.inner_text(p), "Hello, Bob!");
    }

    #[test]
    fn compiles_directive_attributes() {
        let ctx = compile(r#"<input w-model="msg">"#, json!({ "msg": "hi" }));
        let input = ctx.document.query("input").unwrap();
        assert_eq!(ctx.document.value(input).unwrap(), "hi");
    }

    #[test]
    fn plain_text_and_plain_attributes_are_untouched() {
        let ctx = compile(
            r#"<p class="quiet">no placeholders</p>"#,
            json!({ "msg": "hi" }),
        );
        let p = ctx.document.query("p").unwrap();
        assert_eq!(ctx.document.inner_text(p), "no placeholders");
        assert_eq!(
            ctx.document.with(|d| d.node(p).unwrap().attribute("class").map(str::to_string)),
            Some("quiet".to_string())
        );
    }

    #[test]
    fn children_are_reattached_after_compilation() {
        let ctx = compile("<div>a</div><span>b</span>", json!({}));
        let root = ctx.document.with(|d| d.root());
        let children = ctx.document.with(|d| d.children(root));
        assert_eq!(children.len(), 2);
        assert_eq!(ctx.document.inner_text(root), "ab");
    }

    #[test]
    fn unknown_directive_is_an_error() {
        let document = DocumentHandle::parse(r#"<div w-clock="msg"></div>"#).unwrap();
        let ctx = BindContext {
            data: DataObject::observe(Value::from(json!({ "msg": "hi" }))),
            document: document.clone(),
        };
        let container = document.with(|d| d.root());
        let err = TemplateCompiler::new(ctx).compile(container).unwrap_err();
        assert!(matches!(err, BindError::UnknownDirective(name) if name == "clock"));
    }

    #[test]
    fn invalid_template_path_fails_compilation() {
        let document = DocumentHandle::parse("<p>{{ user.age }}</p>").unwrap();
        let ctx = BindContext {
            data: DataObject::observe(Value::from(json!({ "user": {} }))),
            document: document.clone(),
        };
        let container = document.with(|d| d.root());
        let err = TemplateCompiler::new(ctx).compile(container).unwrap_err();
        assert!(matches!(err, BindError::Path(_)));
    }

    #[test]
    fn custom_directives_participate_in_compilation() {
        use super::super::directive::DirectiveHandler;

        struct Upper;
        impl DirectiveHandler for Upper {
            fn apply(&self, ctx: &BindContext, node: NodeId, expr: &str) -> Result<(), BindError> {
                let value = ctx.data.get(expr)?;
                ctx.document.set_value(node, &value.to_string().to_uppercase())
            }
        }

        let document = DocumentHandle::parse(r#"<input w-upper="msg">"#).unwrap();
        let ctx = BindContext {
            data: DataObject::observe(Value::from(json!({ "msg": "hi" }))),
            document: document.clone(),
        };
        let mut registry = DirectiveRegistry::builtin();
        registry.register("upper", Box::new(Upper));
        let container = document.with(|d| d.root());
        TemplateCompiler::with_registry(ctx.clone(), registry)
            .compile(container)
            .unwrap();

        let input = document.query("input").unwrap();
        assert_eq!(document.value(input).unwrap(), "HI");
    }
}
