//! Template Compilation
//!
//! The compiler walks a container's children and attaches live bindings:
//! text interpolation (`{{ path }}`) and attribute directives (`w-*`)
//! resolved through an extensible registry. Everything here builds on
//! `reactive` for tracking and on `dom` for the tree being compiled.

mod compiler;
mod directive;
mod interpolate;

pub use compiler::TemplateCompiler;
pub use directive::{
    BindContext, DirectiveHandler, DirectiveRegistry, ModelDirective, TextDirective,
    DIRECTIVE_PREFIX,
};
pub use interpolate::{Segment, TextTemplate};
