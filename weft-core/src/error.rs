//! Engine Errors
//!
//! Nothing in the core catches or wraps: every fallible operation returns
//! `Result` and the error surfaces to whatever external code invoked the
//! mutating assignment or the compilation entry point.

use thiserror::Error;

use crate::dom::NodeId;
use crate::path::PathError;

/// An error raised while compiling a template or pushing an update.
#[derive(Debug, Error)]
pub enum BindError {
    /// A path expression failed to parse or resolve.
    #[error(transparent)]
    Path(#[from] PathError),

    /// An attribute used the directive prefix with a name no handler is
    /// registered for.
    #[error("unknown directive `{0}`")]
    UnknownDirective(String),

    /// A document operation referenced a node that is not in the tree.
    #[error("node {0} is not part of the document")]
    DetachedNode(NodeId),

    /// A child was appended to a node that cannot have children.
    #[error("node {0} cannot have children")]
    NotAnElement(NodeId),
}
