use core::error::Error;
use core::fmt;
use vdom::NodeHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    UnknownNode(NodeHandle),
    /// `node` was expected under `parent`.
    NotAChild { parent: NodeHandle, node: NodeHandle },
    /// Only elements, text and comments can be inserted.
    InvalidInsert(NodeHandle),
}

impl fmt::Display for DomError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(node) => write!(formatter, "unknown node {node:?}"),
            Self::NotAChild { parent, node } => write!(formatter, "{node:?} is not a child of {parent:?}"),
            Self::InvalidInsert(node) => write!(formatter, "{node:?} cannot be inserted"),
        }
    }
}

impl Error for DomError {}
