use core::error::Error;
use core::fmt;

/// Inconsistencies the patcher detects in the trees it is handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// An element vnode without a tag.
    MissingTag,
    /// A node of the previous tree was never realized.
    Unrealized { what: String },
    /// A component placeholder whose `init` hook produced no instance.
    ComponentNotCreated { tag: String },
}

impl fmt::Display for PatchError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTag => write!(formatter, "element vnode has no tag"),
            Self::Unrealized { what } => write!(formatter, "{what} has no real node to patch"),
            Self::ComponentNotCreated { tag } => {
                write!(formatter, "component <{tag}> was not instantiated by its init hook")
            }
        }
    }
}

impl Error for PatchError {}
