//! In-memory document backend for the patcher.
//!
//! [`Document`] implements [`vdom::NodeOps`] over an arena tree, records every
//! change as a [`DomUpdate`] and can stream those batches to any number of
//! [`DomMirror`]s, e.g. a renderer living on another task.

pub mod document;
pub mod error;

pub use document::{Document, DomMirror, DomNode, DomSubscriber, DomUpdate, NodeKind};
pub use error::DomError;
