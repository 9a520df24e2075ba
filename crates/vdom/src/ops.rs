//! The operations the patch engine needs from an output backend.
//!
//! The engine never touches real nodes itself. Every creation, insertion,
//! move and attribute write goes through a [`NodeOps`] implementation, so the
//! same diff drives an in-memory document, a terminal renderer or a test
//! double that only counts calls.

use core::fmt;
use reactive::Value;
use std::rc::Rc;

/// Opaque handle of a node owned by the backend.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeHandle(pub u64);

impl fmt::Debug for NodeHandle {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "NodeHandle({})", self.0)
    }
}

/// An event delivered by the backend to a listener.
#[derive(Clone, Debug)]
pub struct DomEvent {
    pub name: Rc<str>,
    /// `None` for component events emitted before the component rendered.
    pub target: Option<NodeHandle>,
    pub detail: Value,
}

impl DomEvent {
    pub fn new(name: &str, target: NodeHandle) -> Self {
        Self::with_target(name, Some(target))
    }

    pub fn with_target(name: &str, target: Option<NodeHandle>) -> Self {
        Self {
            name: Rc::from(name),
            target,
            detail: Value::Null,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// Listener the backend stores per node and event name.
pub type EventHandler = Rc<dyn Fn(&DomEvent)>;

/// Node operations of an output backend.
///
/// Methods take `&self`: backends use interior mutability so that the
/// patcher, event handlers and mirrors can share one instance.
pub trait NodeOps {
    fn create_element(&self, tag: &str) -> NodeHandle;

    fn create_text_node(&self, text: &str) -> NodeHandle;

    fn create_comment(&self, text: &str) -> NodeHandle;

    /// Insert `node` into `parent` right before `reference`.
    ///
    /// A node that is already attached somewhere is moved.
    ///
    /// # Errors
    /// Fails when a handle is unknown or `reference` is not a child of `parent`.
    fn insert_before(&self, parent: NodeHandle, node: NodeHandle, reference: NodeHandle) -> anyhow::Result<()>;

    /// Append `node` as the last child of `parent`, moving it if attached.
    ///
    /// # Errors
    /// Fails when a handle is unknown.
    fn append_child(&self, parent: NodeHandle, node: NodeHandle) -> anyhow::Result<()>;

    /// # Errors
    /// Fails when a handle is unknown or `node` is not a child of `parent`.
    fn remove_child(&self, parent: NodeHandle, node: NodeHandle) -> anyhow::Result<()>;

    fn parent_node(&self, node: NodeHandle) -> Option<NodeHandle>;

    fn next_sibling(&self, node: NodeHandle) -> Option<NodeHandle>;

    /// Tag of an element, `None` for text and comments.
    fn tag_name(&self, node: NodeHandle) -> Option<String>;

    /// Replace the content of `node` with `text`.
    ///
    /// # Errors
    /// Fails when the handle is unknown.
    fn set_text_content(&self, node: NodeHandle, text: &str) -> anyhow::Result<()>;

    /// Mark `node` with a component style scope.
    ///
    /// # Errors
    /// Fails when the handle is unknown.
    fn set_style_scope(&self, node: NodeHandle, scope_id: &str) -> anyhow::Result<()>;

    /// # Errors
    /// Fails when the handle is unknown.
    fn set_attribute(&self, node: NodeHandle, name: &str, value: &str) -> anyhow::Result<()>;

    /// # Errors
    /// Fails when the handle is unknown.
    fn remove_attribute(&self, node: NodeHandle, name: &str) -> anyhow::Result<()>;

    /// Install or clear (`None`) the single listener for `event` on `node`.
    ///
    /// # Errors
    /// Fails when the handle is unknown.
    fn set_event_listener(&self, node: NodeHandle, event: &str, handler: Option<EventHandler>) -> anyhow::Result<()>;
}
