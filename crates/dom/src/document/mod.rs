use crate::error::DomError;
use core::cell::RefCell;
use indextree::{Arena, NodeId};
use log::{debug, trace};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::rc::Rc;
use tokio::sync::broadcast;
use vdom::{DomEvent, EventHandler, NodeHandle, NodeOps};

pub mod printing;
pub mod updating;

pub use updating::{DomMirror, DomSubscriber, DomUpdate};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeKind {
    #[default]
    Document,
    Element {
        tag: String,
    },
    Text {
        text: String,
    },
    Comment {
        text: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DomNode {
    pub handle: NodeHandle,
    pub kind: NodeKind,
    pub attrs: SmallVec<(String, String), 4>,
    pub style_scope: Option<String>,
    /// Set once the node was first inserted; later insertions are moves.
    attached: bool,
}

struct Tree {
    arena: Arena<DomNode>,
    root: NodeId,
    ids: FxHashMap<NodeHandle, NodeId>,
    next_handle: u64,
    pending: Vec<DomUpdate>,
}

impl Tree {
    fn id(&self, handle: NodeHandle) -> Result<NodeId, DomError> {
        self.ids.get(&handle).copied().ok_or(DomError::UnknownNode(handle))
    }

    fn node(&self, handle: NodeHandle) -> Result<&DomNode, DomError> {
        let id = self.id(handle)?;
        self.arena
            .get(id)
            .map(indextree::Node::get)
            .ok_or(DomError::UnknownNode(handle))
    }

    fn node_mut(&mut self, handle: NodeHandle) -> Result<&mut DomNode, DomError> {
        let id = self.id(handle)?;
        self.arena
            .get_mut(id)
            .map(indextree::Node::get_mut)
            .ok_or(DomError::UnknownNode(handle))
    }

    fn handle_of(&self, id: NodeId) -> Option<NodeHandle> {
        self.arena.get(id).map(|node| node.get().handle)
    }

    fn new_node(&mut self, kind: NodeKind) -> NodeHandle {
        self.next_handle += 1;
        let handle = NodeHandle(self.next_handle);
        let id = self.arena.new_node(DomNode {
            handle,
            kind,
            ..DomNode::default()
        });
        self.ids.insert(handle, id);
        handle
    }

    /// Drop the detached subtree at `id` from the arena and the handle map.
    ///
    /// Returns the handles that were freed.
    fn free_subtree(&mut self, id: NodeId) -> Vec<NodeHandle> {
        let freed: Vec<NodeHandle> = id
            .descendants(&self.arena)
            .filter_map(|descendant| self.handle_of(descendant))
            .collect();
        for handle in &freed {
            self.ids.remove(handle);
        }
        id.remove_subtree(&mut self.arena);
        trace!("Freed {} nodes", freed.len());
        freed
    }

    /// Record the insertion of `node`, now placed under `parent`.
    fn record_insert(&mut self, parent: NodeHandle, node: NodeHandle) -> Result<(), DomError> {
        let id = self.id(node)?;
        let pos = id.preceding_siblings(&self.arena).count() - 1;
        let dom_node = self.node_mut(node)?;
        let first = !dom_node.attached;
        dom_node.attached = true;
        let update = if first {
            match dom_node.kind.clone() {
                NodeKind::Element { tag } => DomUpdate::InsertElement { parent, node, tag, pos },
                NodeKind::Text { text } => DomUpdate::InsertText { parent, node, text, pos },
                NodeKind::Comment { text } => DomUpdate::InsertComment { parent, node, text, pos },
                NodeKind::Document => return Err(DomError::InvalidInsert(node)),
            }
        } else {
            DomUpdate::MoveNode { parent, node, pos }
        };
        trace!("{update:?}");
        self.pending.push(update);
        Ok(())
    }
}

/// An in-memory document the patcher renders into.
///
/// Nodes live in an arena and are addressed by [`NodeHandle`]. Every
/// structural or attribute change is recorded as a [`DomUpdate`]; the
/// recorded batch is drained with [`take_updates`](Self::take_updates) or
/// forwarded to [`DomMirror`]s with [`publish`](Self::publish).
pub struct Document {
    tree: RefCell<Tree>,
    listeners: RefCell<FxHashMap<NodeHandle, SmallVec<(Rc<str>, EventHandler), 2>>>,
    update_sender: Option<broadcast::Sender<Vec<DomUpdate>>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root_handle = NodeHandle(0);
        let root = arena.new_node(DomNode {
            handle: root_handle,
            attached: true,
            ..DomNode::default()
        });
        let mut ids = FxHashMap::default();
        ids.insert(root_handle, root);
        Self {
            tree: RefCell::new(Tree {
                arena,
                root,
                ids,
                next_handle: 0,
                pending: Vec::new(),
            }),
            listeners: RefCell::new(FxHashMap::default()),
            update_sender: None,
        }
    }

    /// A document forwarding its batches to `sender` on [`publish`](Self::publish).
    pub fn with_publisher(sender: broadcast::Sender<Vec<DomUpdate>>) -> Self {
        Self {
            update_sender: Some(sender),
            ..Self::new()
        }
    }

    /// The document node; mount roots are appended here.
    pub fn root(&self) -> NodeHandle {
        let tree = self.tree.borrow();
        tree.handle_of(tree.root).unwrap_or(NodeHandle(0))
    }

    /// Updates recorded since the last call.
    pub fn take_updates(&self) -> Vec<DomUpdate> {
        core::mem::take(&mut self.tree.borrow_mut().pending)
    }

    /// Send the recorded updates to subscribed mirrors.
    ///
    /// Returns the number of updates sent. Without a publisher the updates
    /// are dropped.
    ///
    /// # Errors
    /// Fails when every receiver has been dropped.
    pub fn publish(&self) -> anyhow::Result<usize> {
        let batch = self.take_updates();
        let count = batch.len();
        if count == 0 {
            return Ok(0);
        }
        if let Some(sender) = &self.update_sender {
            sender.send(batch)?;
            debug!("Published {count} DOM updates");
        }
        Ok(count)
    }

    pub fn kind(&self, node: NodeHandle) -> Option<NodeKind> {
        self.tree.borrow().node(node).ok().map(|dom_node| dom_node.kind.clone())
    }

    pub fn children(&self, node: NodeHandle) -> Vec<NodeHandle> {
        let tree = self.tree.borrow();
        let Ok(id) = tree.id(node) else {
            return Vec::new();
        };
        id.children(&tree.arena).filter_map(|child| tree.handle_of(child)).collect()
    }

    pub fn attribute(&self, node: NodeHandle, name: &str) -> Option<String> {
        let tree = self.tree.borrow();
        let dom_node = tree.node(node).ok()?;
        dom_node
            .attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.clone())
    }

    pub fn style_scope(&self, node: NodeHandle) -> Option<String> {
        self.tree.borrow().node(node).ok()?.style_scope.clone()
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeHandle) -> String {
        let tree = self.tree.borrow();
        let Ok(id) = tree.id(node) else {
            return String::new();
        };
        id.descendants(&tree.arena)
            .filter_map(|descendant| tree.arena.get(descendant))
            .filter_map(|descendant| match &descendant.get().kind {
                NodeKind::Text { text } => Some(text.as_str()),
                NodeKind::Document | NodeKind::Element { .. } | NodeKind::Comment { .. } => None,
            })
            .collect()
    }

    /// Live nodes, the document node included.
    pub fn node_count(&self) -> usize {
        self.tree.borrow().ids.len()
    }

    /// Installed listeners over all nodes.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().values().map(SmallVec::len).sum()
    }

    fn forget_listeners(&self, freed: &[NodeHandle]) {
        let mut listeners = self.listeners.borrow_mut();
        for handle in freed {
            listeners.remove(handle);
        }
    }

    /// Whether a listener for `event` is installed on `node`.
    pub fn has_listener(&self, node: NodeHandle, event: &str) -> bool {
        self.listeners
            .borrow()
            .get(&node)
            .is_some_and(|installed| installed.iter().any(|(name, _)| &**name == event))
    }

    /// Dispatch `event` at its target and bubble it up the ancestors.
    ///
    /// Returns how many handlers ran. An event without a target reaches no one.
    pub fn dispatch(&self, event: &DomEvent) -> usize {
        let Some(target) = event.target else {
            return 0;
        };
        let mut path = vec![target];
        let mut current = target;
        while let Some(parent) = self.parent_node(current) {
            path.push(parent);
            current = parent;
        }
        let mut handled = 0;
        for node in path {
            // Handlers may install or remove listeners.
            let handler = self.listeners.borrow().get(&node).and_then(|installed| {
                installed
                    .iter()
                    .find(|(name, _)| *name == event.name)
                    .map(|(_, handler)| Rc::clone(handler))
            });
            if let Some(handler) = handler {
                handler(event);
                handled += 1;
            }
        }
        handled
    }

    /// Dispatch an event named `name` without payload at `target`.
    pub fn dispatch_event(&self, target: NodeHandle, name: &str) -> usize {
        self.dispatch(&DomEvent::new(name, target))
    }

    fn set_kind_text(&self, node: NodeHandle, text: &str) -> Result<bool, DomError> {
        let mut tree = self.tree.borrow_mut();
        let dom_node = tree.node_mut(node)?;
        match &mut dom_node.kind {
            NodeKind::Text { text: current } | NodeKind::Comment { text: current } => {
                text.clone_into(current);
                Ok(true)
            }
            NodeKind::Document | NodeKind::Element { .. } => Ok(false),
        }
    }
}

impl NodeOps for Document {
    fn create_element(&self, tag: &str) -> NodeHandle {
        self.tree.borrow_mut().new_node(NodeKind::Element { tag: tag.to_owned() })
    }

    fn create_text_node(&self, text: &str) -> NodeHandle {
        self.tree.borrow_mut().new_node(NodeKind::Text { text: text.to_owned() })
    }

    fn create_comment(&self, text: &str) -> NodeHandle {
        self.tree.borrow_mut().new_node(NodeKind::Comment { text: text.to_owned() })
    }

    fn insert_before(&self, parent: NodeHandle, node: NodeHandle, reference: NodeHandle) -> anyhow::Result<()> {
        let mut tree = self.tree.borrow_mut();
        let parent_id = tree.id(parent)?;
        let node_id = tree.id(node)?;
        let reference_id = tree.id(reference)?;
        if reference_id.parent(&tree.arena) != Some(parent_id) {
            return Err(DomError::NotAChild { parent, node: reference }.into());
        }
        node_id.detach(&mut tree.arena);
        reference_id.checked_insert_before(node_id, &mut tree.arena)?;
        tree.record_insert(parent, node)?;
        Ok(())
    }

    fn append_child(&self, parent: NodeHandle, node: NodeHandle) -> anyhow::Result<()> {
        let mut tree = self.tree.borrow_mut();
        let parent_id = tree.id(parent)?;
        let node_id = tree.id(node)?;
        node_id.detach(&mut tree.arena);
        parent_id.checked_append(node_id, &mut tree.arena)?;
        tree.record_insert(parent, node)?;
        Ok(())
    }

    fn remove_child(&self, parent: NodeHandle, node: NodeHandle) -> anyhow::Result<()> {
        let mut tree = self.tree.borrow_mut();
        let parent_id = tree.id(parent)?;
        let node_id = tree.id(node)?;
        if node_id.parent(&tree.arena) != Some(parent_id) {
            return Err(DomError::NotAChild { parent, node }.into());
        }
        node_id.detach(&mut tree.arena);
        tree.pending.push(DomUpdate::RemoveNode { node });
        let freed = tree.free_subtree(node_id);
        drop(tree);
        self.forget_listeners(&freed);
        Ok(())
    }

    fn parent_node(&self, node: NodeHandle) -> Option<NodeHandle> {
        let tree = self.tree.borrow();
        let parent = tree.id(node).ok()?.parent(&tree.arena)?;
        tree.handle_of(parent)
    }

    fn next_sibling(&self, node: NodeHandle) -> Option<NodeHandle> {
        let tree = self.tree.borrow();
        let id = tree.id(node).ok()?;
        let sibling = tree.arena.get(id)?.next_sibling()?;
        tree.handle_of(sibling)
    }

    fn tag_name(&self, node: NodeHandle) -> Option<String> {
        match self.tree.borrow().node(node).ok()?.kind.clone() {
            NodeKind::Element { tag } => Some(tag.to_uppercase()),
            NodeKind::Document | NodeKind::Text { .. } | NodeKind::Comment { .. } => None,
        }
    }

    fn set_text_content(&self, node: NodeHandle, text: &str) -> anyhow::Result<()> {
        if !self.set_kind_text(node, text)? {
            // Elements drop their children for a single text node.
            let mut tree = self.tree.borrow_mut();
            let id = tree.id(node)?;
            let children: Vec<NodeId> = id.children(&tree.arena).collect();
            let mut freed = Vec::new();
            for child in children {
                child.detach(&mut tree.arena);
                freed.extend(tree.free_subtree(child));
            }
            self.forget_listeners(&freed);
            if !text.is_empty() {
                let text_handle = tree.new_node(NodeKind::Text { text: text.to_owned() });
                let text_id = tree.id(text_handle)?;
                id.checked_append(text_id, &mut tree.arena)?;
                if let Some(dom_node) = tree.arena.get_mut(text_id) {
                    dom_node.get_mut().attached = true;
                }
            }
        }
        self.tree.borrow_mut().pending.push(DomUpdate::SetText {
            node,
            text: text.to_owned(),
        });
        Ok(())
    }

    fn set_style_scope(&self, node: NodeHandle, scope_id: &str) -> anyhow::Result<()> {
        let mut tree = self.tree.borrow_mut();
        tree.node_mut(node)?.style_scope = Some(scope_id.to_owned());
        tree.pending.push(DomUpdate::SetStyleScope {
            node,
            scope: scope_id.to_owned(),
        });
        Ok(())
    }

    fn set_attribute(&self, node: NodeHandle, name: &str, value: &str) -> anyhow::Result<()> {
        let mut tree = self.tree.borrow_mut();
        let dom_node = tree.node_mut(node)?;
        match dom_node.attrs.iter_mut().find(|(attr, _)| attr == name) {
            Some((_, current)) => value.clone_into(current),
            None => dom_node.attrs.push((name.to_owned(), value.to_owned())),
        }
        tree.pending.push(DomUpdate::SetAttr {
            node,
            name: name.to_owned(),
            value: value.to_owned(),
        });
        Ok(())
    }

    fn remove_attribute(&self, node: NodeHandle, name: &str) -> anyhow::Result<()> {
        let mut tree = self.tree.borrow_mut();
        tree.node_mut(node)?.attrs.retain(|(attr, _)| attr != name);
        tree.pending.push(DomUpdate::RemoveAttr {
            node,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn set_event_listener(&self, node: NodeHandle, event: &str, handler: Option<EventHandler>) -> anyhow::Result<()> {
        let known = self.tree.borrow().ids.contains_key(&node);
        let mut listeners = self.listeners.borrow_mut();
        let Some(handler) = handler else {
            if let Some(installed) = listeners.get_mut(&node) {
                installed.retain(|(name, _)| &**name != event);
                if installed.is_empty() {
                    listeners.remove(&node);
                }
            }
            return Ok(());
        };
        if !known {
            return Err(DomError::UnknownNode(node).into());
        }
        let installed = listeners.entry(node).or_default();
        installed.retain(|(name, _)| &**name != event);
        installed.push((Rc::from(event), handler));
        Ok(())
    }
}
