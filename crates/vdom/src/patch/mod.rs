//! Reconciling a new virtual tree with the previous one.
//!
//! ```text
//! patch(old, new)
//!   ├─ no old        → create_elm(new)            build from scratch
//!   ├─ no new        → invoke_destroy_hook(old)   tear down
//!   ├─ same_vnode    → patch_vnode(old, new)      update in place
//!   │                    └─ update_children       four-pointer diff
//!   └─ otherwise     → create new next to old, then remove old
//! ```
//!
//! Insert hooks are queued while the tree is built and run once the whole
//! tree is attached, so `inserted`/`mounted` callbacks see a complete document.

mod children;

use crate::context::ComponentInstance;
use crate::error::PatchError;
use crate::hooks::{PendingInsert, RemoveCallback, invoke_insert_hooks};
use crate::modules::reference::register_ref;
use crate::modules::{Module, default_modules};
use crate::node::{VNode, VNodeData, VNodeKind, same_vnode};
use crate::ops::{NodeHandle, NodeOps};
use crate::tags::is_reserved_tag;
use core::cell::Cell;
use core::ops::Range;
use log::trace;
use reactive::{warn, with_config};
use std::rc::Rc;

type InsertQueue = Vec<PendingInsert>;

/// What a patch starts from.
#[derive(Copy, Clone, Debug)]
pub enum PatchSource<'old> {
    /// A real node not produced by this patcher; it is replaced.
    Element(NodeHandle),
    VNode(&'old VNode),
}

/// Outcome of [`Patcher::patch_deferred`].
#[derive(Debug, Default)]
pub struct PatchResult {
    pub elm: Option<NodeHandle>,
    /// Insert hooks of an initial patch, to be run by whoever inserts `elm`.
    pub pending_insert: Vec<PendingInsert>,
}

/// Applies virtual trees to a backend.
pub struct Patcher {
    ops: Rc<dyn NodeOps>,
    modules: Vec<Box<dyn Module>>,
    remove_listeners: usize,
    creating_in_pre: Cell<usize>,
}

impl Patcher {
    /// Patcher with the default modules.
    pub fn new(ops: Rc<dyn NodeOps>) -> Self {
        Self::with_modules(ops, default_modules())
    }

    pub fn with_modules(ops: Rc<dyn NodeOps>, modules: Vec<Box<dyn Module>>) -> Self {
        let remove_listeners = modules.iter().filter(|module| module.handles_remove()).count() + 1;
        Self {
            ops,
            modules,
            remove_listeners,
            creating_in_pre: Cell::new(0),
        }
    }

    pub fn ops(&self) -> &Rc<dyn NodeOps> {
        &self.ops
    }

    /// Bring the backend from `old` to `vnode` and return the root node.
    ///
    /// * no `old`: `vnode` is built detached; the caller inserts the result.
    /// * no `vnode`: `old` is destroyed.
    /// * `old` and `vnode` the same logical node: patched in place.
    /// * otherwise `vnode` is built next to `old`, which is then removed.
    ///
    /// # Errors
    /// Fails on backend errors, errors raised by node hooks and when the
    /// previous tree was never realized.
    pub fn patch(&self, old: Option<PatchSource<'_>>, vnode: Option<&mut VNode>) -> anyhow::Result<Option<NodeHandle>> {
        let (elm, queue) = self.patch_with_queue(old, vnode)?;
        invoke_insert_hooks(queue);
        Ok(elm)
    }

    /// Like [`patch`](Self::patch), but the insert hooks of an initial patch
    /// are handed back instead of run.
    ///
    /// Used for the first render of a child component: its hooks must wait
    /// until the parent inserted the component's root.
    ///
    /// # Errors
    /// See [`patch`](Self::patch).
    pub fn patch_deferred(&self, old: Option<PatchSource<'_>>, vnode: Option<&mut VNode>) -> anyhow::Result<PatchResult> {
        let initial = old.is_none();
        let (elm, queue) = self.patch_with_queue(old, vnode)?;
        if initial {
            return Ok(PatchResult {
                elm,
                pending_insert: queue,
            });
        }
        invoke_insert_hooks(queue);
        Ok(PatchResult {
            elm,
            pending_insert: Vec::new(),
        })
    }

    fn patch_with_queue(
        &self,
        old: Option<PatchSource<'_>>,
        vnode: Option<&mut VNode>,
    ) -> anyhow::Result<(Option<NodeHandle>, InsertQueue)> {
        let mut queue = InsertQueue::new();
        let Some(vnode) = vnode else {
            if let Some(PatchSource::VNode(old)) = old {
                self.invoke_destroy_hook(old)?;
            }
            return Ok((None, queue));
        };
        match old {
            None => self.create_elm(vnode, &mut queue, None, None, false)?,
            Some(PatchSource::VNode(old)) if same_vnode(old, vnode) => {
                self.patch_vnode(old, vnode, &mut queue)?;
            }
            Some(source) => {
                let placeholder;
                let old = match source {
                    PatchSource::VNode(old) => old,
                    PatchSource::Element(elm) => {
                        placeholder = self.empty_node_at(elm);
                        &placeholder
                    }
                };
                let old_elm = old.node_elm();
                let parent = old_elm.and_then(|elm| self.ops.parent_node(elm));
                let reference = old_elm.and_then(|elm| self.ops.next_sibling(elm));
                self.create_elm(vnode, &mut queue, parent, reference, false)?;
                if parent.is_some() {
                    self.remove_vnodes(core::slice::from_ref(old), 0..1, &[])?;
                } else if old.tag.is_some() {
                    self.invoke_destroy_hook(old)?;
                }
            }
        }
        Ok((vnode.node_elm(), queue))
    }

    fn empty_node_at(&self, elm: NodeHandle) -> VNode {
        let tag = self.ops.tag_name(elm).unwrap_or_default().to_lowercase();
        let mut vnode = VNode::element(&tag, VNodeData::new(), Vec::new());
        vnode.elm = Some(elm);
        vnode
    }

    fn create_elm(
        &self,
        vnode: &mut VNode,
        queue: &mut InsertQueue,
        parent: Option<NodeHandle>,
        reference: Option<NodeHandle>,
        nested: bool,
    ) -> anyhow::Result<()> {
        vnode.is_root_insert = !nested;
        if self.create_component(vnode, queue, parent, reference)? {
            return Ok(());
        }
        match vnode.kind {
            VNodeKind::Element => {
                let pre = vnode.data.pre;
                if pre {
                    self.creating_in_pre.set(self.creating_in_pre.get() + 1);
                }
                let created = self.create_element_node(vnode, queue, parent, reference);
                if pre {
                    self.creating_in_pre.set(self.creating_in_pre.get().saturating_sub(1));
                }
                created
            }
            VNodeKind::Comment => {
                let elm = self.ops.create_comment(vnode.text.as_deref().unwrap_or_default());
                vnode.elm = Some(elm);
                self.insert(parent, elm, reference)
            }
            VNodeKind::Text => {
                let elm = self.ops.create_text_node(vnode.text.as_deref().unwrap_or_default());
                vnode.elm = Some(elm);
                self.insert(parent, elm, reference)
            }
            VNodeKind::Component => Err(PatchError::ComponentNotCreated {
                tag: vnode.tag.as_deref().unwrap_or_default().to_owned(),
            }
            .into()),
        }
    }

    fn create_element_node(
        &self,
        vnode: &mut VNode,
        queue: &mut InsertQueue,
        parent: Option<NodeHandle>,
        reference: Option<NodeHandle>,
    ) -> anyhow::Result<()> {
        let tag = vnode.tag.clone().ok_or(PatchError::MissingTag)?;
        if self.is_unknown_element(&tag) {
            warn(&format!(
                "Unknown custom element: <{tag}> - did you register the component correctly?"
            ));
        }
        let elm = self.ops.create_element(&tag);
        trace!("Created <{tag}> as {elm:?}");
        vnode.elm = Some(elm);
        self.set_scope(vnode)?;
        self.create_children(vnode, elm, queue)?;
        self.invoke_create_hooks(vnode, queue)?;
        self.insert(parent, elm, reference)
    }

    fn is_unknown_element(&self, tag: &str) -> bool {
        self.creating_in_pre.get() == 0
            && !is_reserved_tag(tag)
            && !with_config(|config| config.ignored_elements.iter().any(|ignored| ignored == tag))
    }

    fn create_children(&self, vnode: &mut VNode, elm: NodeHandle, queue: &mut InsertQueue) -> anyhow::Result<()> {
        if vnode.children.is_empty() {
            if let Some(text) = &vnode.text {
                let text_node = self.ops.create_text_node(text);
                self.ops.append_child(elm, text_node)?;
            }
            return Ok(());
        }
        for child in &mut vnode.children {
            self.create_elm(child, queue, Some(elm), None, true)?;
        }
        Ok(())
    }

    /// Instantiate a component placeholder. Returns `false` for other nodes.
    fn create_component(
        &self,
        vnode: &mut VNode,
        queue: &mut InsertQueue,
        parent: Option<NodeHandle>,
        reference: Option<NodeHandle>,
    ) -> anyhow::Result<bool> {
        if vnode.component_instance.is_none()
            && let Some(init) = vnode.data.hook.init.clone()
        {
            init(vnode)?;
        }
        if vnode.component_instance.is_none() {
            return Ok(false);
        }
        self.init_component(vnode, queue)?;
        if let Some(elm) = vnode.node_elm() {
            self.insert(parent, elm, reference)?;
        }
        Ok(true)
    }

    fn init_component(&self, vnode: &mut VNode, queue: &mut InsertQueue) -> anyhow::Result<()> {
        let Some(instance) = vnode.component_instance.clone() else {
            return Ok(());
        };
        queue.extend(instance.take_pending_insert());
        vnode.elm = instance.root_elm();
        if is_patchable(vnode) {
            self.invoke_create_hooks(vnode, queue)?;
            self.set_scope(vnode)?;
        } else {
            // An empty root only supports refs.
            register_ref(vnode, false);
            queue.extend(PendingInsert::capture(vnode));
        }
        Ok(())
    }

    fn invoke_create_hooks(&self, vnode: &mut VNode, queue: &mut InsertQueue) -> anyhow::Result<()> {
        for module in &self.modules {
            module.create(&*self.ops, vnode)?;
        }
        if let Some(create) = vnode.data.hook.create.clone() {
            create(vnode)?;
        }
        queue.extend(PendingInsert::capture(vnode));
        Ok(())
    }

    /// Apply the owning component's style scope to the node.
    fn set_scope(&self, vnode: &VNode) -> anyhow::Result<()> {
        let Some(elm) = vnode.node_elm() else {
            return Ok(());
        };
        if let Some(scope_id) = vnode.context().and_then(|context| context.scope_id()) {
            self.ops.set_style_scope(elm, &scope_id)?;
        }
        Ok(())
    }

    /// Insert `elm` into `parent`, before `reference` if it is still a child.
    fn insert(&self, parent: Option<NodeHandle>, elm: NodeHandle, reference: Option<NodeHandle>) -> anyhow::Result<()> {
        let Some(parent) = parent else {
            return Ok(());
        };
        match reference {
            Some(reference) => {
                if self.ops.parent_node(reference) == Some(parent) {
                    self.ops.insert_before(parent, elm, reference)?;
                }
            }
            None => self.ops.append_child(parent, elm)?,
        }
        Ok(())
    }

    fn add_vnodes(
        &self,
        parent: NodeHandle,
        reference: Option<NodeHandle>,
        vnodes: &mut [VNode],
        queue: &mut InsertQueue,
    ) -> anyhow::Result<()> {
        for vnode in vnodes {
            self.create_elm(vnode, queue, Some(parent), reference, false)?;
        }
        Ok(())
    }

    /// Remove `vnodes[range]`, skipping positions flagged in `taken`.
    fn remove_vnodes(&self, vnodes: &[VNode], range: Range<usize>, taken: &[bool]) -> anyhow::Result<()> {
        for index in range {
            if taken.get(index).copied().unwrap_or(false) {
                continue;
            }
            let Some(vnode) = vnodes.get(index) else {
                continue;
            };
            if vnode.tag.is_some() {
                self.remove_and_invoke_remove_hook(vnode, None)?;
                self.invoke_destroy_hook(vnode)?;
            } else if let Some(elm) = vnode.elm {
                self.remove_node(elm)?;
            }
        }
        Ok(())
    }

    fn remove_and_invoke_remove_hook(&self, vnode: &VNode, remove: Option<RemoveCallback>) -> anyhow::Result<()> {
        let remove = match remove {
            Some(remove) => {
                remove.add_listeners(self.remove_listeners);
                remove
            }
            None => RemoveCallback::new(Rc::clone(&self.ops), vnode.node_elm(), self.remove_listeners),
        };
        if let Some(instance) = &vnode.component_instance {
            // The component's own root shares the callback.
            let mut nested = Ok(());
            instance.with_root_vnode(&mut |root| {
                if nested.is_ok() && root.tag.is_some() {
                    nested = self.remove_and_invoke_remove_hook(root, Some(remove.clone()));
                }
            });
            nested?;
        }
        for module in self.modules.iter().filter(|module| module.handles_remove()) {
            module.remove(vnode, remove.clone())?;
        }
        match vnode.data.hook.remove.clone() {
            Some(hook) => hook(vnode, remove),
            None => remove.call(),
        }
    }

    fn remove_node(&self, elm: NodeHandle) -> anyhow::Result<()> {
        if let Some(parent) = self.ops.parent_node(elm) {
            self.ops.remove_child(parent, elm)?;
        }
        Ok(())
    }

    /// Run `destroy` hooks of `vnode` and its whole subtree.
    ///
    /// # Errors
    /// Propagates errors raised by the hooks.
    pub fn invoke_destroy_hook(&self, vnode: &VNode) -> anyhow::Result<()> {
        if let Some(destroy) = vnode.data.hook.destroy.clone() {
            destroy(vnode)?;
        }
        for module in &self.modules {
            module.destroy(&*self.ops, vnode)?;
        }
        for child in &vnode.children {
            self.invoke_destroy_hook(child)?;
        }
        Ok(())
    }

    /// Patch `vnode` in place of `old`, which [`same_vnode`] matched.
    fn patch_vnode(&self, old: &VNode, vnode: &mut VNode, queue: &mut InsertQueue) -> anyhow::Result<()> {
        vnode.elm = old.elm;
        // Cached static trees are reused as they are.
        if vnode.is_static && old.is_static && vnode.data.key == old.data.key && (vnode.is_cloned || vnode.is_once) {
            vnode.component_instance = old.component_instance.clone();
            return Ok(());
        }
        if let Some(prepatch) = vnode.data.hook.prepatch.clone() {
            prepatch(old, vnode)?;
        }
        if is_patchable(vnode) {
            for module in &self.modules {
                module.update(&*self.ops, old, vnode)?;
            }
            if let Some(update) = vnode.data.hook.update.clone() {
                update(old, vnode)?;
            }
        }
        match vnode.text.clone() {
            None => self.patch_children(old, vnode, queue)?,
            Some(text) => {
                if old.text.as_deref() != Some(&*text) {
                    if !old.children.is_empty() {
                        self.remove_vnodes(&old.children, 0..old.children.len(), &[])?;
                    }
                    let elm = realized(vnode)?;
                    self.ops.set_text_content(elm, &text)?;
                }
            }
        }
        if let Some(postpatch) = vnode.data.hook.postpatch.clone() {
            postpatch(old, vnode)?;
        }
        Ok(())
    }

    fn patch_children(&self, old: &VNode, vnode: &mut VNode, queue: &mut InsertQueue) -> anyhow::Result<()> {
        match (old.children.is_empty(), vnode.children.is_empty()) {
            (false, false) => {
                let elm = realized(vnode)?;
                self.update_children(elm, &old.children, &mut vnode.children, queue)
            }
            (true, false) => {
                let elm = realized(vnode)?;
                if old.text.is_some() {
                    self.ops.set_text_content(elm, "")?;
                }
                self.add_vnodes(elm, None, &mut vnode.children, queue)
            }
            (false, true) => self.remove_vnodes(&old.children, 0..old.children.len(), &[]),
            (true, true) => {
                if old.text.is_some()
                    && let Some(elm) = vnode.elm
                {
                    self.ops.set_text_content(elm, "")?;
                }
                Ok(())
            }
        }
    }
}

/// Whether module hooks apply: the node, or the root its component
/// rendered, is an element.
fn is_patchable(vnode: &VNode) -> bool {
    vnode
        .component_instance
        .as_ref()
        .map_or_else(|| vnode.tag.is_some(), |instance| instance.root_is_element())
}

fn realized(vnode: &VNode) -> anyhow::Result<NodeHandle> {
    vnode.node_elm().ok_or_else(|| {
        PatchError::Unrealized {
            what: vnode
                .tag
                .as_deref()
                .map_or_else(|| String::from("text node"), |tag| format!("<{tag}>")),
        }
        .into()
    })
}

/// Whether the instance's root node is currently attached somewhere.
pub fn is_attached(ops: &dyn NodeOps, instance: &dyn ComponentInstance) -> bool {
    instance
        .root_elm()
        .is_some_and(|elm| ops.parent_node(elm).is_some())
}
