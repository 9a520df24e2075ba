//! Per-node lifecycle hooks.

use crate::node::VNode;
use crate::ops::{NodeHandle, NodeOps};
use core::cell::Cell;
use core::fmt;
use log::trace;
use reactive::handle_error;
use std::rc::Rc;

/// Creates the component instance of a placeholder.
pub type InitHook = Rc<dyn Fn(&mut VNode) -> anyhow::Result<()>>;
/// Runs before a node is patched against its previous version.
pub type PrepatchHook = Rc<dyn Fn(&VNode, &mut VNode) -> anyhow::Result<()>>;
/// `create`, `insert` and `destroy`.
pub type VNodeHook = Rc<dyn Fn(&VNode) -> anyhow::Result<()>>;
/// `update` and `postpatch`, receiving the previous and the current node.
pub type UpdateHook = Rc<dyn Fn(&VNode, &VNode) -> anyhow::Result<()>>;
/// Receives the node and the callback that finally detaches it.
pub type RemoveHook = Rc<dyn Fn(&VNode, RemoveCallback) -> anyhow::Result<()>>;

#[derive(Clone, Default)]
pub struct VNodeHooks {
    pub init: Option<InitHook>,
    pub prepatch: Option<PrepatchHook>,
    pub create: Option<VNodeHook>,
    pub insert: Option<VNodeHook>,
    pub update: Option<UpdateHook>,
    pub postpatch: Option<UpdateHook>,
    pub remove: Option<RemoveHook>,
    pub destroy: Option<VNodeHook>,
}

impl fmt::Debug for VNodeHooks {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            ("init", self.init.is_some()),
            ("prepatch", self.prepatch.is_some()),
            ("create", self.create.is_some()),
            ("insert", self.insert.is_some()),
            ("update", self.update.is_some()),
            ("postpatch", self.postpatch.is_some()),
            ("remove", self.remove.is_some()),
            ("destroy", self.destroy.is_some()),
        ];
        formatter
            .debug_list()
            .entries(names.iter().filter(|(_, set)| *set).map(|(name, _)| name))
            .finish()
    }
}

/// A hook appended to a node after it was built.
pub enum MergedHook {
    Insert(VNodeHook),
    Postpatch(UpdateHook),
}

/// Append `hook` to the matching slot of `hooks`.
///
/// Hooks already in the slot run first. The appended hook runs at most once
/// even when the node data is shared between several patches.
pub fn merge_vnode_hook(hooks: &mut VNodeHooks, hook: MergedHook) {
    let fired = Rc::new(Cell::new(false));
    match hook {
        MergedHook::Insert(hook) => {
            let once: VNodeHook = Rc::new(move |vnode: &VNode| {
                if fired.replace(true) {
                    return Ok(());
                }
                hook(vnode)
            });
            hooks.insert = Some(match hooks.insert.take() {
                Some(previous) => Rc::new(move |vnode: &VNode| {
                    previous(vnode)?;
                    once(vnode)
                }),
                None => once,
            });
        }
        MergedHook::Postpatch(hook) => {
            let once: UpdateHook = Rc::new(move |old: &VNode, vnode: &VNode| {
                if fired.replace(true) {
                    return Ok(());
                }
                hook(old, vnode)
            });
            hooks.postpatch = Some(match hooks.postpatch.take() {
                Some(previous) => Rc::new(move |old: &VNode, vnode: &VNode| {
                    previous(old, vnode)?;
                    once(old, vnode)
                }),
                None => once,
            });
        }
    }
}

struct RemoveState {
    ops: Rc<dyn NodeOps>,
    elm: Option<NodeHandle>,
    listeners: Cell<usize>,
}

/// Detaches a node once every party holding it has called back.
///
/// Each module with a remove hook and the node's own `remove` hook count as
/// one listener; the node leaves its parent when the last one calls.
#[derive(Clone)]
pub struct RemoveCallback(Rc<RemoveState>);

impl RemoveCallback {
    pub(crate) fn new(ops: Rc<dyn NodeOps>, elm: Option<NodeHandle>, listeners: usize) -> Self {
        Self(Rc::new(RemoveState {
            ops,
            elm,
            listeners: Cell::new(listeners),
        }))
    }

    pub(crate) fn add_listeners(&self, count: usize) {
        self.0.listeners.set(self.0.listeners.get() + count);
    }

    /// Callers still expected to call back.
    pub fn pending(&self) -> usize {
        self.0.listeners.get()
    }

    /// Report that this listener is done with the node.
    ///
    /// # Errors
    /// Propagates backend failures while detaching.
    pub fn call(&self) -> anyhow::Result<()> {
        let remaining = self.0.listeners.get().saturating_sub(1);
        self.0.listeners.set(remaining);
        if remaining > 0 {
            return Ok(());
        }
        let Some(elm) = self.0.elm else {
            return Ok(());
        };
        // Already detached nodes have no parent.
        if let Some(parent) = self.0.ops.parent_node(elm) {
            trace!("Removing {elm:?} from {parent:?}");
            self.0.ops.remove_child(parent, elm)?;
        }
        Ok(())
    }
}

/// A node whose `insert` hook runs once the whole patch is in place.
pub struct PendingInsert {
    vnode: VNode,
    hook: VNodeHook,
}

impl PendingInsert {
    /// Snapshot of `vnode` if it has an `insert` hook.
    pub fn capture(vnode: &VNode) -> Option<Self> {
        let hook = vnode.data.hook.insert.clone()?;
        Some(Self {
            vnode: vnode.shallow_clone(),
            hook,
        })
    }

    pub fn vnode(&self) -> &VNode {
        &self.vnode
    }

    /// Run the hook, routing failures to the node's component.
    pub fn invoke(&self) {
        if let Err(err) = (self.hook)(&self.vnode) {
            let scope = self.vnode.context().and_then(|context| context.error_scope());
            handle_error(&err, scope.as_ref(), "insert hook");
        }
    }
}

impl fmt::Debug for PendingInsert {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("PendingInsert")
            .field("vnode", &self.vnode)
            .finish_non_exhaustive()
    }
}

/// Invoke queued insert hooks in order.
pub fn invoke_insert_hooks(queue: Vec<PendingInsert>) {
    for pending in queue {
        pending.invoke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::VNodeData;
    use core::cell::RefCell;

    #[test]
    fn merged_hooks_run_in_order_and_once() -> anyhow::Result<()> {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let first = Rc::clone(&calls);
        let second = Rc::clone(&calls);
        let mut hooks = VNodeHooks {
            insert: Some(Rc::new(move |_: &VNode| {
                first.borrow_mut().push("own");
                Ok(())
            })),
            ..VNodeHooks::default()
        };
        merge_vnode_hook(
            &mut hooks,
            MergedHook::Insert(Rc::new(move |_: &VNode| {
                second.borrow_mut().push("merged");
                Ok(())
            })),
        );
        let vnode = VNode::element("div", VNodeData::new(), Vec::new());
        let insert = hooks
            .insert
            .clone()
            .ok_or_else(|| anyhow::anyhow!("insert hook missing"))?;
        insert(&vnode)?;
        insert(&vnode)?;
        assert_eq!(calls.borrow().as_slice(), ["own", "merged", "own"]);
        Ok(())
    }
}
