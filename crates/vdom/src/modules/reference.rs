use super::Module;
use crate::context::RefTarget;
use crate::node::VNode;
use crate::ops::NodeOps;
use std::rc::Rc;

/// Registers `ref` names with the owning component.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefModule;

impl Module for RefModule {
    fn name(&self) -> &'static str {
        "ref"
    }

    fn create(&self, _ops: &dyn NodeOps, vnode: &mut VNode) -> anyhow::Result<()> {
        register_ref(vnode, false);
        Ok(())
    }

    fn update(&self, _ops: &dyn NodeOps, old: &VNode, vnode: &mut VNode) -> anyhow::Result<()> {
        if old.data.ref_name != vnode.data.ref_name {
            register_ref(old, true);
            register_ref(vnode, false);
        }
        Ok(())
    }

    fn destroy(&self, _ops: &dyn NodeOps, vnode: &VNode) -> anyhow::Result<()> {
        register_ref(vnode, true);
        Ok(())
    }
}

/// Add or remove the ref of `vnode` in its component's registry.
///
/// Component placeholders register the component, everything else its node.
pub fn register_ref(vnode: &VNode, removal: bool) {
    let Some(name) = &vnode.data.ref_name else {
        return;
    };
    let Some(context) = vnode.context() else {
        return;
    };
    let target = match (&vnode.component_instance, vnode.elm) {
        (Some(instance), _) => RefTarget::Component(Rc::clone(instance)),
        (None, Some(elm)) => RefTarget::Node(elm),
        (None, None) => return,
    };
    let mut refs = context.refs().borrow_mut();
    if removal {
        refs.unregister(name, &target);
    } else {
        refs.register(name, target, vnode.data.ref_in_for);
    }
}
