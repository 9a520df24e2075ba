//! Cross-cutting concerns applied to every realized node.
//!
//! The patcher runs each module's hooks around the node's own hooks:
//! `create` once the element exists, `update` while patching it, `destroy`
//! when its subtree is torn down and `remove` before it is detached.

pub mod attrs;
pub mod directives;
pub mod events;
pub mod reference;

use crate::hooks::RemoveCallback;
use crate::node::VNode;
use crate::ops::NodeOps;

pub use attrs::AttrsModule;
pub use directives::DirectivesModule;
pub use events::EventsModule;
pub use reference::RefModule;

pub trait Module {
    fn name(&self) -> &'static str;

    /// # Errors
    /// Propagates backend failures.
    fn create(&self, _ops: &dyn NodeOps, _vnode: &mut VNode) -> anyhow::Result<()> {
        Ok(())
    }

    /// # Errors
    /// Propagates backend failures.
    fn update(&self, _ops: &dyn NodeOps, _old: &VNode, _vnode: &mut VNode) -> anyhow::Result<()> {
        Ok(())
    }

    /// # Errors
    /// Propagates backend failures.
    fn destroy(&self, _ops: &dyn NodeOps, _vnode: &VNode) -> anyhow::Result<()> {
        Ok(())
    }

    /// Whether [`Module::remove`] holds on to the node, e.g. for a leave
    /// transition.
    fn handles_remove(&self) -> bool {
        false
    }

    /// Called before the node is detached. Must eventually call `remove`.
    ///
    /// # Errors
    /// Propagates backend failures.
    fn remove(&self, _vnode: &VNode, remove: RemoveCallback) -> anyhow::Result<()> {
        remove.call()
    }
}

/// Attributes, listeners, refs and directives, in that order.
pub fn default_modules() -> Vec<Box<dyn Module>> {
    vec![
        Box::new(AttrsModule),
        Box::new(EventsModule),
        Box::new(RefModule),
        Box::new(DirectivesModule),
    ]
}
