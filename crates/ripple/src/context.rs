//! What render functions see of their component.

use crate::component::Component;
use reactive::Value;
use std::rc::Rc;
use vdom::{Child, DomEvent, Normalization, VNode, VNodeContext, VNodeData, create_element};

/// Render context handed to a component's render function.
///
/// Reads made through it are tracked by the component's render watcher, so
/// the component re-renders when any of them change.
pub struct RenderContext<'render> {
    component: &'render Component,
    owner: Rc<dyn VNodeContext>,
}

impl<'render> RenderContext<'render> {
    pub(crate) fn new(component: &'render Component) -> Self {
        Self {
            component,
            owner: component.as_vnode_context(),
        }
    }

    /// The component being rendered.
    #[inline]
    pub const fn component(&self) -> &Component {
        self.component
    }

    /// Tracked read of a prop, data field, computed property or injection.
    #[inline]
    pub fn get(&self, key: &str) -> Value {
        self.component.get(key)
    }

    /// Tracked read of `key` as display text.
    pub fn text_of(&self, key: &str) -> String {
        self.get(key).to_display_string()
    }

    /// Build an element, or a child component registered under `tag`.
    ///
    /// Children are fully normalized: text is merged and list items get
    /// default keys.
    pub fn h(&self, tag: &str, data: VNodeData, children: Vec<Child>) -> VNode {
        create_element(Some(&self.owner), tag, data, children, Normalization::Full)
    }

    /// Like [`h`](Self::h) for children that are already nodes.
    pub fn element(&self, tag: &str, data: VNodeData, children: Vec<VNode>) -> VNode {
        create_element(
            Some(&self.owner),
            tag,
            data,
            children.into_iter().map(Child::Node).collect(),
            Normalization::Simple,
        )
    }

    pub fn text(&self, text: &str) -> VNode {
        VNode::text(text)
    }

    pub fn empty(&self) -> VNode {
        VNode::empty()
    }

    /// Static subtree `index`, cached across renders outside loops.
    pub fn render_static(&self, index: usize, in_for: bool) -> VNode {
        self.component.render_static(self, index, in_for)
    }

    /// Copies of the content the parent passed between the component's tags.
    pub fn slot(&self) -> Vec<VNode> {
        self.component.slot_content()
    }

    /// Listener that runs `handler` on this component.
    ///
    /// Holds the component weakly; events arriving after it was dropped are
    /// ignored.
    pub fn handler(
        &self,
        handler: impl Fn(&Component, &DomEvent) -> anyhow::Result<()> + 'static,
    ) -> impl Fn(&DomEvent) -> anyhow::Result<()> + 'static {
        let owner = self.component.downgrade();
        move |event: &DomEvent| match owner.upgrade() {
            Some(component) => handler(&component, event),
            None => Ok(()),
        }
    }

    /// Listener calling the method `name` with the event detail.
    pub fn method_handler(&self, name: &str) -> impl Fn(&DomEvent) -> anyhow::Result<()> + 'static {
        let name: Rc<str> = Rc::from(name);
        self.handler(move |component, event| {
            component.call(&name, &[event.detail.clone()])?;
            Ok(())
        })
    }
}
