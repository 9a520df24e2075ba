//! Placeholder nodes standing for child components in a parent's tree.
//!
//! The parent's render produces a [`VNodeKind::Component`](vdom::VNodeKind)
//! node carrying the child's options, its prop values, listeners and slot
//! content. The patch engine calls the hooks installed here to create the
//! child on first patch, hand it fresh props on later patches and destroy it
//! when the placeholder goes away.

use super::{ChildInit, Component, ComponentInner};
use crate::error::ComponentError;
use crate::options::ComponentOptions;
use core::any::Any;
use reactive::Value;
use std::rc::{Rc, Weak};
use vdom::{InitHook, Listener, PrepatchHook, VNode, VNodeContext, VNodeData, VNodeHook, VNodeHooks};

/// Payload stored in the placeholder's `component_options`.
struct PlaceholderOptions {
    options: Rc<ComponentOptions>,
    parent: Weak<ComponentInner>,
    props: Vec<(Rc<str>, Value)>,
    listeners: Vec<(Rc<str>, Listener)>,
    slot: Vec<VNode>,
}

impl PlaceholderOptions {
    fn child_init(&self) -> ChildInit {
        ChildInit {
            props: self.props.clone(),
            listeners: self.listeners.clone(),
            slot: self.slot.clone(),
        }
    }
}

/// Build the placeholder for a child component rendered by `parent`.
///
/// Declared props are taken out of the attributes (matching either the
/// declared name or its hyphenated form), every `on` listener becomes a
/// component listener and `children` become the slot content.
pub(super) fn component_vnode(
    tag: &str,
    options: Rc<ComponentOptions>,
    parent: &Weak<ComponentInner>,
    mut data: VNodeData,
    children: Vec<VNode>,
) -> VNode {
    let props = extract_props(&options, &mut data);
    let listeners = data.on.drain(..).collect();
    install_component_hooks(&mut data.hook);
    let placeholder = PlaceholderOptions {
        options,
        parent: Weak::clone(parent),
        props,
        listeners,
        slot: children,
    };
    let mut vnode = VNode::component(tag, data, Rc::new(placeholder) as Rc<dyn Any>);
    let context: Weak<dyn VNodeContext> = Weak::clone(parent) as Weak<dyn VNodeContext>;
    vnode.context = Some(context);
    vnode
}

fn extract_props(options: &ComponentOptions, data: &mut VNodeData) -> Vec<(Rc<str>, Value)> {
    let mut props = Vec::new();
    for name in &options.props {
        let hyphenated = hyphenate(name);
        let found = data
            .attrs
            .iter()
            .position(|(attr, _)| **attr == **name || **attr == *hyphenated);
        if let Some(position) = found {
            let (_, value) = data.attrs.remove(position);
            props.push((Rc::clone(name), value));
        }
    }
    props
}

/// `fooBar` -> `foo-bar`.
fn hyphenate(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for (index, character) in name.chars().enumerate() {
        if character.is_ascii_uppercase() {
            if index > 0 {
                out.push('-');
            }
            out.push(character.to_ascii_lowercase());
        } else {
            out.push(character);
        }
    }
    out
}

/// Put the component hooks in front of any hooks the render supplied.
fn install_component_hooks(hooks: &mut VNodeHooks) {
    let init: InitHook = Rc::new(init_child);
    hooks.init = Some(match hooks.init.take() {
        Some(own) => Rc::new(move |vnode: &mut VNode| {
            init(vnode)?;
            own(vnode)
        }),
        None => init,
    });
    let prepatch: PrepatchHook = Rc::new(prepatch_child);
    hooks.prepatch = Some(match hooks.prepatch.take() {
        Some(own) => Rc::new(move |old: &VNode, vnode: &mut VNode| {
            prepatch(old, vnode)?;
            own(old, vnode)
        }),
        None => prepatch,
    });
    hooks.insert = Some(chain(Rc::new(insert_child), hooks.insert.take()));
    hooks.destroy = Some(chain(Rc::new(destroy_child), hooks.destroy.take()));
}

fn chain(first: VNodeHook, then: Option<VNodeHook>) -> VNodeHook {
    match then {
        Some(own) => Rc::new(move |vnode: &VNode| {
            first(vnode)?;
            own(vnode)
        }),
        None => first,
    }
}

fn payload(vnode: &VNode) -> Option<&PlaceholderOptions> {
    vnode
        .component_options
        .as_ref()
        .and_then(|options| options.downcast_ref::<PlaceholderOptions>())
}

fn instance_of(vnode: &VNode) -> Option<Component> {
    vnode
        .component_instance
        .as_ref()
        .and_then(|instance| Component::from_instance(&**instance))
}

fn init_child(vnode: &mut VNode) -> anyhow::Result<()> {
    if instance_of(vnode).is_some_and(|existing| !existing.is_destroyed()) {
        return Ok(());
    }
    let Some(placeholder) = payload(vnode) else {
        return Ok(());
    };
    let tag = vnode.tag.as_deref().unwrap_or_default().to_owned();
    let parent = placeholder
        .parent
        .upgrade()
        .map(Component)
        .ok_or_else(|| ComponentError::Destroyed {
            component: format!("parent of <{tag}>"),
        })?;
    let patcher = parent
        .patcher()
        .ok_or_else(|| ComponentError::NotRendered { component: parent.name() })?;
    let child = Component::create(
        Rc::clone(&placeholder.options),
        Some(&parent),
        placeholder.child_init(),
        true,
    );
    child.mount(patcher, None)?;
    vnode.component_instance = Some(child.as_instance());
    Ok(())
}

fn prepatch_child(old: &VNode, vnode: &mut VNode) -> anyhow::Result<()> {
    let Some(instance) = old.component_instance.clone() else {
        return Ok(());
    };
    vnode.component_instance = Some(Rc::clone(&instance));
    let (Some(child), Some(placeholder)) = (Component::from_instance(&*instance), payload(vnode)) else {
        return Ok(());
    };
    child.update_from_parent(placeholder.child_init());
    Ok(())
}

fn insert_child(vnode: &VNode) -> anyhow::Result<()> {
    if let Some(child) = instance_of(vnode) {
        child.mark_inserted();
    }
    Ok(())
}

fn destroy_child(vnode: &VNode) -> anyhow::Result<()> {
    if let Some(child) = instance_of(vnode)
        && !child.is_destroyed()
    {
        child.destroy();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hyphenates_camel_case() {
        assert_eq!(hyphenate("itemCount"), "item-count");
        assert_eq!(hyphenate("title"), "title");
        assert_eq!(hyphenate("HTMLText"), "h-t-m-l-text");
    }

    #[test]
    fn props_are_taken_out_of_attrs() {
        let options = ComponentOptions::new().prop("itemCount").prop("label");
        let mut data = VNodeData::new()
            .attr("item-count", 3)
            .attr("class", "wide")
            .attr("label", "Todos");
        let props = extract_props(&options, &mut data);
        let names: Vec<&str> = props.iter().map(|(name, _)| &**name).collect();
        assert_eq!(names, ["itemCount", "label"]);
        assert_eq!(data.attrs.len(), 1);
        assert_eq!(data.attr_value("class"), Some(&Value::str("wide")));
    }
}
