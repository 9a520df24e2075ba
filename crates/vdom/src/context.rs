//! What the patch engine needs to know about the components that own nodes.

use crate::hooks::PendingInsert;
use crate::modules::directives::DirectiveDef;
use crate::node::{VNode, VNodeData};
use crate::ops::NodeHandle;
use core::any::Any;
use core::cell::RefCell;
use core::fmt;
use reactive::ErrorScope;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Builds the placeholder vnode of a registered child component.
pub type ComponentFactory = Rc<dyn Fn(VNodeData, Vec<VNode>) -> VNode>;

/// The component a vnode was rendered by.
pub trait VNodeContext {
    /// Registry `ref` attributes write into.
    fn refs(&self) -> &RefCell<Refs>;

    /// Style scope applied to every element this component renders.
    fn scope_id(&self) -> Option<Rc<str>> {
        None
    }

    fn resolve_directive(&self, _name: &str) -> Option<Rc<DirectiveDef>> {
        None
    }

    /// Factory for a child component registered under `tag`.
    fn resolve_component(&self, _tag: &str) -> Option<ComponentFactory> {
        None
    }

    /// Scope errors raised by hooks on this component's nodes propagate from.
    fn error_scope(&self) -> Option<Rc<dyn ErrorScope>> {
        None
    }
}

/// A realized child component, as seen from its placeholder.
pub trait ComponentInstance {
    /// Real root node of the component's current tree.
    fn root_elm(&self) -> Option<NodeHandle>;

    /// Whether the root, following nested component roots, is an element.
    fn root_is_element(&self) -> bool;

    /// Insert hooks of the component's first patch, held back until its
    /// placeholder is inserted.
    fn take_pending_insert(&self) -> Vec<PendingInsert>;

    /// Visit the component's current root vnode, if it rendered one.
    fn with_root_vnode(&self, visit: &mut dyn FnMut(&VNode));

    fn as_any(&self) -> &dyn Any;
}

/// What a `ref` points at.
#[derive(Clone)]
pub enum RefTarget {
    Node(NodeHandle),
    Component(Rc<dyn ComponentInstance>),
}

impl RefTarget {
    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Node(left), Self::Node(right)) => left == right,
            (Self::Component(left), Self::Component(right)) => {
                Rc::as_ptr(left).cast::<()>() == Rc::as_ptr(right).cast::<()>()
            }
            (Self::Node(_), Self::Component(_)) | (Self::Component(_), Self::Node(_)) => false,
        }
    }

    pub fn as_node(&self) -> Option<NodeHandle> {
        match self {
            Self::Node(node) => Some(*node),
            Self::Component(_) => None,
        }
    }
}

impl fmt::Debug for RefTarget {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => write!(formatter, "{node:?}"),
            Self::Component(instance) => write!(formatter, "Component(root: {:?})", instance.root_elm()),
        }
    }
}

/// A registered ref; refs set inside a loop collect into a list.
#[derive(Clone, Debug)]
pub enum RefEntry {
    Single(RefTarget),
    List(Vec<RefTarget>),
}

/// Named references of one component.
#[derive(Default, Debug)]
pub struct Refs {
    entries: FxHashMap<Rc<str>, RefEntry>,
}

impl Refs {
    pub fn get(&self, name: &str) -> Option<&RefEntry> {
        self.entries.get(name)
    }

    /// Node of a single ref.
    pub fn node(&self, name: &str) -> Option<NodeHandle> {
        match self.entries.get(name)? {
            RefEntry::Single(target) => target.as_node(),
            RefEntry::List(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn register(&mut self, name: &Rc<str>, target: RefTarget, in_for: bool) {
        if !in_for {
            self.entries.insert(Rc::clone(name), RefEntry::Single(target));
            return;
        }
        match self.entries.get_mut(name) {
            Some(RefEntry::List(targets)) => {
                if !targets.iter().any(|known| known.same(&target)) {
                    targets.push(target);
                }
            }
            Some(RefEntry::Single(_)) | None => {
                self.entries.insert(Rc::clone(name), RefEntry::List(vec![target]));
            }
        }
    }

    pub fn unregister(&mut self, name: &str, target: &RefTarget) {
        let remove = match self.entries.get_mut(name) {
            Some(RefEntry::List(targets)) => {
                targets.retain(|known| !known.same(target));
                false
            }
            Some(RefEntry::Single(current)) => current.same(target),
            None => false,
        };
        if remove {
            self.entries.remove(name);
        }
    }
}
