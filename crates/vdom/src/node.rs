//! Virtual nodes.

use crate::context::{ComponentInstance, VNodeContext};
use crate::hooks::VNodeHooks;
use crate::modules::directives::DirectiveBinding;
use crate::modules::events::{Invoker, Listener};
use crate::ops::{DomEvent, NodeHandle};
use crate::tags::is_text_input_type;
use core::any::Any;
use core::fmt;
use reactive::Value;
use smallvec::SmallVec;
use std::rc::{Rc, Weak};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VNodeKind {
    Element,
    Text,
    Comment,
    /// Placeholder for a child component; realized through its `init` hook.
    Component,
}

/// Everything a render function attaches to a node besides its children.
#[derive(Clone, Default)]
pub struct VNodeData {
    pub key: Option<Rc<str>>,
    pub attrs: SmallVec<(Rc<str>, Value), 4>,
    /// Listeners in registration order; a name may repeat.
    pub on: SmallVec<(Rc<str>, Listener), 2>,
    pub directives: Vec<DirectiveBinding>,
    pub ref_name: Option<Rc<str>>,
    pub ref_in_for: bool,
    /// Subtree was written with `v-pre` and is left uncompiled.
    pub pre: bool,
    pub hook: VNodeHooks,
    /// Listener invokers installed on the realized node, carried from patch to patch.
    pub(crate) invokers: SmallVec<(Rc<str>, Rc<Invoker>), 2>,
}

impl VNodeData {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<Rc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attrs.push((Rc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn on(mut self, event: &str, listener: impl Fn(&DomEvent) -> anyhow::Result<()> + 'static) -> Self {
        self.on.push((Rc::from(event), Rc::new(listener)));
        self
    }

    #[must_use]
    pub fn directive(mut self, binding: DirectiveBinding) -> Self {
        self.directives.push(binding);
        self
    }

    #[must_use]
    pub fn ref_name(mut self, name: &str, in_for: bool) -> Self {
        self.ref_name = Some(Rc::from(name));
        self.ref_in_for = in_for;
        self
    }

    #[must_use]
    pub fn pre(mut self) -> Self {
        self.pre = true;
        self
    }

    #[must_use]
    pub fn hooks(mut self, hook: VNodeHooks) -> Self {
        self.hook = hook;
        self
    }

    /// Value of an attribute, if present.
    pub fn attr_value(&self, name: &str) -> Option<&Value> {
        self.attrs
            .iter()
            .find(|(attr, _)| &**attr == name)
            .map(|(_, value)| value)
    }
}

/// A node of the virtual tree.
///
/// Render functions build fresh trees; the patcher fills in `elm` and
/// `component_instance` while realizing them and reads them back from the
/// previous tree on the next pass.
#[allow(clippy::struct_excessive_bools, reason = "Patch flags are set independently")]
#[derive(Clone)]
pub struct VNode {
    pub kind: VNodeKind,
    pub tag: Option<Rc<str>>,
    pub data: VNodeData,
    pub children: Vec<Self>,
    pub text: Option<Rc<str>>,
    pub elm: Option<NodeHandle>,
    /// Component whose render function produced this node.
    pub context: Option<Weak<dyn VNodeContext>>,
    /// Opaque payload a component `init` hook uses to build the instance.
    pub component_options: Option<Rc<dyn Any>>,
    pub component_instance: Option<Rc<dyn ComponentInstance>>,
    pub is_static: bool,
    pub is_root_insert: bool,
    pub is_cloned: bool,
    pub is_once: bool,
}

impl VNode {
    fn bare(kind: VNodeKind) -> Self {
        Self {
            kind,
            tag: None,
            data: VNodeData::default(),
            children: Vec::new(),
            text: None,
            elm: None,
            context: None,
            component_options: None,
            component_instance: None,
            is_static: false,
            is_root_insert: true,
            is_cloned: false,
            is_once: false,
        }
    }

    pub fn element(tag: &str, data: VNodeData, children: Vec<Self>) -> Self {
        Self {
            tag: Some(Rc::from(tag)),
            data,
            children,
            ..Self::bare(VNodeKind::Element)
        }
    }

    pub fn text(text: impl Into<Rc<str>>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::bare(VNodeKind::Text)
        }
    }

    pub fn comment(text: impl Into<Rc<str>>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::bare(VNodeKind::Comment)
        }
    }

    /// Empty placeholder, rendered as an empty comment.
    pub fn empty() -> Self {
        Self::comment("")
    }

    /// Placeholder for a child component built from `options` by the `init`
    /// hook in `data`.
    pub fn component(tag: &str, data: VNodeData, options: Rc<dyn Any>) -> Self {
        Self {
            tag: Some(Rc::from(tag)),
            data,
            component_options: Some(options),
            ..Self::bare(VNodeKind::Component)
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: &Rc<dyn VNodeContext>) -> Self {
        self.context = Some(Rc::downgrade(context));
        self
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<Rc<str>>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn key(&self) -> Option<&str> {
        self.data.key.as_deref()
    }

    pub fn is_comment(&self) -> bool {
        self.kind == VNodeKind::Comment
    }

    pub fn is_text(&self) -> bool {
        self.kind == VNodeKind::Text
    }

    pub fn context(&self) -> Option<Rc<dyn VNodeContext>> {
        self.context.as_ref().and_then(Weak::upgrade)
    }

    /// Real node currently standing for this vnode.
    ///
    /// For a component placeholder this is the component's present root,
    /// which may have been replaced since the placeholder was last patched.
    pub fn node_elm(&self) -> Option<NodeHandle> {
        self.component_instance
            .as_ref()
            .and_then(|instance| instance.root_elm())
            .or(self.elm)
    }

    /// Copy flagged as cloned, used to reuse cached static subtrees.
    #[must_use]
    pub fn clone_vnode(&self) -> Self {
        let mut cloned = self.clone();
        cloned.is_cloned = true;
        cloned
    }

    /// Copy without children.
    #[must_use]
    pub fn shallow_clone(&self) -> Self {
        Self {
            kind: self.kind,
            tag: self.tag.clone(),
            data: self.data.clone(),
            children: Vec::new(),
            text: self.text.clone(),
            elm: self.elm,
            context: self.context.clone(),
            component_options: self.component_options.clone(),
            component_instance: self.component_instance.clone(),
            is_static: self.is_static,
            is_root_insert: self.is_root_insert,
            is_cloned: self.is_cloned,
            is_once: self.is_once,
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = formatter.debug_struct("VNode");
        debug.field("kind", &self.kind);
        if let Some(tag) = &self.tag {
            debug.field("tag", tag);
        }
        if let Some(key) = &self.data.key {
            debug.field("key", key);
        }
        if let Some(text) = &self.text {
            debug.field("text", text);
        }
        if let Some(elm) = &self.elm {
            debug.field("elm", elm);
        }
        if self.is_static {
            debug.field("is_static", &true);
        }
        if !self.children.is_empty() {
            debug.field("children", &self.children);
        }
        debug.finish()
    }
}

/// Whether `left` and `right` stand for the same logical node and can be
/// patched in place.
///
/// Keys, tags and the comment flag must agree. Two `input` elements must also
/// have the same `type`, except that all text-like types count as one.
pub fn same_vnode(left: &VNode, right: &VNode) -> bool {
    left.data.key == right.data.key
        && left.tag == right.tag
        && left.is_comment() == right.is_comment()
        && same_input_type(left, right)
}

fn same_input_type(left: &VNode, right: &VNode) -> bool {
    if left.tag.as_deref() != Some("input") {
        return true;
    }
    let input_type = |vnode: &VNode| {
        vnode
            .data
            .attr_value("type")
            .map(Value::to_display_string)
    };
    let (left_type, right_type) = (input_type(left), input_type(right));
    left_type == right_type
        || (left_type.as_deref().is_some_and(is_text_input_type)
            && right_type.as_deref().is_some_and(is_text_input_type))
}
