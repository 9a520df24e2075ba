//! Virtual DOM for the ripple UI runtime.
//!
//! Render functions produce [`VNode`] trees; the [`Patcher`] reconciles each
//! new tree with the previous one and applies the difference through a
//! [`NodeOps`] backend. Attributes, listeners, refs and directives are
//! handled by pluggable [`Module`]s that hook into node creation, updates
//! and teardown.

pub mod context;
pub mod error;
pub mod hooks;
pub mod modules;
pub mod node;
pub mod normalize;
pub mod ops;
pub mod optimizer;
pub mod patch;
pub mod render;
pub mod tags;

pub use context::{ComponentFactory, ComponentInstance, RefEntry, RefTarget, Refs, VNodeContext};
pub use error::PatchError;
pub use hooks::{
    InitHook, MergedHook, PendingInsert, PrepatchHook, RemoveCallback, RemoveHook, UpdateHook, VNodeHook,
    VNodeHooks, invoke_insert_hooks, merge_vnode_hook,
};
pub use modules::directives::{DirectiveBinding, DirectiveDef, DirectiveHook, DirectiveHookArgs};
pub use modules::events::{Invoker, Listener};
pub use modules::{AttrsModule, DirectivesModule, EventsModule, Module, RefModule, default_modules};
pub use node::{VNode, VNodeData, VNodeKind, same_vnode};
pub use normalize::{Child, Normalization, create_element, normalize_children, simple_normalize_children};
pub use ops::{DomEvent, EventHandler, NodeHandle, NodeOps};
pub use optimizer::{TemplateKind, TemplateNode, optimize};
pub use patch::{PatchResult, PatchSource, Patcher, is_attached};
pub use render::{StaticTrees, mark_once, mark_static, mark_static_list, render_list};
