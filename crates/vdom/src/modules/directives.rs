use super::Module;
use crate::context::VNodeContext;
use crate::hooks::{MergedHook, merge_vnode_hook};
use crate::node::VNode;
use crate::ops::{NodeHandle, NodeOps};
use core::fmt;
use reactive::{Value, handle_error, warn};
use smallvec::SmallVec;
use std::rc::Rc;

/// A directive as written on a node.
#[derive(Clone, Debug)]
pub struct DirectiveBinding {
    pub name: Rc<str>,
    /// Name as written in the template, including the prefix and modifiers.
    pub raw_name: Option<Rc<str>>,
    pub value: Value,
    /// Value bound during the previous patch.
    pub old_value: Value,
    pub expression: Option<Rc<str>>,
    pub arg: Option<Rc<str>>,
    pub old_arg: Option<Rc<str>>,
    pub modifiers: SmallVec<Rc<str>, 2>,
}

impl DirectiveBinding {
    pub fn new(name: &str, value: impl Into<Value>) -> Self {
        Self {
            name: Rc::from(name),
            raw_name: None,
            value: value.into(),
            old_value: Value::Null,
            expression: None,
            arg: None,
            old_arg: None,
            modifiers: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: &str) -> Self {
        self.arg = Some(Rc::from(arg));
        self
    }

    #[must_use]
    pub fn modifier(mut self, modifier: &str) -> Self {
        self.modifiers.push(Rc::from(modifier));
        self
    }

    #[must_use]
    pub fn expression(mut self, expression: &str) -> Self {
        self.expression = Some(Rc::from(expression));
        self
    }

    /// Identity used to pair bindings across patches.
    fn identity(&self) -> String {
        match &self.raw_name {
            Some(raw) => raw.to_string(),
            None => {
                let modifiers: Vec<&str> = self.modifiers.iter().map(|modifier| &**modifier).collect();
                format!("{}.{}", self.name, modifiers.join("."))
            }
        }
    }
}

/// Arguments every directive hook receives.
pub struct DirectiveHookArgs<'hook> {
    pub elm: Option<NodeHandle>,
    pub binding: &'hook DirectiveBinding,
    pub vnode: &'hook VNode,
    pub old_vnode: Option<&'hook VNode>,
    /// Set for `unbind` when the whole node goes away.
    pub is_destroy: bool,
}

pub type DirectiveHook = Rc<dyn Fn(&DirectiveHookArgs<'_>) -> anyhow::Result<()>>;

/// Hooks of a registered directive.
#[derive(Clone, Default)]
pub struct DirectiveDef {
    pub bind: Option<DirectiveHook>,
    pub inserted: Option<DirectiveHook>,
    pub update: Option<DirectiveHook>,
    pub component_updated: Option<DirectiveHook>,
    pub unbind: Option<DirectiveHook>,
}

impl fmt::Debug for DirectiveDef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("DirectiveDef")
            .field("bind", &self.bind.is_some())
            .field("inserted", &self.inserted.is_some())
            .field("update", &self.update.is_some())
            .field("component_updated", &self.component_updated.is_some())
            .field("unbind", &self.unbind.is_some())
            .finish()
    }
}

/// Runs directive hooks as nodes are created, patched and destroyed.
///
/// `bind` and `update` run during the patch, `inserted` once the node is in
/// the document, `component_updated` after the node's children were patched.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectivesModule;

impl Module for DirectivesModule {
    fn name(&self) -> &'static str {
        "directives"
    }

    fn create(&self, _ops: &dyn NodeOps, vnode: &mut VNode) -> anyhow::Result<()> {
        update_directives(None, vnode);
        Ok(())
    }

    fn update(&self, _ops: &dyn NodeOps, old: &VNode, vnode: &mut VNode) -> anyhow::Result<()> {
        update_directives(Some(old), vnode);
        Ok(())
    }

    fn destroy(&self, _ops: &dyn NodeOps, vnode: &VNode) -> anyhow::Result<()> {
        for (binding, def) in resolve(vnode, false) {
            let args = DirectiveHookArgs {
                elm: vnode.node_elm(),
                binding: &binding,
                vnode,
                old_vnode: Some(vnode),
                is_destroy: true,
            };
            call_hook(def.unbind.as_ref(), &args, "unbind", vnode.context().as_ref());
        }
        Ok(())
    }
}

fn resolve(vnode: &VNode, report_missing: bool) -> Vec<(DirectiveBinding, Rc<DirectiveDef>)> {
    if vnode.data.directives.is_empty() {
        return Vec::new();
    }
    let context = vnode.context();
    vnode
        .data
        .directives
        .iter()
        .filter_map(|binding| {
            let def = context
                .as_ref()
                .and_then(|owner| owner.resolve_directive(&binding.name));
            if def.is_none() && report_missing {
                warn(&format!("Failed to resolve directive: {}", binding.name));
            }
            def.map(|found| (binding.clone(), found))
        })
        .collect()
}

fn call_hook(
    hook: Option<&DirectiveHook>,
    args: &DirectiveHookArgs<'_>,
    hook_name: &str,
    context: Option<&Rc<dyn VNodeContext>>,
) {
    let Some(hook) = hook else {
        return;
    };
    if let Err(err) = hook(args) {
        let scope = context.and_then(|owner| owner.error_scope());
        handle_error(
            &err,
            scope.as_ref(),
            &format!("directive {} {hook_name} hook", args.binding.name),
        );
    }
}

fn update_directives(old: Option<&VNode>, vnode: &mut VNode) {
    let old_has_directives = old.is_some_and(|previous| !previous.data.directives.is_empty());
    if !old_has_directives && vnode.data.directives.is_empty() {
        return;
    }
    let is_create = old.is_none();
    let old_dirs = old.map(|previous| resolve(previous, false)).unwrap_or_default();

    // Carry the previous value and argument into the new bindings first.
    for binding in &mut vnode.data.directives {
        let identity = binding.identity();
        if let Some((previous, _)) = old_dirs.iter().find(|(known, _)| known.identity() == identity) {
            binding.old_value = previous.value.clone();
            binding.old_arg = previous.arg.clone();
        }
    }
    let new_dirs = resolve(vnode, true);
    let context = vnode.context();
    let elm = vnode.node_elm();

    let mut inserted = Vec::new();
    let mut component_updated = Vec::new();
    for (binding, def) in new_dirs.iter().cloned() {
        let identity = binding.identity();
        let is_new = !old_dirs.iter().any(|(known, _)| known.identity() == identity);
        let args = DirectiveHookArgs {
            elm,
            binding: &binding,
            vnode,
            old_vnode: old,
            is_destroy: false,
        };
        if is_new {
            call_hook(def.bind.as_ref(), &args, "bind", context.as_ref());
            if def.inserted.is_some() {
                inserted.push((binding, def));
            }
        } else {
            call_hook(def.update.as_ref(), &args, "update", context.as_ref());
            if def.component_updated.is_some() {
                component_updated.push((binding, def));
            }
        }
    }

    if !inserted.is_empty() {
        let run_inserted = move |node: &VNode| -> anyhow::Result<()> {
            let owner = node.context();
            for (binding, def) in &inserted {
                let args = DirectiveHookArgs {
                    elm: node.node_elm(),
                    binding,
                    vnode: node,
                    old_vnode: None,
                    is_destroy: false,
                };
                call_hook(def.inserted.as_ref(), &args, "inserted", owner.as_ref());
            }
            Ok(())
        };
        if is_create {
            merge_vnode_hook(&mut vnode.data.hook, MergedHook::Insert(Rc::new(run_inserted)));
        } else if let Err(err) = run_inserted(vnode) {
            handle_error(&err, None, "directive inserted hook");
        }
    }

    if !component_updated.is_empty() {
        merge_vnode_hook(
            &mut vnode.data.hook,
            MergedHook::Postpatch(Rc::new(move |previous: &VNode, node: &VNode| {
                let owner = node.context();
                for (binding, def) in &component_updated {
                    let args = DirectiveHookArgs {
                        elm: node.node_elm(),
                        binding,
                        vnode: node,
                        old_vnode: Some(previous),
                        is_destroy: false,
                    };
                    call_hook(def.component_updated.as_ref(), &args, "componentUpdated", owner.as_ref());
                }
                Ok(())
            })),
        );
    }

    if let Some(previous) = old {
        for (binding, def) in &old_dirs {
            let identity = binding.identity();
            if !new_dirs.iter().any(|(known, _)| known.identity() == identity) {
                let args = DirectiveHookArgs {
                    elm,
                    binding,
                    vnode: previous,
                    old_vnode: Some(previous),
                    is_destroy: false,
                };
                call_hook(def.unbind.as_ref(), &args, "unbind", context.as_ref());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_includes_modifiers() {
        let binding = DirectiveBinding::new("model", 1).modifier("trim").modifier("lazy");
        assert_eq!(binding.identity(), "model.trim.lazy");
        let plain = DirectiveBinding::new("focus", true);
        assert_eq!(plain.identity(), "focus.");
    }
}
