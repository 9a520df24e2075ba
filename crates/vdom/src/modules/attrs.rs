use super::Module;
use crate::node::VNode;
use crate::ops::{NodeHandle, NodeOps};
use crate::tags::is_boolean_attr;
use log::trace;
use reactive::{Value, same_value};

/// Mirrors `data.attrs` onto the element.
///
/// `Null` and `false` remove an attribute. Boolean attributes set to `true`
/// get their own name as value.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttrsModule;

impl Module for AttrsModule {
    fn name(&self) -> &'static str {
        "attrs"
    }

    fn create(&self, ops: &dyn NodeOps, vnode: &mut VNode) -> anyhow::Result<()> {
        update_attrs(ops, None, vnode)
    }

    fn update(&self, ops: &dyn NodeOps, old: &VNode, vnode: &mut VNode) -> anyhow::Result<()> {
        update_attrs(ops, Some(old), vnode)
    }
}

fn update_attrs(ops: &dyn NodeOps, old: Option<&VNode>, vnode: &VNode) -> anyhow::Result<()> {
    let old_attrs = old.map(|previous| previous.data.attrs.as_slice()).unwrap_or_default();
    if old_attrs.is_empty() && vnode.data.attrs.is_empty() {
        return Ok(());
    }
    let Some(elm) = vnode.node_elm() else {
        return Ok(());
    };
    for (name, value) in &vnode.data.attrs {
        let previous = old_attrs.iter().find(|(old_name, _)| old_name == name);
        if previous.is_none_or(|(_, old_value)| !same_value(old_value, value)) {
            apply_attr(ops, elm, name, value)?;
        }
    }
    for (name, _) in old_attrs {
        if vnode.data.attr_value(name).is_none() {
            trace!("Removing attribute {name} from {elm:?}");
            ops.remove_attribute(elm, name)?;
        }
    }
    Ok(())
}

fn apply_attr(ops: &dyn NodeOps, elm: NodeHandle, name: &str, value: &Value) -> anyhow::Result<()> {
    match value {
        Value::Null | Value::Bool(false) => ops.remove_attribute(elm, name),
        Value::Bool(true) if is_boolean_attr(name) => ops.set_attribute(elm, name, name),
        Value::Bool(_) | Value::Number(_) | Value::Str(_) | Value::Array(_) | Value::Object(_) => {
            ops.set_attribute(elm, name, &value.to_display_string())
        }
    }
}
