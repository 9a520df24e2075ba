//! Helpers compiled render functions call.

use crate::node::VNode;
use crate::normalize::Child;
use core::cell::RefCell;
use log::trace;
use reactive::Value;
use std::rc::Rc;

/// Render one child per item of `source`.
///
/// `render` receives the item, its key (the index for arrays, strings and
/// numbers, the field name for objects) and the position. A number `n`
/// iterates `1..=n`, a string its characters. Anything else renders nothing.
pub fn render_list(source: &Value, mut render: impl FnMut(Value, Value, usize) -> Child) -> Child {
    let items = match source {
        Value::Array(array) => array
            .to_vec()
            .into_iter()
            .enumerate()
            .map(|(index, item)| render(item, Value::from(index), index))
            .collect(),
        Value::Str(text) => text
            .chars()
            .enumerate()
            .map(|(index, character)| render(Value::from(character.to_string()), Value::from(index), index))
            .collect(),
        Value::Number(count) if count.is_finite() && *count >= 1.0 => (0..*count as usize)
            .map(|index| render(Value::from(index + 1), Value::from(index), index))
            .collect(),
        Value::Object(object) => object
            .keys()
            .into_iter()
            .enumerate()
            .map(|(index, key)| render(object.get(&key), Value::Str(key), index))
            .collect(),
        Value::Null | Value::Bool(_) | Value::Number(_) => return Child::Skip,
    };
    Child::List { items, from_list: true }
}

/// Mark a single node static under `key`.
pub fn mark_static(node: &mut VNode, key: &str, is_once: bool) {
    node.is_static = true;
    node.data.key = Some(Rc::from(key));
    node.is_once = is_once;
}

/// Mark every node of a static list, suffixing `key` with the position.
pub fn mark_static_list(nodes: &mut [VNode], key: &str, is_once: bool) {
    for (index, node) in nodes.iter_mut().enumerate() {
        mark_static(node, &format!("{key}_{index}"), is_once);
    }
}

/// Mark a `v-once` subtree.
pub fn mark_once(tree: &mut VNode, index: usize, key: Option<&str>) {
    let key = key.map_or_else(|| format!("__once__{index}"), |key| format!("__once__{index}_{key}"));
    mark_static(tree, &key, true);
}

/// Cache of static subtrees, one per compiled static render function.
#[derive(Default, Debug)]
pub struct StaticTrees {
    cached: RefCell<Vec<Option<VNode>>>,
}

impl StaticTrees {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the static tree `index`.
    ///
    /// Outside iterations the first rendering is cached and later calls
    /// return a clone the patcher reuses without diffing. Inside an iteration
    /// every call renders anew, since each item needs its own real nodes.
    pub fn render_static(&self, index: usize, in_for: bool, render: impl FnOnce() -> VNode) -> VNode {
        if !in_for
            && let Some(tree) = self.cached.borrow().get(index).and_then(Option::as_ref)
        {
            return tree.clone_vnode();
        }
        trace!("Rendering static tree {index}");
        let mut tree = render();
        mark_static(&mut tree, &format!("__static__{index}"), false);
        let mut cached = self.cached.borrow_mut();
        if cached.len() <= index {
            cached.resize(index + 1, None);
        }
        if let Some(slot) = cached.get_mut(index) {
            *slot = Some(tree.clone());
        }
        tree
    }

    /// Drop every cached tree, e.g. after the component's templates changed.
    pub fn clear(&self) {
        self.cached.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::VNodeData;
    use core::cell::Cell;
    use reactive::ReactiveObject;

    fn items(child: Child) -> Vec<Child> {
        match child {
            Child::List { items, .. } => items,
            Child::Node(_) | Child::Text(_) | Child::Skip => Vec::new(),
        }
    }

    #[test]
    fn numbers_count_from_one() {
        let rendered = items(render_list(&Value::from(3), |item, _, _| Child::Text(Rc::from(item.to_display_string()))));
        let texts: Vec<String> = rendered
            .iter()
            .map(|child| match child {
                Child::Text(text) => text.to_string(),
                Child::Node(_) | Child::List { .. } | Child::Skip => String::new(),
            })
            .collect();
        assert_eq!(texts, ["1", "2", "3"]);
    }

    #[test]
    fn objects_pass_keys() {
        let object = ReactiveObject::from_pairs([("a", Value::from(1)), ("b", Value::from(2))]);
        let mut keys = Vec::new();
        let rendered = render_list(&Value::Object(object), |_, key, index| {
            keys.push((key.to_display_string(), index));
            Child::Skip
        });
        assert_eq!(items(rendered).len(), 2);
        assert_eq!(keys, [(String::from("a"), 0), (String::from("b"), 1)]);
        assert!(matches!(render_list(&Value::Null, |_, _, _| Child::Skip), Child::Skip));
    }

    #[test]
    fn static_trees_are_cached_outside_loops() {
        let trees = StaticTrees::new();
        let renders = Cell::new(0);
        let render = || {
            renders.set(renders.get() + 1);
            VNode::element("p", VNodeData::new(), Vec::new())
        };
        let first = trees.render_static(0, false, render);
        let second = trees.render_static(0, false, render);
        assert_eq!(renders.get(), 1);
        assert!(!first.is_cloned);
        assert!(second.is_cloned && second.is_static);
        assert_eq!(second.key(), Some("__static__0"));

        trees.render_static(0, true, render);
        trees.render_static(0, true, render);
        assert_eq!(renders.get(), 3);
    }

    #[test]
    fn once_keys() {
        let mut node = VNode::element("p", VNodeData::new(), Vec::new());
        mark_once(&mut node, 2, Some("item"));
        assert_eq!(node.key(), Some("__once__2_item"));
        assert!(node.is_once && node.is_static);
    }
}
