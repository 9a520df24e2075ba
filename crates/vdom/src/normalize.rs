//! Turning render output into a flat list of child vnodes.

use crate::context::VNodeContext;
use crate::node::{VNode, VNodeData};
use crate::tags::is_reserved_tag;
use reactive::Value;
use std::rc::Rc;

/// A child as produced by a render function.
#[derive(Debug)]
pub enum Child {
    Node(VNode),
    Text(Rc<str>),
    /// Nested children, e.g. the output of [`render_list`](crate::render_list).
    List { items: Vec<Self>, from_list: bool },
    /// Renders nothing (`null`, booleans).
    Skip,
}

impl Child {
    pub fn text(text: &str) -> Self {
        Self::Text(Rc::from(text))
    }

    pub fn list(items: Vec<Self>) -> Self {
        Self::List {
            items,
            from_list: false,
        }
    }
}

impl From<VNode> for Child {
    fn from(node: VNode) -> Self {
        Self::Node(node)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Self::Text(Rc::from(text))
    }
}

impl From<Vec<VNode>> for Child {
    fn from(nodes: Vec<VNode>) -> Self {
        Self::list(nodes.into_iter().map(Self::Node).collect())
    }
}

impl From<Vec<Self>> for Child {
    fn from(items: Vec<Self>) -> Self {
        Self::list(items)
    }
}

impl From<&Value> for Child {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null | Value::Bool(_) => Self::Skip,
            Value::Number(_) | Value::Str(_) | Value::Object(_) => Self::Text(Rc::from(value.to_display_string())),
            Value::Array(array) => Self::list(array.to_vec().iter().map(Self::from).collect()),
        }
    }
}

impl From<Value> for Child {
    fn from(value: Value) -> Self {
        Self::from(&value)
    }
}

/// How much work [`create_element`] does on its children.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Normalization {
    /// Children are already vnodes; only nested lists are spliced in.
    #[default]
    Simple,
    /// Arbitrary children: text is merged and list items get default keys.
    Full,
}

/// Flatten nested lists into one sequence without merging text.
///
/// Enough for compiled templates, where children are vnodes already and only
/// child components may hand back a list.
pub fn simple_normalize_children(children: Vec<Child>) -> Vec<VNode> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        splice(&mut out, child);
    }
    out
}

fn splice(out: &mut Vec<VNode>, child: Child) {
    match child {
        Child::Node(node) => out.push(node),
        Child::Text(text) => out.push(VNode::text(text)),
        Child::List { items, .. } => {
            for item in items {
                splice(out, item);
            }
        }
        Child::Skip => {}
    }
}

/// Flatten arbitrarily nested children.
///
/// Adjacent text is merged into a single text node and empty strings are
/// dropped. Unkeyed elements produced by a nested list receive a default key
/// of the form `__vlist{nested}_{index}__` so siblings coming from different
/// lists cannot be confused.
pub fn normalize_children(children: Vec<Child>) -> Vec<VNode> {
    let mut out = Vec::with_capacity(children.len());
    normalize_into(&mut out, children, false, None);
    out
}

fn last_text(out: &mut [VNode]) -> Option<&mut VNode> {
    out.last_mut().filter(|node| node.is_text())
}

fn append_text(node: &mut VNode, text: &str) {
    let merged = format!("{}{text}", node.text.as_deref().unwrap_or_default());
    node.text = Some(Rc::from(merged));
}

fn normalize_into(out: &mut Vec<VNode>, children: Vec<Child>, from_list: bool, nested: Option<&str>) {
    for (index, child) in children.into_iter().enumerate() {
        match child {
            Child::Skip => {}
            Child::List {
                items,
                from_list: inner_from_list,
            } => {
                if items.is_empty() {
                    continue;
                }
                let nested_index = format!("{}_{index}", nested.unwrap_or_default());
                let mut flattened = Vec::with_capacity(items.len());
                normalize_into(&mut flattened, items, inner_from_list, Some(&nested_index));
                let mut rest = flattened.into_iter().peekable();
                if let Some(last) = last_text(out)
                    && let Some(first) = rest.next_if(VNode::is_text)
                {
                    append_text(last, first.text.as_deref().unwrap_or_default());
                }
                out.extend(rest);
            }
            Child::Text(text) => {
                if let Some(last) = last_text(out) {
                    append_text(last, &text);
                } else if !text.is_empty() {
                    out.push(VNode::text(text));
                }
            }
            Child::Node(mut node) => {
                if node.is_text()
                    && let Some(last) = last_text(out)
                {
                    append_text(last, node.text.as_deref().unwrap_or_default());
                    continue;
                }
                if from_list
                    && node.tag.is_some()
                    && node.data.key.is_none()
                    && let Some(nested) = nested
                {
                    node.data.key = Some(Rc::from(format!("__vlist{nested}_{index}__")));
                }
                out.push(node);
            }
        }
    }
}

/// Build an element vnode, or a component placeholder when `context`
/// registers a component under `tag`.
pub fn create_element(
    context: Option<&Rc<dyn VNodeContext>>,
    tag: &str,
    data: VNodeData,
    children: Vec<Child>,
    normalization: Normalization,
) -> VNode {
    let children = match normalization {
        Normalization::Simple => simple_normalize_children(children),
        Normalization::Full => normalize_children(children),
    };
    if !is_reserved_tag(tag)
        && let Some(factory) = context.and_then(|owner| owner.resolve_component(tag))
    {
        let mut placeholder = factory(data, children);
        if placeholder.context.is_none() {
            placeholder.context = context.map(Rc::downgrade);
        }
        return placeholder;
    }
    let node = VNode::element(tag, data, children);
    match context {
        Some(owner) => node.with_context(owner),
        None => node,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: &str) -> VNode {
        VNode::element("li", VNodeData::new(), vec![VNode::text(label)])
    }

    #[test]
    fn adjacent_text_is_merged() {
        let children = normalize_children(vec![
            Child::text("a"),
            Child::list(vec![Child::text("b"), Child::text("c")]),
            Child::Node(VNode::text("d")),
            Child::Skip,
            Child::text(""),
        ]);
        assert_eq!(children.len(), 1);
        assert_eq!(children.first().and_then(|node| node.text.as_deref()), Some("abcd"));
    }

    #[test]
    fn nested_list_items_get_default_keys() {
        let list = Child::List {
            items: vec![Child::Node(item("x")), Child::Node(item("y"))],
            from_list: true,
        };
        let children = normalize_children(vec![Child::Node(item("head")), list]);
        let keys: Vec<_> = children.iter().map(VNode::key).collect();
        assert_eq!(keys, [None, Some("__vlist_1_0__"), Some("__vlist_1_1__")]);
    }

    #[test]
    fn simple_normalization_splices_one_level() {
        let children = simple_normalize_children(vec![
            Child::Node(item("a")),
            Child::from(vec![item("b"), item("c")]),
        ]);
        assert_eq!(children.len(), 3);
    }
}
