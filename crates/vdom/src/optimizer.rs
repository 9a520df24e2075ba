//! Static analysis of a parsed template.
//!
//! Finds subtrees that never change after the first render so code
//! generation can hoist them into static render functions and the patcher
//! can skip them entirely.
//!
//! 1. Mark every node that is static, i.e. whose output never depends on
//!    component state.
//! 2. Mark static roots: static subtrees large enough to be worth caching.

use crate::tags::{is_built_in_tag, is_reserved_tag};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TemplateKind {
    #[default]
    Element,
    /// Text with interpolations.
    Expression,
    Text,
}

/// A node of a parsed template, reduced to what the analysis looks at.
#[allow(clippy::struct_excessive_bools, reason = "Each flag mirrors an independent template attribute")]
#[derive(Clone, Debug, Default)]
pub struct TemplateNode {
    pub kind: TemplateKind,
    pub tag: String,
    pub children: Vec<Self>,
    /// `v-else-if` / `v-else` branches following this `v-if` node.
    pub else_branches: Vec<Self>,
    /// Dynamic attribute or property bindings.
    pub has_bindings: bool,
    pub has_if: bool,
    pub has_for: bool,
    pub is_once: bool,
    pub pre: bool,
    pub inline_template: bool,
    /// Listeners, directives, slots or any other compiler option besides
    /// plain attributes.
    pub dynamic_options: bool,

    pub is_static: bool,
    pub static_root: bool,
    pub static_in_for: bool,
}

impl TemplateNode {
    pub fn element(tag: &str, children: Vec<Self>) -> Self {
        Self {
            tag: tag.to_owned(),
            children,
            ..Self::default()
        }
    }

    pub fn text() -> Self {
        Self {
            kind: TemplateKind::Text,
            ..Self::default()
        }
    }

    pub fn expression() -> Self {
        Self {
            kind: TemplateKind::Expression,
            ..Self::default()
        }
    }
}

/// Mark static nodes and static roots of `root`.
pub fn optimize(root: &mut TemplateNode) {
    mark_static(root);
    mark_static_roots(root, false);
}

pub fn mark_static(node: &mut TemplateNode) {
    mark_static_in(node, false);
}

fn mark_static_in(node: &mut TemplateNode, under_template_for: bool) {
    node.is_static = is_static(node, under_template_for);
    if node.kind != TemplateKind::Element {
        return;
    }
    // Slot content handed to components stays dynamic so the component can
    // re-render it.
    if !is_reserved_tag(&node.tag) && node.tag != "slot" && !node.inline_template {
        return;
    }
    let child_under_template_for = node.tag == "template" && (node.has_for || under_template_for);
    for child in &mut node.children {
        mark_static_in(child, child_under_template_for);
        if !child.is_static {
            node.is_static = false;
        }
    }
    for branch in &mut node.else_branches {
        mark_static_in(branch, under_template_for);
        if !branch.is_static {
            node.is_static = false;
        }
    }
}

fn is_static(node: &TemplateNode, under_template_for: bool) -> bool {
    match node.kind {
        TemplateKind::Expression => false,
        TemplateKind::Text => true,
        TemplateKind::Element => {
            node.pre
                || (!node.has_bindings
                    && !node.has_if
                    && !node.has_for
                    && !is_built_in_tag(&node.tag)
                    && is_reserved_tag(&node.tag)
                    && !under_template_for
                    && !node.dynamic_options)
        }
    }
}

/// Mark static subtrees worth caching.
///
/// A node made of a single text child is cheaper to re-render than to cache.
pub fn mark_static_roots(node: &mut TemplateNode, in_for: bool) {
    if node.kind != TemplateKind::Element {
        return;
    }
    if node.is_static || node.is_once {
        node.static_in_for = in_for;
    }
    let single_text =
        node.children.len() == 1 && node.children.first().is_some_and(|child| child.kind == TemplateKind::Text);
    if node.is_static && !node.children.is_empty() && !single_text {
        node.static_root = true;
        return;
    }
    node.static_root = false;
    let children_in_for = in_for || node.has_for;
    for child in &mut node.children {
        mark_static_roots(child, children_in_for);
    }
    for branch in &mut node.else_branches {
        mark_static_roots(branch, in_for);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_subtree_becomes_static_root() {
        let mut root = TemplateNode::element(
            "div",
            vec![
                TemplateNode::element("ul", vec![TemplateNode::element("li", vec![TemplateNode::text()])]),
                TemplateNode::element("p", vec![TemplateNode::expression()]),
            ],
        );
        optimize(&mut root);
        assert!(!root.is_static);
        assert_eq!(root.children.len(), 2);
        let [list, paragraph] = root.children.as_slice() else {
            return;
        };
        assert!(list.is_static && list.static_root);
        assert!(!paragraph.is_static && !paragraph.static_root);
    }

    #[test]
    fn single_text_child_is_not_a_root() {
        let mut node = TemplateNode::element("span", vec![TemplateNode::text()]);
        optimize(&mut node);
        assert!(node.is_static);
        assert!(!node.static_root);
    }

    #[test]
    fn children_of_template_for_stay_dynamic() {
        let mut template = TemplateNode::element("template", vec![TemplateNode::element("b", Vec::new())]);
        template.has_for = true;
        let mut root = TemplateNode::element("div", vec![template]);
        optimize(&mut root);
        let inner = root
            .children
            .first()
            .and_then(|template| template.children.first());
        assert!(inner.is_some_and(|node| !node.is_static));
    }

    #[test]
    fn static_roots_inside_loops_are_flagged() {
        let mut item = TemplateNode::element(
            "li",
            vec![TemplateNode::element("em", vec![TemplateNode::element("b", Vec::new())])],
        );
        item.has_for = true;
        let mut root = TemplateNode::element("ul", vec![item]);
        optimize(&mut root);
        let em = root.children.first().and_then(|li| li.children.first());
        assert!(em.is_some_and(|node| node.static_in_for && node.static_root));
    }

    #[test]
    fn components_keep_their_slot_content_dynamic() {
        let mut root = TemplateNode::element("my-card", vec![TemplateNode::element("p", Vec::new())]);
        optimize(&mut root);
        assert!(!root.is_static);
        assert!(root.children.first().is_some_and(|child| !child.is_static));
    }
}
