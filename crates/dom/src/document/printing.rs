use super::{Document, DomNode, NodeKind, Tree};
use core::fmt;
use indextree::NodeId;
use serde_json::{Map, Value, json};
use vdom::NodeHandle;

fn sorted_attrs(node: &DomNode) -> Vec<(&str, &str)> {
    let mut pairs: Vec<(&str, &str)> = node
        .attrs
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    pairs.sort_by(|left, right| left.0.cmp(right.0));
    pairs
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(character),
        }
    }
    out
}

fn node_to_json(tree: &Tree, id: NodeId) -> Value {
    let Some(node) = tree.arena.get(id).map(indextree::Node::get) else {
        return Value::Null;
    };
    let children = || -> Vec<Value> {
        id.children(&tree.arena)
            .map(|child| node_to_json(tree, child))
            .filter(|child| !child.is_null())
            .collect()
    };
    match &node.kind {
        NodeKind::Document => json!({ "type": "document", "children": children() }),
        NodeKind::Element { tag } => {
            let mut attrs = Map::new();
            for (name, value) in sorted_attrs(node) {
                attrs.insert(name.to_owned(), Value::String(value.to_owned()));
            }
            let mut element = json!({
                "type": "element",
                "tag": tag,
                "attrs": Value::Object(attrs),
                "children": children(),
            });
            if let (Some(scope), Some(object)) = (&node.style_scope, element.as_object_mut()) {
                object.insert(String::from("scope"), Value::String(scope.clone()));
            }
            element
        }
        NodeKind::Text { text } => json!({ "type": "text", "text": text }),
        NodeKind::Comment { text } => json!({ "type": "comment", "text": text }),
    }
}

fn write_html(tree: &Tree, id: NodeId, out: &mut String) {
    let Some(node) = tree.arena.get(id).map(indextree::Node::get) else {
        return;
    };
    let write_children = |out: &mut String| {
        for child in id.children(&tree.arena) {
            write_html(tree, child, out);
        }
    };
    match &node.kind {
        NodeKind::Document => write_children(out),
        NodeKind::Element { tag } => {
            out.push('<');
            out.push_str(tag);
            if let Some(scope) = &node.style_scope {
                out.push(' ');
                out.push_str(scope);
            }
            for (name, value) in sorted_attrs(node) {
                out.push_str(&format!(" {name}=\"{}\"", escape_text(value)));
            }
            out.push('>');
            write_children(out);
            out.push_str(&format!("</{tag}>"));
        }
        NodeKind::Text { text } => out.push_str(&escape_text(text)),
        NodeKind::Comment { text } => out.push_str(&format!("<!--{text}-->")),
    }
}

impl Document {
    /// Serialized markup of `node`, attributes sorted by name.
    pub fn to_html(&self, node: NodeHandle) -> String {
        let tree = self.tree.borrow();
        let mut out = String::new();
        if let Ok(id) = tree.id(node) {
            write_html(&tree, id, &mut out);
        }
        out
    }

    /// Build a deterministic JSON representation of the document.
    /// Schema:
    /// - Document: { "type":"document", "children":[ ... ] }
    /// - Element: { "type":"element", "tag": "div", "attrs": {..}, "children":[ ... ] }
    /// - Text and comments: { "type":"text", "text":"..." }
    pub fn to_json_value(&self) -> Value {
        let tree = self.tree.borrow();
        node_to_json(&tree, tree.root)
    }

    /// Pretty JSON string for snapshots and test comparisons.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json_value()).unwrap_or_else(|_| String::from("{}"))
    }
}

fn write_indent(formatter: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        formatter.write_str("  ")?;
    }
    Ok(())
}

fn fmt_node(tree: &Tree, id: NodeId, formatter: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    let Some(node) = tree.arena.get(id).map(indextree::Node::get) else {
        return Ok(());
    };
    write_indent(formatter, depth)?;
    match &node.kind {
        NodeKind::Document => writeln!(formatter, "#document")?,
        NodeKind::Element { tag } => {
            write!(formatter, "<{tag}")?;
            for (name, value) in sorted_attrs(node) {
                write!(formatter, " {name}={value:?}")?;
            }
            writeln!(formatter, "> {:?}", node.handle)?;
        }
        NodeKind::Text { text } => writeln!(formatter, "{text:?}")?,
        NodeKind::Comment { text } => writeln!(formatter, "<!--{text}-->")?,
    }
    for child in id.children(&tree.arena) {
        fmt_node(tree, child, formatter, depth + 1)?;
    }
    Ok(())
}

impl fmt::Debug for Document {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.borrow();
        writeln!(formatter, "Document")?;
        fmt_node(&tree, tree.root, formatter, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vdom::NodeOps;

    #[test]
    fn html_escapes_and_sorts() -> anyhow::Result<()> {
        let document = Document::new();
        let link = document.create_element("a");
        document.set_attribute(link, "title", "\"quoted\"")?;
        document.set_attribute(link, "href", "/x")?;
        let text = document.create_text_node("a < b");
        document.append_child(link, text)?;
        assert_eq!(document.to_html(link), "<a href=\"/x\" title=\"&quot;quoted&quot;\">a &lt; b</a>");
        Ok(())
    }

    #[test]
    fn json_snapshot_is_rooted_at_the_document() -> anyhow::Result<()> {
        let document = Document::new();
        let comment = document.create_comment("v-if");
        document.append_child(document.root(), comment)?;
        let snapshot = document.to_json_value();
        assert_eq!(snapshot["type"], "document");
        assert_eq!(snapshot["children"][0]["type"], "comment");
        Ok(())
    }
}
