#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use dom::Document;
    use std::rc::Rc;
    use vdom::{DomEvent, NodeOps, PatchSource, Patcher, VNode, VNodeData};

    fn rows(round: usize) -> VNode {
        let items = (0..3)
            .map(|index| {
                let key = format!("{round}-{index}");
                VNode::element(
                    "li",
                    VNodeData::new().key(key.as_str()).on("click", |_| Ok(())),
                    vec![VNode::text(&*key)],
                )
            })
            .collect();
        VNode::element("ul", VNodeData::new(), items)
    }

    /// Replacing every keyed row on each render frees the old rows, their
    /// text and their listeners.
    ///
    /// # Errors
    /// Returns an error if a patch fails.
    #[test]
    fn replaced_rows_are_freed() -> anyhow::Result<()> {
        let _ignored = env_logger::builder().is_test(true).try_init();
        let document = Rc::new(Document::new());
        let ops: Rc<dyn NodeOps> = Rc::clone(&document) as Rc<dyn NodeOps>;
        let patcher = Patcher::new(ops);

        let mut current = rows(0);
        let list = patcher
            .patch(None, Some(&mut current))?
            .ok_or_else(|| anyhow!("nothing was created"))?;
        document.append_child(document.root(), list)?;
        // document, ul, three rows and their text
        assert_eq!(document.node_count(), 8);
        assert_eq!(document.listener_count(), 3);

        for round in 1..20 {
            let mut next = rows(round);
            patcher.patch(Some(PatchSource::VNode(&current)), Some(&mut next))?;
            current = next;
            assert_eq!(document.node_count(), 8);
            assert_eq!(document.listener_count(), 3);
        }
        assert_eq!(document.text_content(list), "19-019-119-2");
        Ok(())
    }

    /// # Errors
    /// Returns an error if a document operation fails.
    #[test]
    fn text_content_frees_the_old_children() -> anyhow::Result<()> {
        let document = Document::new();
        let list = document.create_element("ul");
        let item = document.create_element("li");
        document.append_child(list, item)?;
        document.set_event_listener(item, "click", Some(Rc::new(|_: &DomEvent| {})))?;
        assert_eq!(document.listener_count(), 1);

        document.set_text_content(list, "empty")?;
        // document, ul and the new text node
        assert_eq!(document.node_count(), 3);
        assert_eq!(document.listener_count(), 0);
        assert!(document.set_event_listener(item, "click", Some(Rc::new(|_: &DomEvent| {}))).is_err());
        document.set_event_listener(item, "click", None)?;
        Ok(())
    }
}
