#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use dom::{Document, DomMirror, DomSubscriber, DomUpdate};
    use rustc_hash::FxHashMap;
    use tokio::sync::broadcast;
    use vdom::{NodeHandle, NodeOps};

    /// Rebuilds parent links and attributes from the update stream.
    #[derive(Default)]
    struct ParentMap {
        parents: FxHashMap<NodeHandle, NodeHandle>,
        attrs: FxHashMap<(NodeHandle, String), String>,
        removed: Vec<NodeHandle>,
    }

    impl DomSubscriber for ParentMap {
        fn apply_update(&mut self, update: DomUpdate) -> anyhow::Result<()> {
            match update {
                DomUpdate::InsertElement { parent, node, .. }
                | DomUpdate::InsertText { parent, node, .. }
                | DomUpdate::InsertComment { parent, node, .. }
                | DomUpdate::MoveNode { parent, node, .. } => {
                    self.parents.insert(node, parent);
                }
                DomUpdate::RemoveNode { node } => {
                    self.parents
                        .remove(&node)
                        .ok_or_else(|| anyhow!("{node:?} removed before insertion"))?;
                    self.removed.push(node);
                }
                DomUpdate::SetAttr { node, name, value } => {
                    self.attrs.insert((node, name), value);
                }
                DomUpdate::RemoveAttr { node, name } => {
                    self.attrs.remove(&(node, name));
                }
                DomUpdate::SetText { .. } | DomUpdate::SetStyleScope { .. } => {}
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn mirror_replays_published_batches() -> anyhow::Result<()> {
        let _ignored = env_logger::builder().is_test(true).try_init();
        let (sender, receiver) = broadcast::channel(16);
        let document = Document::with_publisher(sender);
        let mut mirror = DomMirror::new(receiver, ParentMap::default());

        let list = document.create_element("ul");
        let item = document.create_element("li");
        document.append_child(list, item)?;
        document.append_child(document.root(), list)?;
        document.set_attribute(item, "class", "active")?;
        assert_eq!(document.publish()?, 3);

        assert!(mirror.update().await?);
        assert_eq!(mirror.mirror().parents.get(&item), Some(&list));
        assert_eq!(mirror.mirror().parents.get(&list), Some(&document.root()));
        assert_eq!(
            mirror.mirror().attrs.get(&(item, String::from("class"))).map(String::as_str),
            Some("active")
        );

        document.remove_child(list, item)?;
        document.publish()?;
        assert_eq!(mirror.try_update_sync()?, 1);
        assert_eq!(mirror.into_inner().removed, [item]);
        Ok(())
    }

    #[tokio::test]
    async fn mirror_stops_when_document_is_dropped() -> anyhow::Result<()> {
        let (sender, receiver) = broadcast::channel(4);
        let mut mirror = DomMirror::new(receiver, ParentMap::default());
        drop(Document::with_publisher(sender));
        assert!(!mirror.update().await?);
        Ok(())
    }

    #[test]
    fn updates_serialize_with_plain_handles() -> anyhow::Result<()> {
        let update = DomUpdate::MoveNode {
            parent: NodeHandle(1),
            node: NodeHandle(7),
            pos: 2,
        };
        let json = serde_json::to_value(&update)?;
        assert_eq!(json["op"], "move_node");
        assert_eq!(json["node"], 7);
        assert_eq!(serde_json::from_value::<DomUpdate>(json)?, update);
        Ok(())
    }

    #[test]
    fn events_bubble_to_ancestors() -> anyhow::Result<()> {
        use core::cell::Cell;
        use std::rc::Rc;

        let document = Document::new();
        let outer = document.create_element("div");
        let button = document.create_element("button");
        document.append_child(outer, button)?;
        let seen = Rc::new(Cell::new(0));
        for node in [outer, button] {
            let counter = Rc::clone(&seen);
            document.set_event_listener(node, "click", Some(Rc::new(move |_| counter.set(counter.get() + 1))))?;
        }
        assert_eq!(document.dispatch_event(button, "click"), 2);
        document.set_event_listener(outer, "click", None)?;
        assert_eq!(document.dispatch_event(button, "click"), 1);
        assert_eq!(seen.get(), 3);
        assert!(!document.has_listener(outer, "click"));
        Ok(())
    }
}
