#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use core::any::Any;
    use core::cell::{Cell, RefCell};
    use dom::{Document, DomUpdate};
    use rustc_hash::FxHashMap;
    use std::rc::Rc;
    use vdom::{
        ComponentInstance, DirectiveBinding, DirectiveDef, DirectiveHook, NodeHandle, NodeOps, PatchError,
        PatchSource, Patcher, PendingInsert, Refs, RemoveCallback, StaticTrees, VNode, VNodeContext, VNodeData,
        VNodeHooks,
    };

    fn init() {
        let _ignored = env_logger::builder().is_test(true).try_init();
    }

    fn setup() -> (Rc<Document>, Patcher) {
        init();
        let document = Rc::new(Document::new());
        let ops: Rc<dyn NodeOps> = Rc::clone(&document) as Rc<dyn NodeOps>;
        (document, Patcher::new(ops))
    }

    fn item(key: &str) -> VNode {
        VNode::element("li", VNodeData::new().key(key), vec![VNode::text(key)])
    }

    fn list(keys: &[&str]) -> VNode {
        VNode::element("ul", VNodeData::new(), keys.iter().map(|key| item(key)).collect())
    }

    /// Build `vnode` and attach it to the document root.
    fn mount(document: &Document, patcher: &Patcher, vnode: &mut VNode) -> anyhow::Result<NodeHandle> {
        let elm = patcher
            .patch(None, Some(vnode))?
            .ok_or_else(|| anyhow!("nothing was created"))?;
        document.append_child(document.root(), elm)?;
        document.take_updates();
        Ok(elm)
    }

    fn count(updates: &[DomUpdate], wanted: fn(&DomUpdate) -> bool) -> usize {
        updates.iter().filter(|update| wanted(update)).count()
    }

    fn is_insert(update: &DomUpdate) -> bool {
        matches!(update, DomUpdate::InsertElement { .. })
    }

    fn is_move(update: &DomUpdate) -> bool {
        matches!(update, DomUpdate::MoveNode { .. })
    }

    #[derive(Default)]
    struct TestContext {
        refs: RefCell<Refs>,
        directives: FxHashMap<&'static str, Rc<DirectiveDef>>,
    }

    impl VNodeContext for TestContext {
        fn refs(&self) -> &RefCell<Refs> {
            &self.refs
        }

        fn scope_id(&self) -> Option<Rc<str>> {
            Some(Rc::from("data-v-7"))
        }

        fn resolve_directive(&self, name: &str) -> Option<Rc<DirectiveDef>> {
            self.directives.get(name).cloned()
        }
    }

    #[test]
    fn prepend_creates_one_element_and_moves_nothing() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let mut old = list(&["b", "c", "d"]);
        let root = mount(&document, &patcher, &mut old)?;
        let before = document.children(root);

        let mut new = list(&["a", "b", "c", "d"]);
        patcher.patch(Some(PatchSource::VNode(&old)), Some(&mut new))?;

        let updates = document.take_updates();
        assert_eq!(count(&updates, is_insert), 1);
        assert_eq!(count(&updates, is_move), 0);
        assert_eq!(document.text_content(root), "abcd");
        assert_eq!(document.children(root).get(1..), Some(before.as_slice()));
        Ok(())
    }

    #[test]
    fn reversal_moves_two_nodes() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let mut old = list(&["a", "b", "c"]);
        let root = mount(&document, &patcher, &mut old)?;

        let mut new = list(&["c", "b", "a"]);
        patcher.patch(Some(PatchSource::VNode(&old)), Some(&mut new))?;

        let updates = document.take_updates();
        assert_eq!(count(&updates, is_insert), 0);
        assert_eq!(count(&updates, is_move), 2);
        assert_eq!(document.text_content(root), "cba");
        Ok(())
    }

    #[test]
    fn keyed_shuffle_keeps_nodes_by_key() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let mut old = list(&["a", "b", "c", "d", "e"]);
        let root = mount(&document, &patcher, &mut old)?;
        let b_before = document.children(root).get(1).copied();

        let mut new = list(&["e", "x", "b", "a"]);
        patcher.patch(Some(PatchSource::VNode(&old)), Some(&mut new))?;

        assert_eq!(document.text_content(root), "exba");
        assert_eq!(document.children(root).get(2).copied(), b_before);
        let updates = document.take_updates();
        assert_eq!(count(&updates, is_insert), 1);
        assert_eq!(count(&updates, |update| matches!(update, DomUpdate::RemoveNode { .. })), 2);
        Ok(())
    }

    #[test]
    fn unkeyed_children_are_patched_in_place() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let paragraph = |text: &str| VNode::element("p", VNodeData::new(), vec![VNode::text(text)]);
        let mut old = VNode::element("div", VNodeData::new(), vec![paragraph("one"), paragraph("two")]);
        let root = mount(&document, &patcher, &mut old)?;

        let mut new = VNode::element("div", VNodeData::new(), vec![paragraph("uno")]);
        patcher.patch(Some(PatchSource::VNode(&old)), Some(&mut new))?;

        assert_eq!(document.to_html(root), "<div><p>uno</p></div>");
        let updates = document.take_updates();
        assert_eq!(count(&updates, is_insert), 0);
        let paragraph_elm = document.children(root).first().copied().unwrap_or_default();
        let text_elm = document.children(paragraph_elm).first().copied().unwrap_or_default();
        assert!(updates.contains(&DomUpdate::SetText {
            node: text_elm,
            text: String::from("uno"),
        }));
        Ok(())
    }

    #[test]
    fn different_root_replaces_the_old_one() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let mut old = VNode::element("div", VNodeData::new(), vec![VNode::text("old")]);
        let old_elm = mount(&document, &patcher, &mut old)?;

        let mut new = VNode::element("section", VNodeData::new(), vec![VNode::text("new")]);
        let new_elm = patcher
            .patch(Some(PatchSource::VNode(&old)), Some(&mut new))?
            .ok_or_else(|| anyhow!("no root"))?;

        assert_ne!(old_elm, new_elm);
        assert_eq!(document.children(document.root()), [new_elm]);
        assert_eq!(document.parent_node(old_elm), None);
        Ok(())
    }

    #[test]
    fn a_foreign_element_is_replaced() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let mount_point = document.create_element("div");
        document.set_attribute(mount_point, "id", "app")?;
        document.append_child(document.root(), mount_point)?;

        let mut app = VNode::element("main", VNodeData::new(), Vec::new());
        let elm = patcher.patch(Some(PatchSource::Element(mount_point)), Some(&mut app))?;

        assert_eq!(document.children(document.root()), elm.into_iter().collect::<Vec<_>>());
        assert_eq!(document.to_html(document.root()), "<main></main>");
        Ok(())
    }

    #[test]
    fn text_and_children_swap() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let mut old = VNode::element("p", VNodeData::new(), Vec::new()).with_text("plain");
        let root = mount(&document, &patcher, &mut old)?;

        let mut with_children = VNode::element("p", VNodeData::new(), vec![item("a"), item("b")]);
        patcher.patch(Some(PatchSource::VNode(&old)), Some(&mut with_children))?;
        assert_eq!(document.to_html(root), "<p><li>a</li><li>b</li></p>");

        let mut back = VNode::element("p", VNodeData::new(), Vec::new()).with_text("again");
        patcher.patch(Some(PatchSource::VNode(&with_children)), Some(&mut back))?;
        assert_eq!(document.to_html(root), "<p>again</p>");
        Ok(())
    }

    #[test]
    fn attributes_follow_the_data() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let data = VNodeData::new().attr("id", "first").attr("disabled", true).attr("tabindex", 3);
        let mut old = VNode::element("button", data, Vec::new());
        let elm = mount(&document, &patcher, &mut old)?;
        assert_eq!(document.attribute(elm, "disabled").as_deref(), Some("disabled"));
        assert_eq!(document.attribute(elm, "tabindex").as_deref(), Some("3"));

        let data = VNodeData::new().attr("id", "second").attr("disabled", false);
        let mut new = VNode::element("button", data, Vec::new());
        patcher.patch(Some(PatchSource::VNode(&old)), Some(&mut new))?;
        assert_eq!(document.attribute(elm, "id").as_deref(), Some("second"));
        assert_eq!(document.attribute(elm, "disabled"), None);
        assert_eq!(document.attribute(elm, "tabindex"), None);
        Ok(())
    }

    #[test]
    fn listeners_are_swapped_without_reinstalling() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let log = Rc::new(RefCell::new(Vec::new()));
        let listener = |label: &'static str| {
            let log = Rc::clone(&log);
            move |_: &vdom::DomEvent| -> anyhow::Result<()> {
                log.borrow_mut().push(label);
                Ok(())
            }
        };
        let mut old = VNode::element("button", VNodeData::new().on("click", listener("first")), Vec::new());
        let elm = mount(&document, &patcher, &mut old)?;
        document.dispatch_event(elm, "click");

        let mut new = VNode::element("button", VNodeData::new().on("click", listener("second")), Vec::new());
        patcher.patch(Some(PatchSource::VNode(&old)), Some(&mut new))?;
        document.dispatch_event(elm, "click");

        let mut bare = VNode::element("button", VNodeData::new(), Vec::new());
        patcher.patch(Some(PatchSource::VNode(&new)), Some(&mut bare))?;
        assert_eq!(document.dispatch_event(elm, "click"), 0);
        assert_eq!(*log.borrow(), ["first", "second"]);
        Ok(())
    }

    #[test]
    fn destroy_hooks_reach_the_whole_subtree() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let destroyed = Rc::new(RefCell::new(Vec::new()));
        let tracked = |key: &'static str| {
            let destroyed = Rc::clone(&destroyed);
            let hook = VNodeHooks {
                destroy: Some(Rc::new(move |_: &VNode| {
                    destroyed.borrow_mut().push(key);
                    Ok(())
                })),
                ..VNodeHooks::default()
            };
            VNode::element("li", VNodeData::new().key(key).hooks(hook), Vec::new())
        };
        let mut old = VNode::element("ul", VNodeData::new(), vec![tracked("a"), tracked("b")]);
        mount(&document, &patcher, &mut old)?;

        patcher.patch(Some(PatchSource::VNode(&old)), None)?;
        assert_eq!(*destroyed.borrow(), ["a", "b"]);
        Ok(())
    }

    #[test]
    fn remove_hook_delays_detaching() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let held: Rc<RefCell<Option<RemoveCallback>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&held);
        let hook = VNodeHooks {
            remove: Some(Rc::new(move |_: &VNode, remove: RemoveCallback| {
                *slot.borrow_mut() = Some(remove);
                Ok(())
            })),
            ..VNodeHooks::default()
        };
        let leaving = VNode::element("li", VNodeData::new().key("a").hooks(hook), Vec::new());
        let mut old = VNode::element("ul", VNodeData::new(), vec![leaving, item("b")]);
        let root = mount(&document, &patcher, &mut old)?;
        let leaving_elm = document.children(root).first().copied();

        let mut new = list(&["b"]);
        patcher.patch(Some(PatchSource::VNode(&old)), Some(&mut new))?;
        assert_eq!(document.children(root).len(), 2);

        let remove = held.borrow_mut().take().ok_or_else(|| anyhow!("remove hook not called"))?;
        assert_eq!(remove.pending(), 1);
        remove.call()?;
        assert_eq!(document.children(root).len(), 1);
        assert_eq!(leaving_elm.and_then(|elm| document.parent_node(elm)), None);
        Ok(())
    }

    #[test]
    fn refs_and_scope_come_from_the_context() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let context: Rc<dyn VNodeContext> = Rc::new(TestContext::default());
        let mut old =
            VNode::element("div", VNodeData::new().ref_name("panel", false), Vec::new()).with_context(&context);
        let elm = mount(&document, &patcher, &mut old)?;
        assert_eq!(context.refs().borrow().node("panel"), Some(elm));
        assert_eq!(document.style_scope(elm).as_deref(), Some("data-v-7"));

        patcher.patch(Some(PatchSource::VNode(&old)), None)?;
        assert!(context.refs().borrow().is_empty());
        Ok(())
    }

    #[test]
    fn directive_hooks_follow_the_lifecycle() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let record = |label: &'static str| -> Option<DirectiveHook> {
            let calls = Rc::clone(&calls);
            Some(Rc::new(move |args: &vdom::DirectiveHookArgs<'_>| {
                let binding = args.binding;
                calls.borrow_mut().push(format!(
                    "{label}:{}:{}",
                    binding.value.to_display_string(),
                    binding.old_value.to_display_string()
                ));
                Ok(())
            }))
        };
        let def = DirectiveDef {
            bind: record("bind"),
            inserted: record("inserted"),
            update: record("update"),
            component_updated: None,
            unbind: record("unbind"),
        };
        let mut directives = FxHashMap::default();
        directives.insert("focus", Rc::new(def));
        let context: Rc<dyn VNodeContext> = Rc::new(TestContext {
            directives,
            ..TestContext::default()
        });
        let node = |value: i32| {
            VNode::element("input", VNodeData::new().directive(DirectiveBinding::new("focus", value)), Vec::new())
                .with_context(&context)
        };

        let mut old = node(1);
        mount(&document, &patcher, &mut old)?;
        let mut new = node(2);
        patcher.patch(Some(PatchSource::VNode(&old)), Some(&mut new))?;
        patcher.patch(Some(PatchSource::VNode(&new)), None)?;

        assert_eq!(
            *calls.borrow(),
            ["bind:1:", "inserted:1:", "update:2:1", "unbind:2:1"]
        );
        Ok(())
    }

    #[test]
    fn cached_static_trees_are_not_diffed() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let trees = StaticTrees::new();
        let render = || {
            let header = trees.render_static(0, false, || {
                let title = VNode::element("h1", VNodeData::new(), vec![VNode::text("Title")]);
                VNode::element("header", VNodeData::new(), vec![title])
            });
            VNode::element("div", VNodeData::new(), vec![header])
        };
        let mut old = render();
        mount(&document, &patcher, &mut old)?;

        let mut new = render();
        assert!(new.children.first().is_some_and(|header| header.is_cloned));
        patcher.patch(Some(PatchSource::VNode(&old)), Some(&mut new))?;

        assert!(document.take_updates().is_empty());
        let elms = |vnode: &VNode| vnode.children.first().and_then(|header| header.elm);
        assert_eq!(elms(&new), elms(&old));
        assert!(elms(&new).is_some());
        Ok(())
    }

    struct FakeComponent {
        root: NodeHandle,
    }

    impl ComponentInstance for FakeComponent {
        fn root_elm(&self) -> Option<NodeHandle> {
            Some(self.root)
        }

        fn root_is_element(&self) -> bool {
            true
        }

        fn take_pending_insert(&self) -> Vec<PendingInsert> {
            Vec::new()
        }

        fn with_root_vnode(&self, _visit: &mut dyn FnMut(&VNode)) {}

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn component_placeholder_takes_the_instance_root() -> anyhow::Result<()> {
        let (document, patcher) = setup();
        let inits = Rc::new(Cell::new(0));
        let inserted = Rc::new(Cell::new(0));
        let backend = Rc::clone(&document);
        let init_count = Rc::clone(&inits);
        let insert_count = Rc::clone(&inserted);
        let hooks = VNodeHooks {
            init: Some(Rc::new(move |vnode: &mut VNode| {
                init_count.set(init_count.get() + 1);
                let root = backend.create_element("section");
                vnode.component_instance = Some(Rc::new(FakeComponent { root }));
                Ok(())
            })),
            insert: Some(Rc::new(move |_: &VNode| {
                insert_count.set(insert_count.get() + 1);
                Ok(())
            })),
            ..VNodeHooks::default()
        };
        let placeholder = VNode::component("my-card", VNodeData::new().hooks(hooks), Rc::new(()));
        let mut old = VNode::element("div", VNodeData::new(), vec![placeholder]);
        let root = mount(&document, &patcher, &mut old)?;

        assert_eq!(inits.get(), 1);
        assert_eq!(inserted.get(), 1);
        assert_eq!(document.to_html(root), "<div><section></section></div>");
        let section = document.children(root).first().copied();
        assert_eq!(old.children.first().and_then(VNode::node_elm), section);
        Ok(())
    }

    #[test]
    fn placeholder_without_instance_is_an_error() {
        let (_document, patcher) = setup();
        let mut vnode = VNode::component("ghost", VNodeData::new(), Rc::new(()));
        let result = patcher.patch(None, Some(&mut vnode));
        assert!(matches!(
            result.as_ref().map_err(|err| err.downcast_ref::<PatchError>()),
            Err(Some(PatchError::ComponentNotCreated { .. }))
        ));
    }
}
