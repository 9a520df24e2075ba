#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use core::cell::{Cell, RefCell};
    use dom::DomUpdate;
    use reactive::{Config, Value, WatchOptions};
    use ripple::{Component, ComponentOptions, Lifecycle, RenderContext, Ripple, WatchDef};
    use serde_json::json;
    use std::rc::Rc;
    use vdom::{Child, VNode, VNodeData};

    type Log = Rc<RefCell<Vec<String>>>;

    fn init() {
        let _ignored = env_logger::builder().is_test(true).try_init();
    }

    fn paragraph(ctx: &RenderContext<'_>, key: &str) -> VNode {
        ctx.h("p", VNodeData::new(), vec![Child::text(&ctx.text_of(key))])
    }

    /// Record every lifecycle hook of `options` as `label:hook`.
    fn logged(options: ComponentOptions, label: &'static str, log: &Log) -> ComponentOptions {
        [
            Lifecycle::Created,
            Lifecycle::BeforeMount,
            Lifecycle::Mounted,
            Lifecycle::BeforeUpdate,
            Lifecycle::Updated,
            Lifecycle::BeforeDestroy,
            Lifecycle::Destroyed,
        ]
        .into_iter()
        .fold(options, |with_hooks, lifecycle| {
            let log = Rc::clone(log);
            with_hooks.hook(lifecycle, move |_component| {
                log.borrow_mut().push(format!("{label}:{}", lifecycle.name()));
                Ok(())
            })
        })
    }

    fn only_child(parent: &Component) -> anyhow::Result<Component> {
        parent
            .children()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("{} has no child component", parent.name()))
    }

    /// # Errors
    /// Returns an error if mounting fails.
    #[test]
    fn mounted_component_renders_into_the_document() -> anyhow::Result<()> {
        init();
        let mut app = Ripple::new();
        let component = app.mount(
            ComponentOptions::new()
                .name("Title")
                .data(|| json!({ "title": "Todos" }))
                .render(|ctx| Ok(ctx.h("h1", VNodeData::new().attr("class", "big"), vec![Child::text(&ctx.text_of("title"))]))),
        )?;
        assert!(component.is_mounted());
        assert_eq!(app.html(), "<h1 class=\"big\">Todos</h1>");
        assert_eq!(app.roots().len(), 1);
        Ok(())
    }

    /// # Errors
    /// Returns an error if mounting or flushing fails.
    #[test]
    fn writes_are_batched_into_one_render_per_flush() -> anyhow::Result<()> {
        init();
        let renders = Rc::new(Cell::new(0usize));
        let counted = Rc::clone(&renders);
        let mut app = Ripple::new();
        let component = app.mount(
            ComponentOptions::new()
                .data(|| json!({ "count": 0 }))
                .render(move |ctx| {
                    counted.set(counted.get() + 1);
                    Ok(paragraph(ctx, "count"))
                }),
        )?;
        assert_eq!(renders.get(), 1);

        component.set("count", 1)?;
        component.set("count", 2)?;
        assert_eq!(app.html(), "<p>0</p>");
        app.flush()?;
        assert_eq!(app.html(), "<p>2</p>");
        assert_eq!(renders.get(), 2);

        component.set("count", 2)?;
        app.flush()?;
        assert_eq!(renders.get(), 2);
        Ok(())
    }

    /// # Errors
    /// Returns an error if mounting, flushing or the event dispatch fails.
    #[test]
    fn document_events_reach_component_handlers() -> anyhow::Result<()> {
        init();
        let mut app = Ripple::new();
        let component = app.mount(
            ComponentOptions::new()
                .data(|| json!({ "count": 0 }))
                .render(|ctx| {
                    let increment = ctx.handler(|component, _event| {
                        let count = component.get("count").as_f64().unwrap_or_default();
                        component.set("count", count + 1.0)
                    });
                    Ok(ctx.h(
                        "button",
                        VNodeData::new().on("click", increment),
                        vec![Child::text(&ctx.text_of("count"))],
                    ))
                }),
        )?;
        let button = component.root_elm().ok_or_else(|| anyhow!("button was not rendered"))?;
        assert_eq!(app.handle_event(button, "click")?, 1);
        assert_eq!(app.handle_event(button, "click")?, 1);
        assert_eq!(app.html(), "<button>2</button>");
        Ok(())
    }

    /// # Errors
    /// Returns an error if a computed read or write fails.
    #[test]
    fn computed_values_are_cached_until_a_dependency_changes() -> anyhow::Result<()> {
        init();
        let evaluations = Rc::new(Cell::new(0usize));
        let counted = Rc::clone(&evaluations);
        let component = Component::new(
            ComponentOptions::new()
                .data(|| json!({ "count": 2 }))
                .computed("double", move |component| {
                    counted.set(counted.get() + 1);
                    Ok(Value::from(component.get("count").as_f64().unwrap_or_default() * 2.0))
                })
                .computed_with_setter(
                    "half",
                    |component| Ok(Value::from(component.get("count").as_f64().unwrap_or_default() / 2.0)),
                    |component, value| component.set("count", value.as_f64().unwrap_or_default() * 2.0),
                ),
        );
        assert_eq!(component.get("double"), Value::from(4));
        assert_eq!(component.get("double"), Value::from(4));
        assert_eq!(evaluations.get(), 1);

        component.set("count", 5)?;
        assert_eq!(evaluations.get(), 1);
        assert_eq!(component.get("double"), Value::from(10));
        assert_eq!(evaluations.get(), 2);

        component.set("half", 4)?;
        assert_eq!(component.get("count"), Value::from(8));
        Ok(())
    }

    /// # Errors
    /// Returns an error if a write fails.
    #[test]
    fn path_watchers_see_nested_changes_until_cancelled() -> anyhow::Result<()> {
        init();
        let seen: Log = Rc::default();
        let component = Component::new(ComponentOptions::new().data(|| json!({ "user": { "name": "Al" } })));
        let recorded = Rc::clone(&seen);
        let handle = component.watch(
            "user.name",
            move |_component, new, old| {
                recorded
                    .borrow_mut()
                    .push(format!("{} <- {}", new.to_display_string(), old.to_display_string()));
                Ok(())
            },
            WatchOptions::new(),
        );
        let user = component.get("user");
        let fields = user.as_object().ok_or_else(|| anyhow!("user is not an object"))?;
        fields.assign("name", "Bo");
        ripple::flush();
        assert_eq!(*seen.borrow(), ["Bo <- Al"]);

        handle.cancel();
        ripple::set(&user, "name", "Cy");
        ripple::flush();
        assert_eq!(seen.borrow().len(), 1);
        Ok(())
    }

    /// # Errors
    /// Returns an error if a write fails.
    #[test]
    fn declared_watches_call_closures_and_methods() -> anyhow::Result<()> {
        init();
        let seen: Log = Rc::default();
        let by_method = Rc::clone(&seen);
        let by_closure = Rc::clone(&seen);
        let component = Component::new(
            ComponentOptions::new()
                .data(|| json!({ "count": 1, "items": [] }))
                .method("onCount", move |_component, args| {
                    let [new, old] = args else {
                        return Err(anyhow!("expected two arguments"));
                    };
                    by_method
                        .borrow_mut()
                        .push(format!("method {} {}", new.to_display_string(), old.to_display_string()));
                    Ok(Value::Null)
                })
                .watch(WatchDef::method("count", "onCount"))
                .watch(
                    WatchDef::new("items", move |_component, new, _old| {
                        let len = new.as_array().map_or(0, |items| items.len());
                        by_closure.borrow_mut().push(format!("items {len}"));
                        Ok(())
                    })
                    .deep()
                    .immediate(),
                ),
        );
        assert_eq!(*seen.borrow(), ["items 0"]);

        component.set("count", 3)?;
        if let Some(items) = component.get("items").as_array() {
            items.push("milk");
        }
        ripple::flush();
        assert_eq!(*seen.borrow(), ["items 0", "method 3 1", "items 1"]);
        Ok(())
    }

    /// # Errors
    /// Returns an error if mounting or flushing fails.
    #[test]
    fn children_receive_props_and_follow_parent_renders() -> anyhow::Result<()> {
        init();
        let child_renders = Rc::new(Cell::new(0usize));
        let counted = Rc::clone(&child_renders);
        let label = ComponentOptions::new()
            .name("Label")
            .prop("text")
            .render(move |ctx| {
                counted.set(counted.get() + 1);
                Ok(ctx.h("span", VNodeData::new(), vec![Child::text(&ctx.text_of("text"))]))
            });
        let mut app = Ripple::new();
        let parent = app.mount(
            ComponentOptions::new()
                .data(|| json!({ "label": "one", "other": 0 }))
                .component("text-label", label)
                .render(|ctx| {
                    ctx.get("other");
                    let child = ctx.h("text-label", VNodeData::new().attr("text", ctx.get("label")), Vec::new());
                    Ok(ctx.element("div", VNodeData::new(), vec![child]))
                }),
        )?;
        assert_eq!(app.html(), "<div><span>one</span></div>");
        let child = only_child(&parent)?;
        assert!(child.is_mounted());
        assert!(child.parent().is_some_and(|owner| owner.ptr_eq(&parent)));

        parent.set("label", "two")?;
        app.flush()?;
        assert_eq!(app.html(), "<div><span>two</span></div>");
        assert_eq!(child_renders.get(), 2);

        // Unchanged props do not re-render the child.
        parent.set("other", 1)?;
        app.flush()?;
        assert_eq!(child_renders.get(), 2);
        assert!(only_child(&parent)?.ptr_eq(&child));
        Ok(())
    }

    /// # Errors
    /// Returns an error if mounting fails.
    #[test]
    fn emitted_events_reach_the_parent_listener() -> anyhow::Result<()> {
        init();
        let picker = ComponentOptions::new()
            .name("Picker")
            .render(|ctx| Ok(ctx.h("button", VNodeData::new(), vec![Child::text("pick")])));
        let mut app = Ripple::new();
        let parent = app.mount(
            ComponentOptions::new()
                .data(|| json!({ "picked": "" }))
                .component("Picker", picker)
                .render(|ctx| {
                    let on_pick = ctx.handler(|parent, event| parent.set("picked", event.detail.clone()));
                    Ok(ctx.h("picker", VNodeData::new().on("picked", on_pick), Vec::new()))
                }),
        )?;
        let child = only_child(&parent)?;
        assert_eq!(child.emit("picked", "blue"), 1);
        assert_eq!(parent.get("picked"), Value::str("blue"));
        assert_eq!(child.emit("unknown", Value::Null), 0);
        Ok(())
    }

    /// Events emitted before the first render carry no target; afterwards
    /// the target is the component's root node.
    ///
    /// # Errors
    /// Returns an error if mounting fails.
    #[test]
    fn emitted_event_target_follows_the_root_node() -> anyhow::Result<()> {
        init();
        let targets = Rc::new(RefCell::new(Vec::new()));
        let recorded = Rc::clone(&targets);
        let component = Component::new(
            ComponentOptions::new().render(|ctx| Ok(ctx.h("span", VNodeData::new(), Vec::new()))),
        );
        component.on("ping", move |event| {
            recorded.borrow_mut().push(event.target);
            Ok(())
        });
        assert_eq!(component.emit("ping", Value::Null), 1);

        let mut app = Ripple::new();
        let mounted = app.mount_component(component)?;
        assert_eq!(mounted.emit("ping", Value::Null), 1);
        let root = mounted.root_elm().ok_or_else(|| anyhow!("component did not render"))?;
        assert_eq!(*targets.borrow(), [None, Some(root)]);
        assert_eq!(app.document().dispatch(&vdom::DomEvent::with_target("ping", None)), 0);
        Ok(())
    }

    /// # Errors
    /// Returns an error if mounting fails.
    #[test]
    fn child_errors_are_captured_by_ancestors() -> anyhow::Result<()> {
        init();
        let captured: Log = Rc::default();
        let reported: Log = Rc::default();
        let global = Rc::clone(&reported);
        let mut app = Ripple::builder()
            .config(Config::default().with_error_handler(move |err, _scope, info| {
                global.borrow_mut().push(format!("{info}: {err}"));
                Ok(())
            }))
            .build();
        let broken = ComponentOptions::new()
            .name("Broken")
            .hook(Lifecycle::Created, |_component| Err(anyhow!("no data")))
            .render(|_ctx| Err(anyhow!("cannot render")));
        let recorded = Rc::clone(&captured);
        app.mount(
            ComponentOptions::new()
                .component("broken", broken)
                .error_captured(move |err, info| {
                    recorded.borrow_mut().push(format!("{info}: {err}"));
                    Ok(info == "created hook")
                })
                .render(|ctx| Ok(ctx.h("div", VNodeData::new(), vec![Child::Node(ctx.h("broken", VNodeData::new(), Vec::new()))]))),
        )?;
        assert_eq!(*captured.borrow(), ["created hook: no data", "render: cannot render"]);
        // Only the error the hook let through reaches the global handler.
        assert_eq!(*reported.borrow(), ["created hook: no data"]);
        assert_eq!(app.html(), "<div></div>");
        Ok(())
    }

    /// # Errors
    /// Returns an error if mounting, unmounting or flushing fails.
    #[test]
    fn unmounted_components_stop_rendering() -> anyhow::Result<()> {
        init();
        let log: Log = Rc::default();
        let renders = Rc::new(Cell::new(0usize));
        let counted = Rc::clone(&renders);
        let child_options = logged(
            ComponentOptions::new().render(|ctx| Ok(ctx.text("child"))),
            "child",
            &log,
        );
        let mut app = Ripple::new();
        let parent = app.mount(logged(
            ComponentOptions::new()
                .data(|| json!({ "count": 0 }))
                .component("child", child_options)
                .render(move |ctx| {
                    counted.set(counted.get() + 1);
                    Ok(ctx.h("section", VNodeData::new(), vec![Child::text(&ctx.text_of("count")), ctx.h("child", VNodeData::new(), Vec::new()).into()]))
                }),
            "parent",
            &log,
        ))?;
        let child = only_child(&parent)?;
        log.borrow_mut().clear();

        app.unmount(&parent)?;
        assert!(parent.is_destroyed());
        assert!(child.is_destroyed());
        assert_eq!(
            *log.borrow(),
            ["parent:beforeDestroy", "child:beforeDestroy", "child:destroyed", "parent:destroyed"]
        );
        assert!(app.roots().is_empty());
        assert_eq!(app.html(), "");

        parent.set("count", 1)?;
        app.flush()?;
        assert_eq!(renders.get(), 1);
        Ok(())
    }

    /// # Errors
    /// Returns an error if mounting or flushing fails.
    #[test]
    fn lifecycle_hooks_run_parent_around_child() -> anyhow::Result<()> {
        init();
        let log: Log = Rc::default();
        let child = logged(ComponentOptions::new().render(|ctx| Ok(ctx.h("i", VNodeData::new(), Vec::new()))), "child", &log);
        let mut app = Ripple::new();
        let parent = app.mount(logged(
            ComponentOptions::new()
                .data(|| json!({ "title": "a" }))
                .component("child", child)
                .render(|ctx| {
                    Ok(ctx.h(
                        "div",
                        VNodeData::new(),
                        vec![Child::text(&ctx.text_of("title")), ctx.h("child", VNodeData::new(), Vec::new()).into()],
                    ))
                }),
            "parent",
            &log,
        ))?;
        assert_eq!(
            *log.borrow(),
            [
                "parent:created",
                "parent:beforeMount",
                "child:created",
                "child:beforeMount",
                "child:mounted",
                "parent:mounted",
            ]
        );
        log.borrow_mut().clear();

        parent.set("title", "b")?;
        app.flush()?;
        assert_eq!(*log.borrow(), ["parent:beforeUpdate", "parent:updated"]);
        assert_eq!(app.html(), "<div>b<i></i></div>");
        Ok(())
    }

    /// # Errors
    /// Returns an error if mounting fails.
    #[test]
    fn refs_point_at_nodes_and_child_components() -> anyhow::Result<()> {
        init();
        let item = ComponentOptions::new().name("Item").render(|ctx| Ok(ctx.h("li", VNodeData::new(), Vec::new())));
        let mut app = Ripple::new();
        let parent = app.mount(
            ComponentOptions::new()
                .component("item", item)
                .render(|ctx| {
                    Ok(ctx.h(
                        "ul",
                        VNodeData::new().ref_name("list", false),
                        vec![ctx.h("item", VNodeData::new().ref_name("first", false), Vec::new()).into()],
                    ))
                }),
        )?;
        assert_eq!(parent.ref_node("list"), parent.root_elm());
        let first = parent.ref_component("first").ok_or_else(|| anyhow!("component ref missing"))?;
        assert!(first.ptr_eq(&only_child(&parent)?));
        assert!(parent.ref_component("list").is_none());
        Ok(())
    }

    /// # Errors
    /// Returns an error if mounting or flushing fails.
    #[test]
    fn force_update_rerenders_without_changes() -> anyhow::Result<()> {
        init();
        let renders = Rc::new(Cell::new(0usize));
        let counted = Rc::clone(&renders);
        let mut app = Ripple::new();
        let component = app.mount(ComponentOptions::new().render(move |ctx| {
            counted.set(counted.get() + 1);
            Ok(ctx.h("hr", VNodeData::new(), Vec::new()))
        }))?;
        component.force_update();
        app.flush()?;
        assert_eq!(renders.get(), 2);
        Ok(())
    }

    /// # Errors
    /// Returns an error if mounting fails.
    #[test]
    fn injections_resolve_from_the_nearest_provider() -> anyhow::Result<()> {
        init();
        let themed = ComponentOptions::new()
            .inject("theme", Value::Null)
            .inject("size", "small")
            .render(|ctx| Ok(ctx.h("p", VNodeData::new(), vec![Child::text(&format!("{} {}", ctx.text_of("theme"), ctx.text_of("size")))])));
        let mut app = Ripple::new();
        app.mount(
            ComponentOptions::new()
                .provide("theme", "dark")
                .component("themed", themed)
                .render(|ctx| Ok(ctx.h("div", VNodeData::new(), vec![ctx.h("themed", VNodeData::new(), Vec::new()).into()]))),
        )?;
        assert_eq!(app.html(), "<div><p>dark small</p></div>");
        Ok(())
    }

    /// # Errors
    /// Returns an error if mounting fails.
    #[test]
    fn slot_content_renders_inside_the_child() -> anyhow::Result<()> {
        init();
        let card = ComponentOptions::new().render(|ctx| Ok(ctx.element("article", VNodeData::new(), ctx.slot())));
        let mut app = Ripple::new();
        let parent = app.mount(
            ComponentOptions::new()
                .data(|| json!({ "body": "hello" }))
                .component("card", card)
                .render(|ctx| Ok(ctx.h("card", VNodeData::new(), vec![Child::Node(paragraph(ctx, "body"))]))),
        )?;
        assert_eq!(app.html(), "<article><p>hello</p></article>");

        parent.set("body", "bye")?;
        app.flush()?;
        assert_eq!(app.html(), "<article><p>bye</p></article>");
        Ok(())
    }

    /// # Errors
    /// Returns an error if mounting, flushing or the event dispatch fails.
    #[test]
    fn static_subtrees_render_once_and_methods_handle_events() -> anyhow::Result<()> {
        init();
        let static_renders = Rc::new(Cell::new(0usize));
        let counted = Rc::clone(&static_renders);
        let mut app = Ripple::new();
        let component = app.mount(
            ComponentOptions::new()
                .data(|| json!({ "total": 0 }))
                .method("add", |component, args| {
                    let amount = args.first().and_then(Value::as_f64).unwrap_or(1.0);
                    let total = component.get("total").as_f64().unwrap_or_default();
                    component.set("total", total + amount)?;
                    Ok(Value::Null)
                })
                .static_render(move |ctx| {
                    counted.set(counted.get() + 1);
                    ctx.h("footer", VNodeData::new(), vec![Child::text("static")])
                })
                .render(|ctx| {
                    let add = ctx.method_handler("add");
                    Ok(ctx.element(
                        "main",
                        VNodeData::new(),
                        vec![
                            ctx.h("button", VNodeData::new().on("click", add), vec![Child::text(&ctx.text_of("total"))]),
                            ctx.render_static(0, false),
                        ],
                    ))
                }),
        )?;
        let button = component
            .root_elm()
            .and_then(|main| app.document().children(main).first().copied())
            .ok_or_else(|| anyhow!("button was not rendered"))?;
        app.handle_event(button, "click")?;
        app.handle_event(button, "click")?;
        assert_eq!(app.html(), "<main><button>2</button><footer>static</footer></main>");
        assert_eq!(static_renders.get(), 1);
        Ok(())
    }

    /// # Errors
    /// Returns an error if mounting, publishing or receiving fails.
    #[tokio::test]
    async fn settled_updates_are_published_to_subscribers() -> anyhow::Result<()> {
        init();
        let mut app = Ripple::builder().publisher(8).build();
        let mut updates = app.subscribe().ok_or_else(|| anyhow!("no publisher"))?;
        let component = app.mount(
            ComponentOptions::new()
                .data(|| json!({ "count": 0 }))
                .render(|ctx| Ok(paragraph(ctx, "count"))),
        )?;
        assert!(app.flush()? > 0);
        assert!(!updates.recv().await?.is_empty());

        component.set("count", 7)?;
        assert_eq!(app.settle().await?, 1);
        let batch = updates.recv().await?;
        assert!(matches!(batch.as_slice(), [DomUpdate::SetText { text, .. }] if text == "7"));
        Ok(())
    }
}
