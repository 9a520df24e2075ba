//! Component instances.
//!
//! A [`Component`] owns the reactive state built from its
//! [`ComponentOptions`] and a render watcher that re-renders and patches its
//! tree whenever something the render read changes.
//!
//! ```text
//! create ─► props ─► data ─► computed ─► watch ─► created
//! mount  ─► beforeMount ─► render watcher (render + patch) ─► mounted
//! change ─► scheduler ─► beforeUpdate ─► render + patch ─► updated
//! destroy ─► beforeDestroy ─► teardown watchers ─► destroy hooks ─► destroyed
//! ```

mod placeholder;

use crate::context::RenderContext;
use crate::error::ComponentError;
use crate::options::{ComponentOptions, Lifecycle, WatchHandler};
use core::any::Any;
use core::cell::{Cell, Ref, RefCell};
use core::fmt;
use core::mem;
use log::{debug, trace};
use reactive::ids::IdCounter;
use reactive::watcher::Path;
use reactive::{
    CaptureHook, ErrorScope, Getter, ReactiveObject, Value, WatchHandle, WatchOptions, Watcher, define_reactive, handle_error,
    reactive, untracked, warn, without_observing,
};
use rustc_hash::FxHashMap;
use serde_json::{Map, Value as Json};
use std::rc::{Rc, Weak};
use vdom::{
    ComponentFactory, ComponentInstance, DirectiveDef, DomEvent, Listener, NodeHandle, PatchSource, Patcher,
    PendingInsert, RefEntry, RefTarget, Refs, StaticTrees, VNode, VNodeContext, VNodeKind,
};

static COMPONENT_IDS: IdCounter = IdCounter::new();

type WatchCallback = Rc<dyn Fn(&Component, &Value, &Value) -> anyhow::Result<()>>;

/// What a parent hands to a child it creates through a placeholder.
#[derive(Default)]
pub(crate) struct ChildInit {
    pub(crate) props: Vec<(Rc<str>, Value)>,
    pub(crate) listeners: Vec<(Rc<str>, Listener)>,
    pub(crate) slot: Vec<VNode>,
}

pub(crate) struct ComponentInner {
    uid: u64,
    options: Rc<ComponentOptions>,
    self_ref: Weak<Self>,
    parent: Option<Weak<Self>>,
    children: RefCell<Vec<Component>>,
    data: Value,
    props: ReactiveObject,
    injected: ReactiveObject,
    computed: RefCell<FxHashMap<Rc<str>, Watcher>>,
    watchers: RefCell<Vec<Watcher>>,
    render_watcher: RefCell<Option<Watcher>>,
    patcher: RefCell<Option<Rc<Patcher>>>,
    /// Tree of the last render; taken out while it is being patched.
    vnode: RefCell<Option<VNode>>,
    root_elm: Cell<Option<NodeHandle>>,
    mount_target: Cell<Option<NodeHandle>>,
    /// Created by a parent's placeholder rather than mounted directly.
    has_placeholder: bool,
    slot: RefCell<Vec<VNode>>,
    parent_listeners: RefCell<Vec<(Rc<str>, Listener)>>,
    listeners: RefCell<Vec<(Rc<str>, Listener)>>,
    refs: RefCell<Refs>,
    static_trees: StaticTrees,
    pending_insert: RefCell<Vec<PendingInsert>>,
    is_mounted: Cell<bool>,
    is_destroyed: Cell<bool>,
    being_destroyed: Cell<bool>,
}

/// A live component instance. Clones share the instance.
#[derive(Clone)]
pub struct Component(Rc<ComponentInner>);

/// Non-owning reference to a [`Component`].
#[derive(Clone)]
pub struct WeakComponent(Weak<ComponentInner>);

impl WeakComponent {
    pub fn upgrade(&self) -> Option<Component> {
        self.0.upgrade().map(Component)
    }
}

impl Component {
    /// Create a root instance. It renders once [`mount`](Self::mount)ed.
    pub fn new(options: ComponentOptions) -> Self {
        Self::create(Rc::new(options), None, ChildInit::default(), false)
    }

    /// Create a root instance with prop values.
    pub fn with_props<'props>(
        options: ComponentOptions,
        props: impl IntoIterator<Item = (&'props str, Value)>,
    ) -> Self {
        let init = ChildInit {
            props: props.into_iter().map(|(name, value)| (Rc::from(name), value)).collect(),
            ..ChildInit::default()
        };
        Self::create(Rc::new(options), None, init, false)
    }

    pub(crate) fn create(
        options: Rc<ComponentOptions>,
        parent: Option<&Self>,
        init: ChildInit,
        has_placeholder: bool,
    ) -> Self {
        let props = init_props(&options, &init.props, parent.is_none());
        let data = init_data(&options, &props);
        let injected = resolve_injections(&options, parent);
        let inner = Rc::new_cyclic(|self_ref| ComponentInner {
            uid: COMPONENT_IDS.next_raw(),
            options,
            self_ref: Weak::clone(self_ref),
            parent: parent.map(|owner| Rc::downgrade(&owner.0)),
            children: RefCell::new(Vec::new()),
            data,
            props,
            injected,
            computed: RefCell::new(FxHashMap::default()),
            watchers: RefCell::new(Vec::new()),
            render_watcher: RefCell::new(None),
            patcher: RefCell::new(None),
            vnode: RefCell::new(None),
            root_elm: Cell::new(None),
            mount_target: Cell::new(None),
            has_placeholder,
            slot: RefCell::new(init.slot),
            parent_listeners: RefCell::new(init.listeners),
            listeners: RefCell::new(Vec::new()),
            refs: RefCell::new(Refs::default()),
            static_trees: StaticTrees::new(),
            pending_insert: RefCell::new(Vec::new()),
            is_mounted: Cell::new(false),
            is_destroyed: Cell::new(false),
            being_destroyed: Cell::new(false),
        });
        let component = Self(inner);
        if let Some(owner) = parent {
            owner.0.children.borrow_mut().push(component.clone());
        }
        component.check_methods();
        component.init_computed();
        component.init_watch();
        debug!("Created {} ({})", component.name(), component.0.uid);
        component.call_hook(Lifecycle::Created);
        component
    }

    /// Recover the component behind a placeholder's instance.
    pub fn from_instance(instance: &dyn ComponentInstance) -> Option<Self> {
        instance
            .as_any()
            .downcast_ref::<ComponentInner>()
            .and_then(|inner| inner.self_ref.upgrade())
            .map(Self)
    }

    #[inline]
    pub fn uid(&self) -> u64 {
        self.0.uid
    }

    /// Display name, e.g. `<TodoList>`.
    pub fn name(&self) -> String {
        self.0.options.display_name()
    }

    #[inline]
    pub fn options(&self) -> &ComponentOptions {
        &self.0.options
    }

    #[inline]
    pub fn downgrade(&self) -> WeakComponent {
        WeakComponent(Rc::downgrade(&self.0))
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn parent(&self) -> Option<Self> {
        self.0.parent.as_ref().and_then(Weak::upgrade).map(Self)
    }

    pub fn children(&self) -> Vec<Self> {
        self.0.children.borrow().clone()
    }

    /// Topmost ancestor, `self` for a root.
    pub fn root(&self) -> Self {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Observed data root.
    #[inline]
    pub fn data(&self) -> &Value {
        &self.0.data
    }

    #[inline]
    pub fn props(&self) -> &ReactiveObject {
        &self.0.props
    }

    #[inline]
    pub fn is_mounted(&self) -> bool {
        self.0.is_mounted.get()
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.0.is_destroyed.get()
    }

    /// Real node of the rendered root.
    pub fn root_elm(&self) -> Option<NodeHandle> {
        self.0.current_root_elm()
    }

    /// Visit the tree of the last render.
    pub fn with_vnode<R>(&self, visit: impl FnOnce(Option<&VNode>) -> R) -> R {
        visit(self.0.vnode.borrow().as_ref())
    }

    pub fn refs(&self) -> Ref<'_, Refs> {
        self.0.refs.borrow()
    }

    pub fn ref_node(&self, name: &str) -> Option<NodeHandle> {
        self.0.refs.borrow().node(name)
    }

    /// Child component registered under `name` by a `ref` on its placeholder.
    pub fn ref_component(&self, name: &str) -> Option<Self> {
        let instance = match self.0.refs.borrow().get(name)? {
            RefEntry::Single(RefTarget::Component(instance)) => Rc::clone(instance),
            RefEntry::Single(RefTarget::Node(_)) | RefEntry::List(_) => return None,
        };
        Self::from_instance(&*instance)
    }

    /// Tracked read of a prop, computed property, data field or injection,
    /// in that order. Unknown keys warn and read as `Null`.
    pub fn get(&self, key: &str) -> Value {
        self.lookup(key).unwrap_or_else(|| {
            warn(&format!(
                "Property or method \"{key}\" is not defined on the instance but referenced during render. Found in {}",
                self.name()
            ));
            Value::Null
        })
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        let inner = &self.0;
        if inner.props.has_own(key) {
            return Some(inner.props.get(key));
        }
        if let Some(watcher) = self.computed_watcher(key) {
            return Some(watcher.read_computed());
        }
        if let Some(data) = inner.data.as_object()
            && data.has_own(key)
        {
            return Some(data.get(key));
        }
        inner.injected.has_own(key).then(|| inner.injected.get(key))
    }

    fn computed_watcher(&self, key: &str) -> Option<Watcher> {
        self.0.computed.borrow().get(key).cloned()
    }

    /// Write a computed property (through its setter), a prop or a data
    /// field. New data fields are added reactively.
    ///
    /// # Errors
    /// Propagates errors raised by a computed setter.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> anyhow::Result<()> {
        let value = value.into();
        let computed = self
            .0
            .options
            .computed
            .iter()
            .find(|(name, _)| &**name == key)
            .map(|(_, def)| def.set.clone());
        match computed {
            Some(Some(setter)) => return setter(self, value),
            Some(None) => {
                warn(&format!(
                    "Computed property \"{key}\" was assigned to but it has no setter."
                ));
                return Ok(());
            }
            None => {}
        }
        if self.0.props.has_own(key) {
            warn(&format!(
                "Avoid mutating a prop directly since the value will be overwritten whenever the parent component re-renders. Prop being mutated: \"{key}\""
            ));
            self.0.props.assign(key, value);
            return Ok(());
        }
        reactive::set(&self.0.data, key, value);
        Ok(())
    }

    /// Call the method `name`.
    ///
    /// # Errors
    /// Fails when no such method exists or the method fails.
    pub fn call(&self, name: &str, args: &[Value]) -> anyhow::Result<Value> {
        let method = self
            .0
            .options
            .methods
            .get(name)
            .cloned()
            .ok_or_else(|| ComponentError::UnknownMethod {
                component: self.name(),
                method: name.to_owned(),
            })?;
        method(self, args)
    }

    /// Watch a dot-delimited path resolved against this component, e.g.
    /// `user.name` reads the `name` field of the `user` prop, computed or data
    /// field.
    ///
    /// The watch lives until cancelled or until the component is destroyed.
    pub fn watch(
        &self,
        expression: &str,
        callback: impl Fn(&Self, &Value, &Value) -> anyhow::Result<()> + 'static,
        options: WatchOptions,
    ) -> WatchHandle {
        let getter = self.expression_getter(expression);
        self.create_watcher(getter, Rc::new(callback), options)
    }

    /// Watch the value computed by `getter`.
    pub fn watch_fn(
        &self,
        getter: impl Fn(&Self) -> anyhow::Result<Value> + 'static,
        callback: impl Fn(&Self, &Value, &Value) -> anyhow::Result<()> + 'static,
        options: WatchOptions,
    ) -> WatchHandle {
        let owner = self.downgrade();
        let getter = Getter::func(move || owner.upgrade().map_or(Ok(Value::Null), |component| getter(&component)));
        self.create_watcher(getter, Rc::new(callback), options)
    }

    fn create_watcher(&self, getter: Getter, callback: WatchCallback, options: WatchOptions) -> WatchHandle {
        let owner = self.downgrade();
        let handle = reactive::watch(
            getter,
            move |new: &Value, old: &Value| match owner.upgrade() {
                Some(component) => callback(&component, new, old),
                None => Ok(()),
            },
            options.scope(&self.error_scope()),
        );
        self.0.watchers.borrow_mut().push(handle.watcher().clone());
        handle
    }

    fn expression_getter(&self, expression: &str) -> Getter {
        let Some(path) = Path::parse(expression) else {
            // Warns and yields `Null`.
            return Getter::path(&Value::Null, expression);
        };
        let owner = self.downgrade();
        Getter::func(move || {
            let Some(component) = owner.upgrade() else {
                return Ok(Value::Null);
            };
            let mut segments = path.segments().iter();
            let Some(first) = segments.next() else {
                return Ok(Value::Null);
            };
            let mut current = component.lookup(first).unwrap_or_default();
            for segment in segments {
                if current.is_null() {
                    break;
                }
                current = current.get(segment);
            }
            Ok(current)
        })
    }

    fn check_methods(&self) {
        let inner = &self.0;
        for name in inner.options.methods.keys() {
            if inner.props.has_own(name) {
                warn(&format!("Method \"{name}\" has already been defined as a prop."));
            } else if inner.data.as_object().is_some_and(|data| data.has_own(name)) {
                warn(&format!("Method \"{name}\" has already been defined as a data property."));
            }
        }
    }

    fn init_computed(&self) {
        let inner = &self.0;
        let scope = self.error_scope();
        let mut computed = FxHashMap::default();
        for (name, def) in &inner.options.computed {
            if inner.props.has_own(name) {
                warn(&format!("The computed property \"{name}\" is already defined as a prop."));
                continue;
            }
            if inner.data.as_object().is_some_and(|data| data.has_own(name)) {
                warn(&format!("The computed property \"{name}\" is already defined in data."));
                continue;
            }
            let owner = self.downgrade();
            let get = Rc::clone(&def.get);
            let getter = Getter::func(move || owner.upgrade().map_or(Ok(Value::Null), |component| get(&component)));
            computed.insert(Rc::clone(name), Watcher::computed(getter, Some(&scope)));
        }
        *inner.computed.borrow_mut() = computed;
    }

    fn init_watch(&self) {
        let options = Rc::clone(&self.0.options);
        for def in &options.watch {
            let callback: WatchCallback = match &def.handler {
                WatchHandler::Func(handler) => {
                    let handler = Rc::clone(handler);
                    Rc::new(move |component: &Self, new: &Value, old: &Value| handler(component, new, old))
                }
                WatchHandler::Method(method) => {
                    if !options.methods.contains_key(method) {
                        warn(&format!(
                            "Failed watching \"{}\": method \"{method}\" is not defined on {}",
                            def.expression,
                            self.name()
                        ));
                    }
                    let method = Rc::clone(method);
                    Rc::new(move |component: &Self, new: &Value, old: &Value| {
                        component.call(&method, &[new.clone(), old.clone()]).map(drop)
                    })
                }
            };
            let mut watch_options = WatchOptions::new();
            if def.deep {
                watch_options = watch_options.deep();
            }
            if def.immediate {
                watch_options = watch_options.immediate();
            }
            let getter = self.expression_getter(&def.expression);
            // Kept alive by the component until destroy.
            let _handle = self.create_watcher(getter, callback, watch_options);
        }
    }

    /// Run the hooks registered for `lifecycle`, outside dependency tracking.
    pub(crate) fn call_hook(&self, lifecycle: Lifecycle) {
        let hooks = self.0.options.hooks_for(lifecycle);
        if hooks.is_empty() {
            return;
        }
        let scope = self.error_scope();
        untracked(|| {
            for hook in hooks {
                if let Err(err) = hook(self) {
                    handle_error(&err, Some(&scope), &format!("{} hook", lifecycle.name()));
                }
            }
        });
    }

    /// Render for the first time and keep re-rendering on change.
    ///
    /// With a `target` the rendered root replaces that node; without one the
    /// root is built detached and returned for the caller to insert.
    ///
    /// # Errors
    /// Fails when the instance was destroyed or is already mounted.
    pub fn mount(&self, patcher: Rc<Patcher>, target: Option<NodeHandle>) -> anyhow::Result<Option<NodeHandle>> {
        let inner = &self.0;
        if inner.is_destroyed.get() {
            return Err(ComponentError::Destroyed { component: self.name() }.into());
        }
        if inner.render_watcher.borrow().is_some() {
            return Err(ComponentError::AlreadyMounted { component: self.name() }.into());
        }
        *inner.patcher.borrow_mut() = Some(patcher);
        inner.mount_target.set(target);
        if inner.options.render.is_none() {
            warn(&format!(
                "Failed to mount {}: render function not defined.",
                self.name()
            ));
        }
        self.call_hook(Lifecycle::BeforeMount);

        let owner = self.downgrade();
        let before_owner = self.downgrade();
        let options = WatchOptions::new()
            .before(move || {
                if let Some(component) = before_owner.upgrade()
                    && component.is_mounted()
                    && !component.is_destroyed()
                {
                    component.call_hook(Lifecycle::BeforeUpdate);
                }
            })
            .scope(&self.error_scope());
        let watcher = Watcher::new(
            Getter::func(move || {
                if let Some(component) = owner.upgrade() {
                    component.update()?;
                }
                Ok(Value::Null)
            }),
            None,
            options,
        );
        *inner.render_watcher.borrow_mut() = Some(watcher);

        if !inner.has_placeholder {
            inner.is_mounted.set(true);
            self.call_hook(Lifecycle::Mounted);
        }
        Ok(self.root_elm())
    }

    /// Render and patch against the previous tree.
    ///
    /// A failing render is reported and leaves the previous output in place.
    fn update(&self) -> anyhow::Result<()> {
        let inner = &self.0;
        if inner.is_destroyed.get() {
            return Ok(());
        }
        let mut vnode = match self.render() {
            Ok(vnode) => vnode,
            Err(err) => {
                handle_error(&err, Some(&self.error_scope()), "render");
                return Ok(());
            }
        };
        let patcher = inner
            .patcher
            .borrow()
            .clone()
            .ok_or_else(|| ComponentError::NotRendered { component: self.name() })?;
        let was_mounted = inner.is_mounted.get();
        let previous = inner.vnode.borrow_mut().take();
        trace!("Patching {} ({})", self.name(), inner.uid);
        let result = match &previous {
            Some(old) => patcher.patch(Some(PatchSource::VNode(old)), Some(&mut vnode)).map(drop),
            None => {
                let target = inner.mount_target.take().map(PatchSource::Element);
                if inner.has_placeholder {
                    patcher.patch_deferred(target, Some(&mut vnode)).map(|patched| {
                        inner.pending_insert.borrow_mut().extend(patched.pending_insert);
                    })
                } else {
                    patcher.patch(target, Some(&mut vnode)).map(drop)
                }
            }
        };
        inner.root_elm.set(vnode.node_elm());
        *inner.vnode.borrow_mut() = Some(vnode);
        drop(previous);
        result?;
        if was_mounted && !inner.is_destroyed.get() {
            self.call_hook(Lifecycle::Updated);
        }
        Ok(())
    }

    fn render(&self) -> anyhow::Result<VNode> {
        let Some(render) = self.0.options.render.clone() else {
            return Ok(VNode::empty());
        };
        let context = RenderContext::new(self);
        let mut vnode = render(&context)?;
        if vnode.context.is_none() {
            vnode = vnode.with_context(&self.as_vnode_context());
        }
        Ok(vnode)
    }

    pub(crate) fn render_static(&self, context: &RenderContext<'_>, index: usize, in_for: bool) -> VNode {
        let Some(render) = self.0.options.static_render_fns.get(index).cloned() else {
            warn(&format!("Static render function {index} is not defined on {}", self.name()));
            return VNode::empty();
        };
        self.0.static_trees.render_static(index, in_for, || render(context))
    }

    pub(crate) fn slot_content(&self) -> Vec<VNode> {
        self.0.slot.borrow().clone()
    }

    /// Queue a re-render even though no tracked dependency changed.
    pub fn force_update(&self) {
        let watcher = self.0.render_watcher.borrow().clone();
        if let Some(render_watcher) = watcher {
            render_watcher.update();
        }
    }

    /// Apply what the parent passed on its latest render.
    pub(crate) fn update_from_parent(&self, init: ChildInit) {
        let inner = &self.0;
        let needs_force_update = !init.slot.is_empty() || !inner.slot.borrow().is_empty();
        without_observing(|| {
            for name in &inner.options.props {
                let value = init
                    .props
                    .iter()
                    .find(|(supplied, _)| supplied == name)
                    .map(|(_, value)| value.clone())
                    .unwrap_or_default();
                inner.props.assign(name, value);
            }
        });
        *inner.parent_listeners.borrow_mut() = init.listeners;
        *inner.slot.borrow_mut() = init.slot;
        if needs_force_update {
            self.force_update();
        }
    }

    pub(crate) fn mark_inserted(&self) {
        if !self.0.is_mounted.replace(true) {
            self.call_hook(Lifecycle::Mounted);
        }
    }

    /// Tear the instance down.
    ///
    /// Watchers stop, the destroy hooks of the rendered tree run (destroying
    /// child components) and the instance leaves its parent. The rendered
    /// nodes stay where they are; a parent removes them when it patches its
    /// placeholder away. Calling this twice is harmless.
    pub fn destroy(&self) {
        let inner = &self.0;
        if inner.being_destroyed.get() {
            return;
        }
        self.call_hook(Lifecycle::BeforeDestroy);
        inner.being_destroyed.set(true);
        if let Some(parent) = self.parent()
            && !parent.0.being_destroyed.get()
        {
            parent.0.children.borrow_mut().retain(|child| !child.ptr_eq(self));
        }
        let render_watcher = inner.render_watcher.borrow().clone();
        if let Some(watcher) = render_watcher {
            watcher.teardown();
        }
        let watchers = mem::take(&mut *inner.watchers.borrow_mut());
        for watcher in watchers {
            watcher.teardown();
        }
        let computed: Vec<Watcher> = inner.computed.borrow().values().cloned().collect();
        for watcher in computed {
            watcher.teardown();
        }
        inner.is_destroyed.set(true);

        let patcher = inner.patcher.borrow().clone();
        let tree = inner.vnode.borrow_mut().take();
        if let (Some(patcher), Some(old)) = (patcher, tree.as_ref())
            && let Err(err) = patcher.patch(Some(PatchSource::VNode(old)), None)
        {
            handle_error(&err, Some(&self.error_scope()), "destroy");
        }
        *inner.vnode.borrow_mut() = tree;
        inner.children.borrow_mut().clear();
        self.call_hook(Lifecycle::Destroyed);
        inner.listeners.borrow_mut().clear();
        inner.parent_listeners.borrow_mut().clear();
        debug!("Destroyed {} ({})", self.name(), inner.uid);
    }

    /// Listen to events this component emits.
    pub fn on(&self, event: &str, listener: impl Fn(&DomEvent) -> anyhow::Result<()> + 'static) {
        self.0.listeners.borrow_mut().push((Rc::from(event), Rc::new(listener)));
    }

    /// Drop the listeners of `event`, or all listeners with `None`.
    pub fn off(&self, event: Option<&str>) {
        let mut listeners = self.0.listeners.borrow_mut();
        match event {
            Some(name) => listeners.retain(|(registered, _)| &**registered != name),
            None => listeners.clear(),
        }
    }

    /// Call every listener of `event` with `detail`; returns how many ran.
    ///
    /// Listeners come from the parent's placeholder and from [`on`](Self::on).
    /// Their errors are routed from this component upwards.
    pub fn emit(&self, event: &str, detail: impl Into<Value>) -> usize {
        let listeners: Vec<Listener> = {
            let from_parent = self.0.parent_listeners.borrow();
            let own = self.0.listeners.borrow();
            from_parent
                .iter()
                .chain(own.iter())
                .filter(|(name, _)| &**name == event)
                .map(|(_, listener)| Rc::clone(listener))
                .collect()
        };
        let payload = DomEvent::with_target(event, self.root_elm()).with_detail(detail);
        let scope = self.error_scope();
        for listener in &listeners {
            if let Err(err) = listener(&payload) {
                handle_error(&err, Some(&scope), &format!("event handler for \"{event}\""));
            }
        }
        listeners.len()
    }

    /// Run `callback` after the next flush, if the component is still alive.
    pub fn next_tick(&self, callback: impl FnOnce(&Self) + 'static) {
        let owner = self.downgrade();
        reactive::next_tick(move || {
            if let Some(component) = owner.upgrade() {
                callback(&component);
            }
        });
    }

    pub(crate) fn patcher(&self) -> Option<Rc<Patcher>> {
        self.0.patcher.borrow().clone()
    }

    pub(crate) fn error_scope(&self) -> Rc<dyn ErrorScope> {
        Rc::clone(&self.0) as Rc<dyn ErrorScope>
    }

    pub(crate) fn as_vnode_context(&self) -> Rc<dyn VNodeContext> {
        Rc::clone(&self.0) as Rc<dyn VNodeContext>
    }

    pub(crate) fn as_instance(&self) -> Rc<dyn ComponentInstance> {
        Rc::clone(&self.0) as Rc<dyn ComponentInstance>
    }
}

/// Value provided under `key` by `start` or its nearest ancestor.
fn find_provided(start: Option<Component>, key: &str) -> Option<Value> {
    let mut current = start;
    while let Some(provider) = current {
        if let Some((_, value)) = provider.0.options.provide.iter().find(|(name, _)| &**name == key) {
            return Some(value.clone());
        }
        current = provider.parent();
    }
    None
}

fn init_props(options: &ComponentOptions, supplied: &[(Rc<str>, Value)], is_root: bool) -> ReactiveObject {
    let props = ReactiveObject::new();
    let define = || {
        for name in &options.props {
            let value = supplied
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone())
                .unwrap_or_default();
            define_reactive(&props, name, value);
        }
    };
    // Values handed down by a parent are already observed there.
    if is_root { define() } else { without_observing(define) }
    props
}

fn init_data(options: &ComponentOptions, props: &ReactiveObject) -> Value {
    let json = options
        .data
        .as_ref()
        .map_or_else(|| Json::Object(Map::new()), |data| untracked(|| data()));
    let json = if json.is_object() {
        json
    } else {
        warn(&format!(
            "data functions should return an object, {} returned {json}",
            options.display_name()
        ));
        Json::Object(Map::new())
    };
    let data = reactive(&json);
    if let Some(object) = data.as_object() {
        for key in object.keys_untracked() {
            if props.has_own(&key) {
                warn(&format!(
                    "The data property \"{key}\" is already declared as a prop. Use prop default value instead."
                ));
            }
        }
    }
    data
}

fn resolve_injections(options: &ComponentOptions, parent: Option<&Component>) -> ReactiveObject {
    let injected = ReactiveObject::new();
    for (key, fallback) in &options.inject {
        let value = find_provided(parent.cloned(), key).unwrap_or_else(|| {
            if fallback.is_null() {
                warn(&format!("Injection \"{key}\" not found"));
            }
            fallback.clone()
        });
        without_observing(|| define_reactive(&injected, key, value));
    }
    injected
}

/// Look `id` up as written, camelized, then capitalized.
fn resolve_asset<'registry, T>(registry: &'registry FxHashMap<Rc<str>, T>, id: &str) -> Option<&'registry T> {
    if let Some(found) = registry.get(id) {
        return Some(found);
    }
    let camelized = camelize(id);
    if let Some(found) = registry.get(camelized.as_str()) {
        return Some(found);
    }
    registry.get(capitalize(&camelized).as_str())
}

fn camelize(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    let mut upper = false;
    for character in id.chars() {
        if character == '-' {
            upper = true;
        } else if upper {
            out.extend(character.to_uppercase());
            upper = false;
        } else {
            out.push(character);
        }
    }
    out
}

fn capitalize(id: &str) -> String {
    let mut chars = id.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl ComponentInner {
    fn current_root_elm(&self) -> Option<NodeHandle> {
        self.vnode
            .try_borrow()
            .ok()
            .and_then(|vnode| vnode.as_ref().and_then(VNode::node_elm))
            .or_else(|| self.root_elm.get())
    }
}

impl ErrorScope for ComponentInner {
    fn parent_scope(&self) -> Option<Rc<dyn ErrorScope>> {
        let parent = self.parent.as_ref().and_then(Weak::upgrade)?;
        Some(parent as Rc<dyn ErrorScope>)
    }

    fn capture_hooks(&self) -> Vec<CaptureHook> {
        self.options.error_captured.clone()
    }

    fn scope_name(&self) -> String {
        self.options.display_name()
    }
}

impl VNodeContext for ComponentInner {
    fn refs(&self) -> &RefCell<Refs> {
        &self.refs
    }

    fn scope_id(&self) -> Option<Rc<str>> {
        self.options.scope_id.clone()
    }

    fn resolve_directive(&self, name: &str) -> Option<Rc<DirectiveDef>> {
        resolve_asset(&self.options.directives, name).cloned()
    }

    fn resolve_component(&self, tag: &str) -> Option<ComponentFactory> {
        let options = Rc::clone(resolve_asset(&self.options.components, tag)?);
        let parent = Weak::clone(&self.self_ref);
        let tag: Rc<str> = Rc::from(tag);
        Some(Rc::new(move |data, children| {
            placeholder::component_vnode(&tag, Rc::clone(&options), &parent, data, children)
        }))
    }

    fn error_scope(&self) -> Option<Rc<dyn ErrorScope>> {
        let owner = self.self_ref.upgrade()?;
        Some(owner as Rc<dyn ErrorScope>)
    }
}

impl ComponentInstance for ComponentInner {
    fn root_elm(&self) -> Option<NodeHandle> {
        self.current_root_elm()
    }

    fn root_is_element(&self) -> bool {
        self.vnode
            .try_borrow()
            .ok()
            .and_then(|vnode| {
                vnode.as_ref().map(|root| {
                    root.component_instance
                        .as_ref()
                        .map_or(root.kind == VNodeKind::Element, |nested| nested.root_is_element())
                })
            })
            .unwrap_or(false)
    }

    fn take_pending_insert(&self) -> Vec<PendingInsert> {
        mem::take(&mut *self.pending_insert.borrow_mut())
    }

    fn with_root_vnode(&self, visit: &mut dyn FnMut(&VNode)) {
        if let Ok(vnode) = self.vnode.try_borrow()
            && let Some(root) = vnode.as_ref()
        {
            visit(root);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Component")
            .field("uid", &self.0.uid)
            .field("name", &self.0.options.name)
            .field("mounted", &self.0.is_mounted.get())
            .field("destroyed", &self.0.is_destroyed.get())
            .field("root_elm", &self.0.current_root_elm())
            .finish_non_exhaustive()
    }
}
