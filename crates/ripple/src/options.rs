//! Declarative description of a component.

use crate::component::Component;
use crate::context::RenderContext;
use core::fmt;
use reactive::{CaptureHook, Value};
use rustc_hash::FxHashMap;
use std::rc::Rc;
use vdom::{DirectiveDef, VNode};

/// Produces the initial state of each instance.
pub type DataFn = Rc<dyn Fn() -> serde_json::Value>;
pub type RenderFn = Rc<dyn Fn(&RenderContext<'_>) -> anyhow::Result<VNode>>;
/// Renders one hoisted static subtree.
pub type StaticRenderFn = Rc<dyn Fn(&RenderContext<'_>) -> VNode>;
pub type ComputedGetter = Rc<dyn Fn(&Component) -> anyhow::Result<Value>>;
pub type ComputedSetter = Rc<dyn Fn(&Component, Value) -> anyhow::Result<()>>;
pub type MethodFn = Rc<dyn Fn(&Component, &[Value]) -> anyhow::Result<Value>>;
pub type WatchFn = Rc<dyn Fn(&Component, &Value, &Value) -> anyhow::Result<()>>;
pub type LifecycleHook = Rc<dyn Fn(&Component) -> anyhow::Result<()>>;

#[derive(Clone)]
pub struct ComputedDef {
    pub get: ComputedGetter,
    pub set: Option<ComputedSetter>,
}

/// What a declared watch calls on change.
#[derive(Clone)]
pub enum WatchHandler {
    Func(WatchFn),
    /// Name of a method, called with `[new, old]`.
    Method(Rc<str>),
}

#[derive(Clone)]
pub struct WatchDef {
    pub expression: Rc<str>,
    pub handler: WatchHandler,
    pub deep: bool,
    pub immediate: bool,
}

/// Points in an instance's life where hooks run.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Created,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    BeforeDestroy,
    Destroyed,
}

impl Lifecycle {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::BeforeMount => "beforeMount",
            Self::Mounted => "mounted",
            Self::BeforeUpdate => "beforeUpdate",
            Self::Updated => "updated",
            Self::BeforeDestroy => "beforeDestroy",
            Self::Destroyed => "destroyed",
        }
    }
}

/// Options a [`Component`] is instantiated from.
///
/// Built with the chaining methods below and shared behind an `Rc` between
/// every instance of the component.
#[derive(Clone, Default)]
pub struct ComponentOptions {
    pub name: Option<Rc<str>>,
    pub data: Option<DataFn>,
    pub props: Vec<Rc<str>>,
    pub computed: Vec<(Rc<str>, ComputedDef)>,
    pub watch: Vec<WatchDef>,
    pub methods: FxHashMap<Rc<str>, MethodFn>,
    pub render: Option<RenderFn>,
    pub static_render_fns: Vec<StaticRenderFn>,
    pub error_captured: Vec<CaptureHook>,
    pub directives: FxHashMap<Rc<str>, Rc<DirectiveDef>>,
    pub components: FxHashMap<Rc<str>, Rc<Self>>,
    pub scope_id: Option<Rc<str>>,
    pub provide: Vec<(Rc<str>, Value)>,
    /// Keys looked up in the ancestors' `provide`, with a fallback.
    pub inject: Vec<(Rc<str>, Value)>,
    pub hooks: FxHashMap<Lifecycle, Vec<LifecycleHook>>,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(Rc::from(name));
        self
    }

    /// Initial state, rebuilt for every instance.
    #[must_use]
    pub fn data(mut self, data: impl Fn() -> serde_json::Value + 'static) -> Self {
        self.data = Some(Rc::new(data));
        self
    }

    #[must_use]
    pub fn prop(mut self, name: &str) -> Self {
        self.props.push(Rc::from(name));
        self
    }

    #[must_use]
    pub fn computed(mut self, name: &str, get: impl Fn(&Component) -> anyhow::Result<Value> + 'static) -> Self {
        self.computed.push((
            Rc::from(name),
            ComputedDef {
                get: Rc::new(get),
                set: None,
            },
        ));
        self
    }

    /// Computed property that can also be assigned.
    #[must_use]
    pub fn computed_with_setter(
        mut self,
        name: &str,
        get: impl Fn(&Component) -> anyhow::Result<Value> + 'static,
        set: impl Fn(&Component, Value) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.computed.push((
            Rc::from(name),
            ComputedDef {
                get: Rc::new(get),
                set: Some(Rc::new(set)),
            },
        ));
        self
    }

    #[must_use]
    pub fn watch(mut self, def: WatchDef) -> Self {
        self.watch.push(def);
        self
    }

    #[must_use]
    pub fn method(
        mut self,
        name: &str,
        method: impl Fn(&Component, &[Value]) -> anyhow::Result<Value> + 'static,
    ) -> Self {
        self.methods.insert(Rc::from(name), Rc::new(method));
        self
    }

    #[must_use]
    pub fn render(mut self, render: impl Fn(&RenderContext<'_>) -> anyhow::Result<VNode> + 'static) -> Self {
        self.render = Some(Rc::new(render));
        self
    }

    /// Register the next static subtree; its index is the registration order.
    #[must_use]
    pub fn static_render(mut self, render: impl Fn(&RenderContext<'_>) -> VNode + 'static) -> Self {
        self.static_render_fns.push(Rc::new(render));
        self
    }

    #[must_use]
    pub fn error_captured(
        mut self,
        hook: impl Fn(&anyhow::Error, &str) -> anyhow::Result<bool> + 'static,
    ) -> Self {
        self.error_captured.push(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn directive(mut self, name: &str, def: DirectiveDef) -> Self {
        self.directives.insert(Rc::from(name), Rc::new(def));
        self
    }

    /// Register a child component under `tag`.
    #[must_use]
    pub fn component(mut self, tag: &str, options: Self) -> Self {
        self.components.insert(Rc::from(tag), Rc::new(options));
        self
    }

    #[must_use]
    pub fn scope_id(mut self, scope_id: &str) -> Self {
        self.scope_id = Some(Rc::from(scope_id));
        self
    }

    #[must_use]
    pub fn provide(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.provide.push((Rc::from(key), value.into()));
        self
    }

    #[must_use]
    pub fn inject(mut self, key: &str, fallback: impl Into<Value>) -> Self {
        self.inject.push((Rc::from(key), fallback.into()));
        self
    }

    #[must_use]
    pub fn hook(mut self, lifecycle: Lifecycle, hook: impl Fn(&Component) -> anyhow::Result<()> + 'static) -> Self {
        self.hooks.entry(lifecycle).or_default().push(Rc::new(hook));
        self
    }

    pub(crate) fn hooks_for(&self, lifecycle: Lifecycle) -> Vec<LifecycleHook> {
        self.hooks.get(&lifecycle).cloned().unwrap_or_default()
    }

    pub(crate) fn display_name(&self) -> String {
        self.name
            .as_deref()
            .map_or_else(|| String::from("<Anonymous>"), |name| format!("<{name}>"))
    }
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ComponentOptions")
            .field("name", &self.name)
            .field("props", &self.props)
            .field("computed", &self.computed.iter().map(|(name, _)| name).collect::<Vec<_>>())
            .field("watch", &self.watch.len())
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl WatchDef {
    pub fn new(expression: &str, handler: impl Fn(&Component, &Value, &Value) -> anyhow::Result<()> + 'static) -> Self {
        Self {
            expression: Rc::from(expression),
            handler: WatchHandler::Func(Rc::new(handler)),
            deep: false,
            immediate: false,
        }
    }

    pub fn method(expression: &str, method: &str) -> Self {
        Self {
            expression: Rc::from(expression),
            handler: WatchHandler::Method(Rc::from(method)),
            deep: false,
            immediate: false,
        }
    }

    #[must_use]
    pub const fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    #[must_use]
    pub const fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }
}
