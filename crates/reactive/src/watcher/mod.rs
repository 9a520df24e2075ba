//! Watchers: re-evaluatable units of derived work.
//!
//! A [`Watcher`] wraps a getter (a path into a state tree or a closure), the
//! value it last produced and the set of [`Dep`]s it read while producing it.
//! Render passes, computed fields and user `watch` registrations are all
//! watchers; they differ only in their [`WatchOptions`].

mod path;

pub use path::Path;

use crate::dep::{Dep, TargetGuard, is_tracking};
use crate::error::{ErrorScope, ReactiveError, handle_error, warn};
use crate::ids::{DepId, WatcherId};
use crate::scheduler::queue_watcher;
use crate::traverse::traverse;
use crate::value::{Value, same_value};
use core::cell::{Cell, RefCell};
use core::fmt;
use log::trace;
use rustc_hash::FxHashSet;
use std::rc::{Rc, Weak};

/// Closure getter.
pub type GetterFn = Rc<dyn Fn() -> anyhow::Result<Value>>;

/// Change callback, called with `(new, old)`.
pub type Callback = Rc<dyn Fn(&Value, &Value) -> anyhow::Result<()>>;

/// Pre-flush hook.
pub type Hook = Rc<dyn Fn()>;

/// What a watcher evaluates.
#[derive(Clone)]
pub enum Getter {
    /// Dot-delimited path resolved against `root`. `path` is `None` when the
    /// expression was rejected; such a getter always yields `Null`.
    Path {
        root: Value,
        expression: Rc<str>,
        path: Option<Path>,
    },
    /// Arbitrary closure; every tracked read it performs becomes a dependency.
    Func(GetterFn),
}

impl Getter {
    /// Path getter for `expression` rooted at `root`.
    ///
    /// Invalid expressions produce a warning and a getter yielding `Null`.
    pub fn path(root: &Value, expression: &str) -> Self {
        let path = Path::parse(expression);
        if path.is_none() {
            warn(
                &ReactiveError::InvalidPath {
                    expression: expression.to_owned(),
                }
                .to_string(),
            );
        }
        Self::Path {
            root: root.clone(),
            expression: Rc::from(expression),
            path,
        }
    }

    /// Closure getter.
    pub fn func(getter: impl Fn() -> anyhow::Result<Value> + 'static) -> Self {
        Self::Func(Rc::new(getter))
    }

    fn call(&self) -> anyhow::Result<Value> {
        match self {
            Self::Path { root, path, .. } => Ok(path
                .as_ref()
                .map_or(Value::Null, |found| found.resolve(root))),
            Self::Func(getter) => getter(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Path { expression, .. } => expression.to_string(),
            Self::Func(_) => String::from("function"),
        }
    }
}

impl fmt::Debug for Getter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path { expression, .. } => write!(formatter, "Getter::Path({expression:?})"),
            Self::Func(_) => formatter.write_str("Getter::Func"),
        }
    }
}

/// Watcher construction options.
#[derive(Clone, Default)]
pub struct WatchOptions {
    /// Call the callback once at construction with `(value, Null)`.
    pub immediate: bool,
    /// Depend on every nested field of the produced value.
    pub deep: bool,
    /// Lazy computed value; see [`Watcher::evaluate`].
    pub computed: bool,
    /// Run on notification instead of queueing for the next flush.
    pub sync: bool,
    /// Registered by application code; errors are labelled as such.
    pub user: bool,
    /// Runs right before the watcher is re-run by a flush.
    pub before: Option<Hook>,
    /// Scope that errors raised by this watcher are reported against.
    pub scope: Option<Weak<dyn ErrorScope>>,
}

impl WatchOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    #[must_use]
    pub const fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    #[must_use]
    pub const fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    #[must_use]
    pub const fn sync(mut self) -> Self {
        self.sync = true;
        self
    }

    #[must_use]
    pub const fn user(mut self) -> Self {
        self.user = true;
        self
    }

    #[must_use]
    pub fn before(mut self, hook: impl Fn() + 'static) -> Self {
        self.before = Some(Rc::new(hook));
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: &Rc<dyn ErrorScope>) -> Self {
        self.scope = Some(Rc::downgrade(scope));
        self
    }
}

struct WatcherInner {
    id: WatcherId,
    expression: String,
    getter: Getter,
    callback: Option<Callback>,
    before: Option<Hook>,
    deep: bool,
    user: bool,
    computed: bool,
    sync: bool,
    scope: Option<Weak<dyn ErrorScope>>,
    active: Cell<bool>,
    dirty: Cell<bool>,
    value: RefCell<Value>,
    deps: RefCell<Vec<Dep>>,
    dep_ids: RefCell<FxHashSet<DepId>>,
    new_deps: RefCell<Vec<Dep>>,
    new_dep_ids: RefCell<FxHashSet<DepId>>,
    /// Computed watchers only: lets other watchers depend on this one.
    own_dep: Option<Dep>,
}

/// Shared handle to a watcher.
#[derive(Clone)]
pub struct Watcher(Rc<WatcherInner>);

/// Non-owning reference held by [`Dep`] subscriber lists.
#[derive(Clone)]
pub struct WeakWatcher(Weak<WatcherInner>);

impl WeakWatcher {
    #[inline]
    pub fn upgrade(&self) -> Option<Watcher> {
        self.0.upgrade().map(Watcher)
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Whether this reference designates `watcher`.
    #[inline]
    pub fn points_to(&self, watcher: &Watcher) -> bool {
        Weak::as_ptr(&self.0) == Rc::as_ptr(&watcher.0)
    }
}

impl Watcher {
    /// Create a watcher.
    ///
    /// Non-computed watchers evaluate immediately to collect their
    /// dependencies; with `immediate` the callback also runs once with
    /// `(value, Null)`. Computed watchers start dirty and evaluate on first
    /// read.
    pub fn new(getter: Getter, callback: Option<Callback>, options: WatchOptions) -> Self {
        let WatchOptions {
            immediate,
            deep,
            computed,
            sync,
            user,
            before,
            scope,
        } = options;
        let watcher = Self(Rc::new(WatcherInner {
            id: WatcherId::next(),
            expression: getter.describe(),
            getter,
            callback,
            before,
            deep,
            user,
            computed,
            sync,
            scope,
            active: Cell::new(true),
            dirty: Cell::new(computed),
            value: RefCell::new(Value::Null),
            deps: RefCell::new(Vec::new()),
            dep_ids: RefCell::new(FxHashSet::default()),
            new_deps: RefCell::new(Vec::new()),
            new_dep_ids: RefCell::new(FxHashSet::default()),
            own_dep: computed.then(Dep::new),
        }));
        trace!(
            "Created watcher {} for \"{}\"",
            watcher.0.id,
            watcher.0.expression
        );
        if !computed {
            let value = watcher.get();
            *watcher.0.value.borrow_mut() = value.clone();
            if immediate {
                watcher.invoke_callback(&value, &Value::Null);
            }
        }
        watcher
    }

    /// Convenience constructor for a computed watcher.
    pub fn computed(getter: Getter, scope: Option<&Rc<dyn ErrorScope>>) -> Self {
        let mut options = WatchOptions::new().computed();
        if let Some(owner) = scope {
            options = options.scope(owner);
        }
        Self::new(getter, None, options)
    }

    #[inline]
    pub fn downgrade(&self) -> WeakWatcher {
        WeakWatcher(Rc::downgrade(&self.0))
    }

    #[inline]
    pub fn id(&self) -> WatcherId {
        self.0.id
    }

    #[inline]
    pub fn expression(&self) -> &str {
        &self.0.expression
    }

    /// Last value produced.
    #[inline]
    pub fn value(&self) -> Value {
        self.0.value.borrow().clone()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    #[inline]
    pub fn is_computed(&self) -> bool {
        self.0.computed
    }

    #[inline]
    pub fn is_user(&self) -> bool {
        self.0.user
    }

    /// Number of Deps this watcher is subscribed to.
    pub fn dep_count(&self) -> usize {
        self.0.deps.borrow().len()
    }

    /// The computed watcher's own Dep.
    #[inline]
    pub fn own_dep(&self) -> Option<&Dep> {
        self.0.own_dep.as_ref()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Evaluate the getter while collecting dependencies.
    ///
    /// Container results are returned as shallow copies so that the new and
    /// old values handed to callbacks are never the same object. A failing
    /// getter is reported through [`handle_error`] and the cached value is
    /// returned.
    pub fn get(&self) -> Value {
        self.try_get().unwrap_or_else(|| self.value())
    }

    fn try_get(&self) -> Option<Value> {
        let result = {
            let _target = TargetGuard::push(Some(self.clone()));
            let result = self.0.getter.call();
            if self.0.deep
                && let Ok(value) = &result
            {
                traverse(value);
            }
            result
        };
        self.cleanup_deps();
        match result {
            Ok(value) => Some(value.shallow_copy()),
            Err(err) => {
                let info = if self.0.user {
                    format!("getter for watcher \"{}\"", self.0.expression)
                } else {
                    format!("watcher getter \"{}\"", self.0.expression)
                };
                handle_error(&err, self.scope().as_ref(), &info);
                None
            }
        }
    }

    /// Record `dep` as read during the current evaluation, subscribing to it
    /// the first time.
    pub fn add_dep(&self, dep: &Dep) {
        let id = dep.id();
        if !self.0.new_dep_ids.borrow_mut().insert(id) {
            return;
        }
        self.0.new_deps.borrow_mut().push(dep.clone());
        if !self.0.dep_ids.borrow().contains(&id) {
            dep.add_sub(self);
        }
    }

    /// Unsubscribe from Deps not read by the last evaluation and promote the
    /// new dependency set to current.
    ///
    /// A watcher torn down during the evaluation keeps no dependencies.
    fn cleanup_deps(&self) {
        if !self.is_active() {
            let read: Vec<Dep> = self.0.new_deps.borrow_mut().drain(..).collect();
            for dep in read {
                dep.remove_sub(self);
            }
            self.0.new_dep_ids.borrow_mut().clear();
            return;
        }
        let stale: Vec<Dep> = {
            let fresh = self.0.new_dep_ids.borrow();
            self.0
                .deps
                .borrow()
                .iter()
                .filter(|dep| !fresh.contains(&dep.id()))
                .cloned()
                .collect()
        };
        for dep in stale {
            dep.remove_sub(self);
        }
        self.0.dep_ids.swap(&self.0.new_dep_ids);
        self.0.new_dep_ids.borrow_mut().clear();
        self.0.deps.swap(&self.0.new_deps);
        self.0.new_deps.borrow_mut().clear();
    }

    /// React to a dependency change.
    ///
    /// Inactive watchers ignore notifications. A computed watcher nobody
    /// depends on only becomes dirty; one with subscribers re-evaluates and
    /// forwards the change to its own Dep. Other watchers run immediately when
    /// `sync`, otherwise they are queued for the next flush.
    pub fn update(&self) {
        if !self.is_active() {
            return;
        }
        if let Some(own) = &self.0.own_dep {
            if own.has_subscribers() {
                self.get_and_invoke(|_, _, _| own.notify());
            } else {
                self.0.dirty.set(true);
            }
        } else if self.0.sync {
            self.run();
        } else {
            queue_watcher(self);
        }
    }

    /// Re-evaluate and call the callback when the value changed.
    ///
    /// A value counts as changed when it differs under [`same_value`], when it
    /// is a container (always a fresh copy) or when the watcher is deep.
    pub fn run(&self) {
        if self.is_active() {
            self.get_and_invoke(Self::invoke_callback);
        }
    }

    fn get_and_invoke(&self, on_change: impl FnOnce(&Self, &Value, &Value)) {
        let Some(value) = self.try_get() else {
            return;
        };
        let changed = {
            let cached = self.0.value.borrow();
            !same_value(&cached, &value) || value.is_container() || self.0.deep
        };
        if changed {
            let old = self.0.value.replace(value.clone());
            self.0.dirty.set(false);
            on_change(self, &value, &old);
        }
    }

    fn invoke_callback(&self, new: &Value, old: &Value) {
        let Some(callback) = &self.0.callback else {
            return;
        };
        if let Err(err) = callback(new, old) {
            let info = if self.0.user {
                format!("callback for watcher \"{}\"", self.0.expression)
            } else {
                format!("watcher callback \"{}\"", self.0.expression)
            };
            handle_error(&err, self.scope().as_ref(), &info);
        }
    }

    /// Run the pre-flush hook, if any.
    pub fn run_before(&self) {
        if let Some(before) = &self.0.before {
            before();
        }
    }

    /// Computed watchers: recompute if dirty and return the cached value.
    pub fn evaluate(&self) -> Value {
        if self.0.dirty.get() {
            if let Some(value) = self.try_get() {
                *self.0.value.borrow_mut() = value;
            }
            self.0.dirty.set(false);
        }
        self.value()
    }

    /// Computed watchers: make the active watcher depend on this one.
    pub fn depend(&self) {
        if let Some(own) = &self.0.own_dep
            && is_tracking()
        {
            own.depend();
        }
    }

    /// Tracked read of a computed value.
    pub fn read_computed(&self) -> Value {
        self.depend();
        self.evaluate()
    }

    /// Unsubscribe from every Dep and become inactive. Idempotent.
    pub fn teardown(&self) {
        if !self.0.active.get() {
            return;
        }
        let deps: Vec<Dep> = self.0.deps.borrow_mut().drain(..).collect();
        for dep in &deps {
            dep.remove_sub(self);
        }
        self.0.dep_ids.borrow_mut().clear();
        self.0.active.set(false);
        trace!("Tore down watcher {}", self.0.id);
    }

    fn scope(&self) -> Option<Rc<dyn ErrorScope>> {
        self.0.scope.as_ref().and_then(Weak::upgrade)
    }
}

impl PartialEq for Watcher {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Watcher")
            .field("id", &self.0.id)
            .field("expression", &self.0.expression)
            .field("active", &self.0.active.get())
            .field("dirty", &self.0.dirty.get())
            .finish_non_exhaustive()
    }
}

/// Handle returned by [`watch`]. The watch stays alive as long as the handle.
#[derive(Debug, Clone)]
#[must_use = "dropping the handle stops the watch"]
pub struct WatchHandle {
    watcher: Watcher,
}

impl WatchHandle {
    /// Stop watching. Calling this more than once is harmless.
    #[inline]
    pub fn cancel(&self) {
        self.watcher.teardown();
    }

    #[inline]
    pub const fn watcher(&self) -> &Watcher {
        &self.watcher
    }
}

/// Register a user watcher calling `callback(new, old)` when `getter`'s value
/// changes.
pub fn watch(
    getter: Getter,
    callback: impl Fn(&Value, &Value) -> anyhow::Result<()> + 'static,
    options: WatchOptions,
) -> WatchHandle {
    let watcher = Watcher::new(getter, Some(Rc::new(callback)), options.user());
    WatchHandle { watcher }
}
