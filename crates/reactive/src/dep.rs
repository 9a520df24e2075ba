//! Dependency sets and the active-watcher stack.
//!
//! A [`Dep`] is the subscriber list of one observable field or one container.
//! Reads call [`Dep::depend`], which registers the watcher currently on top of
//! the target stack; writes call [`Dep::notify`].
//!
//! ```text
//! watcher.get() ── push_target(w) ──► getter reads field ──► dep.depend()
//!                                                              │
//!                                   w.add_dep(dep) ◄───────────┘
//!                                   dep.add_sub(w)   (first time only)
//! ```

use crate::ids::DepId;
use crate::watcher::{WeakWatcher, Watcher};
use core::cell::RefCell;
use core::fmt;
use log::trace;
use std::rc::Rc;

struct DepInner {
    id: DepId,
    subs: RefCell<Vec<WeakWatcher>>,
}

/// Ordered, duplicate-free set of subscribed watchers.
///
/// Subscriptions are non-owning: a dropped watcher simply disappears from the
/// list on the next notification.
#[derive(Clone)]
pub struct Dep(Rc<DepInner>);

impl Dep {
    /// Create an empty dependency set with a fresh id.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Rc::new(DepInner {
            id: DepId::next(),
            subs: RefCell::new(Vec::new()),
        }))
    }

    /// This set's id.
    #[inline]
    pub fn id(&self) -> DepId {
        self.0.id
    }

    /// Register the currently active watcher, if any.
    #[inline]
    pub fn depend(&self) {
        if let Some(target) = current_target() {
            target.add_dep(self);
        }
    }

    /// Call `update` on every live subscriber in subscription order.
    ///
    /// The subscriber list is snapshotted first, so watchers that subscribe or
    /// unsubscribe during the notification do not disturb the iteration.
    pub fn notify(&self) {
        let subs: Vec<Watcher> = {
            let mut subs = self.0.subs.borrow_mut();
            subs.retain(WeakWatcher::is_alive);
            subs.iter().filter_map(WeakWatcher::upgrade).collect()
        };
        trace!("Dep {:?} notifying {} subscribers", self.0.id, subs.len());
        for watcher in subs {
            watcher.update();
        }
    }

    /// Subscribe `watcher`; a no-op when it is already subscribed.
    pub fn add_sub(&self, watcher: &Watcher) {
        let mut subs = self.0.subs.borrow_mut();
        if !subs.iter().any(|sub| sub.points_to(watcher)) {
            subs.push(watcher.downgrade());
        }
    }

    /// Unsubscribe `watcher`; a no-op when it is not subscribed.
    pub fn remove_sub(&self, watcher: &Watcher) {
        let mut subs = self.0.subs.borrow_mut();
        if let Some(position) = subs.iter().position(|sub| sub.points_to(watcher)) {
            subs.remove(position);
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.0
            .subs
            .borrow()
            .iter()
            .filter(|sub| sub.is_alive())
            .count()
    }

    /// Whether any live watcher is subscribed.
    #[inline]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Identity comparison.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Dep {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Dep {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Dep {}

impl fmt::Debug for Dep {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Dep")
            .field("id", &self.0.id)
            .field("subs", &self.subscriber_count())
            .finish()
    }
}

thread_local! {
    static TARGET_STACK: RefCell<Vec<Option<Watcher>>> = const { RefCell::new(Vec::new()) };
}

/// Make `target` the active watcher until the matching [`pop_target`].
///
/// Pushing `None` suspends tracking.
#[inline]
pub fn push_target(target: Option<Watcher>) {
    TARGET_STACK.with_borrow_mut(|stack| stack.push(target));
}

/// Restore the previously active watcher.
#[inline]
pub fn pop_target() {
    TARGET_STACK.with_borrow_mut(|stack| {
        stack.pop();
    });
}

/// The watcher currently collecting dependencies.
#[inline]
pub fn current_target() -> Option<Watcher> {
    TARGET_STACK.with_borrow(|stack| stack.last().cloned().flatten())
}

/// Whether a watcher is currently collecting dependencies.
#[inline]
pub fn is_tracking() -> bool {
    TARGET_STACK.with_borrow(|stack| matches!(stack.last(), Some(Some(_))))
}

/// Pops the target stack when dropped.
#[must_use = "the target is popped as soon as the guard is dropped"]
pub struct TargetGuard(());

impl TargetGuard {
    /// Push `target` and return a guard that pops it.
    #[inline]
    pub fn push(target: Option<Watcher>) -> Self {
        push_target(target);
        Self(())
    }
}

impl Drop for TargetGuard {
    #[inline]
    fn drop(&mut self) {
        pop_target();
    }
}

/// Run `body` with dependency tracking suspended.
#[inline]
pub fn untracked<R>(body: impl FnOnce() -> R) -> R {
    let _guard = TargetGuard::push(None);
    body()
}
