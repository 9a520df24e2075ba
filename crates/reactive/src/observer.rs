//! Making containers reactive.
//!
//! Whether a container is already reactive is recorded in a thread-local side
//! table keyed by [`ContainerId`], never on the container's own data. The
//! table maps each observed container to its [`Observer`], which owns the
//! container-level [`Dep`]. Entries are dropped together with their container.
//!
//! Observation is eager and recursive: observing an object gives every field a
//! Dep and observes every nested container; observing an array observes every
//! element.

use crate::dep::Dep;
use crate::error::{ReactiveError, warn};
use crate::ids::ContainerId;
use crate::value::{ReactiveArray, ReactiveObject, Value};
use core::cell::{Cell, RefCell};
use log::trace;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// Reactive metadata of one container.
#[derive(Debug)]
pub struct Observer {
    container: ContainerId,
    dep: Dep,
}

impl Observer {
    /// Container-level Dep, notified on structural changes.
    #[inline]
    pub const fn dep(&self) -> &Dep {
        &self.dep
    }

    #[inline]
    pub const fn container(&self) -> ContainerId {
        self.container
    }
}

thread_local! {
    static OBSERVERS: RefCell<FxHashMap<ContainerId, Rc<Observer>>> =
        RefCell::new(FxHashMap::default());
    static SHOULD_OBSERVE: Cell<bool> = const { Cell::new(true) };
}

/// Observer registered for `container`, if it is reactive.
#[inline]
pub fn lookup(container: ContainerId) -> Option<Rc<Observer>> {
    OBSERVERS.with_borrow(|table| table.get(&container).cloned())
}

/// Observer of `value`, if it is a reactive container.
#[inline]
pub fn observer_of(value: &Value) -> Option<Rc<Observer>> {
    value.container_id().and_then(lookup)
}

/// Whether `value` is a reactive container.
#[inline]
pub fn is_observed(value: &Value) -> bool {
    observer_of(value).is_some()
}

pub(crate) fn forget(container: ContainerId) {
    let removed = OBSERVERS.try_with(|table| {
        table
            .try_borrow_mut()
            .ok()
            .and_then(|mut entries| entries.remove(&container))
    });
    if let Ok(Some(observer)) = removed {
        trace!("Dropped observer for container {}", observer.container.get());
    }
}

/// Enable or disable automatic observation of new values.
#[inline]
pub fn toggle_observing(enabled: bool) {
    SHOULD_OBSERVE.with(|flag| flag.set(enabled));
}

/// Whether new values are currently observed automatically.
#[inline]
pub fn should_observe() -> bool {
    SHOULD_OBSERVE.with(Cell::get)
}

/// Run `body` with automatic observation disabled, restoring the previous state.
pub fn without_observing<R>(body: impl FnOnce() -> R) -> R {
    let previous = should_observe();
    toggle_observing(false);
    let result = body();
    toggle_observing(previous);
    result
}

/// Make `value` reactive.
///
/// Returns the existing observer when the container is already reactive,
/// `None` for primitives or while observation is disabled.
pub fn observe(value: &Value) -> Option<Rc<Observer>> {
    let container = value.container_id()?;
    if let Some(existing) = lookup(container) {
        return Some(existing);
    }
    if !should_observe() {
        return None;
    }
    let observer = Rc::new(Observer {
        container,
        dep: Dep::new(),
    });
    OBSERVERS.with_borrow_mut(|table| table.insert(container, Rc::clone(&observer)));
    match value {
        Value::Object(object) => walk(object),
        Value::Array(array) => observe_array(array),
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Str(_) => {}
    }
    Some(observer)
}

/// Build a reactive state tree from plain JSON data.
pub fn reactive(json: &serde_json::Value) -> Value {
    let value = Value::from_json(json);
    if observe(&value).is_none() && value.is_container() {
        trace!("Observation disabled; returning plain state tree");
    }
    value
}

fn walk(object: &ReactiveObject) {
    for (key, value) in object.entries_untracked() {
        define_reactive(object, &key, value);
    }
}

fn observe_array(array: &ReactiveArray) {
    for item in array.to_vec_untracked() {
        observe(&item);
    }
}

/// Define `key` on `object` as a reactive field holding `value`.
///
/// Replaces any existing field of that name. Nested containers in `value` are
/// observed unless observation is disabled.
pub fn define_reactive(object: &ReactiveObject, key: &str, value: Value) {
    observe(&value);
    object.insert_field(key, value, Some(Dep::new()));
}

/// Property key accepted by [`set`] and [`delete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropKey {
    Index(usize),
    Name(Rc<str>),
}

impl PropKey {
    /// Array index this key denotes, if it is a valid non-negative integer.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Name(name) => name.parse::<usize>().ok(),
        }
    }

    /// Key as a field name.
    pub fn to_name(&self) -> Rc<str> {
        match self {
            Self::Index(index) => Rc::from(index.to_string()),
            Self::Name(name) => Rc::clone(name),
        }
    }
}

impl From<usize> for PropKey {
    #[inline]
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for PropKey {
    #[inline]
    fn from(name: &str) -> Self {
        Self::Name(Rc::from(name))
    }
}

impl From<String> for PropKey {
    #[inline]
    fn from(name: String) -> Self {
        Self::Name(Rc::from(name))
    }
}

/// Set a property, adding a reactive field when it does not exist yet.
///
/// * array target with an index key: replace (or append past the end) through
///   the array's own mutation path;
/// * existing field: plain assignment, already reactive;
/// * new field on an observed object: define it reactively, then notify the
///   object's container Dep;
/// * new field on a plain object: plain assignment.
///
/// Other targets produce a warning. Returns `value`.
pub fn set(target: &Value, key: impl Into<PropKey>, value: impl Into<Value>) -> Value {
    let key = key.into();
    let value = value.into();
    match target {
        Value::Array(array) => match key.as_index() {
            Some(index) => array.set_index(index, value.clone()),
            None => warn(
                &ReactiveError::NonIndexKey {
                    key: key.to_name().to_string(),
                }
                .to_string(),
            ),
        },
        Value::Object(object) => {
            let name = key.to_name();
            if object.has_own(&name) {
                object.assign(&name, value.clone());
            } else if let Some(found) = observer_of(target) {
                define_reactive(object, &name, value.clone());
                found.dep().notify();
            } else {
                object.assign(&name, value.clone());
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Str(_) => warn(
            &ReactiveError::InvalidTarget {
                operation: "set",
                found: target.kind_name(),
            }
            .to_string(),
        ),
    }
    value
}

/// Delete a property and notify the container.
///
/// Array targets with an index key remove that element through the array's
/// own mutation path. Missing keys are a no-op.
pub fn delete(target: &Value, key: impl Into<PropKey>) {
    let key = key.into();
    match target {
        Value::Array(array) => match key.as_index() {
            Some(index) => {
                array.splice(index, 1, []);
            }
            None => warn(
                &ReactiveError::NonIndexKey {
                    key: key.to_name().to_string(),
                }
                .to_string(),
            ),
        },
        Value::Object(object) => {
            let name = key.to_name();
            if object.remove_field(&name).is_none() {
                return;
            }
            if let Some(found) = observer_of(target) {
                found.dep().notify();
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Str(_) => warn(
            &ReactiveError::InvalidTarget {
                operation: "delete",
                found: target.kind_name(),
            }
            .to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn observing_twice_reuses_the_observer() {
        let state = reactive(&json!({ "nested": { "a": 1 } }));
        let first = observer_of(&state);
        let second = observe(&state);
        assert!(matches!((first, second), (Some(lhs), Some(rhs)) if Rc::ptr_eq(&lhs, &rhs)));
        assert!(is_observed(&state.get("nested")));
    }

    #[test]
    fn disabled_observation_keeps_values_plain() {
        let value = without_observing(|| reactive(&json!({ "a": 1 })));
        assert!(!is_observed(&value));
        assert!(should_observe());
    }

    #[test]
    fn observer_entry_dropped_with_container() {
        let container = {
            let state = reactive(&json!([1, 2]));
            let id = state.container_id();
            assert!(is_observed(&state));
            id
        };
        assert!(container.and_then(lookup).is_none());
    }

    #[test]
    fn string_index_keys_address_array_elements() {
        assert_eq!(PropKey::from("3").as_index(), Some(3));
        assert_eq!(PropKey::from("-1").as_index(), None);
        assert_eq!(PropKey::from("x").as_index(), None);
    }
}
