use super::{Value, same_value};
use crate::dep::{Dep, is_tracking};
use crate::ids::ContainerId;
use crate::observer::{self, observe};
use core::cell::RefCell;
use core::fmt;
use rustc_hash::FxHashMap;
use std::rc::Rc;

/// One field slot. `dep` is `None` for plain (non-reactive) fields.
struct Slot {
    value: Value,
    dep: Option<Dep>,
}

#[derive(Default)]
struct FieldMap {
    order: Vec<Rc<str>>,
    slots: FxHashMap<Rc<str>, Slot>,
}

struct ObjectInner {
    id: ContainerId,
    fields: RefCell<FieldMap>,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        observer::forget(self.id);
    }
}

/// An object container with ordered keys.
///
/// Fields defined while the object is observed carry their own [`Dep`];
/// reading them through [`get`](Self::get) registers the active watcher and
/// writing them through [`assign`](Self::assign) notifies it.
#[derive(Clone)]
pub struct ReactiveObject(Rc<ObjectInner>);

impl ReactiveObject {
    /// Create an empty, unobserved object.
    #[must_use]
    pub fn new() -> Self {
        Self(Rc::new(ObjectInner {
            id: ContainerId::next(),
            fields: RefCell::new(FieldMap::default()),
        }))
    }

    /// Create an unobserved object from key/value pairs.
    #[must_use]
    pub fn from_pairs<K: AsRef<str>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        let object = Self::new();
        for (key, value) in pairs {
            object.insert_field(key.as_ref(), value, None);
        }
        object
    }

    #[inline]
    pub fn id(&self) -> ContainerId {
        self.0.id
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Tracked read of `key`.
    ///
    /// Registers the field's Dep and, when the value is an observed
    /// container, that container's Dep too, so replacing or structurally
    /// changing a nested value is seen through an unchanged field.
    pub fn get(&self, key: &str) -> Value {
        let (value, dep) = {
            let fields = self.0.fields.borrow();
            match fields.slots.get(key) {
                Some(slot) => (slot.value.clone(), slot.dep.clone()),
                None => return Value::Null,
            }
        };
        if let Some(field_dep) = dep
            && is_tracking()
        {
            field_dep.depend();
            depend_nested(&value);
        }
        value
    }

    /// Read `key` without registering any dependency.
    pub fn get_untracked(&self, key: &str) -> Value {
        self.0
            .fields
            .borrow()
            .slots
            .get(key)
            .map_or(Value::Null, |slot| slot.value.clone())
    }

    /// Whether `key` is an own field.
    pub fn has_own(&self, key: &str) -> bool {
        self.0.fields.borrow().slots.contains_key(key)
    }

    /// Whether `key` is a reactive field.
    pub fn is_reactive_field(&self, key: &str) -> bool {
        self.0
            .fields
            .borrow()
            .slots
            .get(key)
            .is_some_and(|slot| slot.dep.is_some())
    }

    /// Field names in definition order. Registers the container Dep.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.depend_container();
        self.keys_untracked()
    }

    /// Field names in definition order.
    pub fn keys_untracked(&self) -> Vec<Rc<str>> {
        self.0.fields.borrow().order.clone()
    }

    /// Number of fields. Registers the container Dep.
    pub fn len(&self) -> usize {
        self.depend_container();
        self.0.fields.borrow().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Key/value pairs in definition order, read without tracking.
    pub fn entries_untracked(&self) -> Vec<(Rc<str>, Value)> {
        let fields = self.0.fields.borrow();
        fields
            .order
            .iter()
            .filter_map(|key| {
                fields
                    .slots
                    .get(key)
                    .map(|slot| (Rc::clone(key), slot.value.clone()))
            })
            .collect()
    }

    /// Write `key`.
    ///
    /// Equal writes (see [`same_value`]) are ignored. Otherwise the new value
    /// is observed and the field's Dep notified. Assigning a key that does not
    /// exist creates a plain field that is not reactive; use
    /// [`set`](crate::set) to add reactive fields.
    pub fn assign(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let dep = {
            let fields = self.0.fields.borrow();
            match fields.slots.get(key) {
                Some(slot) if same_value(&slot.value, &value) => return,
                Some(slot) => Some(slot.dep.clone()),
                None => None,
            }
        };
        match dep {
            None => self.insert_field(key, value, None),
            Some(None) => self.replace_value(key, value),
            Some(Some(field_dep)) => {
                observe(&value);
                self.replace_value(key, value);
                field_dep.notify();
            }
        }
    }

    /// New unobserved object holding the same field values.
    #[must_use]
    pub fn shallow_copy(&self) -> Self {
        Self::from_pairs(self.entries_untracked())
    }

    pub(crate) fn insert_field(&self, key: &str, value: Value, dep: Option<Dep>) {
        let mut fields = self.0.fields.borrow_mut();
        let key: Rc<str> = Rc::from(key);
        let previous = fields.slots.insert(Rc::clone(&key), Slot { value, dep });
        if previous.is_none() {
            fields.order.push(key);
        }
        drop(fields);
        drop(previous);
    }

    pub(crate) fn remove_field(&self, key: &str) -> Option<Value> {
        let mut fields = self.0.fields.borrow_mut();
        let removed = fields.slots.remove(key)?;
        fields.order.retain(|name| name.as_ref() != key);
        drop(fields);
        Some(removed.value)
    }

    fn replace_value(&self, key: &str, value: Value) {
        let previous = {
            let mut fields = self.0.fields.borrow_mut();
            fields
                .slots
                .get_mut(key)
                .map(|slot| core::mem::replace(&mut slot.value, value))
        };
        drop(previous);
    }

    fn depend_container(&self) {
        if is_tracking()
            && let Some(found) = observer::lookup(self.0.id)
        {
            found.dep().depend();
        }
    }
}

/// Register the Dep of an observed container value and, for arrays, of every
/// observed element, recursively.
pub(crate) fn depend_nested(value: &Value) {
    let Some(id) = value.container_id() else {
        return;
    };
    let Some(found) = observer::lookup(id) else {
        return;
    };
    found.dep().depend();
    if let Value::Array(array) = value {
        for item in array.to_vec_untracked() {
            depend_nested(&item);
        }
    }
}

impl Default for ReactiveObject {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ReactiveObject {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ReactiveObject {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "Object#{}", self.0.id.get())?;
        formatter.debug_list().entries(self.keys_untracked()).finish()
    }
}
