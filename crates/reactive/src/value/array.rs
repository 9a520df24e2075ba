use super::Value;
use crate::dep::is_tracking;
use crate::ids::ContainerId;
use crate::observer::{self, observe};
use core::cell::RefCell;
use core::cmp::Ordering;
use core::fmt;
use log::trace;
use std::rc::Rc;

struct ArrayInner {
    id: ContainerId,
    items: RefCell<Vec<Value>>,
}

impl Drop for ArrayInner {
    fn drop(&mut self) {
        observer::forget(self.id);
    }
}

/// An array container that owns its storage.
///
/// The mutation methods below are the only way to change the contents. Each
/// one performs the change, observes any inserted elements (when the array is
/// itself observed) and then notifies the array's container Dep exactly once.
/// Reads register the container Dep.
#[derive(Clone)]
pub struct ReactiveArray(Rc<ArrayInner>);

impl ReactiveArray {
    /// Create an empty, unobserved array.
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Create an unobserved array holding `items`.
    #[must_use]
    pub fn from_vec(items: Vec<Value>) -> Self {
        Self(Rc::new(ArrayInner {
            id: ContainerId::next(),
            items: RefCell::new(items),
        }))
    }

    #[inline]
    pub fn id(&self) -> ContainerId {
        self.0.id
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Tracked element read; out-of-range indices yield `Null`.
    pub fn get(&self, index: usize) -> Value {
        self.depend_container();
        self.get_untracked(index)
    }

    pub fn get_untracked(&self, index: usize) -> Value {
        self.0
            .items
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    /// Tracked length.
    pub fn len(&self) -> usize {
        self.depend_container();
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tracked copy of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.depend_container();
        self.to_vec_untracked()
    }

    pub fn to_vec_untracked(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    /// Tracked iteration over a snapshot of the elements.
    pub fn iter_values(&self) -> impl Iterator<Item = Value> + use<> {
        self.to_vec().into_iter()
    }

    /// Append `value`, returning the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        self.push_all([value.into()])
    }

    /// Append every value in order, with a single notification.
    pub fn push_all(&self, values: impl IntoIterator<Item = Value>) -> usize {
        let inserted: Vec<Value> = values.into_iter().collect();
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.extend(inserted.iter().cloned());
            items.len()
        };
        self.after_mutation("push", &inserted);
        len
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        let removed = self.0.items.borrow_mut().pop();
        self.after_mutation("pop", &[]);
        removed
    }

    /// Insert `value` at the front, returning the new length.
    pub fn unshift(&self, value: impl Into<Value>) -> usize {
        self.unshift_all([value.into()])
    }

    /// Insert every value at the front, keeping their order.
    pub fn unshift_all(&self, values: impl IntoIterator<Item = Value>) -> usize {
        let inserted: Vec<Value> = values.into_iter().collect();
        let len = {
            let mut items = self.0.items.borrow_mut();
            items.splice(0..0, inserted.iter().cloned());
            items.len()
        };
        self.after_mutation("unshift", &inserted);
        len
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        let removed = {
            let mut items = self.0.items.borrow_mut();
            (!items.is_empty()).then(|| items.remove(0))
        };
        self.after_mutation("shift", &[]);
        removed
    }

    /// Sort with [`Value::natural_cmp`].
    pub fn sort(&self) {
        self.sort_by(Value::natural_cmp);
    }

    /// Stable sort with a caller-supplied comparator.
    ///
    /// The comparator runs while the storage is borrowed and must not touch
    /// this array.
    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) {
        self.0.items.borrow_mut().sort_by(compare);
        self.after_mutation("sort", &[]);
    }

    pub fn reverse(&self) {
        self.0.items.borrow_mut().reverse();
        self.after_mutation("reverse", &[]);
    }

    /// Remove `delete_count` elements starting at `start` and insert `items`
    /// in their place. Both bounds are clamped to the current length.
    ///
    /// Returns the removed elements.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        items: impl IntoIterator<Item = Value>,
    ) -> Vec<Value> {
        let inserted: Vec<Value> = items.into_iter().collect();
        let removed: Vec<Value> = {
            let mut storage = self.0.items.borrow_mut();
            let start = start.min(storage.len());
            let end = start.saturating_add(delete_count).min(storage.len());
            storage.splice(start..end, inserted.iter().cloned()).collect()
        };
        self.after_mutation("splice", &inserted);
        removed
    }

    /// Replace the element at `index`, padding with `Null` when `index` is
    /// past the end. Observable, unlike a raw index store.
    pub fn set_index(&self, index: usize, value: impl Into<Value>) {
        let value = value.into();
        {
            let mut storage = self.0.items.borrow_mut();
            if index >= storage.len() {
                storage.resize(index + 1, Value::Null);
            }
            if let Some(slot) = storage.get_mut(index) {
                *slot = value.clone();
            }
        }
        self.after_mutation("set_index", &[value]);
    }

    /// Truncate, or pad with `Null`, to exactly `len` elements.
    pub fn set_len(&self, len: usize) {
        let removed: Vec<Value> = {
            let mut storage = self.0.items.borrow_mut();
            if len < storage.len() {
                storage.drain(len..).collect()
            } else {
                storage.resize(len, Value::Null);
                Vec::new()
            }
        };
        drop(removed);
        self.after_mutation("set_len", &[]);
    }

    /// New unobserved array holding the same elements.
    #[must_use]
    pub fn shallow_copy(&self) -> Self {
        Self::from_vec(self.to_vec_untracked())
    }

    fn after_mutation(&self, method: &str, inserted: &[Value]) {
        let Some(found) = observer::lookup(self.0.id) else {
            return;
        };
        for value in inserted {
            observe(value);
        }
        trace!("Array#{} {method}", self.0.id.get());
        found.dep().notify();
    }

    fn depend_container(&self) {
        if is_tracking()
            && let Some(found) = observer::lookup(self.0.id)
        {
            found.dep().depend();
        }
    }
}

impl Default for ReactiveArray {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ReactiveArray {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ReactiveArray {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "Array#{}(len {})",
            self.0.id.get(),
            self.0.items.borrow().len()
        )
    }
}
