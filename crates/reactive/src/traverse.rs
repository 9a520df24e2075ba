//! Deep reads for `deep` watchers.

use crate::ids::{ContainerId, DepId};
use crate::observer::observer_of;
use crate::value::Value;
use rustc_hash::FxHashSet;

/// Read every nested field of `value` so the active watcher depends on all of
/// them. Each observed container is visited once, which also terminates
/// cycles.
pub fn traverse(value: &Value) {
    let mut seen = Seen::default();
    traverse_inner(value, &mut seen);
}

/// Visited containers: observed ones by their Dep, plain ones by identity.
#[derive(Default)]
struct Seen {
    deps: FxHashSet<DepId>,
    plain: FxHashSet<ContainerId>,
}

fn traverse_inner(value: &Value, seen: &mut Seen) {
    let Some(container) = value.container_id() else {
        return;
    };
    let first_visit = match observer_of(value) {
        Some(found) => seen.deps.insert(found.dep().id()),
        None => seen.plain.insert(container),
    };
    if !first_visit {
        return;
    }
    match value {
        Value::Array(array) => {
            for item in array.to_vec() {
                traverse_inner(&item, seen);
            }
        }
        Value::Object(object) => {
            for key in object.keys() {
                traverse_inner(&object.get(&key), seen);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Str(_) => {}
    }
}
