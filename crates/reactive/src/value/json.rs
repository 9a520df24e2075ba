use super::{ReactiveArray, ReactiveObject, Value};
use rustc_hash::FxHashSet;
use serde_json::{Map, Number, Value as Json};

impl Value {
    /// Build an unobserved value tree from JSON.
    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(flag) => Self::Bool(*flag),
            Json::Number(number) => Self::Number(number.as_f64().unwrap_or(f64::NAN)),
            Json::String(text) => Self::str(text),
            Json::Array(items) => Self::Array(ReactiveArray::from_vec(
                items.iter().map(Self::from_json).collect(),
            )),
            Json::Object(fields) => Self::Object(ReactiveObject::from_pairs(
                fields.iter().map(|(key, value)| (key, Self::from_json(value))),
            )),
        }
    }

    /// Snapshot the value tree as JSON without registering dependencies.
    ///
    /// Non-finite numbers become `null`; a container reached again through
    /// its own descendants is cut off as `null`.
    pub fn to_json(&self) -> Json {
        let mut visiting = FxHashSet::default();
        to_json_inner(self, &mut visiting)
    }
}

fn to_json_inner(value: &Value, visiting: &mut FxHashSet<u64>) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(flag) => Json::Bool(*flag),
        Value::Number(number) => Number::from_f64(*number).map_or(Json::Null, Json::Number),
        Value::Str(text) => Json::String(text.to_string()),
        Value::Array(array) => {
            if !visiting.insert(array.id().get()) {
                return Json::Null;
            }
            let items = array
                .to_vec_untracked()
                .iter()
                .map(|item| to_json_inner(item, visiting))
                .collect();
            visiting.remove(&array.id().get());
            Json::Array(items)
        }
        Value::Object(object) => {
            if !visiting.insert(object.id().get()) {
                return Json::Null;
            }
            let mut fields = Map::new();
            for (key, item) in object.entries_untracked() {
                fields.insert(key.to_string(), to_json_inner(&item, visiting));
            }
            visiting.remove(&object.id().get());
            Json::Object(fields)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_round_trip() {
        let source = json!({ "b": 1, "a": [true, null, "x"] });
        let value = Value::from_json(&source);
        let keys = value
            .as_object()
            .map(ReactiveObject::keys_untracked)
            .unwrap_or_default();
        assert_eq!(keys.iter().map(|key| &**key).collect::<Vec<&str>>(), ["a", "b"]);
        assert_eq!(value.to_json(), source);
    }

    #[test]
    fn self_reference_is_cut_off() {
        let object = ReactiveObject::new();
        object.assign("me", Value::Object(object.clone()));
        assert_eq!(Value::Object(object).to_json(), json!({ "me": null }));
    }
}
