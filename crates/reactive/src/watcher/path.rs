use crate::value::Value;
use std::rc::Rc;

/// A parsed dot-delimited watch expression such as `user.friends.0.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    segments: Vec<Rc<str>>,
}

impl Path {
    /// Parse `expression`, rejecting characters outside `[A-Za-z0-9_.$]`.
    pub fn parse(expression: &str) -> Option<Self> {
        let valid = expression
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '$'));
        if !valid {
            return None;
        }
        Some(Self {
            segments: expression
                .split('.')
                .filter(|segment| !segment.is_empty())
                .map(Rc::from)
                .collect(),
        })
    }

    /// Walk the path from `root` with tracked reads.
    ///
    /// A missing segment anywhere along the way yields `Null`.
    pub fn resolve(&self, root: &Value) -> Value {
        let mut current = root.clone();
        for segment in &self.segments {
            if current.is_null() {
                return Value::Null;
            }
            current = current.get(segment);
        }
        current
    }

    pub fn segments(&self) -> &[Rc<str>] {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::reactive;
    use serde_json::json;

    #[test]
    fn rejects_expressions() {
        assert!(Path::parse("a[0]").is_none());
        assert!(Path::parse("a + b").is_none());
        assert!(Path::parse("$data.items_2").is_some());
    }

    #[test]
    fn resolves_through_arrays() {
        let state = reactive(&json!({ "list": [{ "name": "kiner" }] }));
        let path = Path::parse("list.0.name");
        let resolved = path.map(|found| found.resolve(&state));
        assert_eq!(resolved, Some(Value::str("kiner")));
        let missing = Path::parse("list.4.name").map(|found| found.resolve(&state));
        assert_eq!(missing, Some(Value::Null));
    }
}
