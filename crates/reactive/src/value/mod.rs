//! Dynamic state values.
//!
//! State trees are built from [`Value`]s. Primitives are stored inline;
//! objects and arrays are reference-counted containers, so cloning a `Value`
//! never copies a container and two values are "the same" container exactly
//! when they point at the same allocation.

mod array;
mod json;
mod object;

pub use array::ReactiveArray;
pub use object::ReactiveObject;

use crate::ids::ContainerId;
use core::cmp::Ordering;
use core::fmt;
use std::rc::Rc;

/// A state value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(ReactiveArray),
    Object(ReactiveObject),
}

impl Value {
    /// Build a string value.
    #[inline]
    pub fn str(text: &str) -> Self {
        Self::Str(Rc::from(text))
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether this value is an object or an array.
    #[inline]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_))
    }

    #[inline]
    pub const fn as_bool(&self) -> Option<bool> {
        if let Self::Bool(flag) = self {
            Some(*flag)
        } else {
            None
        }
    }

    #[inline]
    pub const fn as_f64(&self) -> Option<f64> {
        if let Self::Number(number) = self {
            Some(*number)
        } else {
            None
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        if let Self::Str(text) = self {
            Some(text)
        } else {
            None
        }
    }

    #[inline]
    pub const fn as_array(&self) -> Option<&ReactiveArray> {
        if let Self::Array(array) = self {
            Some(array)
        } else {
            None
        }
    }

    #[inline]
    pub const fn as_object(&self) -> Option<&ReactiveObject> {
        if let Self::Object(object) = self {
            Some(object)
        } else {
            None
        }
    }

    /// Identity of the container, if this value is one.
    #[inline]
    pub fn container_id(&self) -> Option<ContainerId> {
        match self {
            Self::Array(array) => Some(array.id()),
            Self::Object(object) => Some(object.id()),
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::Str(_) => None,
        }
    }

    /// Tracked property read: object field, or array element for an index key.
    ///
    /// Anything else yields `Null`.
    pub fn get(&self, key: &str) -> Self {
        match self {
            Self::Object(object) => object.get(key),
            Self::Array(array) => key
                .parse::<usize>()
                .map_or(Self::Null, |index| array.get(index)),
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::Str(_) => Self::Null,
        }
    }

    /// Truthiness in the sense templates use for conditionals.
    pub fn truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(flag) => *flag,
            Self::Number(number) => *number != 0.0 && !number.is_nan(),
            Self::Str(text) => !text.is_empty(),
            Self::Array(_) | Self::Object(_) => true,
        }
    }

    /// Shallow copy: a new, unobserved container holding the same children.
    ///
    /// Primitives are returned unchanged.
    #[must_use]
    pub fn shallow_copy(&self) -> Self {
        match self {
            Self::Array(array) => Self::Array(array.shallow_copy()),
            Self::Object(object) => Self::Object(object.shallow_copy()),
            Self::Null | Self::Bool(_) | Self::Number(_) | Self::Str(_) => self.clone(),
        }
    }

    /// Text used when the value is interpolated into output.
    ///
    /// `Null` renders as the empty string and containers as JSON.
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(flag) => flag.to_string(),
            Self::Number(number) => format_number(*number),
            Self::Str(text) => text.to_string(),
            Self::Array(_) | Self::Object(_) => self.to_json().to_string(),
        }
    }

    /// Ordering used by [`ReactiveArray::sort`]: `Null` < booleans < numbers <
    /// strings < containers; numbers compare numerically, strings lexically,
    /// containers by creation order.
    pub fn natural_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(left), Self::Bool(right)) => left.cmp(right),
            (Self::Number(left), Self::Number(right)) => left.total_cmp(right),
            (Self::Str(left), Self::Str(right)) => left.cmp(right),
            _ => match (self.container_id(), other.container_id()) {
                (Some(left), Some(right)) => left.cmp(&right),
                _ => self.rank().cmp(&other.rank()),
            },
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Number(_) => 2,
            Self::Str(_) => 3,
            Self::Array(_) | Self::Object(_) => 4,
        }
    }

    /// Name of the variant, used in warnings.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

/// Write-equality rule: primitives compare by value with `NaN` equal to
/// `NaN`, containers compare by identity.
pub fn same_value(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(lhs), Value::Bool(rhs)) => lhs == rhs,
        (Value::Number(lhs), Value::Number(rhs)) => {
            lhs == rhs || (lhs.is_nan() && rhs.is_nan())
        }
        (Value::Str(lhs), Value::Str(rhs)) => lhs == rhs,
        (Value::Array(lhs), Value::Array(rhs)) => lhs.ptr_eq(rhs),
        (Value::Object(lhs), Value::Object(rhs)) => lhs.ptr_eq(rhs),
        _ => false,
    }
}

fn format_number(number: f64) -> String {
    if number.is_nan() {
        String::from("NaN")
    } else if number.is_infinite() {
        String::from(if number > 0.0 { "Infinity" } else { "-Infinity" })
    } else if number.fract() == 0.0 && number.abs() < 1e15 {
        format!("{}", number as i64)
    } else {
        number.to_string()
    }
}

impl PartialEq for Value {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        same_value(self, other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => formatter.write_str("Null"),
            Self::Bool(flag) => write!(formatter, "Bool({flag})"),
            Self::Number(number) => write!(formatter, "Number({number})"),
            Self::Str(text) => write!(formatter, "Str({text:?})"),
            Self::Array(array) => fmt::Debug::fmt(array, formatter),
            Self::Object(object) => fmt::Debug::fmt(object, formatter),
        }
    }
}

impl fmt::Display for Value {
    #[inline]
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.to_display_string())
    }
}

impl From<bool> for Value {
    #[inline]
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(number: f64) -> Self {
        Self::Number(number)
    }
}

impl From<i32> for Value {
    #[inline]
    fn from(number: i32) -> Self {
        Self::Number(f64::from(number))
    }
}

impl From<u32> for Value {
    #[inline]
    fn from(number: u32) -> Self {
        Self::Number(f64::from(number))
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(number: i64) -> Self {
        Self::Number(number as f64)
    }
}

impl From<usize> for Value {
    #[inline]
    fn from(number: usize) -> Self {
        Self::Number(number as f64)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(text: &str) -> Self {
        Self::str(text)
    }
}

impl From<String> for Value {
    #[inline]
    fn from(text: String) -> Self {
        Self::Str(Rc::from(text))
    }
}

impl From<ReactiveArray> for Value {
    #[inline]
    fn from(array: ReactiveArray) -> Self {
        Self::Array(array)
    }
}

impl From<ReactiveObject> for Value {
    #[inline]
    fn from(object: ReactiveObject) -> Self {
        Self::Object(object)
    }
}

impl From<Vec<Self>> for Value {
    #[inline]
    fn from(items: Vec<Self>) -> Self {
        Self::Array(ReactiveArray::from_vec(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_same_as_nan() {
        assert!(same_value(&Value::Number(f64::NAN), &Value::Number(f64::NAN)));
        assert!(!same_value(&Value::Number(1.0), &Value::str("1")));
    }

    #[test]
    fn containers_compare_by_identity() {
        let first = Value::from(vec![Value::from(1)]);
        let copy = first.shallow_copy();
        assert!(same_value(&first, &first.clone()));
        assert!(!same_value(&first, &copy));
    }

    #[test]
    fn numbers_display_like_template_text() {
        assert_eq!(Value::from(3).to_display_string(), "3");
        assert_eq!(Value::from(2.5).to_display_string(), "2.5");
        assert_eq!(Value::Null.to_display_string(), "");
        assert_eq!(Value::Number(f64::NAN).to_display_string(), "NaN");
    }

    #[test]
    fn truthiness() {
        assert!(!Value::from(0).truthy());
        assert!(!Value::str("").truthy());
        assert!(Value::from(vec![]).truthy());
    }
}
