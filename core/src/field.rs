//! Tri-state optional field used by partial updates.
//!
//! # Design
//! A plain `Option<T>` cannot tell "the key was missing" apart from "the key
//! was present with `null`". `Field<T>` keeps the three states separate:
//!
//! | JSON                | `Field<T>`          |
//! |---------------------|---------------------|
//! | key missing         | `Field::Unset`      |
//! | `"key": null`       | `Field::Clear`      |
//! | `"key": <value>`    | `Field::Value(v)`   |
//!
//! The missing-key case relies on `#[serde(default)]` on the containing
//! struct field; the deserializer itself only ever sees `null` or a value.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Field<T> {
    /// Not provided; the stored value is left untouched.
    #[default]
    Unset,
    /// Explicitly cleared; the stored value becomes `None`.
    Clear,
    /// Explicitly set.
    Value(T),
}

impl<T> Field<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Field::Unset)
    }

    /// Apply this field onto a stored optional value.
    pub fn apply_to(self, target: &mut Option<T>) {
        match self {
            Field::Unset => {}
            Field::Clear => *target = None,
            Field::Value(value) => *target = Some(value),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Unset => Field::Unset,
            Field::Clear => Field::Clear,
            Field::Value(value) => Field::Value(f(value)),
        }
    }

    pub fn as_ref(&self) -> Field<&T> {
        match self {
            Field::Unset => Field::Unset,
            Field::Clear => Field::Clear,
            Field::Value(value) => Field::Value(value),
        }
    }
}

impl Field<String> {
    /// Treat an empty string as an explicit clear.
    pub fn empty_as_clear(self) -> Self {
        match self {
            Field::Value(value) if value.is_empty() => Field::Clear,
            other => other,
        }
    }

    /// Treat an empty string as if the key had not been sent.
    pub fn empty_as_unset(self) -> Self {
        match self {
            Field::Value(value) if value.is_empty() => Field::Unset,
            other => other,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Field::Value(value),
            None => Field::Clear,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Field::from)
    }
}

/// `Unset` must be skipped by the container with
/// `#[serde(skip_serializing_if = "Field::is_unset")]`; if it reaches the
/// serializer anyway it is written as `null`.
impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Unset | Field::Clear => serializer.serialize_none(),
            Field::Value(value) => serializer.serialize_some(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Holder {
        #[serde(default, skip_serializing_if = "Field::is_unset")]
        note: Field<String>,
    }

    #[test]
    fn missing_key_is_unset() {
        let holder: Holder = serde_json::from_str("{}").unwrap();
        assert_eq!(holder.note, Field::Unset);
    }

    #[test]
    fn null_is_clear() {
        let holder: Holder = serde_json::from_str(r#"{"note":null}"#).unwrap();
        assert_eq!(holder.note, Field::Clear);
    }

    #[test]
    fn value_is_value() {
        let holder: Holder = serde_json::from_str(r#"{"note":"hi"}"#).unwrap();
        assert_eq!(holder.note, Field::Value("hi".to_string()));
    }

    #[test]
    fn unset_is_not_serialized() {
        let json = serde_json::to_string(&Holder { note: Field::Unset }).unwrap();
        assert_eq!(json, "{}");
        let json = serde_json::to_string(&Holder { note: Field::Clear }).unwrap();
        assert_eq!(json, r#"{"note":null}"#);
    }

    #[test]
    fn apply_to_respects_each_state() {
        let mut stored = Some("old".to_string());
        Field::Unset.apply_to(&mut stored);
        assert_eq!(stored.as_deref(), Some("old"));
        Field::Value("new".to_string()).apply_to(&mut stored);
        assert_eq!(stored.as_deref(), Some("new"));
        Field::Clear.apply_to(&mut stored);
        assert_eq!(stored, None);
    }

    #[test]
    fn empty_string_helpers() {
        assert_eq!(
            Field::Value(String::new()).empty_as_clear(),
            Field::<String>::Clear
        );
        assert_eq!(
            Field::Value(String::new()).empty_as_unset(),
            Field::<String>::Unset
        );
        assert_eq!(
            Field::Value("x".to_string()).empty_as_unset(),
            Field::Value("x".to_string())
        );
    }
}
