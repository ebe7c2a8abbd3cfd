//! Tri-state field values for API payloads.
//!
//! # Design
//! A JSON key can be missing, present with `null`, or present with data.
//! `Field<T>` keeps those three states apart so the mapper can apply the
//! field's optionality policy instead of collapsing them into one `Option`.
//!
//! Callers that only care whether a value exists use the two-valued view
//! (`value`, `into_option`). Callers that must tell "not requested" from
//! "explicitly empty" match on the enum directly.
//!
//! When used in serde-derived request types, pair the field with
//! `#[serde(default, skip_serializing_if = "Field::is_unset")]`: an absent key
//! deserializes as `Unset`, and `Unset` is never written back out.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A payload field that distinguishes absence from an explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    /// The key was not present in the payload.
    Unset,
    /// The key was present with JSON `null`.
    Null,
    /// The key was present with a value.
    Value(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unset
    }
}

impl<T> Field<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Field::Unset)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Field::Value(_))
    }

    /// Two-valued view: `Unset` and `Null` both read as `None`.
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            Field::Unset | Field::Null => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Value(v) => Some(v),
            Field::Unset | Field::Null => None,
        }
    }

    pub fn as_ref(&self) -> Field<&T> {
        match self {
            Field::Unset => Field::Unset,
            Field::Null => Field::Null,
            Field::Value(v) => Field::Value(v),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Field<U> {
        match self {
            Field::Unset => Field::Unset,
            Field::Null => Field::Null,
            Field::Value(v) => Field::Value(f(v)),
        }
    }

    /// Collapse `Null` into `Unset`, for fields whose policy does not keep
    /// explicit nulls.
    pub fn null_as_unset(self) -> Self {
        match self {
            Field::Null => Field::Unset,
            other => other,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    /// `None` becomes `Null`: an `Option` has already observed the key.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Value(v),
            None => Field::Null,
        }
    }
}

/// `Value` serializes as the inner value; `Null` and `Unset` both serialize
/// as `null`.
///
/// A struct field must carry
/// `#[serde(default, skip_serializing_if = "Field::is_unset")]` for `Unset`
/// to omit the key. Without it an unset field is written as `null`, which the
/// API reads as a request to clear the value.
impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Value(v) => v.serialize(serializer),
            Field::Unset | Field::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.into())
    }
}
