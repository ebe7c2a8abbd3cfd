//! Declarative field schemas and the generic entity mapper.
//!
//! # Design
//! Each entity describes its fields as a static table of `FieldDescriptor`s
//! (wire key, kind, optionality). `map_fields` is the only place that walks a
//! JSON object and applies those rules; entity types just pull typed values
//! out of the resulting `MappedFields`. `unmap_fields` is the inverse and is
//! what makes explicit nulls survive a round-trip.
//!
//! Optionality is applied here, not in the entity:
//! - `NullableIfAbsent`: a missing key and a `null` both become `Unset`.
//! - `ExplicitNullPreserving`: a `null` stays `Null` and is written back out.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::DeserializationError;
use crate::field::Field;

/// The JSON shape a field is expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
    /// A mapping of string keys to arbitrary JSON values.
    Object,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
            FieldKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// How a field treats an explicit JSON `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optionality {
    NullableIfAbsent,
    ExplicitNullPreserving,
}

/// One row of an entity schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Name used by the entity to look the value up in `MappedFields`.
    pub name: &'static str,
    /// Exact key in the JSON payload.
    pub wire_key: &'static str,
    pub kind: FieldKind,
    pub optionality: Optionality,
}

impl FieldDescriptor {
    pub const fn nullable(name: &'static str, wire_key: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            wire_key,
            kind,
            optionality: Optionality::NullableIfAbsent,
        }
    }

    pub const fn allow_nulls(name: &'static str, wire_key: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            wire_key,
            kind,
            optionality: Optionality::ExplicitNullPreserving,
        }
    }
}

/// A parsed field value, already checked against its `FieldKind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Object(Map<String, Value>),
}

impl FieldValue {
    fn parse(descriptor: &FieldDescriptor, value: &Value) -> Result<Self, DeserializationError> {
        let parsed = match (descriptor.kind, value) {
            (FieldKind::String, Value::String(s)) => Some(FieldValue::String(s.clone())),
            (FieldKind::Integer, Value::Number(n)) => n.as_i64().map(FieldValue::Integer),
            (FieldKind::Boolean, Value::Bool(b)) => Some(FieldValue::Boolean(*b)),
            (FieldKind::Object, Value::Object(m)) => Some(FieldValue::Object(m.clone())),
            _ => None,
        };
        parsed.ok_or(DeserializationError::TypeMismatch {
            wire_key: descriptor.wire_key,
            expected: descriptor.kind,
            found: json_type(value),
        })
    }

    fn kind(&self) -> FieldKind {
        match self {
            FieldValue::String(_) => FieldKind::String,
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::Boolean(_) => FieldKind::Boolean,
            FieldValue::Object(_) => FieldKind::Object,
        }
    }

    fn into_json(self) -> Value {
        match self {
            FieldValue::String(s) => Value::String(s),
            FieldValue::Integer(i) => Value::from(i),
            FieldValue::Boolean(b) => Value::Bool(b),
            FieldValue::Object(m) => Value::Object(m),
        }
    }
}

/// Rust types that can be stored in a `FieldValue`.
pub trait FieldType: Sized {
    const KIND: FieldKind;

    fn from_field_value(value: FieldValue) -> Result<Self, FieldValue>;
    fn into_field_value(self) -> FieldValue;
}

impl FieldType for String {
    const KIND: FieldKind = FieldKind::String;

    fn from_field_value(value: FieldValue) -> Result<Self, FieldValue> {
        match value {
            FieldValue::String(s) => Ok(s),
            other => Err(other),
        }
    }

    fn into_field_value(self) -> FieldValue {
        FieldValue::String(self)
    }
}

impl FieldType for i64 {
    const KIND: FieldKind = FieldKind::Integer;

    fn from_field_value(value: FieldValue) -> Result<Self, FieldValue> {
        match value {
            FieldValue::Integer(i) => Ok(i),
            other => Err(other),
        }
    }

    fn into_field_value(self) -> FieldValue {
        FieldValue::Integer(self)
    }
}

impl FieldType for bool {
    const KIND: FieldKind = FieldKind::Boolean;

    fn from_field_value(value: FieldValue) -> Result<Self, FieldValue> {
        match value {
            FieldValue::Boolean(b) => Ok(b),
            other => Err(other),
        }
    }

    fn into_field_value(self) -> FieldValue {
        FieldValue::Boolean(self)
    }
}

impl FieldType for Map<String, Value> {
    const KIND: FieldKind = FieldKind::Object;

    fn from_field_value(value: FieldValue) -> Result<Self, FieldValue> {
        match value {
            FieldValue::Object(m) => Ok(m),
            other => Err(other),
        }
    }

    fn into_field_value(self) -> FieldValue {
        FieldValue::Object(self)
    }
}

/// Field values keyed by descriptor name, produced by `map_fields` and
/// consumed by `Entity::from_fields`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedFields {
    schema: &'static [FieldDescriptor],
    values: BTreeMap<&'static str, Field<FieldValue>>,
}

impl MappedFields {
    pub fn new(schema: &'static [FieldDescriptor]) -> Self {
        Self {
            schema,
            values: BTreeMap::new(),
        }
    }

    fn descriptor(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.schema.iter().find(|d| d.name == name)
    }

    /// Remove a field and convert it to `T`. Names not in the schema read as
    /// `Unset`.
    pub fn take<T: FieldType>(&mut self, name: &str) -> Result<Field<T>, DeserializationError> {
        match self.values.remove(name) {
            None | Some(Field::Unset) => Ok(Field::Unset),
            Some(Field::Null) => Ok(Field::Null),
            Some(Field::Value(value)) => T::from_field_value(value).map(Field::Value).map_err(|v| {
                DeserializationError::TypeMismatch {
                    wire_key: self.descriptor(name).map_or("<unknown>", |d| d.wire_key),
                    expected: T::KIND,
                    found: kind_as_json_type(v.kind()),
                }
            }),
        }
    }

    /// Two-valued convenience over `take`.
    pub fn take_option<T: FieldType>(&mut self, name: &str) -> Result<Option<T>, DeserializationError> {
        Ok(self.take(name)?.into_option())
    }

    /// Store a field for serialization. Names not in the schema are dropped.
    pub fn set<T: FieldType>(&mut self, name: &str, value: Field<T>) {
        if let Some(descriptor) = self.descriptor(name) {
            self.values
                .insert(descriptor.name, value.map(FieldType::into_field_value));
        }
    }
}

/// Map a JSON object onto the field table described by `schema`.
///
/// Unknown keys are ignored. The first type mismatch aborts the mapping.
pub fn map_fields(
    payload: &Value,
    schema: &'static [FieldDescriptor],
) -> Result<MappedFields, DeserializationError> {
    let object = payload.as_object().ok_or(DeserializationError::NotAnObject {
        found: json_type(payload),
    })?;

    let mut fields = MappedFields::new(schema);
    for descriptor in schema {
        let field = match object.get(descriptor.wire_key) {
            None => Field::Unset,
            Some(Value::Null) => match descriptor.optionality {
                Optionality::NullableIfAbsent => Field::Unset,
                Optionality::ExplicitNullPreserving => Field::Null,
            },
            Some(value) => Field::Value(FieldValue::parse(descriptor, value)?),
        };
        fields.values.insert(descriptor.name, field);
    }
    Ok(fields)
}

/// Render a field table back into a JSON object: `Unset` is omitted and
/// `Null` is written as `null`.
pub fn unmap_fields(mut fields: MappedFields) -> Value {
    let mut object = Map::new();
    for descriptor in fields.schema {
        match fields.values.remove(descriptor.name) {
            None | Some(Field::Unset) => {}
            Some(Field::Null) => {
                object.insert(descriptor.wire_key.to_string(), Value::Null);
            }
            Some(Field::Value(value)) => {
                object.insert(descriptor.wire_key.to_string(), value.into_json());
            }
        }
    }
    Value::Object(object)
}

/// An immutable resource entity described by a static schema.
pub trait Entity: Sized {
    const SCHEMA: &'static [FieldDescriptor];

    fn from_fields(fields: &mut MappedFields) -> Result<Self, DeserializationError>;

    fn to_fields(&self, fields: &mut MappedFields);
}

pub fn map_entity<E: Entity>(payload: &Value) -> Result<E, DeserializationError> {
    let mut fields = map_fields(payload, E::SCHEMA)?;
    E::from_fields(&mut fields)
}

pub fn to_payload<E: Entity>(entity: &E) -> Value {
    let mut fields = MappedFields::new(E::SCHEMA);
    entity.to_fields(&mut fields);
    unmap_fields(fields)
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn kind_as_json_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::String => "string",
        FieldKind::Integer => "number",
        FieldKind::Boolean => "boolean",
        FieldKind::Object => "object",
    }
}

/// Implement serde `Serialize`/`Deserialize` for entities by routing through
/// the schema mapper.
macro_rules! impl_entity_serde {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl serde::Serialize for $ty {
                fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    serde::Serialize::serialize(&$crate::schema::to_payload(self), serializer)
                }
            }

            impl<'de> serde::Deserialize<'de> for $ty {
                fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                    let payload = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
                    $crate::schema::map_entity(&payload).map_err(serde::de::Error::custom)
                }
            }
        )+
    };
}

pub(crate) use impl_entity_serde;
