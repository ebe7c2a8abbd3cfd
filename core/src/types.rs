//! Resource entities and request payloads for the service-instance API.
//!
//! # Design
//! Response entities are immutable value objects. Each one declares its wire
//! layout as a `FieldDescriptor` table and is built only through the schema
//! mapper, so the per-entity code is a list of descriptors plus field moves.
//!
//! Only `credentials` preserves explicit nulls: the API uses `null` there to
//! mean "credentials are empty", which callers need to tell apart from
//! "credentials were not returned". Every other field collapses `null` into
//! absence.
//!
//! Request payloads are plain serde structs. Their `credentials` field is a
//! `Field` too, so an update can leave credentials alone (`Unset`) or clear
//! them (`Null`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::DeserializationError;
use crate::field::Field;
use crate::schema::{impl_entity_serde, map_entity, to_payload, Entity, FieldDescriptor, FieldKind, MappedFields};

/// Arbitrary key/value credentials attached to a service instance.
pub type Credentials = Map<String, Value>;

const CREDENTIALS: FieldDescriptor = FieldDescriptor::allow_nulls("credentials", "credentials", FieldKind::Object);
const NAME: FieldDescriptor = FieldDescriptor::nullable("name", "name", FieldKind::String);
const ROUTES_URL: FieldDescriptor = FieldDescriptor::nullable("routes_url", "routes_url", FieldKind::String);
const SERVICE_BINDINGS_URL: FieldDescriptor =
    FieldDescriptor::nullable("service_bindings_url", "service_bindings_url", FieldKind::String);
const SPACE_ID: FieldDescriptor = FieldDescriptor::nullable("space_id", "space_guid", FieldKind::String);
const SPACE_URL: FieldDescriptor = FieldDescriptor::nullable("space_url", "space_url", FieldKind::String);
const SERVICE_TYPE: FieldDescriptor = FieldDescriptor::nullable("service_type", "type", FieldKind::String);
const ROUTE_SERVICE_URL: FieldDescriptor =
    FieldDescriptor::nullable("route_service_url", "route_service_url", FieldKind::String);
const SYSLOG_DRAIN_URL: FieldDescriptor =
    FieldDescriptor::nullable("syslog_drain_url", "syslog_drain_url", FieldKind::String);

/// The entity payload shared by managed and user-provided service instances.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseServiceInstanceEntity {
    credentials: Field<Credentials>,
    name: Option<String>,
    routes_url: Option<String>,
    service_bindings_url: Option<String>,
    space_id: Option<String>,
    space_url: Option<String>,
    service_type: Option<String>,
}

impl BaseServiceInstanceEntity {
    /// The credentials, keeping "not returned" and "explicitly empty" apart.
    pub fn credentials(&self) -> &Field<Credentials> {
        &self.credentials
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn routes_url(&self) -> Option<&str> {
        self.routes_url.as_deref()
    }

    pub fn service_bindings_url(&self) -> Option<&str> {
        self.service_bindings_url.as_deref()
    }

    /// The space guid (`space_guid` on the wire).
    pub fn space_id(&self) -> Option<&str> {
        self.space_id.as_deref()
    }

    pub fn space_url(&self) -> Option<&str> {
        self.space_url.as_deref()
    }

    /// The instance type (`type` on the wire).
    pub fn service_type(&self) -> Option<&str> {
        self.service_type.as_deref()
    }
}

impl Entity for BaseServiceInstanceEntity {
    const SCHEMA: &'static [FieldDescriptor] = &[
        CREDENTIALS,
        NAME,
        ROUTES_URL,
        SERVICE_BINDINGS_URL,
        SPACE_ID,
        SPACE_URL,
        SERVICE_TYPE,
    ];

    fn from_fields(fields: &mut MappedFields) -> Result<Self, DeserializationError> {
        Ok(Self {
            credentials: fields.take(CREDENTIALS.name)?,
            name: fields.take_option(NAME.name)?,
            routes_url: fields.take_option(ROUTES_URL.name)?,
            service_bindings_url: fields.take_option(SERVICE_BINDINGS_URL.name)?,
            space_id: fields.take_option(SPACE_ID.name)?,
            space_url: fields.take_option(SPACE_URL.name)?,
            service_type: fields.take_option(SERVICE_TYPE.name)?,
        })
    }

    fn to_fields(&self, fields: &mut MappedFields) {
        fields.set(CREDENTIALS.name, self.credentials.clone());
        fields.set(NAME.name, unset_if_none(&self.name));
        fields.set(ROUTES_URL.name, unset_if_none(&self.routes_url));
        fields.set(SERVICE_BINDINGS_URL.name, unset_if_none(&self.service_bindings_url));
        fields.set(SPACE_ID.name, unset_if_none(&self.space_id));
        fields.set(SPACE_URL.name, unset_if_none(&self.space_url));
        fields.set(SERVICE_TYPE.name, unset_if_none(&self.service_type));
    }
}

/// A user-provided service instance: the base fields plus route and syslog
/// drain URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProvidedServiceInstanceEntity {
    base: BaseServiceInstanceEntity,
    route_service_url: Option<String>,
    syslog_drain_url: Option<String>,
}

impl UserProvidedServiceInstanceEntity {
    pub fn base(&self) -> &BaseServiceInstanceEntity {
        &self.base
    }

    pub fn route_service_url(&self) -> Option<&str> {
        self.route_service_url.as_deref()
    }

    pub fn syslog_drain_url(&self) -> Option<&str> {
        self.syslog_drain_url.as_deref()
    }
}

impl Entity for UserProvidedServiceInstanceEntity {
    const SCHEMA: &'static [FieldDescriptor] = &[
        CREDENTIALS,
        NAME,
        ROUTES_URL,
        SERVICE_BINDINGS_URL,
        SPACE_ID,
        SPACE_URL,
        SERVICE_TYPE,
        ROUTE_SERVICE_URL,
        SYSLOG_DRAIN_URL,
    ];

    fn from_fields(fields: &mut MappedFields) -> Result<Self, DeserializationError> {
        Ok(Self {
            base: BaseServiceInstanceEntity::from_fields(fields)?,
            route_service_url: fields.take_option(ROUTE_SERVICE_URL.name)?,
            syslog_drain_url: fields.take_option(SYSLOG_DRAIN_URL.name)?,
        })
    }

    fn to_fields(&self, fields: &mut MappedFields) {
        self.base.to_fields(fields);
        fields.set(ROUTE_SERVICE_URL.name, unset_if_none(&self.route_service_url));
        fields.set(SYSLOG_DRAIN_URL.name, unset_if_none(&self.syslog_drain_url));
    }
}

const GUID: FieldDescriptor = FieldDescriptor::nullable("guid", "guid", FieldKind::String);
const URL: FieldDescriptor = FieldDescriptor::nullable("url", "url", FieldKind::String);
const CREATED_AT: FieldDescriptor = FieldDescriptor::nullable("created_at", "created_at", FieldKind::String);
const UPDATED_AT: FieldDescriptor = FieldDescriptor::nullable("updated_at", "updated_at", FieldKind::String);

/// The `metadata` block of a v2 resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    guid: Option<String>,
    url: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl Metadata {
    pub fn guid(&self) -> Option<&str> {
        self.guid.as_deref()
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }

    pub fn updated_at(&self) -> Option<&str> {
        self.updated_at.as_deref()
    }
}

impl Entity for Metadata {
    const SCHEMA: &'static [FieldDescriptor] = &[GUID, URL, CREATED_AT, UPDATED_AT];

    fn from_fields(fields: &mut MappedFields) -> Result<Self, DeserializationError> {
        Ok(Self {
            guid: fields.take_option(GUID.name)?,
            url: fields.take_option(URL.name)?,
            created_at: fields.take_option(CREATED_AT.name)?,
            updated_at: fields.take_option(UPDATED_AT.name)?,
        })
    }

    fn to_fields(&self, fields: &mut MappedFields) {
        fields.set(GUID.name, unset_if_none(&self.guid));
        fields.set(URL.name, unset_if_none(&self.url));
        fields.set(CREATED_AT.name, unset_if_none(&self.created_at));
        fields.set(UPDATED_AT.name, unset_if_none(&self.updated_at));
    }
}

impl_entity_serde!(BaseServiceInstanceEntity, UserProvidedServiceInstanceEntity, Metadata);

/// Mapped fields normalise absent strings to `None`; writing them back must
/// omit the key, unlike `Field::from(None)` which yields `Null`.
fn unset_if_none(value: &Option<String>) -> Field<String> {
    match value {
        Some(v) => Field::Value(v.clone()),
        None => Field::Unset,
    }
}

/// The v2 resource envelope: `{"metadata": {...}, "entity": {...}}`.
///
/// A missing `metadata` block maps to empty metadata; a missing `entity` is an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource<E> {
    metadata: Metadata,
    entity: E,
}

impl<E: Entity> Resource<E> {
    pub fn from_payload(payload: &Value) -> Result<Self, DeserializationError> {
        let object = payload.as_object().ok_or(DeserializationError::NotAnObject {
            found: crate::schema::json_type(payload),
        })?;
        let metadata = match object.get("metadata") {
            None | Some(Value::Null) => Metadata::default(),
            Some(value) => map_entity(value)?,
        };
        let entity = match object.get("entity") {
            None | Some(Value::Null) => return Err(DeserializationError::MissingKey { key: "entity" }),
            Some(value) => map_entity(value)?,
        };
        Ok(Self { metadata, entity })
    }

    pub fn to_payload(&self) -> Value {
        let mut object = Map::new();
        object.insert("metadata".to_string(), to_payload(&self.metadata));
        object.insert("entity".to_string(), to_payload(&self.entity));
        Value::Object(object)
    }
}

impl<E> Resource<E> {
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn into_entity(self) -> E {
        self.entity
    }
}

impl<E: Entity> Serialize for Resource<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_payload().serialize(serializer)
    }
}

impl<'de, E: Entity> Deserialize<'de> for Resource<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let payload = Value::deserialize(deserializer)?;
        Self::from_payload(&payload).map_err(serde::de::Error::custom)
    }
}

/// Request payload for creating a user-provided service instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserProvidedServiceInstance {
    pub name: String,
    pub space_guid: String,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub credentials: Field<Credentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_service_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syslog_drain_url: Option<String>,
}

/// Request payload for updating a user-provided service instance. Omitted
/// fields are left unchanged; `credentials: Null` clears the credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserProvidedServiceInstance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Field::is_unset")]
    pub credentials: Field<Credentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_service_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syslog_drain_url: Option<String>,
}
