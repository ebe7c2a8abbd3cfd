//! Synchronous client core for the Cloud Foundry service-instance API.
//!
//! # Overview
//! Maps raw JSON responses into typed, immutable entities and turns
//! structured API error payloads into a typed exception. The caller executes
//! the HTTP round-trip (host-does-IO pattern); this crate only builds
//! requests and interprets responses.
//!
//! # Design
//! - `schema` holds the one generic mapping routine; entities in `types` are
//!   declared as static field tables on top of it.
//! - `field::Field` keeps absent, `null` and present apart so each field can
//!   apply its own optionality policy.
//! - `error::ClientV3Exception` carries every error the API reported, in
//!   order, plus a precomputed summary message.
//! - `CloudFoundryClient` is stateless and holds only `base_url`.

pub mod client;
pub mod error;
pub mod field;
pub mod http;
pub mod schema;
pub mod types;

pub use client::CloudFoundryClient;
pub use error::{ApiError, ClientV3Error, ClientV3Exception, DeserializationError, MalformedErrorPayload};
pub use field::Field;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use schema::{map_entity, to_payload, Entity, FieldDescriptor, FieldKind, Optionality};
pub use types::{
    BaseServiceInstanceEntity, CreateUserProvidedServiceInstance, Credentials, Metadata, Resource,
    UpdateUserProvidedServiceInstance, UserProvidedServiceInstanceEntity,
};
