//! Stateless HTTP request builder and response parser for the Cloud Foundry
//! service-instance API.
//!
//! # Design
//! `CloudFoundryClient` holds only a `base_url`. Each operation is split into
//! a `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`; the caller executes the round-trip.
//!
//! Any 2xx response goes to the entity mapper. Every other status goes to the
//! error aggregator and surfaces as `ApiError::ClientV3`, or as
//! `ApiError::MalformedErrorPayload` when the body is not an `errors` envelope.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ApiError, ClientV3Exception, DeserializationError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::schema::Entity;
use crate::types::{
    BaseServiceInstanceEntity, CreateUserProvidedServiceInstance, Resource,
    UpdateUserProvidedServiceInstance, UserProvidedServiceInstanceEntity,
};

/// Synchronous, stateless client for the service-instance endpoints.
#[derive(Debug, Clone)]
pub struct CloudFoundryClient {
    base_url: String,
}

impl CloudFoundryClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn build_get_service_instance(&self, guid: &str) -> HttpRequest {
        HttpRequest::bodiless(
            HttpMethod::Get,
            format!("{}/v2/service_instances/{guid}", self.base_url),
        )
    }

    pub fn build_get_user_provided_service_instance(&self, guid: &str) -> HttpRequest {
        HttpRequest::bodiless(
            HttpMethod::Get,
            format!("{}/v2/user_provided_service_instances/{guid}", self.base_url),
        )
    }

    pub fn build_create_user_provided_service_instance(
        &self,
        input: &CreateUserProvidedServiceInstance,
    ) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::json(
            HttpMethod::Post,
            format!("{}/v2/user_provided_service_instances", self.base_url),
            to_body(input)?,
        ))
    }

    pub fn build_update_user_provided_service_instance(
        &self,
        guid: &str,
        input: &UpdateUserProvidedServiceInstance,
    ) -> Result<HttpRequest, ApiError> {
        Ok(HttpRequest::json(
            HttpMethod::Put,
            format!("{}/v2/user_provided_service_instances/{guid}", self.base_url),
            to_body(input)?,
        ))
    }

    pub fn build_delete_service_instance(&self, guid: &str) -> HttpRequest {
        HttpRequest::bodiless(
            HttpMethod::Delete,
            format!("{}/v2/service_instances/{guid}", self.base_url),
        )
    }

    pub fn parse_get_service_instance(
        &self,
        response: HttpResponse,
    ) -> Result<Resource<BaseServiceInstanceEntity>, ApiError> {
        check_status(&response)?;
        parse_resource(&response.body)
    }

    pub fn parse_get_user_provided_service_instance(
        &self,
        response: HttpResponse,
    ) -> Result<Resource<UserProvidedServiceInstanceEntity>, ApiError> {
        check_status(&response)?;
        parse_resource(&response.body)
    }

    pub fn parse_create_user_provided_service_instance(
        &self,
        response: HttpResponse,
    ) -> Result<Resource<UserProvidedServiceInstanceEntity>, ApiError> {
        check_status(&response)?;
        parse_resource(&response.body)
    }

    pub fn parse_update_user_provided_service_instance(
        &self,
        response: HttpResponse,
    ) -> Result<Resource<UserProvidedServiceInstanceEntity>, ApiError> {
        check_status(&response)?;
        parse_resource(&response.body)
    }

    pub fn parse_delete_service_instance(&self, response: HttpResponse) -> Result<(), ApiError> {
        check_status(&response)
    }
}

fn to_body<T: Serialize>(input: &T) -> Result<String, ApiError> {
    serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))
}

fn parse_resource<E: Entity>(body: &str) -> Result<Resource<E>, ApiError> {
    let payload: Value =
        serde_json::from_str(body).map_err(|e| DeserializationError::InvalidJson(e.to_string()))?;
    Ok(Resource::from_payload(&payload)?)
}

/// Turn a non-2xx response into the aggregated API error.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    match ClientV3Exception::from_body(&response.body) {
        Ok(exception) => {
            debug!(
                status = response.status,
                errors = exception.errors().len(),
                "request rejected: {exception}"
            );
            Err(ApiError::ClientV3(exception))
        }
        Err(source) => {
            warn!(
                status = response.status,
                reason = source.reason(),
                "failure response without an errors envelope"
            );
            Err(ApiError::MalformedErrorPayload {
                status: response.status,
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::field::Field;

    fn client() -> CloudFoundryClient {
        CloudFoundryClient::new("http://localhost:3000")
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_get_service_instance_produces_correct_request() {
        let req = client().build_get_service_instance("g-1");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/v2/service_instances/g-1");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn build_create_produces_json_request() {
        let input = CreateUserProvidedServiceInstance {
            name: "db".to_string(),
            space_guid: "s-1".to_string(),
            credentials: Field::Value(json!({"user": "u"}).as_object().unwrap().clone()),
            route_service_url: None,
            syslog_drain_url: None,
        };
        let req = client().build_create_user_provided_service_instance(&input).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/v2/user_provided_service_instances");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "db", "space_guid": "s-1", "credentials": {"user": "u"}}));
    }

    #[test]
    fn build_update_sends_explicit_null_credentials() {
        let input = UpdateUserProvidedServiceInstance {
            credentials: Field::Null,
            ..Default::default()
        };
        let req = client()
            .build_update_user_provided_service_instance("g-1", &input)
            .unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "http://localhost:3000/v2/user_provided_service_instances/g-1");
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"credentials": null}));
    }

    #[test]
    fn build_delete_produces_correct_request() {
        let req = client().build_delete_service_instance("g-1");
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "http://localhost:3000/v2/service_instances/g-1");
        assert!(req.body.is_none());
    }

    #[test]
    fn parse_get_service_instance_success() {
        let body = r#"{"metadata":{"guid":"g-1"},"entity":{"name":"db","credentials":null,"space_guid":"s-1"}}"#;
        let resource = client().parse_get_service_instance(response(200, body)).unwrap();
        assert_eq!(resource.metadata().guid(), Some("g-1"));
        assert_eq!(resource.entity().name(), Some("db"));
        assert!(resource.entity().credentials().is_null());
        assert_eq!(resource.entity().service_type(), None);
    }

    #[test]
    fn parse_failure_aggregates_errors() {
        let body = r#"{"errors":[{"code":10008,"detail":"bad request","title":"CF-MessageParseError"},{"code":10009,"detail":"missing field","title":"CF-MissingField"}]}"#;
        let err = client()
            .parse_create_user_provided_service_instance(response(422, body))
            .unwrap_err();
        let ApiError::ClientV3(exception) = err else {
            panic!("expected ClientV3");
        };
        assert_eq!(exception.errors().len(), 2);
        assert_eq!(
            exception.message(),
            "CF-MessageParseError(10008): bad request, CF-MissingField(10009): missing field"
        );
    }

    #[test]
    fn parse_not_found_is_structured() {
        let body = r#"{"errors":[{"code":60004,"detail":"The service instance could not be found: g-1","title":"CF-ServiceInstanceNotFound"}]}"#;
        let err = client().parse_get_service_instance(response(404, body)).unwrap_err();
        assert!(matches!(err, ApiError::ClientV3(ref e) if e.errors()[0].code() == Some(60004)));
    }

    #[test]
    fn parse_failure_with_empty_errors_is_malformed() {
        let err = client()
            .parse_delete_service_instance(response(500, r#"{"errors":[]}"#))
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedErrorPayload { status: 500, .. }));
    }

    #[test]
    fn parse_failure_with_plain_text_is_malformed() {
        let err = client()
            .parse_get_service_instance(response(502, "bad gateway"))
            .unwrap_err();
        assert!(matches!(err, ApiError::MalformedErrorPayload { status: 502, .. }));
    }

    #[test]
    fn parse_type_mismatch_is_deserialization_error() {
        let body = r#"{"metadata":{},"entity":{"name":42}}"#;
        let err = client().parse_get_service_instance(response(200, body)).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Deserialization(DeserializationError::TypeMismatch { wire_key: "name", .. })
        ));
    }

    #[test]
    fn parse_bad_json_is_deserialization_error() {
        let err = client()
            .parse_get_user_provided_service_instance(response(200, "not json"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(DeserializationError::InvalidJson(_))));
    }

    #[test]
    fn parse_delete_accepts_no_content() {
        assert!(client().parse_delete_service_instance(response(204, "")).is_ok());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = CloudFoundryClient::new("http://localhost:3000/");
        let req = client.build_delete_service_instance("g-1");
        assert_eq!(req.path, "http://localhost:3000/v2/service_instances/g-1");
    }
}
