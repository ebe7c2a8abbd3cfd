//! In-memory stand-in for the Cloud Foundry service-instance endpoints.
//!
//! Wire types here are defined independently of `cf-client-core` so the
//! integration tests catch schema drift between the two. Failures always use
//! the `{"errors": [...]}` envelope.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const USER_PROVIDED_TYPE: &str = "user_provided_service_instance";

#[derive(Clone, Debug, PartialEq)]
pub struct ServiceInstance {
    pub guid: String,
    pub name: String,
    pub space_guid: String,
    /// `None` renders as an explicit `null`.
    pub credentials: Option<Map<String, Value>>,
    pub route_service_url: Option<String>,
    pub syslog_drain_url: Option<String>,
}

impl ServiceInstance {
    pub fn to_resource(&self) -> Value {
        let guid = &self.guid;
        json!({
            "metadata": {
                "guid": guid,
                "url": format!("/v2/user_provided_service_instances/{guid}"),
            },
            "entity": {
                "name": self.name,
                "credentials": self.credentials,
                "space_guid": self.space_guid,
                "space_url": format!("/v2/spaces/{}", self.space_guid),
                "type": USER_PROVIDED_TYPE,
                "routes_url": format!("/v2/user_provided_service_instances/{guid}/routes"),
                "service_bindings_url": format!("/v2/user_provided_service_instances/{guid}/service_bindings"),
                "route_service_url": self.route_service_url,
                "syslog_drain_url": self.syslog_drain_url,
            }
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateInstance {
    pub name: Option<String>,
    pub space_guid: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub credentials: Option<Option<Map<String, Value>>>,
    pub route_service_url: Option<String>,
    pub syslog_drain_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInstance {
    pub name: Option<String>,
    /// Missing -> keep, null -> clear, object -> replace.
    #[serde(default, deserialize_with = "present")]
    pub credentials: Option<Option<Map<String, Value>>>,
    pub route_service_url: Option<String>,
    pub syslog_drain_url: Option<String>,
}

/// Marks a key as present, keeping an explicit `null` as `Some(None)`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CfError {
    pub code: i32,
    pub title: String,
    pub detail: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub errors: Vec<CfError>,
}

/// A failed request, rendered as the `errors` envelope.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    errors: Vec<CfError>,
}

impl Failure {
    fn not_found(guid: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            errors: vec![CfError {
                code: 60004,
                title: "CF-ServiceInstanceNotFound".to_string(),
                detail: format!("The service instance could not be found: {guid}"),
            }],
        }
    }

    fn missing_fields(fields: &[&str]) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            errors: fields
                .iter()
                .map(|field| CfError {
                    code: 1001,
                    title: "CF-MessageParseError".to_string(),
                    detail: format!("Request invalid due to parse error: Field: {field}, Error: Missing field {field}"),
                })
                .collect(),
        }
    }
}

impl From<JsonRejection> for Failure {
    /// Bodies axum cannot decode still answer with the `errors` envelope.
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            errors: vec![CfError {
                code: 1001,
                title: "CF-MessageParseError".to_string(),
                detail: format!("Request invalid due to parse error: {}", rejection.body_text()),
            }],
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { errors: self.errors })).into_response()
    }
}

pub type Db = Arc<RwLock<HashMap<String, ServiceInstance>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route(
            "/v2/service_instances/{guid}",
            get(get_instance).delete(delete_instance),
        )
        .route("/v2/user_provided_service_instances", post(create_instance))
        .route(
            "/v2/user_provided_service_instances/{guid}",
            get(get_instance).put(update_instance),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn get_instance(
    State(db): State<Db>,
    Path(guid): Path<String>,
) -> Result<Json<Value>, Failure> {
    let instances = db.read().await;
    instances
        .get(&guid)
        .map(|instance| Json(instance.to_resource()))
        .ok_or_else(|| Failure::not_found(&guid))
}

async fn create_instance(
    State(db): State<Db>,
    payload: Result<Json<CreateInstance>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let Json(input) = payload?;
    let (name, space_guid) = match (input.name, input.space_guid) {
        (Some(name), Some(space_guid)) => (name, space_guid),
        (None, Some(_)) => return Err(Failure::missing_fields(&["name"])),
        (Some(_), None) => return Err(Failure::missing_fields(&["space_guid"])),
        (None, None) => return Err(Failure::missing_fields(&["name", "space_guid"])),
    };
    let instance = ServiceInstance {
        guid: Uuid::new_v4().to_string(),
        name,
        space_guid,
        credentials: input.credentials.unwrap_or_else(|| Some(Map::new())),
        route_service_url: input.route_service_url,
        syslog_drain_url: input.syslog_drain_url,
    };
    debug!(guid = %instance.guid, "created user-provided service instance");
    let resource = instance.to_resource();
    db.write().await.insert(instance.guid.clone(), instance);
    Ok((StatusCode::CREATED, Json(resource)))
}

async fn update_instance(
    State(db): State<Db>,
    Path(guid): Path<String>,
    payload: Result<Json<UpdateInstance>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), Failure> {
    let Json(input) = payload?;
    let mut instances = db.write().await;
    let instance = instances
        .get_mut(&guid)
        .ok_or_else(|| Failure::not_found(&guid))?;
    if let Some(name) = input.name {
        instance.name = name;
    }
    if let Some(credentials) = input.credentials {
        instance.credentials = credentials;
    }
    if let Some(url) = input.route_service_url {
        instance.route_service_url = Some(url);
    }
    if let Some(url) = input.syslog_drain_url {
        instance.syslog_drain_url = Some(url);
    }
    debug!(%guid, "updated user-provided service instance");
    Ok((StatusCode::CREATED, Json(instance.to_resource())))
}

async fn delete_instance(
    State(db): State<Db>,
    Path(guid): Path<String>,
) -> Result<StatusCode, Failure> {
    let mut instances = db.write().await;
    instances
        .remove(&guid)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| Failure::not_found(&guid))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(credentials: Option<Map<String, Value>>) -> ServiceInstance {
        ServiceInstance {
            guid: "g-1".to_string(),
            name: "db".to_string(),
            space_guid: "s-1".to_string(),
            credentials,
            route_service_url: None,
            syslog_drain_url: None,
        }
    }

    #[test]
    fn resource_renders_null_credentials() {
        let resource = instance(None).to_resource();
        assert_eq!(resource["entity"]["credentials"], Value::Null);
        assert!(resource["entity"].as_object().unwrap().contains_key("credentials"));
        assert_eq!(resource["metadata"]["guid"], "g-1");
        assert_eq!(resource["entity"]["type"], USER_PROVIDED_TYPE);
    }

    #[test]
    fn update_distinguishes_missing_and_null_credentials() {
        let missing: UpdateInstance = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(missing.credentials, None);

        let null: UpdateInstance = serde_json::from_str(r#"{"credentials":null}"#).unwrap();
        assert_eq!(null.credentials, Some(None));

        let set: UpdateInstance = serde_json::from_str(r#"{"credentials":{"k":"v"}}"#).unwrap();
        assert_eq!(set.credentials.unwrap().unwrap()["k"], "v");
    }

    #[test]
    fn create_with_all_fields_missing_is_allowed_by_serde() {
        let input: CreateInstance = serde_json::from_str(r#"{}"#).unwrap();
        assert!(input.name.is_none());
        assert!(input.space_guid.is_none());
    }

    #[test]
    fn missing_fields_failure_keeps_field_order() {
        let failure = Failure::missing_fields(&["name", "space_guid"]);
        assert_eq!(failure.status, StatusCode::BAD_REQUEST);
        assert_eq!(failure.errors.len(), 2);
        assert!(failure.errors[0].detail.contains("Field: name"));
        assert!(failure.errors[1].detail.contains("Field: space_guid"));
    }
}
