//! Verify the entity mapper and error aggregator against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Each vector file lists payloads with their expected outcome. Comparing
//! parsed JSON (not raw strings) avoids false negatives from key ordering.

use cf_client_core::{
    map_entity, to_payload, ApiError, BaseServiceInstanceEntity, ClientV3Exception, CloudFoundryClient,
    DeserializationError, Field, HttpResponse,
};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Entity mapping
// ---------------------------------------------------------------------------

#[test]
fn entity_mapping_vectors() {
    let raw = include_str!("../../test-vectors/entity_mapping.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let result = map_entity::<BaseServiceInstanceEntity>(&case["payload"]);

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            match expected_error.as_str().unwrap() {
                "TypeMismatch" => {
                    let DeserializationError::TypeMismatch { wire_key, .. } = err else {
                        panic!("{name}: expected TypeMismatch");
                    };
                    assert_eq!(wire_key, case["expected_wire_key"].as_str().unwrap(), "{name}: wire key");
                }
                "NotAnObject" => assert!(
                    matches!(err, DeserializationError::NotAnObject { .. }),
                    "{name}: expected NotAnObject"
                ),
                other => panic!("{name}: unknown expected_error: {other}"),
            }
            continue;
        }

        let entity = result.unwrap();
        let credentials_state = match entity.credentials() {
            Field::Unset => "unset",
            Field::Null => "null",
            Field::Value(_) => "value",
        };
        assert_eq!(credentials_state, case["expected_credentials"].as_str().unwrap(), "{name}: credentials");
        assert_eq!(to_payload(&entity), case["expected_payload"], "{name}: re-serialized payload");

        let remapped: BaseServiceInstanceEntity = map_entity(&to_payload(&entity)).unwrap();
        assert_eq!(remapped, entity, "{name}: round-trip");
    }
}

// ---------------------------------------------------------------------------
// Error aggregation
// ---------------------------------------------------------------------------

#[test]
fn error_aggregation_vectors() {
    let raw = include_str!("../../test-vectors/errors.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let result = ClientV3Exception::from_payload(&case["payload"]);

        if let Some(expected_error) = case.get("expected_error") {
            assert_eq!(expected_error.as_str(), Some("Malformed"), "{name}: unknown expected_error");
            assert!(result.is_err(), "{name}: expected malformed payload");
            continue;
        }

        let exception = result.unwrap();
        assert_eq!(
            exception.errors().len() as u64,
            case["expected_count"].as_u64().unwrap(),
            "{name}: error count"
        );
        assert_eq!(exception.message(), case["expected_message"].as_str().unwrap(), "{name}: message");
    }
}

#[test]
fn error_vectors_through_client() {
    let raw = include_str!("../../test-vectors/errors.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let client = CloudFoundryClient::new("http://localhost:3000");

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let response = HttpResponse {
            status: 400,
            headers: Vec::new(),
            body: case["payload"].to_string(),
        };
        let err = client.parse_get_service_instance(response).unwrap_err();

        match (case.get("expected_error"), err) {
            (Some(_), ApiError::MalformedErrorPayload { status, .. }) => assert_eq!(status, 400, "{name}"),
            (None, ApiError::ClientV3(exception)) => {
                assert_eq!(exception.to_string(), case["expected_message"].as_str().unwrap(), "{name}");
            }
            (_, other) => panic!("{name}: unexpected error {other:?}"),
        }
    }
}
