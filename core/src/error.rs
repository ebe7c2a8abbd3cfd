//! Error types for the Cloud Foundry API client.
//!
//! # Design
//! A rejected call is reported by the API as an `errors` array. Each element
//! becomes a `ClientV3Error`, and the ordered list is wrapped in one
//! `ClientV3Exception` whose message is computed once at construction. The
//! exception always holds at least one error: a failure body with no errors
//! is a `MalformedErrorPayload`, never an empty exception.
//!
//! Everything else the core can fail with is an `ApiError` variant, so callers
//! have a single error channel to match on.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::schema::{json_type, FieldKind};

/// A response body could not be mapped onto the expected entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeserializationError {
    /// The body is not JSON at all.
    #[error("body is not valid JSON: {0}")]
    InvalidJson(String),

    /// The payload (or a nested payload) is not a JSON object.
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// A required envelope key such as `entity` is missing.
    #[error("missing key `{key}`")]
    MissingKey { key: &'static str },

    /// A field holds a JSON value of the wrong type.
    #[error("field `{wire_key}` expected {expected}, found {found}")]
    TypeMismatch {
        wire_key: &'static str,
        expected: FieldKind,
        found: &'static str,
    },
}

/// A failure body that does not follow the `{"errors": [...]}` contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed error payload: {reason}")]
pub struct MalformedErrorPayload {
    reason: String,
}

impl MalformedErrorPayload {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// One `{code, detail, title}` record from an API error payload.
///
/// Every part is optional because the API does not always send all three.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientV3Error {
    code: Option<i32>,
    detail: Option<String>,
    title: Option<String>,
}

impl ClientV3Error {
    pub fn new(code: Option<i32>, detail: Option<String>, title: Option<String>) -> Self {
        Self {
            code,
            detail,
            title,
        }
    }

    /// Parse one array element. A sub-field of the wrong type is left unset
    /// rather than failing the record.
    fn from_value(value: &Value) -> Result<Self, MalformedErrorPayload> {
        let object = value.as_object().ok_or_else(|| {
            MalformedErrorPayload::new(format!(
                "error entry must be an object, found {}",
                json_type(value)
            ))
        })?;

        let code = object
            .get("code")
            .and_then(Value::as_i64)
            .and_then(|c| i32::try_from(c).ok());
        let detail = object.get("detail").and_then(Value::as_str).map(str::to_string);
        let title = object.get("title").and_then(Value::as_str).map(str::to_string);

        Ok(Self::new(code, detail, title))
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

impl fmt::Display for ClientV3Error {
    /// `<title>(<code>): <detail>`; a missing part prints as `null`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.title.as_deref().unwrap_or("null");
        let detail = self.detail.as_deref().unwrap_or("null");
        match self.code {
            Some(code) => write!(f, "{title}({code}): {detail}"),
            None => write!(f, "{title}(null): {detail}"),
        }
    }
}

/// The typed failure for a call the API rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ClientV3Exception {
    errors: Vec<ClientV3Error>,
    message: String,
}

impl ClientV3Exception {
    /// Wrap an ordered, non-empty list of errors.
    pub fn new(errors: Vec<ClientV3Error>) -> Result<Self, MalformedErrorPayload> {
        if errors.is_empty() {
            return Err(MalformedErrorPayload::new("`errors` array is empty"));
        }
        let message = errors
            .iter()
            .map(ClientV3Error::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        Ok(Self { errors, message })
    }

    /// Build the exception from a decoded failure body.
    pub fn from_payload(payload: &Value) -> Result<Self, MalformedErrorPayload> {
        let object = payload.as_object().ok_or_else(|| {
            MalformedErrorPayload::new(format!(
                "expected a JSON object, found {}",
                json_type(payload)
            ))
        })?;
        let entries = match object.get("errors") {
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                return Err(MalformedErrorPayload::new(format!(
                    "`errors` must be an array, found {}",
                    json_type(other)
                )))
            }
            None => return Err(MalformedErrorPayload::new("missing `errors` key")),
        };

        let errors = entries
            .iter()
            .map(ClientV3Error::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(errors)
    }

    /// Build the exception from a raw failure body.
    pub fn from_body(body: &str) -> Result<Self, MalformedErrorPayload> {
        let payload: Value = serde_json::from_str(body)
            .map_err(|e| MalformedErrorPayload::new(format!("body is not valid JSON: {e}")))?;
        Self::from_payload(&payload)
    }

    /// The errors in the order the API reported them.
    pub fn errors(&self) -> &[ClientV3Error] {
        &self.errors
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn into_errors(self) -> Vec<ClientV3Error> {
        self.errors
    }
}

/// Errors returned by `CloudFoundryClient` and the entity mapper.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A success body could not be mapped onto the expected entity.
    #[error("deserialization failed: {0}")]
    Deserialization(#[from] DeserializationError),

    /// The API rejected the request with one or more structured errors.
    #[error(transparent)]
    ClientV3(#[from] ClientV3Exception),

    /// The API returned a failure status with a body we could not interpret.
    #[error("HTTP {status}: {source}")]
    MalformedErrorPayload {
        status: u16,
        source: MalformedErrorPayload,
    },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}
