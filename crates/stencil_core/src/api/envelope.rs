//! Uniform response envelope.
//!
//! # Responsibility
//! - Wrap any payload and HTTP status into
//!   `{"data", "status", "action_code", ...extra}`.
//!
//! # Invariants
//! - `status` is `"success"` exactly for 2xx codes.
//! - A 401 always carries `AUTH_TOKEN_NOT_PROVIDED_OR_INVALID`, whatever
//!   action code the caller supplied.
//! - Building an envelope performs no I/O and cannot fail.

use crate::api::error::ApiError;
use http::StatusCode;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// Client follow-up hint carried by every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionCode {
    #[default]
    DoNothing,
    DisplayErrorMessages,
    AuthTokenNotProvidedOrInvalid,
    /// Application-specific tag, sent verbatim.
    Custom(String),
}

impl ActionCode {
    pub fn as_str(&self) -> &str {
        match self {
            Self::DoNothing => "DO_NOTHING",
            Self::DisplayErrorMessages => "DISPLAY_ERROR_MESSAGES",
            Self::AuthTokenNotProvidedOrInvalid => "AUTH_TOKEN_NOT_PROVIDED_OR_INVALID",
            Self::Custom(code) => code,
        }
    }
}

impl Display for ActionCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ActionCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

impl ResponseStatus {
    pub fn for_code(status_code: StatusCode) -> Self {
        if status_code.is_success() {
            Self::Success
        } else {
            Self::Error
        }
    }
}

/// Outward response body plus the HTTP status it travels with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub data: Value,
    pub status: ResponseStatus,
    pub action_code: ActionCode,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub status_code: StatusCode,
}

impl Envelope {
    /// Wraps `data` for `status_code`.
    ///
    /// Keys of `extra` that collide with the envelope's own keys are
    /// dropped.
    pub fn wrap(
        data: Value,
        status_code: StatusCode,
        action_code: ActionCode,
        mut extra: Map<String, Value>,
    ) -> Self {
        let action_code = if status_code == StatusCode::UNAUTHORIZED {
            ActionCode::AuthTokenNotProvidedOrInvalid
        } else {
            action_code
        };
        for reserved in ["data", "status", "action_code"] {
            extra.remove(reserved);
        }
        Self {
            data,
            status: ResponseStatus::for_code(status_code),
            action_code,
            extra,
            status_code,
        }
    }

    /// Adds one extra top-level key.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if !matches!(key.as_str(), "data" | "status" | "action_code") {
            self.extra.insert(key, value);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Renders the wire body.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert("data".to_string(), self.data.clone());
        body.insert(
            "status".to_string(),
            Value::from(match self.status {
                ResponseStatus::Success => "success",
                ResponseStatus::Error => "error",
            }),
        );
        body.insert(
            "action_code".to_string(),
            Value::from(self.action_code.as_str()),
        );
        for (key, value) in &self.extra {
            body.insert(key.clone(), value.clone());
        }
        Value::Object(body)
    }
}

/// `200` envelope with the default action code.
pub fn send_response(data: Value) -> Envelope {
    Envelope::wrap(data, StatusCode::OK, ActionCode::default(), Map::new())
}

/// `400` envelope with the default action code.
pub fn send_error_response(data: Value) -> Envelope {
    Envelope::wrap(data, StatusCode::BAD_REQUEST, ActionCode::default(), Map::new())
}

/// Error envelope for a failed operation.
pub fn from_error(error: &ApiError) -> Envelope {
    Envelope::wrap(
        error.data(),
        error.status_code(),
        ActionCode::DisplayErrorMessages,
        Map::new(),
    )
}

#[cfg(test)]
mod tests {
    use super::{send_error_response, send_response, ActionCode, Envelope};
    use http::StatusCode;
    use serde_json::{json, Map};

    #[test]
    fn wire_shape_matches_serde_output() {
        let envelope = send_response(json!({"id": 1})).with_extra("meta", json!({"page": 1}));
        assert_eq!(serde_json::to_value(&envelope).unwrap(), envelope.to_json());
        assert_eq!(
            envelope.to_json(),
            json!({
                "data": {"id": 1},
                "status": "success",
                "action_code": "DO_NOTHING",
                "meta": {"page": 1},
            })
        );
    }

    #[test]
    fn error_response_defaults_to_bad_request() {
        let envelope = send_error_response(json!({"detail": "nope"}));
        assert_eq!(envelope.status_code, StatusCode::BAD_REQUEST);
        assert_eq!(envelope.to_json()["status"], "error");
    }

    #[test]
    fn extras_cannot_shadow_envelope_keys() {
        let mut extra = Map::new();
        extra.insert("status".to_string(), json!("hijacked"));
        extra.insert("trace_id".to_string(), json!("abc"));
        let envelope = Envelope::wrap(json!(null), StatusCode::OK, ActionCode::DoNothing, extra);
        let body = envelope.to_json();
        assert_eq!(body["status"], "success");
        assert_eq!(body["trace_id"], "abc");
    }
}
