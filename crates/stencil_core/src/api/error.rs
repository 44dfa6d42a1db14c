//! Request-level failures and their HTTP mapping.

use crate::model::base::ValidationError;
use crate::repo::RepoError;
use http::StatusCode;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Per-field messages, keyed by field name.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication credentials were not provided.")]
    NotAuthenticated,
    #[error("Not found.")]
    NotFound,
    #[error("Invalid page.")]
    InvalidPage,
    #[error("Method \"{0}\" not allowed.")]
    MethodNotAllowed(&'static str),
    #[error("invalid payload: {0:?}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::NotFound | Self::InvalidPage => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Repo(err) => match err {
                RepoError::Validation(_) | RepoError::Conflict(_) => StatusCode::BAD_REQUEST,
                RepoError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error payload placed under the envelope's `data` key.
    ///
    /// Server-side failures are reported generically.
    pub fn data(&self) -> Value {
        match self {
            Self::Validation(fields) => field_errors_json(fields),
            Self::Repo(RepoError::Validation(err)) => field_errors_json(&field_errors(err)),
            Self::Repo(RepoError::Conflict(message)) => json!({ "detail": message }),
            Self::Repo(RepoError::NotFound(_)) => json!({ "detail": "Not found." }),
            Self::Repo(_) | Self::Serialization(_) => {
                json!({ "detail": "A server error occurred." })
            }
            other => json!({ "detail": other.to_string() }),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(field_errors(&value))
    }
}

/// Splits a validation failure into per-field messages.
pub fn field_errors(error: &ValidationError) -> FieldErrors {
    let mut fields = FieldErrors::new();
    match error {
        ValidationError::Field { field, message } => {
            fields.insert(field.clone(), vec![message.clone()]);
        }
        other => {
            fields.insert(NON_FIELD_ERRORS.to_string(), vec![other.to_string()]);
        }
    }
    fields
}

fn field_errors_json(fields: &FieldErrors) -> Value {
    let map: Map<String, Value> = fields
        .iter()
        .map(|(field, messages)| (field.clone(), json!(messages)))
        .collect();
    Value::Object(map)
}
