use std::sync::Arc;

use async_graphql::{Error, ErrorExtensions};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Shared result type for directory and gate operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("User is not an HR")]
    NotHr,
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "VALIDATION",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::InvalidCredentials => "INVALID_CREDENTIALS",
            ApiError::NotHr => "NOT_HR",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal(Arc::new(err))
    }

    /// Client-visible text. Internal causes never leak.
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// `{"success": false, "message": ...}`, logging masked internals.
    pub fn envelope(&self) -> Value {
        if let ApiError::Internal(cause) = self {
            tracing::error!(error = %cause, "request failed with internal error");
        }
        Envelope::failure(self.message()).into_value()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value)
    }
}

impl ErrorExtensions for ApiError {
    fn extend(&self) -> Error {
        let mut err = Error::new(self.to_string());
        err = err.extend_with(|_err, e| {
            e.set("code", self.code());
        });
        if let ApiError::Validation(_) = self {
            err = err.extend_with(|_err, e| {
                e.set("type", "BAD_REQUEST");
            });
        }
        err
    }
}

/// Convert any error into a GraphQL error payload while hiding internals.
pub fn internal_error(err: impl Into<anyhow::Error>) -> Error {
    ApiError::internal(err.into()).extend()
}

/// Uniform JSON response body: a `success` flag plus either a message or
/// named payload keys.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Envelope {
    success: bool,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Envelope {
    pub fn success() -> Self {
        Self {
            success: true,
            fields: Map::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            fields: Map::new(),
        }
        .message(message)
    }

    pub fn message(self, message: impl Into<String>) -> Self {
        self.with("message", Value::String(message.into()))
    }

    /// Attach a payload under `key`. Values that fail to serialize become null.
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.fields.insert(key.to_string(), value);
        self
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_graphql::Value as GqlValue;
    use serde_json::json;

    #[test]
    fn internal_errors_are_masked() {
        let err = internal_error(anyhow::anyhow!("boom"));
        assert_eq!(err.message, "internal server error");
        let extra = err.extensions.as_ref().and_then(|map| map.get("code"));
        let code = extra.cloned();
        assert_eq!(code, Some(GqlValue::from("INTERNAL")));
    }

    #[test]
    fn failure_envelope_carries_message() {
        let body = ApiError::not_found("Employee not found").envelope();
        assert_eq!(
            body,
            json!({"success": false, "message": "Employee not found"})
        );
    }

    #[test]
    fn not_hr_and_credential_errors_have_fixed_text() {
        assert_eq!(ApiError::NotHr.message(), "User is not an HR");
        assert_eq!(ApiError::InvalidCredentials.message(), "Invalid credentials");
        assert_eq!(ApiError::Unauthorized.message(), "Unauthorized");
    }

    #[test]
    fn success_envelope_flattens_payload() {
        let body = Envelope::success()
            .message("Employee created")
            .with("username", "john_240101120000")
            .into_value();
        assert_eq!(
            body,
            json!({
                "success": true,
                "message": "Employee created",
                "username": "john_240101120000"
            })
        );
    }
}
