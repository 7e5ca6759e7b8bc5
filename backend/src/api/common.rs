//! Shared response envelope and error mapping for API handlers.
//!
//! Every endpoint answers with the same JSON shape:
//! - `success`: whether the request succeeded
//! - `code`: `OK` or the stable error code of the failure
//! - `message`: human-readable message
//! - `data`: payload on success
//! - `details`: per-field problems for validation failures
//!
//! # Error Handling Flow
//! 1. Service layer returns a domain-specific `ServiceError`
//! 2. `service_error_to_http` picks the status code and builds the envelope
//! 3. Internal failures are answered with a generic message only

use crate::errors::{ErrorClass, ServiceError};
use crate::utils::jwt::TokenError;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

pub const SUCCESS_CODE: &str = "OK";

/// Standard API response wrapper for all endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Indicates if the request was successful
    pub success: bool,
    /// `OK` on success, otherwise the error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Field-specific problems (present on validation failures)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
    /// Response timestamp
    pub timestamp: String,
}

/// Field-specific validation error details
#[derive(Debug, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the field with validation error
    pub field: String,
    /// Description of the validation failure
    pub message: String,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: SUCCESS_CODE.to_string(),
            message: message.into(),
            data: Some(data),
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a successful response with default message
    pub fn ok(data: T) -> Self {
        Self::success(data, "Request successful")
    }
}

impl ApiResponse<()> {
    /// Create a successful response without payload
    pub fn ok_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: SUCCESS_CODE.to_string(),
            message: message.into(),
            data: None,
            details: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create an error response
    pub fn error(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<Vec<FieldError>>,
    ) -> Self {
        Self {
            success: false,
            code: code.into(),
            message: message.into(),
            data: None,
            details,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Converts ServiceError to appropriate HTTP response with standard format
pub fn service_error_to_http(error: ServiceError) -> (StatusCode, Json<ApiResponse<()>>) {
    let status = match &error {
        ServiceError::EmailAlreadyExists => StatusCode::CONFLICT,
        ServiceError::InvalidCredential
        | ServiceError::Token(TokenError::Invalid | TokenError::Expired | TokenError::TypeWrong) => {
            StatusCode::UNAUTHORIZED
        }
        ServiceError::NotFound { .. } => StatusCode::NOT_FOUND,
        _ if error.class() == ErrorClass::Validation => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let code = error.code();
    let body = match error {
        ServiceError::RequiredFieldMissing { fields } => {
            let details = fields
                .into_iter()
                .map(|field| FieldError {
                    field,
                    message: "Field is required".to_string(),
                })
                .collect();
            ApiResponse::error(code, "Required field is missing", Some(details))
        }
        ServiceError::RequestParseFailed { message } => ApiResponse::error(code, message, None),
        ServiceError::NotFound { entity, .. } => {
            ApiResponse::error(code, format!("{entity} not found"), None)
        }
        other if status == StatusCode::INTERNAL_SERVER_ERROR => {
            tracing::error!(error = %other, "Request failed");
            ApiResponse::error(code, "Internal server error", None)
        }
        other => ApiResponse::error(code, other.to_string(), None),
    };

    (status, Json(body))
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        service_error_to_http(self).into_response()
    }
}

impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::RequestParseFailed {
            message: rejection.body_text(),
        }
    }
}
