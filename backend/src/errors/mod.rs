//! Global application error types.
//!
//! `ServiceError` is the closed set of failures a service operation can
//! produce. Each variant carries a stable wire code and belongs to one class
//! (validation, business, internal) that decides how it is reported.

use crate::utils::jwt::TokenError;
use crate::utils::password::PasswordError;
use thiserror::Error;

/// How an error is treated by reporting and response mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller sent missing or malformed input.
    Validation,
    /// Expected, recoverable outcome of a well-formed request.
    Business,
    /// Unexpected failure inside the service or its dependencies.
    Internal,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("REQUEST_PARSE_FAILED: {message}")]
    RequestParseFailed { message: String },

    #[error("REQUIRED_FIELD_MISSING: {}", .fields.join(", "))]
    RequiredFieldMissing { fields: Vec<String> },

    #[error("EMAIL_ALREADY_EXISTS")]
    EmailAlreadyExists,

    #[error("INVALID_CREDENTIAL")]
    InvalidCredential,

    #[error("COOKIE_NOT_FOUND")]
    CookieNotFound,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("{entity} not found: {identifier}")]
    NotFound { entity: String, identifier: String },

    #[error(transparent)]
    Hashing(#[from] PasswordError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn required_fields(fields: Vec<String>) -> Self {
        Self::RequiredFieldMissing { fields }
    }

    pub fn not_found(entity: impl Into<String>, identifier: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            identifier: identifier.to_string(),
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable code used on the wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RequestParseFailed { .. } => "REQUEST_PARSE_FAILED",
            Self::RequiredFieldMissing { .. } => "REQUIRED_FIELD_MISSING",
            Self::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::CookieNotFound => "COOKIE_NOT_FOUND",
            Self::Token(TokenError::Invalid) => "TOKEN_INVALID",
            Self::Token(TokenError::Expired) => "TOKEN_EXPIRED",
            Self::Token(TokenError::TypeWrong) => "TOKEN_TYPE_WRONG",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Token(TokenError::Signing(_))
            | Self::Hashing(_)
            | Self::Database(_)
            | Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::RequestParseFailed { .. }
            | Self::RequiredFieldMissing { .. }
            | Self::CookieNotFound => ErrorClass::Validation,
            Self::EmailAlreadyExists
            | Self::InvalidCredential
            | Self::Token(TokenError::Expired)
            | Self::Token(TokenError::TypeWrong) => ErrorClass::Business,
            // A forged or corrupted token is a security event, not routine expiry.
            Self::Token(TokenError::Invalid)
            | Self::Token(TokenError::Signing(_))
            | Self::NotFound { .. }
            | Self::Hashing(_)
            | Self::Database(_)
            | Self::Internal { .. } => ErrorClass::Internal,
        }
    }
}
