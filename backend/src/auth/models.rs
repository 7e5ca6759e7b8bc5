//! Data structures for authentication requests and responses.
//!
//! Field names follow the camelCase wire format used by the web client.

use crate::database::models::{Member, Role};
use crate::errors::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Sign-up request payload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    pub tel: Option<String>,
    pub address: Option<String>,
    pub profile: Option<String>,
}

/// Login request payload
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[serde(default)]
    pub remember_me: bool,
}

/// Public projection of a member. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberResponse {
    pub id: i64,
    pub email: String,
    pub profile: Option<String>,
    pub roles: Vec<Role>,
}

impl MemberResponse {
    pub fn new(member: &Member, roles: Vec<Role>) -> Self {
        Self {
            id: member.member_id,
            email: member.email.clone(),
            profile: member.profile.clone(),
            roles,
        }
    }
}

/// Result of a successful login. The refresh token leaves the service here
/// and is moved into a cookie by the handler.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub access_token: String,
    pub refresh_token: String,
    pub member: MemberResponse,
}

/// Result of a successful refresh. Carries no refresh token.
#[derive(Debug, Clone)]
pub struct RefreshResult {
    pub access_token: String,
    pub member: MemberResponse,
}

/// Response body for login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub access_token: String,
    pub member: MemberResponse,
}

impl From<LoginResult> for SessionResponse {
    fn from(result: LoginResult) -> Self {
        Self {
            access_token: result.access_token,
            member: result.member,
        }
    }
}

impl From<RefreshResult> for SessionResponse {
    fn from(result: RefreshResult) -> Self {
        Self {
            access_token: result.access_token,
            member: result.member,
        }
    }
}

/// Runs the derived validation and reports every missing field at once.
pub fn validate_required<T: Validate>(payload: &T) -> ServiceResult<()> {
    payload.validate().map_err(|validation_errors| {
        let mut fields: Vec<String> = validation_errors
            .field_errors()
            .into_keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();
        ServiceError::required_fields(fields)
    })
}
