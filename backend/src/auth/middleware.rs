//! Middleware for protecting authenticated routes.
//!
//! The gate reads the bearer access token and the refresh cookie and either
//! admits the request with the decoded claims or rejects it with a reason the
//! client can act on:
//!
//! | access token | refresh cookie  | outcome           |
//! |--------------|-----------------|-------------------|
//! | valid        | any             | admit             |
//! | expired      | valid           | `ACCESS_EXPIRED`  |
//! | expired      | missing/invalid | `SESSION_EXPIRED` |
//! | invalid      | any             | `INVALID_TOKEN`   |
//! | missing      | valid           | `ACCESS_REQUIRED` |
//! | missing      | missing/invalid | `SESSION_EXPIRED` |

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::Request,
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::common::ApiResponse;
use crate::auth::cookie::CookieService;
use crate::utils::jwt::{Claims, JwtService, TokenStatus, extract_bearer};

/// Why the gate turned a request away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    /// Access token expired but the session can be refreshed.
    AccessExpired,
    /// Nothing usable is left; the member must log in again.
    SessionExpired,
    /// Access token is forged, malformed or of the wrong kind.
    InvalidToken,
    /// Only a refresh token was presented.
    AccessRequired,
}

impl GateRejection {
    pub fn code(&self) -> &'static str {
        match self {
            GateRejection::AccessExpired => "ACCESS_EXPIRED",
            GateRejection::SessionExpired => "SESSION_EXPIRED",
            GateRejection::InvalidToken => "INVALID_TOKEN",
            GateRejection::AccessRequired => "ACCESS_REQUIRED",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            GateRejection::AccessExpired => "Access token expired",
            GateRejection::SessionExpired => "Session expired",
            GateRejection::InvalidToken => "Invalid token",
            GateRejection::AccessRequired => "Access token required",
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let body = ApiResponse::error(self.code(), self.message(), None);
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Admit(Claims),
    Reject(GateRejection),
}

/// Decides the fate of a request from the tokens it carries.
pub fn decide(jwt: &JwtService, access: Option<&str>, refresh: Option<&str>) -> GateDecision {
    let refresh_valid = refresh.is_some_and(|token| jwt.verify_refresh(token).is_ok());

    let Some(access) = access else {
        return if refresh_valid {
            GateDecision::Reject(GateRejection::AccessRequired)
        } else {
            GateDecision::Reject(GateRejection::SessionExpired)
        };
    };

    let error = match jwt.verify_access(access) {
        Ok(claims) => return GateDecision::Admit(claims),
        Err(error) => error,
    };

    match TokenStatus::from(&error) {
        TokenStatus::Expired if refresh_valid => GateDecision::Reject(GateRejection::AccessExpired),
        TokenStatus::Expired => GateDecision::Reject(GateRejection::SessionExpired),
        TokenStatus::Valid | TokenStatus::Invalid => {
            GateDecision::Reject(GateRejection::InvalidToken)
        }
    }
}

/// Session gate middleware
///
/// Inserts the admitted member's [`Claims`] into the request extensions.
pub async fn session_gate(
    Extension(jwt): Extension<Arc<JwtService>>,
    Extension(cookies): Extension<Arc<CookieService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let access = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(extract_bearer)
        .map(str::to_owned);
    let refresh = cookies.get_cookie(request.headers());

    match decide(&jwt, access.as_deref(), refresh.as_deref()) {
        GateDecision::Admit(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        GateDecision::Reject(rejection) => {
            tracing::debug!(code = rejection.code(), "Request rejected by session gate");
            rejection.into_response()
        }
    }
}
