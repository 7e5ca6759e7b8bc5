//! Handler functions for authentication-related API endpoints.
//!
//! These functions parse request data, build the per-request storage handle,
//! call into `auth::service` and move the refresh token between the service
//! and the cookie. The refresh token never appears in a JSON body.

use std::sync::Arc;

use crate::api::common::ApiResponse;
use crate::auth::cookie::CookieService;
use crate::auth::models::*;
use crate::auth::service::AuthService;
use crate::database::{Db, RequestMetrics};
use crate::errors::{ServiceError, ServiceResult};
use crate::utils::jwt::Claims;
use axum::{
    extract::{Extension, Json, rejection::JsonRejection},
    http::{HeaderMap, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;

/// Handle member sign-up request
#[axum::debug_handler]
pub async fn signup(
    Extension(pool): Extension<SqlitePool>,
    Extension(metrics): Extension<RequestMetrics>,
    Extension(auth_service): Extension<Arc<AuthService>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> ServiceResult<Json<ApiResponse<()>>> {
    let Json(request) = payload?;
    let db = Db::new(pool, metrics);

    auth_service.register(&db, request).await?;

    Ok(Json(ApiResponse::ok_message("Sign-up succeeded")))
}

/// Handle login request
///
/// The refresh token is delivered as a cookie, the access token in the body.
#[axum::debug_handler]
pub async fn login(
    Extension(pool): Extension<SqlitePool>,
    Extension(metrics): Extension<RequestMetrics>,
    Extension(auth_service): Extension<Arc<AuthService>>,
    Extension(cookies): Extension<Arc<CookieService>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ServiceResult<impl IntoResponse> {
    let Json(request) = payload?;
    let remember_me = request.remember_me;
    let mut db = Db::new(pool, metrics);

    let result = auth_service.login(&mut db, request).await?;

    let cookie = cookies
        .set_header(&result.refresh_token, remember_me)
        .ok_or_else(|| ServiceError::internal_error("Refresh cookie is not a valid header"))?;
    let body = ApiResponse::success(SessionResponse::from(result), "Login succeeded");

    Ok(([(SET_COOKIE, cookie)], Json(body)))
}

/// Handle token refresh request
#[axum::debug_handler]
pub async fn refresh(
    Extension(pool): Extension<SqlitePool>,
    Extension(metrics): Extension<RequestMetrics>,
    Extension(auth_service): Extension<Arc<AuthService>>,
    Extension(cookies): Extension<Arc<CookieService>>,
    headers: HeaderMap,
) -> ServiceResult<Json<ApiResponse<SessionResponse>>> {
    let refresh_token = cookies
        .get_cookie(&headers)
        .ok_or(ServiceError::CookieNotFound)?;
    let mut db = Db::new(pool, metrics);

    let result = auth_service.refresh(&mut db, &refresh_token).await?;

    Ok(Json(ApiResponse::success(
        SessionResponse::from(result),
        "Access token refreshed",
    )))
}

/// Handle logout request
///
/// Always succeeds; clears the refresh cookie whether or not one was sent.
#[axum::debug_handler]
pub async fn logout(Extension(cookies): Extension<Arc<CookieService>>) -> Response {
    let mut response = Json(ApiResponse::ok_message("Logout succeeded")).into_response();
    if let Some(cookie) = cookies.clear_header() {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

/// Get current member information
#[axum::debug_handler]
pub async fn me(
    Extension(pool): Extension<SqlitePool>,
    Extension(metrics): Extension<RequestMetrics>,
    Extension(auth_service): Extension<Arc<AuthService>>,
    Extension(claims): Extension<Claims>,
) -> ServiceResult<Json<ApiResponse<MemberResponse>>> {
    let mut db = Db::new(pool, metrics);

    let member = auth_service.current_member(&mut db, claims.member_id).await?;

    Ok(Json(ApiResponse::ok(member)))
}
