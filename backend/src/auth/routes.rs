//! Defines the HTTP routes specifically for authentication.
//!
//! Sign-up, login, refresh and logout are open; `/me` sits behind the
//! session gate. Shared services are expected as request extensions.

use crate::auth::handlers::*;
use crate::auth::middleware::session_gate;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Creates the authentication router with all auth-related routes
pub fn auth_router() -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me).layer(middleware::from_fn(session_gate)))
}
