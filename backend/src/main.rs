//! Main entry point for the session-auth backend.
//!
//! This file initializes tracing, loads configuration, sets up the database
//! pool, and assembles the Axum router with its shared services and
//! middleware.

mod api;
mod auth;
mod config;
mod database;
mod errors;
mod middleware;
mod repositories;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use crate::api::common::ApiResponse;
use crate::auth::cookie::CookieService;
use crate::auth::observer::TracingObserver;
use crate::auth::service::AuthService;
use crate::utils::jwt::JwtService;
use crate::utils::password::PasswordHasher;
use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    http::{HeaderValue, Method, StatusCode, header},
    response::Json,
    routing::get,
};
use config::Config;
use database::Database;
use sqlx::SqlitePool;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let db = Database::new(&config).await?;
    let app = create_app(db.pool().clone(), &config)?;

    let bind_address = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    info!("Starting session-auth server on port {}", config.server_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    Ok(())
}

/// Builds the application router and the services it shares across requests.
fn create_app(pool: SqlitePool, config: &Config) -> Result<Router> {
    let jwt = Arc::new(JwtService::from_config(&config.jwt));
    let cookies = Arc::new(CookieService::new(config.cookie.clone()));
    let auth_service = Arc::new(AuthService::new(
        jwt.clone(),
        PasswordHasher::new(config.bcrypt_cost),
        Arc::new(TracingObserver),
    ));

    let app = Router::new()
        .route("/", get(root_handler))
        .nest("/api/v1/auth", auth::routes::auth_router())
        .layer(axum::middleware::from_fn(middleware::api_metrics))
        .layer(Extension(pool))
        .layer(Extension(auth_service))
        .layer(Extension(jwt))
        .layer(Extension(cookies))
        .layer(TraceLayer::new_for_http())
        .layer(timeout_layer(Duration::from_secs(config.request_timeout_seconds)));

    Ok(match cors_layer(&config.cors_allow_origins)? {
        Some(cors) => app.layer(cors),
        None => app,
    })
}

/// Answers `408 Request Timeout` once a request runs longer than `limit`.
fn timeout_layer(limit: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, limit)
}

/// CORS for the configured origins; `None` when no origin is allowed.
fn cors_layer(origins: &[String]) -> Result<Option<CorsLayer>> {
    if origins.is_empty() {
        return Ok(None);
    }

    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid CORS origin: {origin}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    ))
}

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        serde_json::json!({
            "service": "session-auth",
            "version": env!("CARGO_PKG_VERSION")
        }),
        "Welcome to the session-auth API",
    ))
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
