//! Request-level middleware shared by every route.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};

use crate::database::RequestMetrics;

/// Per-request storage metrics.
///
/// Creates a fresh [`RequestMetrics`] for the request, exposes it to handlers
/// as an extension and logs the totals once the response is ready:
/// - `api`: matched route, or the raw path when nothing matched
/// - `time_ms`: total handling time
/// - `query_count`: storage calls made by the request
/// - `max_query_time_ms`: slowest storage call
pub async fn api_metrics(mut request: Request, next: Next) -> Response {
    let api = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());

    let metrics = RequestMetrics::new();
    request.extensions_mut().insert(metrics.clone());

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed();

    let stats = metrics.snapshot();
    tracing::info!(
        api = %api,
        status = response.status().as_u16(),
        time_ms = elapsed.as_millis() as u64,
        query_count = stats.query_count,
        max_query_time_ms = stats.max_time_ms,
        "API metrics"
    );
    if let Some(query) = stats.max_query {
        tracing::debug!(api = %api, query = %query, "Slowest query");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Extension, Router,
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
    };
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn one_query(Extension(metrics): Extension<RequestMetrics>) -> String {
        metrics.record("SELECT 1", Duration::from_millis(3));
        metrics.snapshot().query_count.to_string()
    }

    fn app() -> Router {
        Router::new()
            .route("/members/{id}", get(one_query))
            .layer(middleware::from_fn(api_metrics))
    }

    async fn call(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_handlers_receive_metrics() {
        let (status, body) = call(app(), "/members/1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "1");
    }

    #[tokio::test]
    async fn test_metrics_are_not_shared_between_requests() {
        let app = app();

        let (_, first) = call(app.clone(), "/members/1").await;
        let (_, second) = call(app, "/members/2").await;

        assert_eq!(first, "1");
        assert_eq!(second, "1");
    }

    #[tokio::test]
    async fn test_unmatched_route_passes_through() {
        let (status, _) = call(app(), "/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
