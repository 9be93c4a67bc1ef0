//! # HTTP Request Metrics Middleware
//!
//! Axum middleware recording request counts and latency. Per-request spans
//! come from tower-http's `TraceLayer` configured in the router.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics;

/// Axum middleware that records `http_requests_total` and request latency
pub async fn track_http_requests(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = normalize_path_for_metrics(request.uri().path());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed = start.elapsed();

    tracing::debug!(
        method = %method,
        path = %path,
        status = status,
        elapsed_ms = elapsed.as_millis(),
        "HTTP request completed"
    );

    metrics::record_http_request(&method, &path, status, elapsed.as_secs_f64()).await;

    response
}

/// Normalize path for metrics to avoid high cardinality
///
/// Segments following a known collection are replaced with `:id`.
fn normalize_path_for_metrics(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    let mut normalized = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        let prev_is_collection =
            i > 0 && matches!(segments.get(i - 1).copied(), Some("organizations"));

        if prev_is_collection && !segment.is_empty() {
            normalized.push(":id");
        } else {
            normalized.push(*segment);
        }
    }

    normalized.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use axum::http::Request;
    use tower::ServiceExt;

    async fn test_handler() -> &'static str {
        "OK"
    }

    #[tokio::test]
    async fn test_middleware_passes_response_through() {
        let app = Router::new()
            .route("/test", get(test_handler))
            .layer(axum::middleware::from_fn(track_http_requests));

        let request = Request::builder().uri("/test").method("GET").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_normalize_path_for_metrics() {
        assert_eq!(normalize_path_for_metrics("/organizations"), "/organizations");
        assert_eq!(normalize_path_for_metrics("/health"), "/health");
        assert_eq!(
            normalize_path_for_metrics("/organizations/550e8400-e29b-41d4-a716-446655440000"),
            "/organizations/:id"
        );
        assert_eq!(normalize_path_for_metrics("/organizations/"), "/organizations/");
    }
}
