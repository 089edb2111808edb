//! Request metrics middleware.
//!
//! Records a counter and a duration histogram for every request, labelled
//! by method, matched route, and status.
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get, middleware};
//! use cs_server::api::middleware::track_metrics;
//! # async fn handler() {}
//!
//! let app: Router = Router::new()
//!     .route("/api/queue", get(handler))
//!     .layer(middleware::from_fn(track_metrics));
//! # let _ = app;
//! ```

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};

use crate::metrics;

/// Route label used when no route matched, keeping label cardinality bounded
const UNMATCHED_PATH: &str = "unmatched";

pub async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());

    let response = next.run(request).await;

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    metrics::http_requests_total(&method, &path, response.status().as_u16());
    metrics::http_request_duration_ms(&method, &path, elapsed_ms);

    response
}
