//! HTTP API for the seating server.
//!
//! JSON in, JSON out. Errors are returned as `{ "error": message }` with a
//! status code derived from the underlying [`QueueError`].
//!
//! # Modules
//!
//! - [`queue`]: Queue reads with ETAs and party management
//! - [`tables`]: Tables, table types, and statistics
//! - [`middleware`]: Request metrics
//! - [`request_id`]: Request correlation IDs
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                 - Storage health
//! GET  /api/queue              - All queues with ETAs
//! GET  /api/queue/{type}       - One queue with ETAs
//! POST /api/queue              - Add a party
//! POST /api/queueplayer        - Move a person to a queue
//! POST /api/tableplayer        - Seat a person at a table
//! POST /api/deleteplayer       - Delete a person
//! POST /api/editplayer         - Rename a person
//! GET  /api/tables             - Tables with seated players
//! POST /api/tables             - Add a table
//! POST /api/starttable         - Start a table now
//! POST /api/cleartable         - Stop a table and release its seats
//! POST /api/deletetable        - Delete a table
//! GET  /api/tabletypes         - Table types
//! POST /api/tabletypes         - Add a table type
//! POST /api/deletetabletype    - Delete a table type
//! GET  /api/stats              - Event totals
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use cs_server::api::{create_router, AppState};
//! use conseater::db::MemoryRepository;
//! use conseater::seating::SeatingManager;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState {
//!     manager: Arc::new(SeatingManager::new(Arc::new(MemoryRepository::new()))),
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively so kiosk pages on other hosts can poll.

pub mod middleware;
pub mod queue;
pub mod request_id;
pub mod tables;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use conseater::{queue::QueueError, seating::SeatingManager};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SeatingManager>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Handler result carrying a JSON body or an error response
pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Map a queue error to an HTTP status and client-safe body.
pub fn error_response(err: QueueError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        QueueError::InvalidConfig { .. }
        | QueueError::InvalidTimestamp { .. }
        | QueueError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        QueueError::TableTypeNotFound(_)
        | QueueError::PersonNotFound(_)
        | QueueError::TableNotFound(_) => StatusCode::NOT_FOUND,
        QueueError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        QueueError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if err.is_client_error() {
        tracing::debug!(error = %err, "Request rejected");
    } else {
        tracing::error!(error = %err, "Request failed");
    }

    (
        status,
        Json(ErrorResponse {
            error: err.client_message(),
        }),
    )
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/queue", get(queue::list_queues).post(queue::enqueue))
        .route("/queue/{type}", get(queue::get_queue))
        .route("/queueplayer", post(queue::move_to_queue))
        .route("/tableplayer", post(queue::seat_at_table))
        .route("/deleteplayer", post(queue::delete_player))
        .route("/editplayer", post(queue::rename_player))
        .route("/tables", get(tables::list_tables).post(tables::add_table))
        .route("/starttable", post(tables::start_table))
        .route("/cleartable", post(tables::clear_table))
        .route("/deletetable", post(tables::delete_table))
        .route(
            "/tabletypes",
            get(tables::list_table_types).post(tables::add_table_type),
        )
        .route("/deletetabletype", post(tables::delete_table_type))
        .route("/stats", get(tables::stats));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(axum::middleware::from_fn(middleware::track_metrics))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when storage answers, `503 Service Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:5000/health
/// # {"status":"healthy","version":"0.1.0","storage":true,"timestamp":"2024-01-01 10:00:00"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_healthy = state.manager.health_check().await.is_ok();

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if storage_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage_healthy,
        "timestamp": conseater::time_format::format_timestamp(&state.manager.now()),
    });

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let (status, body) = error_response(QueueError::InvalidInput("Please enter a name".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "Please enter a name");

        let (status, _) = error_response(QueueError::TableNotFound(3));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) =
            error_response(QueueError::Timeout(std::time::Duration::from_secs(5)));
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.error, "Internal server error");
    }
}
