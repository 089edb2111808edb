//! Queue API handlers.
//!
//! Reads return every waiting party with its projected seating time;
//! estimates are recomputed from a fresh snapshot on every call.
//!
//! # Examples
//!
//! Read one queue:
//! ```bash
//! curl http://localhost:5000/api/queue/mahjong
//! ```
//!
//! Add a party of three:
//! ```bash
//! curl -X POST http://localhost:5000/api/queue \
//!   -H "Content-Type: application/json" \
//!   -d '{"name": "Alice", "phone": "555-0100", "type": "mahjong", "num_players": 3}'
//! ```

use std::time::Instant;

use axum::{
    Json,
    extract::{Path, State},
};
use conseater::queue::{PersonId, QueueError, QueueTypeResult, TableId};
use conseater::seating::{EnqueueRequest, QueuedPerson};
use serde::{Deserialize, Serialize};

use super::request_id::RequestId;
use super::{ApiResult, AppState, MessageResponse, error_response};
use crate::{logging, metrics};

#[derive(Debug, Serialize)]
pub struct QueuesResponse {
    pub queues: Vec<QueueTypeResult>,
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub message: String,
    pub players: Vec<QueuedPerson>,
}

#[derive(Debug, Deserialize)]
pub struct MovePlayerRequest {
    pub player: PersonId,
    #[serde(rename = "type")]
    pub table_type: String,
}

#[derive(Debug, Deserialize)]
pub struct SeatPlayerRequest {
    pub player: PersonId,
    pub table: TableId,
}

#[derive(Debug, Deserialize)]
pub struct PlayerRequest {
    pub player: PersonId,
}

#[derive(Debug, Deserialize)]
pub struct RenamePlayerRequest {
    pub player: PersonId,
    pub name: String,
}

fn record_estimation(result: &QueueTypeResult, start: Instant) {
    let elapsed = start.elapsed();
    logging::log_estimation(
        &result.table_type,
        result.queue.len(),
        elapsed.as_millis() as u64,
    );
    metrics::estimation_duration_ms(&result.table_type, elapsed.as_secs_f64() * 1000.0);
}

/// All queues with ETAs, ordered by table type name.
///
/// Each type is estimated and timed on its own.
///
/// # Response
///
/// ```json
/// {
///   "queues": [
///     {
///       "type": "mahjong",
///       "queue": [
///         {
///           "id": 1,
///           "name": "Alice",
///           "hasPhone": true,
///           "elapsed": "10m",
///           "added": "2024-01-01 10:00:00",
///           "eta": "2024-01-01 11:00:00",
///           "remaining": "50m"
///         }
///       ],
///       "eta": "2024-01-01 11:00:00",
///       "remaining": "50m"
///     }
///   ]
/// }
/// ```
pub async fn list_queues(State(state): State<AppState>) -> ApiResult<QueuesResponse> {
    let table_types = state
        .manager
        .list_table_types()
        .await
        .map_err(error_response)?;

    let mut queues = Vec::with_capacity(table_types.len());
    for table_type in table_types {
        let start = Instant::now();
        match state.manager.queue_for_type(&table_type.name).await {
            Ok(result) => {
                record_estimation(&result, start);
                queues.push(result);
            }
            // Deleted since the type list was read
            Err(QueueError::TableTypeNotFound(_)) => continue,
            Err(e) => return Err(error_response(e)),
        }
    }
    Ok(Json(QueuesResponse { queues }))
}

/// One table type's queue with ETAs.
///
/// # Errors
///
/// - `404 Not Found`: Unknown table type
pub async fn get_queue(
    State(state): State<AppState>,
    Path(table_type): Path<String>,
) -> ApiResult<QueueTypeResult> {
    let start = Instant::now();
    let result = state
        .manager
        .queue_for_type(&table_type)
        .await
        .map_err(error_response)?;
    record_estimation(&result, start);
    Ok(Json(result))
}

/// Add a party to a queue.
///
/// # Errors
///
/// - `400 Bad Request`: Empty name or group size out of range
/// - `404 Not Found`: Unknown table type
pub async fn enqueue(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(request): Json<EnqueueRequest>,
) -> ApiResult<EnqueueResponse> {
    let players = state.manager.enqueue(request).await.map_err(error_response)?;
    tracing::info!(
        request_id = %request_id.as_str(),
        players = players.len(),
        "Party queued"
    );

    Ok(Json(EnqueueResponse {
        message: format!("Added {} players", players.len()),
        players,
    }))
}

/// Move a person into a queue, leaving any other queue or seat.
pub async fn move_to_queue(
    State(state): State<AppState>,
    Json(request): Json<MovePlayerRequest>,
) -> ApiResult<MessageResponse> {
    state
        .manager
        .move_to_queue(request.player, &request.table_type)
        .await
        .map_err(error_response)?;
    Ok(MessageResponse::new("Moved player"))
}

/// Seat a person at a table.
pub async fn seat_at_table(
    State(state): State<AppState>,
    Json(request): Json<SeatPlayerRequest>,
) -> ApiResult<MessageResponse> {
    state
        .manager
        .seat_at_table(request.player, request.table)
        .await
        .map_err(error_response)?;
    Ok(MessageResponse::new("Seated player"))
}

pub async fn delete_player(
    State(state): State<AppState>,
    Json(request): Json<PlayerRequest>,
) -> ApiResult<MessageResponse> {
    state
        .manager
        .delete_person(request.player)
        .await
        .map_err(error_response)?;
    Ok(MessageResponse::new("Deleted player"))
}

pub async fn rename_player(
    State(state): State<AppState>,
    Json(request): Json<RenamePlayerRequest>,
) -> ApiResult<MessageResponse> {
    state
        .manager
        .rename_person(request.player, &request.name)
        .await
        .map_err(error_response)?;
    Ok(MessageResponse::new("Renamed player"))
}
