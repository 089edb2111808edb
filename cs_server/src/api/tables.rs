//! Table, table type, and statistics API handlers.
//!
//! # Examples
//!
//! Reserve a table for a 13:00 session:
//! ```bash
//! curl -X POST http://localhost:5000/api/tables \
//!   -H "Content-Type: application/json" \
//!   -d '{"type": "go", "scheduled_start": "2024-01-01 13:00:00"}'
//! ```
//!
//! Add a table type:
//! ```bash
//! curl -X POST http://localhost:5000/api/tabletypes \
//!   -H "Content-Type: application/json" \
//!   -d '{"type": "mahjong", "duration": 60, "player_count": 4}'
//! ```

use axum::{Json, extract::State};
use chrono::NaiveDateTime;
use conseater::events::EventCount;
use conseater::queue::{TableId, TableType};
use conseater::seating::TableSummary;
use conseater::time_format::naive_timestamp;
use serde::{Deserialize, Serialize};

use super::{ApiResult, AppState, MessageResponse, error_response};

#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<TableSummary>,
}

#[derive(Debug, Deserialize)]
pub struct AddTableRequest {
    #[serde(rename = "type")]
    pub table_type: String,
    #[serde(default, with = "naive_timestamp::option")]
    pub scheduled_start: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize)]
pub struct AddTableResponse {
    pub id: TableId,
}

#[derive(Debug, Deserialize)]
pub struct TableRequest {
    pub table: TableId,
}

#[derive(Debug, Serialize)]
pub struct TableTypesResponse {
    pub types: Vec<TableType>,
}

#[derive(Debug, Deserialize)]
pub struct TableTypeRequest {
    #[serde(rename = "type")]
    pub table_type: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub events: Vec<EventCount>,
}

/// All tables with their seated players.
///
/// # Response
///
/// ```json
/// {
///   "tables": [
///     {
///       "id": 1,
///       "type": "mahjong",
///       "playing": true,
///       "started": "2024-01-01 10:00:00",
///       "scheduled_start": null,
///       "players": [{ "id": 4, "name": "Alice", "phone": null, "added_at": "2024-01-01 09:40:00" }]
///     }
///   ]
/// }
/// ```
pub async fn list_tables(State(state): State<AppState>) -> ApiResult<TablesResponse> {
    let tables = state.manager.list_tables().await.map_err(error_response)?;
    Ok(Json(TablesResponse { tables }))
}

/// Add an idle table, optionally reserved to start at a fixed time.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Malformed `scheduled_start`
/// - `404 Not Found`: Unknown table type
pub async fn add_table(
    State(state): State<AppState>,
    Json(request): Json<AddTableRequest>,
) -> ApiResult<AddTableResponse> {
    let id = state
        .manager
        .add_table(&request.table_type, request.scheduled_start)
        .await
        .map_err(error_response)?;
    Ok(Json(AddTableResponse { id }))
}

/// Start a table now; any reservation is dropped.
pub async fn start_table(
    State(state): State<AppState>,
    Json(request): Json<TableRequest>,
) -> ApiResult<MessageResponse> {
    state
        .manager
        .start_table(request.table)
        .await
        .map_err(error_response)?;
    Ok(MessageResponse::new("Started table"))
}

/// Stop a table and release its seats.
pub async fn clear_table(
    State(state): State<AppState>,
    Json(request): Json<TableRequest>,
) -> ApiResult<MessageResponse> {
    state
        .manager
        .clear_table(request.table)
        .await
        .map_err(error_response)?;
    Ok(MessageResponse::new("Cleared table"))
}

pub async fn delete_table(
    State(state): State<AppState>,
    Json(request): Json<TableRequest>,
) -> ApiResult<MessageResponse> {
    state
        .manager
        .delete_table(request.table)
        .await
        .map_err(error_response)?;
    Ok(MessageResponse::new("Deleted table"))
}

pub async fn list_table_types(State(state): State<AppState>) -> ApiResult<TableTypesResponse> {
    let types = state
        .manager
        .list_table_types()
        .await
        .map_err(error_response)?;
    Ok(Json(TableTypesResponse { types }))
}

/// Add a table type.
///
/// # Errors
///
/// - `400 Bad Request`: Non-positive seat count, duration outside zero to
///   one week, empty name, or a type that already exists
pub async fn add_table_type(
    State(state): State<AppState>,
    Json(table_type): Json<TableType>,
) -> ApiResult<MessageResponse> {
    let name = table_type.name.clone();
    state
        .manager
        .add_table_type(table_type)
        .await
        .map_err(error_response)?;
    Ok(MessageResponse::new(format!("Added table type {name}")))
}

/// Delete a table type together with its tables and queue.
pub async fn delete_table_type(
    State(state): State<AppState>,
    Json(request): Json<TableTypeRequest>,
) -> ApiResult<MessageResponse> {
    state
        .manager
        .delete_table_type(&request.table_type)
        .await
        .map_err(error_response)?;
    Ok(MessageResponse::new("Deleted table type"))
}

/// Totals per event kind.
pub async fn stats(State(state): State<AppState>) -> ApiResult<StatsResponse> {
    let events = state
        .manager
        .event_counts()
        .await
        .map_err(error_response)?;
    Ok(Json(StatsResponse { events }))
}
