use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use tracing::error;

use crate::handlers::documents::require_room_code;
use crate::models::{ErrorResponse, Operation, RoomCodeQuery, WireMessage};
use crate::services::doc_edit_service;
use crate::state::AppState;
use crate::ws::broadcast;

/// Author id of edits submitted over HTTP. No session carries it, so nobody is skipped.
pub const API_AUTHOR_ID: &str = "api";

/// Apply an edit outside the websocket path
pub async fn apply_operation(
    State(state): State<AppState>,
    Path(doc_id): Path<i64>,
    Query(query): Query<RoomCodeQuery>,
    Json(operation): Json<Operation>,
) -> Result<(StatusCode, Json<Operation>), (StatusCode, Json<ErrorResponse>)> {
    let room_code = require_room_code(&query)?;

    let edit = doc_edit_service::apply_edit(&state.store, &room_code, doc_id, &operation)
        .await
        .ok_or_else(|| ErrorResponse::reply(StatusCode::BAD_REQUEST, "operation not supported"))?;

    if let Err(e) = &edit.persisted {
        error!("Could not update document {} in room {}: {}", doc_id, room_code, e);
    }

    if let Some(room) = state.registry.get(&room_code).await {
        let message = WireMessage::Operation {
            operation: edit.operation.clone(),
            user_id: Some(API_AUTHOR_ID.to_string()),
        };
        match message.encode() {
            Ok(payload) => {
                broadcast::to_others(&room, API_AUTHOR_ID, doc_id, &payload).await;
            }
            Err(e) => error!("Failed to encode operation for document {}: {}", doc_id, e),
        }
    }

    Ok((StatusCode::OK, Json(edit.operation)))
}
