use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::models::{AiRequest, ErrorResponse};
use crate::services::ai_service;
use crate::state::AppState;

/// Queue a completion. The result arrives later as an `operation` message from author `ai`.
pub async fn request_completion(
    State(state): State<AppState>,
    Json(request): Json<AiRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    if request.room_code.trim().is_empty() || request.prompt.trim().is_empty() {
        return Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "roomCode and prompt must be non empty"));
    }

    let Some(completer) = state.completer.clone() else {
        return Err(ErrorResponse::reply(StatusCode::SERVICE_UNAVAILABLE, "completions are not configured"));
    };

    info!("Completion requested for room {} doc {}", request.room_code, request.doc_id);
    ai_service::spawn_completion(completer, state.store.clone(), state.registry.clone(), request);
    Ok(StatusCode::ACCEPTED)
}
