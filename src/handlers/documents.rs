use axum::{extract::{Query, State}, http::StatusCode, Json};
use tracing::{error, info};

use crate::models::{CreateDocumentRequest, Document, DocumentListResponse, ErrorResponse, RoomCodeQuery};
use crate::state::AppState;
use crate::ws::broadcast;

const DEFAULT_TITLE: &str = "Untitled";

pub(crate) fn require_room_code(query: &RoomCodeQuery) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    match query.room_code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => Ok(code.to_string()),
        _ => Err(ErrorResponse::reply(StatusCode::BAD_REQUEST, "room code is required")),
    }
}

/// List the documents of a room
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<RoomCodeQuery>,
) -> Result<Json<DocumentListResponse>, (StatusCode, Json<ErrorResponse>)> {
    let room_code = require_room_code(&query)?;

    let documents = match state.store.durable().list_documents(&room_code).await {
        Ok(documents) => documents,
        Err(e) => {
            error!("Failed to list documents of room {}: {}", room_code, e);
            Vec::new()
        }
    };

    Ok(Json(DocumentListResponse { documents }))
}

/// Create a document and tell the room's sessions to refresh their list
pub async fn create_document(
    State(state): State<AppState>,
    Query(query): Query<RoomCodeQuery>,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), (StatusCode, Json<ErrorResponse>)> {
    let room_code = require_room_code(&query)?;

    let title = match request.title.trim() {
        "" => DEFAULT_TITLE.to_string(),
        title => title.to_string(),
    };
    let content = format!("# {}\n\n", title);

    let id = state
        .store
        .durable()
        .create_document(&room_code, &title, &content)
        .await
        .map_err(|e| {
            error!("Error creating document in room {}: {}", room_code, e);
            ErrorResponse::reply(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })?;
    info!("Created document {} '{}' in room {}", id, title, room_code);

    if let Some(room) = state.registry.get(&room_code).await {
        broadcast::document_list_update(&room).await;
    }

    Ok((StatusCode::OK, Json(Document { id, title })))
}
